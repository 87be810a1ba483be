//! Task View - 任务快照的只读展示形式
//!
//! 事件流与 HTTP 响应共用

use serde::Serialize;

use crate::domain::analysis::{AnalysisResult, RecordId};
use crate::domain::task::{ClarificationState, Task, TaskId, TaskStatus};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskView {
    pub id: TaskId,
    pub ordinal: u64,
    pub input_text: String,
    pub status: TaskStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<AnalysisResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_id: Option<RecordId>,
    pub clarification: ClarificationState,
    pub clarification_pending: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clarification_error: Option<String>,
    pub accepted: Vec<String>,
    pub denied: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&Task> for TaskView {
    fn from(task: &Task) -> Self {
        Self {
            id: *task.id(),
            ordinal: task.ordinal(),
            input_text: task.input_text().to_string(),
            status: task.status(),
            result: task.result().cloned(),
            error: task.error().map(str::to_string),
            record_id: task.record_id().cloned(),
            clarification: task.clarification(),
            clarification_pending: task.clarification_pending(),
            clarification_error: task.clarification_error().map(str::to_string),
            accepted: task.selection().accepted().iter().cloned().collect(),
            denied: task.selection().denied().iter().cloned().collect(),
            created_at: task.created_at().to_rfc3339(),
            updated_at: task.updated_at().to_rfc3339(),
        }
    }
}
