//! Task Registry Port - 分析任务注册表
//!
//! 定义任务注册表的抽象接口，具体实现在 infrastructure/memory 层。
//! 所有修改都以 [`TaskPatch`] 描述，并以结构替换的方式落到任务上；
//! 调用方拿到的始终是快照，不会与注册表内部共享可变引用。

use thiserror::Error;

use crate::domain::analysis::{AnalysisResult, RecordId};
use crate::domain::task::{SelectionDecision, Task, TaskError, TaskId};

/// Task Registry 错误
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Task not found: {0}")]
    NotFound(TaskId),

    #[error(transparent)]
    Rejected(#[from] TaskError),
}

/// 任务修改
#[derive(Debug, Clone)]
pub enum TaskPatch {
    EditText(String),
    BeginPending,
    Succeed(AnalysisResult),
    Fail(String),
    Cancel,
    Select {
        code: String,
        decision: SelectionDecision,
    },
    PresentClarification,
    AcknowledgeClarification,
    ReopenClarification,
    MergeClarification {
        record_id: RecordId,
        update: AnalysisResult,
    },
    FailClarification {
        record_id: RecordId,
        message: String,
    },
}

impl TaskPatch {
    /// 将修改应用到任务副本上
    pub fn apply(self, task: &mut Task) -> Result<(), TaskError> {
        match self {
            TaskPatch::EditText(text) => task.edit_text(text),
            TaskPatch::BeginPending => task.begin_pending(),
            TaskPatch::Succeed(result) => task.succeed(result),
            TaskPatch::Fail(message) => task.fail(message),
            TaskPatch::Cancel => task.cancel(),
            TaskPatch::Select { code, decision } => task.select(&code, decision),
            TaskPatch::PresentClarification => task.present_clarification(),
            TaskPatch::AcknowledgeClarification => task.acknowledge_clarification(),
            TaskPatch::ReopenClarification => task.reopen_clarification(),
            TaskPatch::MergeClarification { record_id, update } => {
                task.merge_clarification(&record_id, update)
            }
            TaskPatch::FailClarification { record_id, message } => {
                task.fail_clarification(&record_id, message)
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            TaskPatch::EditText(_) => "edit_text",
            TaskPatch::BeginPending => "begin_pending",
            TaskPatch::Succeed(_) => "succeed",
            TaskPatch::Fail(_) => "fail",
            TaskPatch::Cancel => "cancel",
            TaskPatch::Select { .. } => "select",
            TaskPatch::PresentClarification => "present_clarification",
            TaskPatch::AcknowledgeClarification => "acknowledge_clarification",
            TaskPatch::ReopenClarification => "reopen_clarification",
            TaskPatch::MergeClarification { .. } => "merge_clarification",
            TaskPatch::FailClarification { .. } => "fail_clarification",
        }
    }
}

/// Task Registry Port
///
/// 任务的唯一事实来源，所有状态存储在内存中
pub trait TaskRegistryPort: Send + Sync {
    /// 创建任务，返回快照
    fn create(&self, input_text: String) -> Task;

    /// 移除任务
    ///
    /// 若任务仍有活动的请求，先通过取消控制器中止它
    fn remove(&self, id: &TaskId) -> Result<Task, RegistryError>;

    /// 应用修改，返回修改后的快照；修改被拒绝时任务保持不变
    fn update(&self, id: &TaskId, patch: TaskPatch) -> Result<Task, RegistryError>;

    /// 条件修改
    ///
    /// `guard` 与修改在同一把锁内执行；`guard` 返回 false 时不做任何修改并返回 `Ok(None)`。
    /// 陈旧响应检查依赖这一原子性。
    fn update_if(
        &self,
        id: &TaskId,
        guard: &dyn Fn(&Task) -> bool,
        patch: TaskPatch,
    ) -> Result<Option<Task>, RegistryError>;

    /// 获取任务快照
    fn get(&self, id: &TaskId) -> Option<Task>;

    /// 按创建顺序列出所有任务
    fn list(&self) -> Vec<Task>;
}
