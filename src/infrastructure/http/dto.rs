//! Data Transfer Objects

use serde::{Deserialize, Serialize};

use crate::domain::analysis::{ClarificationAnswer, RecordId};
use crate::domain::task::{SelectionDecision, TaskId};

// ============================================================================
// 统一响应结构
// ============================================================================

/// 统一 API 响应格式
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub errno: i32,
    pub error: String,
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    /// 成功响应
    pub fn success(data: T) -> Self {
        Self {
            errno: 0,
            error: String::new(),
            data: Some(data),
        }
    }
}

/// 空数据响应
#[derive(Debug, Serialize)]
pub struct Empty {}

impl ApiResponse<Empty> {
    /// 成功但无数据
    pub fn ok() -> Self {
        Self {
            errno: 0,
            error: String::new(),
            data: Some(Empty {}),
        }
    }
}

// ============================================================================
// Task DTOs
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    #[serde(default)]
    pub input_text: String,
}

/// 只携带任务 ID 的请求（remove / get / submit / cancel / reopen）
#[derive(Debug, Deserialize)]
pub struct TaskIdRequest {
    pub id: TaskId,
}

#[derive(Debug, Deserialize)]
pub struct EditTaskRequest {
    pub id: TaskId,
    pub input_text: String,
}

#[derive(Debug, Deserialize)]
pub struct SelectCodeRequest {
    pub id: TaskId,
    pub code: String,
    pub decision: SelectionDecision,
}

// ============================================================================
// Analysis DTOs
// ============================================================================

/// 批量分析请求，`ids` 缺省时分析所有有输入文本的任务
#[derive(Debug, Default, Deserialize)]
pub struct SubmitBatchRequest {
    #[serde(default)]
    pub ids: Option<Vec<TaskId>>,
}

// ============================================================================
// Clarification DTOs
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct RecordAnswers {
    pub record_id: RecordId,
    pub answers: Vec<ClarificationAnswer>,
}

#[derive(Debug, Deserialize)]
pub struct ResolveClarificationRequest {
    pub records: Vec<RecordAnswers>,
}
