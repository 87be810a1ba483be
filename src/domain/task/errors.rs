//! Task Context - Errors

use thiserror::Error;

use super::TaskStatus;

#[derive(Debug, Error)]
pub enum TaskError {
    #[error("任务状态 {from} 不允许{action}")]
    InvalidTransition {
        from: TaskStatus,
        action: &'static str,
    },

    #[error("输入文本不能为空")]
    EmptyInput,

    #[error("结果中不存在编码: {0}")]
    UnknownCode(String),

    #[error("澄清状态不允许{0}")]
    InvalidClarificationState(&'static str),

    #[error("澄清记录不匹配: {0}")]
    ClarificationMismatch(String),
}
