//! 应用层错误定义
//!
//! 统一的命令/查询错误类型

use thiserror::Error;
use uuid::Uuid;

use crate::application::orchestrator::{ClarificationError, DispatchError};
use crate::application::ports::RegistryError;
use crate::domain::task::TaskError;

/// 应用层错误
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// 资源未找到
    #[error("{resource_type} not found: {id}")]
    NotFound {
        resource_type: &'static str,
        id: String,
    },

    /// 验证错误
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// 状态无效
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// 外部服务错误
    #[error("External service error: {0}")]
    ExternalServiceError(String),

    /// 内部错误
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl ApplicationError {
    /// 创建 NotFound 错误
    pub fn not_found(resource_type: &'static str, id: Uuid) -> Self {
        Self::NotFound {
            resource_type,
            id: id.to_string(),
        }
    }

    /// 创建验证错误
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError(message.into())
    }

    /// 创建状态无效错误
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState(message.into())
    }

    /// 创建内部错误
    pub fn internal(message: impl Into<String>) -> Self {
        Self::InternalError(message.into())
    }
}

impl From<TaskError> for ApplicationError {
    fn from(err: TaskError) -> Self {
        match err {
            TaskError::EmptyInput | TaskError::UnknownCode(_) => {
                Self::ValidationError(err.to_string())
            }
            _ => Self::InvalidState(err.to_string()),
        }
    }
}

impl From<RegistryError> for ApplicationError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotFound(id) => Self::not_found("Task", *id.as_uuid()),
            RegistryError::Rejected(e) => e.into(),
        }
    }
}

impl From<DispatchError> for ApplicationError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::NotFound(id) => Self::not_found("Task", *id.as_uuid()),
            DispatchError::EmptyInput(_)
            | DispatchError::EmptyBatch
            | DispatchError::DuplicateTask(_) => Self::ValidationError(err.to_string()),
            DispatchError::Registry(e) => e.into(),
        }
    }
}

impl From<ClarificationError> for ApplicationError {
    fn from(err: ClarificationError) -> Self {
        match err {
            ClarificationError::UnknownRecord(_) => Self::ValidationError(err.to_string()),
            ClarificationError::NothingVisible
            | ClarificationError::ResolveInProgress
            | ClarificationError::NotReopenable(_) => Self::InvalidState(err.to_string()),
            ClarificationError::Registry(e) => e.into(),
        }
    }
}
