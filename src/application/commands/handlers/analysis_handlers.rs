//! Analysis Command Handlers - 提交与取消

use serde::Serialize;
use std::sync::Arc;

use crate::application::commands::{
    CancelAll, CancelAnalysis, ClearBanner, SubmitAnalysis, SubmitBatch,
};
use crate::application::error::ApplicationError;
use crate::application::orchestrator::{Dispatcher, GlobalBanner, TokenId};
use crate::application::ports::TaskRegistryPort;
use crate::domain::task::TaskId;

/// 提交响应
#[derive(Debug, Clone, Serialize)]
pub struct SubmitResponse {
    pub token_id: TokenId,
    pub task_ids: Vec<TaskId>,
}

/// 取消响应
#[derive(Debug, Clone, Serialize)]
pub struct CancelResponse {
    /// 因此进入 Cancelled 的任务数
    pub cancelled: usize,
}

// ============================================================================
// SubmitAnalysis
// ============================================================================

/// SubmitAnalysis Handler
pub struct SubmitAnalysisHandler {
    dispatcher: Arc<Dispatcher>,
}

impl SubmitAnalysisHandler {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }

    pub async fn handle(
        &self,
        command: SubmitAnalysis,
    ) -> Result<SubmitResponse, ApplicationError> {
        let dispatched = self.dispatcher.submit_individual(command.task_id)?;
        Ok(SubmitResponse {
            token_id: dispatched.token.id(),
            task_ids: vec![command.task_id],
        })
    }
}

// ============================================================================
// SubmitBatch
// ============================================================================

/// SubmitBatch Handler
///
/// 未指定任务时提交所有有输入文本的任务，空白任务在组批前过滤掉
pub struct SubmitBatchHandler {
    registry: Arc<dyn TaskRegistryPort>,
    dispatcher: Arc<Dispatcher>,
}

impl SubmitBatchHandler {
    pub fn new(registry: Arc<dyn TaskRegistryPort>, dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            registry,
            dispatcher,
        }
    }

    pub async fn handle(&self, command: SubmitBatch) -> Result<SubmitResponse, ApplicationError> {
        let task_ids: Vec<TaskId> = match command.task_ids {
            Some(ids) => ids,
            None => self
                .registry
                .list()
                .iter()
                .filter(|task| task.has_input())
                .map(|task| *task.id())
                .collect(),
        };
        if task_ids.is_empty() {
            return Err(ApplicationError::validation("No task with input text to analyze"));
        }

        let dispatched = self.dispatcher.submit_batch(&task_ids)?;
        Ok(SubmitResponse {
            token_id: dispatched.token.id(),
            task_ids,
        })
    }
}

// ============================================================================
// CancelAnalysis / CancelAll
// ============================================================================

/// CancelAnalysis Handler
pub struct CancelAnalysisHandler {
    dispatcher: Arc<Dispatcher>,
}

impl CancelAnalysisHandler {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }

    pub async fn handle(
        &self,
        command: CancelAnalysis,
    ) -> Result<CancelResponse, ApplicationError> {
        let cancelled = self.dispatcher.cancel_task(&command.task_id)?;
        Ok(CancelResponse {
            cancelled: usize::from(cancelled),
        })
    }
}

/// CancelAll Handler
pub struct CancelAllHandler {
    dispatcher: Arc<Dispatcher>,
}

impl CancelAllHandler {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }

    pub async fn handle(&self, _command: CancelAll) -> Result<CancelResponse, ApplicationError> {
        Ok(CancelResponse {
            cancelled: self.dispatcher.cancel_all(),
        })
    }
}

/// ClearBanner Handler
pub struct ClearBannerHandler {
    banner: Arc<GlobalBanner>,
}

impl ClearBannerHandler {
    pub fn new(banner: Arc<GlobalBanner>) -> Self {
        Self { banner }
    }

    pub async fn handle(&self, _command: ClearBanner) -> Result<(), ApplicationError> {
        self.banner.clear();
        Ok(())
    }
}
