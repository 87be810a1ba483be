//! Clarification Command Handlers

use serde::Serialize;
use std::sync::Arc;

use crate::application::commands::{DismissClarification, ReopenClarification, ResolveClarification};
use crate::application::error::ApplicationError;
use crate::application::orchestrator::ClarificationQueue;
use crate::domain::analysis::RecordId;
use crate::domain::task::TaskId;

/// 单个记录的提交失败
#[derive(Debug, Clone, Serialize)]
pub struct FailedRecord {
    pub record_id: RecordId,
    pub error: String,
}

/// 回答提交响应
#[derive(Debug, Clone, Serialize)]
pub struct ResolveResponse {
    pub resolved: Vec<RecordId>,
    pub failed: Vec<FailedRecord>,
}

/// 关闭响应
#[derive(Debug, Clone, Serialize)]
pub struct DismissResponse {
    pub request_id: u64,
    pub task_ids: Vec<TaskId>,
}

// ============================================================================
// ResolveClarification
// ============================================================================

/// ResolveClarification Handler
///
/// 回答提交在独立任务中执行：调用方中途放弃等待时，提交仍会完整结算，
/// 队列不会停留在提交中状态
pub struct ResolveClarificationHandler {
    clarifications: Arc<ClarificationQueue>,
}

impl ResolveClarificationHandler {
    pub fn new(clarifications: Arc<ClarificationQueue>) -> Self {
        Self { clarifications }
    }

    pub async fn handle(
        &self,
        command: ResolveClarification,
    ) -> Result<ResolveResponse, ApplicationError> {
        let queue = self.clarifications.clone();
        let report = tokio::spawn(async move { queue.resolve(command.answers).await })
            .await
            .map_err(|e| ApplicationError::internal(format!("Clarification task failed: {}", e)))??;

        Ok(ResolveResponse {
            resolved: report.resolved,
            failed: report
                .failed
                .into_iter()
                .map(|(record_id, error)| FailedRecord { record_id, error })
                .collect(),
        })
    }
}

// ============================================================================
// DismissClarification / ReopenClarification
// ============================================================================

/// DismissClarification Handler
pub struct DismissClarificationHandler {
    clarifications: Arc<ClarificationQueue>,
}

impl DismissClarificationHandler {
    pub fn new(clarifications: Arc<ClarificationQueue>) -> Self {
        Self { clarifications }
    }

    pub async fn handle(
        &self,
        _command: DismissClarification,
    ) -> Result<DismissResponse, ApplicationError> {
        let request = self.clarifications.dismiss()?;
        Ok(DismissResponse {
            request_id: request.id,
            task_ids: request.task_ids(),
        })
    }
}

/// ReopenClarification Handler
pub struct ReopenClarificationHandler {
    clarifications: Arc<ClarificationQueue>,
}

impl ReopenClarificationHandler {
    pub fn new(clarifications: Arc<ClarificationQueue>) -> Self {
        Self { clarifications }
    }

    pub async fn handle(&self, command: ReopenClarification) -> Result<(), ApplicationError> {
        self.clarifications.reopen(&command.task_id)?;
        Ok(())
    }
}
