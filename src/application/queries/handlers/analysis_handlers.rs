//! Analysis Query Handlers

use serde::Serialize;
use std::sync::Arc;

use crate::application::error::ApplicationError;
use crate::application::orchestrator::{
    CancellationController, ClarificationQueue, ClarificationRequest, GlobalBanner,
};
use crate::application::queries::{GetAnalysisStatus, GetCurrentClarification};

// ============================================================================
// Response DTOs
// ============================================================================

/// 分析状态响应
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisStatusResponse {
    /// 未结算的远程工作单元数
    pub active: usize,
    /// 未结算的远程请求数（批次计一次）
    pub requests: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub banner: Option<String>,
}

// ============================================================================
// Handlers
// ============================================================================

/// GetAnalysisStatus Handler
pub struct GetAnalysisStatusHandler {
    cancellation: Arc<CancellationController>,
    banner: Arc<GlobalBanner>,
}

impl GetAnalysisStatusHandler {
    pub fn new(cancellation: Arc<CancellationController>, banner: Arc<GlobalBanner>) -> Self {
        Self {
            cancellation,
            banner,
        }
    }

    pub async fn handle(
        &self,
        _query: GetAnalysisStatus,
    ) -> Result<AnalysisStatusResponse, ApplicationError> {
        Ok(AnalysisStatusResponse {
            active: self.cancellation.active_count(),
            requests: self.cancellation.active_tokens(),
            banner: self.banner.current(),
        })
    }
}

/// GetCurrentClarification Handler
pub struct GetCurrentClarificationHandler {
    clarifications: Arc<ClarificationQueue>,
}

impl GetCurrentClarificationHandler {
    pub fn new(clarifications: Arc<ClarificationQueue>) -> Self {
        Self { clarifications }
    }

    pub async fn handle(
        &self,
        _query: GetCurrentClarification,
    ) -> Result<Option<ClarificationRequest>, ApplicationError> {
        Ok(self.clarifications.currently_visible())
    }
}
