//! Analysis Orchestrator - 并发分析编排
//!
//! 组件（由底向上）：
//! - CancellationController: 令牌与租约簿记
//! - Reconciler: 陈旧响应检查与结果合并
//! - ClarificationQueue: 澄清请求聚合与串行展示
//! - Dispatcher: 单个/批量提交与取消
//! - GlobalBanner: 影响整个操作的提示

mod banner;
mod cancellation;
mod clarification;
mod dispatcher;
mod failure;
mod reconciler;

#[cfg(test)]
pub(crate) mod testing;

pub use banner::GlobalBanner;
pub use cancellation::{CancellationController, RequestToken, RetiredLease, TokenId, TokenScope};
pub use clarification::{
    ClarificationError, ClarificationItem, ClarificationQueue, ClarificationRequest, ResolveReport,
};
pub use dispatcher::{DispatchError, Dispatched, Dispatcher, CANCELLED_BANNER};
pub use failure::{FailureClassifier, FailureKind};
pub use reconciler::{Applied, Reconciler, Settlement};

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::application::ports::{
    AnalysisError, AnalysisServicePort, EventSinkPort, TaskRegistryPort,
};

/// 等待远程调用结算
///
/// 取消信号优先于调用结果；超过 `limit` 视为超时失败
pub(crate) async fn settle<T, F>(
    call: F,
    signal: &CancellationToken,
    limit: Duration,
) -> Result<T, AnalysisError>
where
    F: Future<Output = Result<T, AnalysisError>>,
{
    tokio::select! {
        biased;
        _ = signal.cancelled() => Err(AnalysisError::Aborted),
        outcome = tokio::time::timeout(limit, call) => match outcome {
            Ok(outcome) => outcome,
            Err(_) => Err(AnalysisError::Timeout),
        },
    }
}

/// 编排器配置
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// 单个远程调用的上限
    pub request_timeout: Duration,
    pub rate_limit_markers: Vec<String>,
    pub rate_limit_message: String,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(300),
            rate_limit_markers: vec![
                "rate limit".to_string(),
                "too many requests".to_string(),
                "429".to_string(),
                "quota".to_string(),
            ],
            rate_limit_message: concat!(
                "The analysis service is receiving too many requests. ",
                "Please wait a moment and try again."
            )
            .to_string(),
        }
    }
}

/// 编排器各组件的组装结果
#[derive(Clone)]
pub struct AnalysisOrchestrator {
    pub registry: Arc<dyn TaskRegistryPort>,
    pub cancellation: Arc<CancellationController>,
    pub dispatcher: Arc<Dispatcher>,
    pub reconciler: Arc<Reconciler>,
    pub clarifications: Arc<ClarificationQueue>,
    pub banner: Arc<GlobalBanner>,
    pub events: Arc<dyn EventSinkPort>,
}

impl AnalysisOrchestrator {
    /// 组装编排器
    ///
    /// `registry` 须与 `cancellation` 共享同一个控制器，移除任务时才能中止其请求
    pub fn new(
        config: OrchestratorConfig,
        registry: Arc<dyn TaskRegistryPort>,
        cancellation: Arc<CancellationController>,
        service: Arc<dyn AnalysisServicePort>,
        events: Arc<dyn EventSinkPort>,
    ) -> Self {
        let classifier = Arc::new(FailureClassifier::new(
            &config.rate_limit_markers,
            config.rate_limit_message.clone(),
        ));
        let clarifications = Arc::new(ClarificationQueue::new(
            registry.clone(),
            service.clone(),
            classifier.clone(),
            events.clone(),
            config.request_timeout,
        ));
        let reconciler = Arc::new(Reconciler::new(
            registry.clone(),
            cancellation.clone(),
            clarifications.clone(),
            classifier,
            events.clone(),
        ));
        let banner = Arc::new(GlobalBanner::new(events.clone()));
        let dispatcher = Arc::new(Dispatcher::new(
            registry.clone(),
            cancellation.clone(),
            reconciler.clone(),
            service,
            banner.clone(),
            events.clone(),
            config.request_timeout,
        ));

        Self {
            registry,
            cancellation,
            dispatcher,
            reconciler,
            clarifications,
            banner,
            events,
        }
    }

    /// 关闭：中止所有请求与进行中的澄清提交
    pub fn shutdown(&self) {
        let leases = self.cancellation.abort_all();
        self.reconciler.apply_cancellation(&leases);
        self.clarifications.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_settle_prefers_cancellation() {
        let signal = CancellationToken::new();
        signal.cancel();
        let outcome: Result<u32, AnalysisError> =
            settle(async { Ok(7) }, &signal, Duration::from_secs(1)).await;
        assert_eq!(outcome, Err(AnalysisError::Aborted));
    }

    #[tokio::test]
    async fn test_settle_times_out() {
        let signal = CancellationToken::new();
        let outcome: Result<u32, AnalysisError> = settle(
            std::future::pending::<Result<u32, AnalysisError>>(),
            &signal,
            Duration::from_millis(10),
        )
        .await;
        assert_eq!(outcome, Err(AnalysisError::Timeout));
    }

    #[tokio::test]
    async fn test_settle_passes_outcome_through() {
        let signal = CancellationToken::new();
        let outcome: Result<u32, AnalysisError> = settle(
            async { Err(AnalysisError::Remote("boom".to_string())) },
            &signal,
            Duration::from_secs(1),
        )
        .await;
        assert_eq!(outcome, Err(AnalysisError::Remote("boom".to_string())));
    }
}
