//! Analysis Service Port - 远程分析服务抽象
//!
//! 定义远程分析调用的抽象接口，具体实现在 infrastructure/adapters 层。
//! 所有调用都接受取消信号；实现方应在信号触发后尽快返回 `AnalysisError::Aborted`。

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::domain::analysis::{AnalysisResult, ClarificationAnswer, RecordId};

/// 远程分析错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalysisError {
    /// 用户或系统触发的取消，不作为错误展示
    #[error("Request aborted")]
    Aborted,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timeout")]
    Timeout,

    /// 远程服务返回的错误，消息原样展示
    #[error("{0}")]
    Remote(String),

    /// 响应形状校验失败
    #[error("Malformed response: {0}")]
    Malformed(String),
}

/// 单个远程工作单元的结果
pub type AnalysisOutcome = Result<AnalysisResult, AnalysisError>;

/// Analysis Service Port
///
/// 外部分析服务的抽象接口
#[async_trait]
pub trait AnalysisServicePort: Send + Sync {
    /// 分析单段文本
    async fn analyze(&self, text: &str, cancel: &CancellationToken) -> AnalysisOutcome;

    /// 批量分析
    ///
    /// 成功时返回与输入等长、同序的结果数组，每一项独立成功或失败；
    /// 外层错误表示整个调用没有返回任何逐项信息
    async fn analyze_batch(
        &self,
        texts: &[String],
        cancel: &CancellationToken,
    ) -> Result<Vec<AnalysisOutcome>, AnalysisError>;

    /// 提交某个记录的澄清回答
    async fn submit_clarification_answers(
        &self,
        record_id: &RecordId,
        answers: &[ClarificationAnswer],
        cancel: &CancellationToken,
    ) -> AnalysisOutcome;

    /// 检查分析服务是否可用
    async fn health_check(&self) -> bool {
        true // 默认实现
    }
}
