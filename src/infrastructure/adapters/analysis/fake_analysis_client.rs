//! Fake Analysis Client - 不依赖后端的分析客户端
//!
//! 按输入文本生成确定性的结果，用于本地运行 HTTP 接口：
//! - 文本包含 `?` 时结果需要澄清
//! - 文本包含 `rate limit` 时返回限流失败

use async_trait::async_trait;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::application::ports::{AnalysisError, AnalysisOutcome, AnalysisServicePort};
use crate::domain::analysis::{
    AnalysisResult, ClarificationAnswer, ClarificationQuestion, ProposedCode, RecordId,
};

/// Fake Analysis Client 配置
#[derive(Debug, Clone)]
pub struct FakeAnalysisClientConfig {
    /// 模拟的远程延迟
    pub delay: Duration,
}

impl Default for FakeAnalysisClientConfig {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(500),
        }
    }
}

/// Fake Analysis Client
pub struct FakeAnalysisClient {
    config: FakeAnalysisClientConfig,
}

impl FakeAnalysisClient {
    pub fn new(config: FakeAnalysisClientConfig) -> Self {
        tracing::info!(
            delay_ms = config.delay.as_millis() as u64,
            "FakeAnalysisClient initialized"
        );
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(FakeAnalysisClientConfig::default())
    }

    async fn wait(&self, cancel: &CancellationToken) -> Result<(), AnalysisError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(AnalysisError::Aborted),
            _ = tokio::time::sleep(self.config.delay) => Ok(()),
        }
    }

    fn respond(text: &str) -> AnalysisOutcome {
        if text.to_lowercase().contains("rate limit") {
            return Err(AnalysisError::Remote("rate limit exceeded".to_string()));
        }

        let code = fake_code(text);
        let mut result = AnalysisResult::new(vec![ProposedCode::new(
            code.clone(),
            format!("Fake classification for {} characters", text.chars().count()),
        )
        .with_explanation("Generated locally without a backend")
        .preselected()]);

        if text.contains('?') {
            let record_id = RecordId::new(format!("fake-{}", Uuid::new_v4()))
                .map_err(|e| AnalysisError::Malformed(e.to_string()))?;
            result = result
                .with_record_id(record_id)
                .with_questions(vec![ClarificationQuestion::new(
                    "q1",
                    format!("Is {} the intended classification?", code),
                    "confirmation",
                )]);
        }
        Ok(result)
    }
}

/// 由文本内容派生的稳定编码
fn fake_code(text: &str) -> String {
    let sum: u32 = text.bytes().map(u32::from).sum();
    let letter = char::from(b'A' + (sum % 26) as u8);
    format!("{}{:02}", letter, sum % 100)
}

#[async_trait]
impl AnalysisServicePort for FakeAnalysisClient {
    async fn analyze(&self, text: &str, cancel: &CancellationToken) -> AnalysisOutcome {
        self.wait(cancel).await?;
        Self::respond(text)
    }

    async fn analyze_batch(
        &self,
        texts: &[String],
        cancel: &CancellationToken,
    ) -> Result<Vec<AnalysisOutcome>, AnalysisError> {
        self.wait(cancel).await?;
        Ok(texts.iter().map(|text| Self::respond(text)).collect())
    }

    async fn submit_clarification_answers(
        &self,
        record_id: &RecordId,
        answers: &[ClarificationAnswer],
        cancel: &CancellationToken,
    ) -> AnalysisOutcome {
        self.wait(cancel).await?;
        let confirmed = answers
            .iter()
            .map(|a| a.answer.trim().to_lowercase())
            .any(|a| a == "yes" || a == "y");
        let code = ProposedCode::new(
            format!("{}-C", record_id.as_str().chars().take(10).collect::<String>()),
            "Clarified classification",
        );
        let code = if confirmed { code.preselected() } else { code };
        Ok(AnalysisResult::new(vec![code]))
    }
}
