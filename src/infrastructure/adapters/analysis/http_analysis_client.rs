//! HTTP Analysis Client - 调用外部分析 HTTP 服务
//!
//! 实现 AnalysisServicePort trait，通过 HTTP 调用外部分析服务
//!
//! 外部分析 API:
//! POST {base}/analyze                     Request: {"text": "..."}
//! POST {base}/analyze/batch               Request: {"texts": ["...", "..."]}
//! POST {base}/records/{recordId}/answers  Request: {"answers": [{"questionId": "...", "answer": "..."}]}
//! GET  {base}/health

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::wire::{self, AnalyzeRequest, AnswersRequest, BatchRequest};
use crate::application::ports::{AnalysisError, AnalysisOutcome, AnalysisServicePort};
use crate::domain::analysis::{ClarificationAnswer, RecordId};

/// HTTP 分析客户端配置
#[derive(Debug, Clone)]
pub struct HttpAnalysisClientConfig {
    /// 分析服务基础 URL
    pub base_url: String,
    /// 请求超时时间（秒）
    pub timeout_secs: u64,
}

impl Default for HttpAnalysisClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout_secs: 300,
        }
    }
}

impl HttpAnalysisClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// HTTP 分析客户端
///
/// 每个调用都与取消信号竞争；信号触发时丢弃进行中的请求并返回 `Aborted`
pub struct HttpAnalysisClient {
    client: Client,
    config: HttpAnalysisClientConfig,
}

impl HttpAnalysisClient {
    /// 创建新的 HTTP 分析客户端
    pub fn new(config: HttpAnalysisClientConfig) -> Result<Self, AnalysisError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AnalysisError::Network(e.to_string()))?;

        Ok(Self { client, config })
    }

    fn analyze_url(&self) -> String {
        format!("{}/analyze", self.config.base_url)
    }

    fn batch_url(&self) -> String {
        format!("{}/analyze/batch", self.config.base_url)
    }

    fn answers_url(&self, record_id: &RecordId) -> String {
        format!("{}/records/{}/answers", self.config.base_url, record_id)
    }

    fn health_url(&self) -> String {
        format!("{}/health", self.config.base_url)
    }

    /// 发送请求并取回 JSON 响应体，与取消信号竞争
    async fn send_json(
        &self,
        request: RequestBuilder,
        cancel: &CancellationToken,
    ) -> Result<Value, AnalysisError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(AnalysisError::Aborted),
            outcome = Self::exchange(request) => outcome,
        }
    }

    async fn exchange(request: RequestBuilder) -> Result<Value, AnalysisError> {
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                AnalysisError::Timeout
            } else if e.is_connect() {
                AnalysisError::Network(format!("Cannot connect to analysis service: {}", e))
            } else {
                AnalysisError::Network(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| AnalysisError::Malformed(format!("Invalid JSON body: {}", e)))
    }
}

/// 非 2xx 响应转换为远程失败；429 的消息携带限流标记
fn status_error(status: StatusCode, body: &str) -> AnalysisError {
    let detail = wire::error_message(body).unwrap_or_else(|| body.trim().to_string());
    if status == StatusCode::TOO_MANY_REQUESTS {
        return AnalysisError::Remote(format!("HTTP 429 rate limit: {}", detail));
    }
    if detail.is_empty() {
        AnalysisError::Remote(format!("HTTP {}", status))
    } else {
        AnalysisError::Remote(format!("HTTP {}: {}", status, detail))
    }
}

#[async_trait]
impl AnalysisServicePort for HttpAnalysisClient {
    async fn analyze(&self, text: &str, cancel: &CancellationToken) -> AnalysisOutcome {
        tracing::debug!(
            url = %self.analyze_url(),
            text_len = text.len(),
            "Sending analyze request"
        );

        let request = self.client.post(self.analyze_url()).json(&AnalyzeRequest { text });
        let body = self.send_json(request, cancel).await?;
        wire::parse_result(body)
    }

    async fn analyze_batch(
        &self,
        texts: &[String],
        cancel: &CancellationToken,
    ) -> Result<Vec<AnalysisOutcome>, AnalysisError> {
        tracing::debug!(
            url = %self.batch_url(),
            count = texts.len(),
            "Sending batch analyze request"
        );

        let request = self.client.post(self.batch_url()).json(&BatchRequest { texts });
        let body = self.send_json(request, cancel).await?;
        let items = wire::parse_batch(body)?;

        tracing::info!(
            requested = texts.len(),
            received = items.len(),
            failed = items.iter().filter(|i| i.is_err()).count(),
            "Batch analysis completed"
        );
        Ok(items)
    }

    async fn submit_clarification_answers(
        &self,
        record_id: &RecordId,
        answers: &[ClarificationAnswer],
        cancel: &CancellationToken,
    ) -> AnalysisOutcome {
        tracing::debug!(
            record_id = %record_id,
            answers = answers.len(),
            "Submitting clarification answers"
        );

        let request = self
            .client
            .post(self.answers_url(record_id))
            .json(&AnswersRequest::new(answers));
        let body = self.send_json(request, cancel).await?;
        wire::parse_result(body)
    }

    async fn health_check(&self) -> bool {
        match self
            .client
            .get(self.health_url())
            .timeout(Duration::from_secs(5))
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}
