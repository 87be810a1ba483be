//! Failure Classification - 失败分类
//!
//! 限流类失败（按消息内容识别）替换为固定的友好提示，其余失败原样展示

use crate::application::ports::AnalysisError;

/// 失败分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// 取消，不作为错误展示
    Aborted,
    /// 限流
    RateLimited,
    /// 远程失败（含网络与超时）
    Remote,
    /// 响应形状校验失败
    Malformed,
}

/// 失败分类器
#[derive(Debug, Clone)]
pub struct FailureClassifier {
    markers: Vec<String>,
    rate_limit_message: String,
}

impl FailureClassifier {
    pub fn new(markers: &[String], rate_limit_message: impl Into<String>) -> Self {
        Self {
            markers: markers.iter().map(|m| m.to_lowercase()).collect(),
            rate_limit_message: rate_limit_message.into(),
        }
    }

    pub fn classify(&self, error: &AnalysisError) -> FailureKind {
        match error {
            AnalysisError::Aborted => FailureKind::Aborted,
            AnalysisError::Malformed(_) => FailureKind::Malformed,
            AnalysisError::Remote(message) | AnalysisError::Network(message)
                if self.is_rate_limited(message) =>
            {
                FailureKind::RateLimited
            }
            AnalysisError::Remote(_) | AnalysisError::Network(_) | AnalysisError::Timeout => {
                FailureKind::Remote
            }
        }
    }

    /// 面向用户的错误文本
    pub fn user_message(&self, error: &AnalysisError) -> String {
        match self.classify(error) {
            FailureKind::RateLimited => self.rate_limit_message.clone(),
            _ => error.to_string(),
        }
    }

    fn is_rate_limited(&self, message: &str) -> bool {
        let message = message.to_lowercase();
        self.markers
            .iter()
            .any(|marker| contains_marker(&message, marker))
    }
}

/// 标记以数字开头或结尾时，该侧相邻字符不能是数字
///
/// "429" 命中 "HTTP 429"，不命中 "record 14290"
fn contains_marker(message: &str, marker: &str) -> bool {
    if marker.is_empty() {
        return false;
    }
    let digit_start = marker.starts_with(|c: char| c.is_ascii_digit());
    let digit_end = marker.ends_with(|c: char| c.is_ascii_digit());

    message.match_indices(marker).any(|(start, matched)| {
        let before = message[..start].chars().next_back();
        let after = message[start + matched.len()..].chars().next();
        let clear = |c: Option<char>| !c.is_some_and(|c| c.is_ascii_digit());
        (!digit_start || clear(before)) && (!digit_end || clear(after))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::orchestrator::OrchestratorConfig;

    fn classifier() -> FailureClassifier {
        let markers = vec!["rate limit".to_string(), "429".to_string()];
        FailureClassifier::new(&markers, "Service is busy, please retry shortly.")
    }

    #[test]
    fn test_rate_limit_detected_by_message() {
        let classifier = classifier();
        let error = AnalysisError::Remote("Rate Limit exceeded for org".to_string());
        assert_eq!(classifier.classify(&error), FailureKind::RateLimited);
        assert_eq!(
            classifier.user_message(&error),
            "Service is busy, please retry shortly."
        );

        let http = AnalysisError::Remote("HTTP 429 Too Many Requests: slow down".to_string());
        assert_eq!(classifier.classify(&http), FailureKind::RateLimited);
    }

    #[test]
    fn test_other_failures_surface_verbatim() {
        let classifier = classifier();
        let error = AnalysisError::Remote("model unavailable".to_string());
        assert_eq!(classifier.classify(&error), FailureKind::Remote);
        assert_eq!(classifier.user_message(&error), "model unavailable");

        let malformed = AnalysisError::Malformed("missing codes".to_string());
        assert_eq!(classifier.classify(&malformed), FailureKind::Malformed);
        assert_eq!(
            classifier.user_message(&malformed),
            "Malformed response: missing codes"
        );

        assert_eq!(
            classifier.classify(&AnalysisError::Aborted),
            FailureKind::Aborted
        );
    }

    #[test]
    fn test_status_marker_needs_standalone_number() {
        let markers = OrchestratorConfig::default().rate_limit_markers;
        let classifier = FailureClassifier::new(&markers, "busy");

        let not_found =
            AnalysisError::Remote("HTTP 404 Not Found: record 14290 does not exist".to_string());
        assert_eq!(classifier.classify(&not_found), FailureKind::Remote);
        assert_eq!(
            classifier.user_message(&not_found),
            "HTTP 404 Not Found: record 14290 does not exist"
        );
        let port = AnalysisError::Network("connect 10.0.0.1:4290 refused".to_string());
        assert_eq!(classifier.classify(&port), FailureKind::Remote);

        for message in ["HTTP 429 rate limit: slow down", "status=429", "429: try later"] {
            let error = AnalysisError::Remote(message.to_string());
            assert_eq!(
                classifier.classify(&error),
                FailureKind::RateLimited,
                "{}",
                message
            );
        }
    }
}
