//! 分析服务响应归一化
//!
//! 远程响应字段可选、问题项有时是字符串有时是对象。所有形状在这里统一
//! 转换为固定的 `AnalysisResult`，不合法的形状报告为 `Malformed`。
//!
//! 单条结果:
//! ```json
//! {
//!   "recordId": "rec-1",
//!   "codes": [{"code": "A01", "description": "...", "explanation": "...", "selected": true}],
//!   "questions": ["plain text", {"id": "q-7", "text": "...", "category": "severity"}],
//!   "clarifiedCodes": []
//! }
//! ```
//! 批量结果: `{"results": [<单条结果> | {"error": "..." | {"message": "..."}}]}`
//! 或直接是数组。

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::application::ports::{AnalysisError, AnalysisOutcome};
use crate::domain::analysis::{
    AnalysisResult, ClarificationAnswer, ClarificationQuestion, ProposedCode, RecordId,
};

/// 问题缺省分类
const DEFAULT_CATEGORY: &str = "general";

#[derive(Debug, Serialize)]
pub(crate) struct AnalyzeRequest<'a> {
    pub text: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct BatchRequest<'a> {
    pub texts: &'a [String],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireAnswer<'a> {
    pub question_id: &'a str,
    pub answer: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct AnswersRequest<'a> {
    pub answers: Vec<WireAnswer<'a>>,
}

impl<'a> AnswersRequest<'a> {
    pub fn new(answers: &'a [ClarificationAnswer]) -> Self {
        Self {
            answers: answers
                .iter()
                .map(|a| WireAnswer {
                    question_id: &a.question_id,
                    answer: &a.answer,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireCode {
    #[serde(default)]
    code: Option<String>,
    #[serde(default, alias = "label")]
    description: Option<String>,
    #[serde(default, alias = "reason")]
    explanation: Option<String>,
    #[serde(default)]
    selected: bool,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireQuestion {
    Text(String),
    Object {
        #[serde(default, alias = "questionId", alias = "question_id")]
        id: Option<String>,
        #[serde(default, alias = "question")]
        text: Option<String>,
        #[serde(default, alias = "type")]
        category: Option<String>,
    },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireResult {
    #[serde(default, alias = "record_id")]
    record_id: Option<String>,
    #[serde(default)]
    codes: Vec<WireCode>,
    #[serde(default)]
    questions: Vec<WireQuestion>,
    #[serde(default, alias = "clarified_codes")]
    clarified_codes: Vec<WireCode>,
}

/// 至少出现其一才算结果形状
const RESULT_KEYS: &[&str] = &[
    "codes",
    "questions",
    "recordId",
    "record_id",
    "clarifiedCodes",
    "clarified_codes",
];

/// 服务端错误体中的消息
pub(crate) fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    ["error", "message", "detail"]
        .iter()
        .find_map(|key| value.get(*key).and_then(message_of))
}

/// 错误字段可能是字符串，也可能是带 `message`/`detail` 的对象
fn message_of(value: &Value) -> Option<String> {
    match value {
        Value::String(message) => Some(message.clone()),
        Value::Object(map) => ["message", "detail"]
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_str))
            .map(str::to_string),
        _ => None,
    }
}

/// 解析单条结果
///
/// 非空 `error` 为远程失败；不含任何结果字段的对象为 `Malformed`
pub(crate) fn parse_result(value: Value) -> AnalysisOutcome {
    let map = value
        .as_object()
        .ok_or_else(|| AnalysisError::Malformed("result is not an object".to_string()))?;

    if let Some(error) = map.get("error").filter(|e| !e.is_null()) {
        let message = message_of(error).unwrap_or_else(|| error.to_string());
        return Err(AnalysisError::Remote(message));
    }
    if !RESULT_KEYS.iter().any(|key| map.contains_key(*key)) {
        return Err(AnalysisError::Malformed(
            "result has no codes, questions or record id".to_string(),
        ));
    }

    let wire: WireResult = serde_json::from_value(value)
        .map_err(|e| AnalysisError::Malformed(e.to_string()))?;
    normalize(wire)
}

/// 解析批量结果，外层形状错误时整体失败
pub(crate) fn parse_batch(value: Value) -> Result<Vec<AnalysisOutcome>, AnalysisError> {
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("results") {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(AnalysisError::Malformed(
                    "batch response has no results array".to_string(),
                ))
            }
        },
        _ => {
            return Err(AnalysisError::Malformed(
                "batch response is not an array".to_string(),
            ))
        }
    };
    Ok(items.into_iter().map(parse_result).collect())
}

fn normalize(wire: WireResult) -> AnalysisOutcome {
    let codes = normalize_codes(wire.codes)?;
    let clarified = normalize_codes(wire.clarified_codes)?;

    let record_id = match wire.record_id {
        Some(id) if !id.trim().is_empty() => {
            Some(RecordId::new(id).map_err(|e| AnalysisError::Malformed(e.to_string()))?)
        }
        _ => None,
    };

    let questions = wire
        .questions
        .into_iter()
        .enumerate()
        .filter_map(|(index, question)| normalize_question(index, question))
        .collect();

    let mut result = AnalysisResult::new(codes)
        .with_questions(questions)
        .with_clarified_codes(clarified);
    if let Some(record_id) = record_id {
        result = result.with_record_id(record_id);
    }
    Ok(result)
}

fn normalize_codes(codes: Vec<WireCode>) -> Result<Vec<ProposedCode>, AnalysisError> {
    codes
        .into_iter()
        .map(|wire| {
            let code = wire
                .code
                .filter(|c| !c.trim().is_empty())
                .ok_or_else(|| AnalysisError::Malformed("code entry without code".to_string()))?;
            let mut proposed = ProposedCode::new(code, wire.description.unwrap_or_default())
                .with_explanation(wire.explanation.unwrap_or_default());
            if wire.selected {
                proposed = proposed.preselected();
            }
            Ok(proposed)
        })
        .collect()
}

/// 缺少 id 的问题按位置分配本地 id（`q1`、`q2`...）
fn normalize_question(index: usize, question: WireQuestion) -> Option<ClarificationQuestion> {
    let local_id = || format!("q{}", index + 1);
    match question {
        WireQuestion::Text(text) if !text.trim().is_empty() => {
            Some(ClarificationQuestion::new(local_id(), text, DEFAULT_CATEGORY))
        }
        WireQuestion::Text(_) => None,
        WireQuestion::Object { id, text, category } => {
            let text = text.filter(|t| !t.trim().is_empty())?;
            let id = id.filter(|i| !i.trim().is_empty()).unwrap_or_else(local_id);
            let category = category
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_CATEGORY.to_string());
            Some(ClarificationQuestion::new(id, text, category))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_mixed_question_shapes_are_normalized() {
        let result = parse_result(json!({
            "recordId": "rec-9",
            "codes": [{"code": "A01", "description": "first", "selected": true}],
            "questions": [
                "Was the fracture open?",
                {"id": "server-7", "question": "Which side?", "type": "laterality"},
                {"text": "Initial encounter?"}
            ]
        }))
        .unwrap();

        assert!(result.needs_clarification());
        assert_eq!(result.record_id().unwrap().as_str(), "rec-9");
        let questions = result.questions();
        assert_eq!(questions[0].id, "q1");
        assert_eq!(questions[0].category, "general");
        assert_eq!(questions[1].id, "server-7");
        assert_eq!(questions[1].category, "laterality");
        assert_eq!(questions[2].id, "q3");
        assert_eq!(result.preselected_codes().collect::<Vec<_>>(), vec!["A01"]);
    }

    #[test]
    fn test_code_without_identifier_is_malformed() {
        let outcome = parse_result(json!({"codes": [{"description": "no code"}]}));
        assert!(matches!(outcome, Err(AnalysisError::Malformed(_))));
    }

    #[test]
    fn test_batch_items_fail_independently() {
        let items = parse_batch(json!({
            "results": [
                {"codes": [{"code": "A"}]},
                {"error": "rate limit exceeded"},
                {"codes": [{"code": "C"}]}
            ]
        }))
        .unwrap();

        assert_eq!(items.len(), 3);
        assert_eq!(items[0].as_ref().unwrap().codes()[0].code, "A");
        assert_eq!(
            items[1],
            Err(AnalysisError::Remote("rate limit exceeded".to_string()))
        );
        assert_eq!(items[2].as_ref().unwrap().codes()[0].code, "C");
    }

    #[test]
    fn test_batch_items_with_error_objects_or_no_result_fields() {
        let items = parse_batch(json!({
            "results": [
                {"codes": [{"code": "A"}]},
                {"error": {"message": "rate limit exceeded"}},
                {},
                {"error": {"code": 503, "detail": "model warming up"}},
                {"error": null, "codes": []},
                "oops"
            ]
        }))
        .unwrap();

        assert_eq!(items.len(), 6);
        assert_eq!(items[0].as_ref().unwrap().codes()[0].code, "A");
        assert_eq!(
            items[1],
            Err(AnalysisError::Remote("rate limit exceeded".to_string()))
        );
        assert!(matches!(items[2], Err(AnalysisError::Malformed(_))));
        assert_eq!(
            items[3],
            Err(AnalysisError::Remote("model warming up".to_string()))
        );
        assert!(items[4].as_ref().unwrap().codes().is_empty());
        assert!(matches!(items[5], Err(AnalysisError::Malformed(_))));
    }

    #[test]
    fn test_error_object_without_message_keeps_raw_value() {
        let outcome = parse_result(json!({"error": {"code": 42}}));
        assert_eq!(
            outcome,
            Err(AnalysisError::Remote(r#"{"code":42}"#.to_string()))
        );
    }

    #[test]
    fn test_batch_without_results_is_malformed() {
        assert!(matches!(
            parse_batch(json!({"status": "ok"})),
            Err(AnalysisError::Malformed(_))
        ));
        assert_eq!(parse_batch(json!([])).unwrap().len(), 0);
    }

    #[test]
    fn test_error_message_extraction() {
        assert_eq!(
            error_message(r#"{"detail": "quota exhausted"}"#).as_deref(),
            Some("quota exhausted")
        );
        assert_eq!(
            error_message(r#"{"error": {"message": "bad key"}}"#).as_deref(),
            Some("bad key")
        );
        assert!(error_message("<html>bad gateway</html>").is_none());
    }
}
