//! Analysis Context - Analysis Result

use serde::{Deserialize, Serialize};

use super::RecordId;

/// 建议编码
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposedCode {
    /// 编码
    pub code: String,
    /// 编码说明
    pub description: String,
    /// 远程服务给出的理由
    pub explanation: String,
    /// 远程结果是否已将其标记为选中
    #[serde(default)]
    pub selected: bool,
}

impl ProposedCode {
    pub fn new(code: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            description: description.into(),
            explanation: String::new(),
            selected: false,
        }
    }

    pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = explanation.into();
        self
    }

    pub fn preselected(mut self) -> Self {
        self.selected = true;
        self
    }
}

/// 澄清问题
///
/// `category` 区分同一记录下彼此独立的问题组
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClarificationQuestion {
    pub id: String,
    pub text: String,
    pub category: String,
}

impl ClarificationQuestion {
    pub fn new(
        id: impl Into<String>,
        text: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            category: category.into(),
        }
    }
}

/// 澄清回答
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClarificationAnswer {
    pub question_id: String,
    pub answer: String,
}

/// 分析结果
///
/// 不变量:
/// - 只有同时携带 `record_id` 与非空 `questions` 时才需要澄清
/// - 澄清合并只改写 `clarified_codes` 与 `questions`，`codes` 保持不变
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    record_id: Option<RecordId>,
    codes: Vec<ProposedCode>,
    questions: Vec<ClarificationQuestion>,
    clarified_codes: Vec<ProposedCode>,
}

impl AnalysisResult {
    pub fn new(codes: Vec<ProposedCode>) -> Self {
        Self {
            record_id: None,
            codes,
            questions: Vec::new(),
            clarified_codes: Vec::new(),
        }
    }

    pub fn with_record_id(mut self, record_id: RecordId) -> Self {
        self.record_id = Some(record_id);
        self
    }

    pub fn with_questions(mut self, questions: Vec<ClarificationQuestion>) -> Self {
        self.questions = questions;
        self
    }

    pub fn with_clarified_codes(mut self, clarified_codes: Vec<ProposedCode>) -> Self {
        self.clarified_codes = clarified_codes;
        self
    }

    /// 是否需要用户澄清
    pub fn needs_clarification(&self) -> bool {
        self.record_id.is_some() && !self.questions.is_empty()
    }

    /// 远程结果已标记为选中的编码
    pub fn preselected_codes(&self) -> impl Iterator<Item = &str> {
        self.all_codes().filter(|c| c.selected).map(|c| c.code.as_str())
    }

    /// 结果中是否包含该编码（包括澄清后得到的编码）
    pub fn contains_code(&self, code: &str) -> bool {
        self.all_codes().any(|c| c.code == code)
    }

    /// 合并澄清回答后的结果
    ///
    /// 远程返回的编码写入 `clarified_codes`，后续问题（如果有）替换当前问题集
    pub fn merge_clarification(&mut self, update: AnalysisResult) {
        let AnalysisResult {
            codes,
            questions,
            clarified_codes,
            ..
        } = update;
        self.clarified_codes = codes.into_iter().chain(clarified_codes).collect();
        self.questions = questions;
    }

    fn all_codes(&self) -> impl Iterator<Item = &ProposedCode> {
        self.codes.iter().chain(self.clarified_codes.iter())
    }

    // Getters
    pub fn record_id(&self) -> Option<&RecordId> {
        self.record_id.as_ref()
    }

    pub fn codes(&self) -> &[ProposedCode] {
        &self.codes
    }

    pub fn questions(&self) -> &[ClarificationQuestion] {
        &self.questions
    }

    pub fn clarified_codes(&self) -> &[ProposedCode] {
        &self.clarified_codes
    }
}
