//! Task Context - Aggregate Root

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ClarificationState, CodeSelection, SelectionDecision, TaskError, TaskId, TaskStatus};
use crate::domain::analysis::{AnalysisResult, RecordId};

/// 分析任务聚合根
///
/// 不变量:
/// - `input_text` 只能在 Idle 状态下修改
/// - `result` 仅在 Succeeded 时存在，`error` 仅在 Failed 时存在
/// - 每次重新进入 Pending 时清空 result / error / selection / 澄清状态
/// - 澄清合并只改写结果中由澄清派生的字段
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    id: TaskId,
    ordinal: u64,
    input_text: String,
    status: TaskStatus,
    result: Option<AnalysisResult>,
    error: Option<String>,
    clarification: ClarificationState,
    clarification_error: Option<String>,
    selection: CodeSelection,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Task {
    /// 创建新任务，`ordinal` 决定在列表中的顺序
    pub fn new(ordinal: u64, input_text: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: TaskId::new(),
            ordinal,
            input_text: input_text.into(),
            status: TaskStatus::Idle,
            result: None,
            error: None,
            clarification: ClarificationState::None,
            clarification_error: None,
            selection: CodeSelection::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// 修改输入文本
    pub fn edit_text(&mut self, text: impl Into<String>) -> Result<(), TaskError> {
        self.expect_status(TaskStatus::Idle, "修改文本")?;
        self.input_text = text.into();
        self.touch();
        Ok(())
    }

    /// 进入 Pending，清空上一次提交的所有产物
    pub fn begin_pending(&mut self) -> Result<(), TaskError> {
        if !self.has_input() {
            return Err(TaskError::EmptyInput);
        }
        self.status = TaskStatus::Pending;
        self.result = None;
        self.error = None;
        self.clarification = ClarificationState::None;
        self.clarification_error = None;
        self.selection = CodeSelection::new();
        self.touch();
        Ok(())
    }

    /// 应用成功结果
    pub fn succeed(&mut self, result: AnalysisResult) -> Result<(), TaskError> {
        self.expect_status(TaskStatus::Pending, "写入结果")?;
        self.selection = CodeSelection::preselected(result.preselected_codes());
        self.clarification = if result.needs_clarification() {
            ClarificationState::Awaiting
        } else {
            ClarificationState::None
        };
        self.status = TaskStatus::Succeeded;
        self.result = Some(result);
        self.touch();
        Ok(())
    }

    /// 标记失败
    pub fn fail(&mut self, message: impl Into<String>) -> Result<(), TaskError> {
        self.expect_status(TaskStatus::Pending, "标记失败")?;
        self.status = TaskStatus::Failed;
        self.error = Some(message.into());
        self.touch();
        Ok(())
    }

    /// 标记取消（不作为错误展示）
    pub fn cancel(&mut self) -> Result<(), TaskError> {
        self.expect_status(TaskStatus::Pending, "取消")?;
        self.status = TaskStatus::Cancelled;
        self.touch();
        Ok(())
    }

    /// 用户接受/拒绝/清除编码
    pub fn select(&mut self, code: &str, decision: SelectionDecision) -> Result<(), TaskError> {
        self.expect_status(TaskStatus::Succeeded, "选择编码")?;
        let known = self
            .result
            .as_ref()
            .map(|r| r.contains_code(code))
            .unwrap_or(false);
        if !known {
            return Err(TaskError::UnknownCode(code.to_string()));
        }
        self.selection.apply(code, decision);
        self.touch();
        Ok(())
    }

    /// Awaiting -> Presented
    pub fn present_clarification(&mut self) -> Result<(), TaskError> {
        self.transition_clarification(
            ClarificationState::Awaiting,
            ClarificationState::Presented,
            "展示",
        )
    }

    /// Presented -> Acknowledged（用户关闭对话框）
    pub fn acknowledge_clarification(&mut self) -> Result<(), TaskError> {
        self.transition_clarification(
            ClarificationState::Presented,
            ClarificationState::Acknowledged,
            "关闭",
        )
    }

    /// Acknowledged / Unresolved -> Awaiting
    pub fn reopen_clarification(&mut self) -> Result<(), TaskError> {
        if !self.clarification.is_reopenable() {
            return Err(TaskError::InvalidClarificationState("重新打开"));
        }
        self.clarification = ClarificationState::Awaiting;
        self.clarification_error = None;
        self.touch();
        Ok(())
    }

    /// 合并澄清回答的结果
    ///
    /// 仅当任务仍持有同一记录的结果且正在展示时生效
    pub fn merge_clarification(
        &mut self,
        record_id: &RecordId,
        update: AnalysisResult,
    ) -> Result<(), TaskError> {
        self.expect_clarification_record(record_id)?;
        let Some(result) = self.result.as_mut() else {
            return Err(TaskError::ClarificationMismatch(record_id.to_string()));
        };
        result.merge_clarification(update);
        for code in result.preselected_codes() {
            if !self.selection.denied().contains(code) {
                self.selection.apply(code, SelectionDecision::Accept);
            }
        }
        self.clarification = if result.needs_clarification() {
            ClarificationState::Awaiting
        } else {
            ClarificationState::None
        };
        self.clarification_error = None;
        self.touch();
        Ok(())
    }

    /// 澄清回答提交失败，保留 pending 并记录错误
    pub fn fail_clarification(
        &mut self,
        record_id: &RecordId,
        message: impl Into<String>,
    ) -> Result<(), TaskError> {
        self.expect_clarification_record(record_id)?;
        self.clarification = ClarificationState::Unresolved;
        self.clarification_error = Some(message.into());
        self.touch();
        Ok(())
    }

    pub fn has_input(&self) -> bool {
        !self.input_text.trim().is_empty()
    }

    pub fn clarification_pending(&self) -> bool {
        self.clarification.is_pending()
    }

    pub fn record_id(&self) -> Option<&RecordId> {
        self.result.as_ref().and_then(|r| r.record_id())
    }

    fn expect_status(&self, expected: TaskStatus, action: &'static str) -> Result<(), TaskError> {
        if self.status != expected {
            return Err(TaskError::InvalidTransition {
                from: self.status,
                action,
            });
        }
        Ok(())
    }

    fn expect_clarification_record(&self, record_id: &RecordId) -> Result<(), TaskError> {
        self.expect_status(TaskStatus::Succeeded, "合并澄清")?;
        if self.record_id() != Some(record_id) {
            return Err(TaskError::ClarificationMismatch(record_id.to_string()));
        }
        if self.clarification != ClarificationState::Presented {
            return Err(TaskError::InvalidClarificationState("提交回答"));
        }
        Ok(())
    }

    fn transition_clarification(
        &mut self,
        from: ClarificationState,
        to: ClarificationState,
        action: &'static str,
    ) -> Result<(), TaskError> {
        if self.clarification != from {
            return Err(TaskError::InvalidClarificationState(action));
        }
        self.clarification = to;
        self.touch();
        Ok(())
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    // Getters
    pub fn id(&self) -> &TaskId {
        &self.id
    }

    pub fn ordinal(&self) -> u64 {
        self.ordinal
    }

    pub fn input_text(&self) -> &str {
        &self.input_text
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    pub fn result(&self) -> Option<&AnalysisResult> {
        self.result.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn clarification(&self) -> ClarificationState {
        self.clarification
    }

    pub fn clarification_error(&self) -> Option<&str> {
        self.clarification_error.as_deref()
    }

    pub fn selection(&self) -> &CodeSelection {
        &self.selection
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::analysis::{ClarificationQuestion, ProposedCode};

    fn record(id: &str) -> RecordId {
        RecordId::new(id).unwrap()
    }

    fn clarifying_result(id: &str) -> AnalysisResult {
        AnalysisResult::new(vec![ProposedCode::new("A01", "first")])
            .with_record_id(record(id))
            .with_questions(vec![ClarificationQuestion::new("q1", "Which?", "family")])
    }

    #[test]
    fn test_text_is_editable_only_while_idle() {
        let mut task = Task::new(0, "first draft");
        task.edit_text("second draft").unwrap();
        assert_eq!(task.input_text(), "second draft");

        task.begin_pending().unwrap();
        assert!(matches!(
            task.edit_text("third"),
            Err(TaskError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_begin_pending_rejects_blank_text() {
        let mut task = Task::new(0, "   ");
        assert!(matches!(task.begin_pending(), Err(TaskError::EmptyInput)));
        assert_eq!(task.status(), TaskStatus::Idle);
    }

    #[test]
    fn test_succeed_preselects_codes_and_flags_clarification() {
        let mut task = Task::new(0, "text");
        task.begin_pending().unwrap();
        let result = AnalysisResult::new(vec![
            ProposedCode::new("A01", "a").preselected(),
            ProposedCode::new("B02", "b"),
        ])
        .with_record_id(record("r1"))
        .with_questions(vec![ClarificationQuestion::new("q1", "?", "family")]);

        task.succeed(result).unwrap();

        assert_eq!(task.status(), TaskStatus::Succeeded);
        assert!(task.selection().accepted().contains("A01"));
        assert!(task.selection().denied().is_empty());
        assert_eq!(task.clarification(), ClarificationState::Awaiting);
        assert!(task.clarification_pending());
    }

    #[test]
    fn test_resubmission_clears_previous_outcome() {
        let mut task = Task::new(0, "text");
        task.begin_pending().unwrap();
        task.fail("boom").unwrap();
        assert_eq!(task.error(), Some("boom"));

        task.begin_pending().unwrap();
        assert_eq!(task.status(), TaskStatus::Pending);
        assert!(task.error().is_none());
        assert!(task.result().is_none());
        assert!(task.selection().is_empty());
    }

    #[test]
    fn test_select_rejects_unknown_code() {
        let mut task = Task::new(0, "text");
        task.begin_pending().unwrap();
        task.succeed(AnalysisResult::new(vec![ProposedCode::new("A01", "a")]))
            .unwrap();

        assert!(matches!(
            task.select("Z99", SelectionDecision::Accept),
            Err(TaskError::UnknownCode(_))
        ));
        task.select("A01", SelectionDecision::Deny).unwrap();
        assert!(task.selection().denied().contains("A01"));
    }

    #[test]
    fn test_clarification_merge_requires_matching_record() {
        let mut task = Task::new(0, "text");
        task.begin_pending().unwrap();
        task.succeed(clarifying_result("r1")).unwrap();
        task.present_clarification().unwrap();

        let update = AnalysisResult::new(vec![ProposedCode::new("C03", "c").preselected()]);
        assert!(matches!(
            task.merge_clarification(&record("other"), update.clone()),
            Err(TaskError::ClarificationMismatch(_))
        ));

        task.merge_clarification(&record("r1"), update).unwrap();
        assert!(!task.clarification_pending());
        assert!(task.selection().accepted().contains("C03"));
        assert_eq!(task.result().unwrap().codes()[0].code, "A01");
    }

    #[test]
    fn test_failed_clarification_can_be_reopened() {
        let mut task = Task::new(0, "text");
        task.begin_pending().unwrap();
        task.succeed(clarifying_result("r1")).unwrap();
        task.present_clarification().unwrap();

        task.fail_clarification(&record("r1"), "remote down").unwrap();
        assert_eq!(task.clarification(), ClarificationState::Unresolved);
        assert_eq!(task.clarification_error(), Some("remote down"));
        assert!(task.clarification_pending());
        assert!(task.error().is_none());

        task.reopen_clarification().unwrap();
        assert_eq!(task.clarification(), ClarificationState::Awaiting);
        assert!(task.clarification_error().is_none());
    }
}
