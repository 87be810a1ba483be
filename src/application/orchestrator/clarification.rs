//! Clarification Queue - 澄清请求队列
//!
//! 把多个任务的澄清需求聚合到同一个对话框中，并保证任意时刻最多只有
//! 一个澄清请求可见。对话框打开期间到达的新需求进入 FIFO 队列，当前
//! 请求结束（回答或关闭）后，按注册表的最新状态重新聚合并展示。

use futures_util::future::join_all;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use super::failure::FailureClassifier;
use super::settle;
use crate::application::ports::{
    AnalysisServicePort, EventSinkPort, OrchestratorEvent, RegistryError, TaskPatch,
    TaskRegistryPort,
};
use crate::application::queries::TaskView;
use crate::domain::analysis::{ClarificationAnswer, RecordId};
use crate::domain::task::{ClarificationState, Task, TaskId};

/// Clarification Queue 错误
#[derive(Debug, Error)]
pub enum ClarificationError {
    #[error("No clarification request is visible")]
    NothingVisible,

    #[error("Clarification answers are already being submitted")]
    ResolveInProgress,

    #[error("Record {0} is not part of the visible clarification request")]
    UnknownRecord(RecordId),

    #[error("Task {0} has no dismissed or unresolved clarification")]
    NotReopenable(TaskId),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// 澄清条目
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClarificationItem {
    pub task_id: TaskId,
    pub record_id: RecordId,
    pub question_id: String,
    pub question_text: String,
    pub category: String,
}

impl ClarificationItem {
    /// 从任务当前结果中提取澄清条目
    pub fn for_task(task: &Task) -> Vec<Self> {
        let Some(result) = task.result() else {
            return Vec::new();
        };
        let Some(record_id) = result.record_id() else {
            return Vec::new();
        };
        result
            .questions()
            .iter()
            .map(|question| Self {
                task_id: *task.id(),
                record_id: record_id.clone(),
                question_id: question.id.clone(),
                question_text: question.text.clone(),
                category: question.category.clone(),
            })
            .collect()
    }
}

/// 聚合后的澄清请求
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClarificationRequest {
    pub id: u64,
    pub items: Vec<ClarificationItem>,
}

impl ClarificationRequest {
    /// 请求中出现的记录，按首次出现顺序去重
    pub fn record_ids(&self) -> Vec<RecordId> {
        let mut records: Vec<RecordId> = Vec::new();
        for item in &self.items {
            if !records.contains(&item.record_id) {
                records.push(item.record_id.clone());
            }
        }
        records
    }

    pub fn task_ids(&self) -> Vec<TaskId> {
        let mut tasks: Vec<TaskId> = Vec::new();
        for item in &self.items {
            if !tasks.contains(&item.task_id) {
                tasks.push(item.task_id);
            }
        }
        tasks
    }

    /// 带有该记录的任务
    pub fn tasks_for(&self, record_id: &RecordId) -> Vec<TaskId> {
        let mut tasks: Vec<TaskId> = Vec::new();
        for item in self.items.iter().filter(|i| &i.record_id == record_id) {
            if !tasks.contains(&item.task_id) {
                tasks.push(item.task_id);
            }
        }
        tasks
    }
}

/// 回答提交结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolveReport {
    pub resolved: Vec<RecordId>,
    pub failed: Vec<(RecordId, String)>,
}

#[derive(Default)]
struct QueueState {
    visible: Option<ClarificationRequest>,
    fifo: VecDeque<Vec<ClarificationItem>>,
    resolving: bool,
    next_request_id: u64,
}

pub struct ClarificationQueue {
    registry: Arc<dyn TaskRegistryPort>,
    service: Arc<dyn AnalysisServicePort>,
    classifier: Arc<FailureClassifier>,
    events: Arc<dyn EventSinkPort>,
    request_timeout: Duration,
    shutdown: CancellationToken,
    state: Mutex<QueueState>,
}

impl ClarificationQueue {
    pub fn new(
        registry: Arc<dyn TaskRegistryPort>,
        service: Arc<dyn AnalysisServicePort>,
        classifier: Arc<FailureClassifier>,
        events: Arc<dyn EventSinkPort>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            service,
            classifier,
            events,
            request_timeout,
            shutdown: CancellationToken::new(),
            state: Mutex::new(QueueState::default()),
        }
    }

    /// 提交澄清需求
    ///
    /// 没有可见请求时立即聚合所有尚未展示的需求并展示，否则追加到 FIFO 队列
    pub fn enqueue(&self, items: Vec<ClarificationItem>) {
        if items.is_empty() {
            return;
        }
        let mut state = self.state();
        if state.visible.is_none() {
            self.present(&mut state, items);
        } else {
            tracing::debug!(items = items.len(), "Clarification queued behind visible request");
            state.fifo.push_back(items);
        }
    }

    /// 当前可见的澄清请求
    pub fn currently_visible(&self) -> Option<ClarificationRequest> {
        self.state().visible.clone()
    }

    /// 排队中的需求数
    pub fn queued(&self) -> usize {
        self.state().fifo.len()
    }

    /// 提交回答
    ///
    /// 对可见请求中的每个记录并行发起一次远程调用。每个记录独立成功或失败；
    /// 全部结束后关闭当前请求并展示下一个。
    pub async fn resolve(
        &self,
        answers: HashMap<RecordId, Vec<ClarificationAnswer>>,
    ) -> Result<ResolveReport, ClarificationError> {
        let request = {
            let mut state = self.state();
            let request = state
                .visible
                .clone()
                .ok_or(ClarificationError::NothingVisible)?;
            if state.resolving {
                return Err(ClarificationError::ResolveInProgress);
            }
            let records = request.record_ids();
            if let Some(unknown) = answers.keys().find(|r| !records.contains(r)) {
                return Err(ClarificationError::UnknownRecord(unknown.clone()));
            }
            state.resolving = true;
            request
        };

        tracing::info!(
            request_id = request.id,
            records = request.record_ids().len(),
            "Submitting clarification answers"
        );

        let signal = self.shutdown.child_token();
        let calls = request.record_ids().into_iter().map(|record_id| {
            let answers = answers.get(&record_id).cloned().unwrap_or_default();
            let service = self.service.clone();
            let signal = signal.clone();
            let limit = self.request_timeout;
            async move {
                let outcome = settle(
                    service.submit_clarification_answers(&record_id, &answers, &signal),
                    &signal,
                    limit,
                )
                .await;
                (record_id, outcome)
            }
        });
        let settled = join_all(calls).await;

        let mut report = ResolveReport::default();
        for (record_id, outcome) in settled {
            let tasks = request.tasks_for(&record_id);
            match outcome {
                Ok(update) => {
                    for task_id in &tasks {
                        self.patch(
                            task_id,
                            TaskPatch::MergeClarification {
                                record_id: record_id.clone(),
                                update: update.clone(),
                            },
                        );
                    }
                    report.resolved.push(record_id);
                }
                Err(error) => {
                    let message = self.classifier.user_message(&error);
                    tracing::warn!(
                        record_id = %record_id,
                        error = %error,
                        "Clarification submission failed"
                    );
                    for task_id in &tasks {
                        self.patch(
                            task_id,
                            TaskPatch::FailClarification {
                                record_id: record_id.clone(),
                                message: message.clone(),
                            },
                        );
                    }
                    report.failed.push((record_id, message));
                }
            }
        }

        let mut state = self.state();
        state.resolving = false;
        state.visible = None;
        self.events
            .publish(OrchestratorEvent::ClarificationCleared { request_id: request.id });

        // 澄清后仍有后续问题的任务重新排队
        let follow_ups: Vec<ClarificationItem> = request
            .task_ids()
            .iter()
            .filter_map(|task_id| self.registry.get(task_id))
            .filter(|task| task.clarification() == ClarificationState::Awaiting)
            .flat_map(|task| ClarificationItem::for_task(&task))
            .collect();
        if !follow_ups.is_empty() {
            state.fifo.push_back(follow_ups);
        }
        self.present_next(&mut state);

        tracing::info!(
            request_id = request.id,
            resolved = report.resolved.len(),
            failed = report.failed.len(),
            "Clarification request settled"
        );
        Ok(report)
    }

    /// 用户关闭对话框
    ///
    /// 相关任务标记为已确认但未解决，不会自动重新排队
    pub fn dismiss(&self) -> Result<ClarificationRequest, ClarificationError> {
        let mut state = self.state();
        if state.resolving {
            return Err(ClarificationError::ResolveInProgress);
        }
        let request = state
            .visible
            .take()
            .ok_or(ClarificationError::NothingVisible)?;

        for task_id in request.task_ids() {
            self.patch(&task_id, TaskPatch::AcknowledgeClarification);
        }
        tracing::info!(request_id = request.id, "Clarification request dismissed");
        self.events
            .publish(OrchestratorEvent::ClarificationCleared { request_id: request.id });

        self.present_next(&mut state);
        Ok(request)
    }

    /// 手动重试已关闭或提交失败的澄清
    pub fn reopen(&self, task_id: &TaskId) -> Result<(), ClarificationError> {
        let task = self
            .registry
            .update(task_id, TaskPatch::ReopenClarification)
            .map_err(|e| match e {
                RegistryError::Rejected(_) => ClarificationError::NotReopenable(*task_id),
                other => ClarificationError::Registry(other),
            })?;
        self.publish_task(&task);
        tracing::debug!(task_id = %task_id, "Clarification reopened");
        self.enqueue(ClarificationItem::for_task(&task));
        Ok(())
    }

    /// 放弃所有进行中的回答提交
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    fn present_next(&self, state: &mut QueueState) {
        if state.fifo.is_empty() {
            return;
        }
        let hints: Vec<ClarificationItem> = state.fifo.drain(..).flatten().collect();
        self.present(state, hints);
    }

    /// 聚合并展示
    ///
    /// 以传入条目的任务顺序为先，再追加注册表中其他尚未展示的任务；
    /// 条目内容始终取自任务的最新结果
    fn present(&self, state: &mut QueueState, hints: Vec<ClarificationItem>) {
        let mut order: Vec<TaskId> = Vec::new();
        for item in &hints {
            if !order.contains(&item.task_id) {
                order.push(item.task_id);
            }
        }
        for task in self.registry.list() {
            if task.clarification() == ClarificationState::Awaiting && !order.contains(task.id()) {
                order.push(*task.id());
            }
        }

        let mut items = Vec::new();
        for task_id in &order {
            match self.registry.update(task_id, TaskPatch::PresentClarification) {
                Ok(task) => {
                    items.extend(ClarificationItem::for_task(&task));
                    self.publish_task(&task);
                }
                Err(e) => {
                    tracing::trace!(
                        task_id = %task_id,
                        error = %e,
                        "Task no longer awaiting clarification"
                    );
                }
            }
        }
        if items.is_empty() {
            return;
        }

        state.next_request_id += 1;
        let request = ClarificationRequest {
            id: state.next_request_id,
            items,
        };
        tracing::info!(
            request_id = request.id,
            tasks = request.task_ids().len(),
            items = request.items.len(),
            "Clarification request presented"
        );
        state.visible = Some(request.clone());
        self.events
            .publish(OrchestratorEvent::ClarificationPresented { request });
    }

    fn patch(&self, task_id: &TaskId, patch: TaskPatch) {
        let name = patch.name();
        match self.registry.update(task_id, patch) {
            Ok(task) => self.publish_task(&task),
            Err(e) => {
                tracing::debug!(
                    task_id = %task_id,
                    patch = name,
                    error = %e,
                    "Clarification update skipped"
                );
            }
        }
    }

    fn publish_task(&self, task: &Task) {
        self.events.publish(OrchestratorEvent::TaskChanged {
            task: TaskView::from(task),
        });
    }

    fn state(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::orchestrator::testing::{
        clarifying_result, harness, result, Harness, ScriptedService,
    };
    use crate::application::orchestrator::{Settlement, TokenScope};
    use crate::application::ports::AnalysisError;

    fn record(id: &str) -> RecordId {
        RecordId::new(id).unwrap()
    }

    /// 创建任务并直接合并一个需要澄清的结果
    fn clarifying_task(h: &Harness, code: &str, record_id: &str, question_id: &str) -> TaskId {
        let task_id = *h.registry.create(format!("text {}", code)).id();
        let token = h.cancellation.issue(TokenScope::Individual(task_id));
        h.registry.update(&task_id, TaskPatch::BeginPending).unwrap();
        h.reconciler.apply(
            task_id,
            &token,
            Ok(clarifying_result(code, record_id, question_id)),
        );
        task_id
    }

    fn answer(question_id: &str) -> Vec<ClarificationAnswer> {
        vec![ClarificationAnswer {
            question_id: question_id.to_string(),
            answer: "yes".to_string(),
        }]
    }

    #[test]
    fn test_enqueue_while_visible_appends_to_fifo() {
        let h = harness(Arc::new(ScriptedService::default()));
        let first = clarifying_task(&h, "A01", "rec-1", "q-a");
        let visible = h.clarifications.currently_visible().unwrap();

        let second = clarifying_task(&h, "B02", "rec-2", "q-b");

        let still_visible = h.clarifications.currently_visible().unwrap();
        assert_eq!(still_visible, visible);
        assert_eq!(still_visible.task_ids(), vec![first]);
        assert_eq!(h.clarifications.queued(), 1);
        assert_eq!(
            h.registry.get(&second).unwrap().clarification(),
            ClarificationState::Awaiting
        );
    }

    #[test]
    fn test_dismiss_presents_next_and_does_not_requeue() {
        let h = harness(Arc::new(ScriptedService::default()));
        let first = clarifying_task(&h, "A01", "rec-1", "q-a");
        let second = clarifying_task(&h, "B02", "rec-2", "q-b");

        let dismissed = h.clarifications.dismiss().unwrap();
        assert_eq!(dismissed.task_ids(), vec![first]);

        let first_task = h.registry.get(&first).unwrap();
        assert_eq!(first_task.clarification(), ClarificationState::Acknowledged);
        assert!(first_task.clarification_pending());

        let next = h.clarifications.currently_visible().unwrap();
        assert_eq!(next.task_ids(), vec![second]);
        assert!(next.id > dismissed.id);
        assert_eq!(h.clarifications.queued(), 0);

        h.clarifications.dismiss().unwrap();
        assert!(h.clarifications.currently_visible().is_none());
        assert!(matches!(
            h.clarifications.dismiss(),
            Err(ClarificationError::NothingVisible)
        ));
    }

    #[test]
    fn test_reopen_brings_dismissed_clarification_back() {
        let h = harness(Arc::new(ScriptedService::default()));
        let task_id = clarifying_task(&h, "A01", "rec-1", "q-a");
        h.clarifications.dismiss().unwrap();
        assert!(h.clarifications.currently_visible().is_none());

        h.clarifications.reopen(&task_id).unwrap();

        let request = h.clarifications.currently_visible().unwrap();
        assert_eq!(request.task_ids(), vec![task_id]);
        assert!(matches!(
            h.clarifications.reopen(&task_id),
            Err(ClarificationError::NotReopenable(_))
        ));
    }

    #[tokio::test]
    async fn test_resolve_isolates_record_failures() {
        let service = Arc::new(ScriptedService::default());
        service.reply_answers("rec-1", Ok(result("A01-REFINED")));
        service.reply_answers(
            "rec-2",
            Err(AnalysisError::Remote("record expired".to_string())),
        );
        let h = harness(service.clone());

        let first = *h.registry.create("one".to_string()).id();
        let second = *h.registry.create("two".to_string()).id();
        let first_token = h.cancellation.issue(TokenScope::Individual(first));
        let second_token = h.cancellation.issue(TokenScope::Individual(second));
        h.registry.update(&first, TaskPatch::BeginPending).unwrap();
        h.registry.update(&second, TaskPatch::BeginPending).unwrap();
        h.reconciler.apply_all(vec![
            Settlement::new(first, first_token, Ok(clarifying_result("A01", "rec-1", "q-a"))),
            Settlement::new(second, second_token, Ok(clarifying_result("B02", "rec-2", "q-b"))),
        ]);

        let mut answers = HashMap::new();
        answers.insert(record("rec-1"), answer("q-a"));
        answers.insert(record("rec-2"), answer("q-b"));
        let report = h.clarifications.resolve(answers).await.unwrap();

        assert_eq!(report.resolved, vec![record("rec-1")]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, record("rec-2"));

        let resolved = h.registry.get(&first).unwrap();
        assert!(!resolved.clarification_pending());
        assert_eq!(resolved.result().unwrap().clarified_codes()[0].code, "A01-REFINED");

        let failed = h.registry.get(&second).unwrap();
        assert!(failed.clarification_pending());
        assert_eq!(failed.clarification_error(), Some("record expired"));
        assert!(failed.error().is_none());

        assert!(h.clarifications.currently_visible().is_none());
        assert_eq!(service.answer_calls().len(), 2);
    }

    #[tokio::test]
    async fn test_resolve_presents_queued_request_against_latest_state() {
        let service = Arc::new(ScriptedService::default());
        service.reply_answers("rec-1", Ok(result("A01-REFINED")));
        let h = harness(service);

        clarifying_task(&h, "A01", "rec-1", "q-a");
        let second = clarifying_task(&h, "B02", "rec-2", "q-b");
        let removed = clarifying_task(&h, "C03", "rec-3", "q-c");
        h.registry.remove(&removed).unwrap();
        assert_eq!(h.clarifications.queued(), 2);

        let mut answers = HashMap::new();
        answers.insert(record("rec-1"), answer("q-a"));
        h.clarifications.resolve(answers).await.unwrap();

        let next = h.clarifications.currently_visible().unwrap();
        assert_eq!(next.task_ids(), vec![second]);
        assert_eq!(h.clarifications.queued(), 0);
    }

    #[tokio::test]
    async fn test_resolve_rejects_unknown_record() {
        let h = harness(Arc::new(ScriptedService::default()));
        clarifying_task(&h, "A01", "rec-1", "q-a");

        let mut answers = HashMap::new();
        answers.insert(record("elsewhere"), answer("q-x"));
        let err = h.clarifications.resolve(answers).await.unwrap_err();

        assert!(matches!(err, ClarificationError::UnknownRecord(_)));
        assert!(h.clarifications.currently_visible().is_some());
    }
}
