//! 测试支撑：可编排的分析服务与事件记录

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use super::{
    AnalysisOrchestrator, CancellationController, ClarificationQueue, Dispatcher, GlobalBanner,
    OrchestratorConfig, Reconciler,
};
use crate::application::ports::{
    AnalysisError, AnalysisOutcome, AnalysisServicePort, EventSinkPort, OrchestratorEvent,
    TaskRegistryPort,
};
use crate::domain::analysis::{
    AnalysisResult, ClarificationAnswer, ClarificationQuestion, ProposedCode, RecordId,
};
use crate::infrastructure::memory::InMemoryTaskRegistry;

pub(crate) const RATE_LIMIT_MESSAGE: &str = "Too many requests, try again later.";

/// 记录所有发布的事件
#[derive(Default)]
pub(crate) struct RecordingSink {
    events: Mutex<Vec<OrchestratorEvent>>,
}

impl RecordingSink {
    pub(crate) fn events(&self) -> Vec<OrchestratorEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl EventSinkPort for RecordingSink {
    fn publish(&self, event: OrchestratorEvent) {
        self.events.lock().unwrap().push(event);
    }
}

type BatchOutcome = Result<Vec<AnalysisOutcome>, AnalysisError>;

enum Reply<T> {
    Now(T),
    Hold(oneshot::Receiver<T>),
}

/// 可编排的分析服务
///
/// 每次调用按脚本顺序取出一个回复；没有脚本的调用一直挂起直到被取消
#[derive(Default)]
pub(crate) struct ScriptedService {
    texts: Mutex<HashMap<String, VecDeque<Reply<AnalysisOutcome>>>>,
    batches: Mutex<VecDeque<Reply<BatchOutcome>>>,
    answers: Mutex<HashMap<String, VecDeque<Reply<AnalysisOutcome>>>>,
    answer_calls: Mutex<Vec<(RecordId, Vec<ClarificationAnswer>)>>,
    analyze_calls: AtomicUsize,
}

impl ScriptedService {
    pub(crate) fn reply_text(&self, text: &str, outcome: AnalysisOutcome) {
        self.push_text(text, Reply::Now(outcome));
    }

    pub(crate) fn hold_text(&self, text: &str) -> oneshot::Sender<AnalysisOutcome> {
        let (tx, rx) = oneshot::channel();
        self.push_text(text, Reply::Hold(rx));
        tx
    }

    pub(crate) fn reply_batch(&self, outcome: BatchOutcome) {
        self.batches.lock().unwrap().push_back(Reply::Now(outcome));
    }

    pub(crate) fn hold_batch(&self) -> oneshot::Sender<BatchOutcome> {
        let (tx, rx) = oneshot::channel();
        self.batches.lock().unwrap().push_back(Reply::Hold(rx));
        tx
    }

    pub(crate) fn reply_answers(&self, record_id: &str, outcome: AnalysisOutcome) {
        self.answers
            .lock()
            .unwrap()
            .entry(record_id.to_string())
            .or_default()
            .push_back(Reply::Now(outcome));
    }

    pub(crate) fn answer_calls(&self) -> Vec<(RecordId, Vec<ClarificationAnswer>)> {
        self.answer_calls.lock().unwrap().clone()
    }

    /// 等待至少 `n` 次 `analyze` 调用已经取走回复
    pub(crate) async fn wait_for_analyze_calls(&self, n: usize) {
        while self.analyze_calls.load(Ordering::SeqCst) < n {
            tokio::task::yield_now().await;
        }
    }

    fn push_text(&self, text: &str, reply: Reply<AnalysisOutcome>) {
        self.texts
            .lock()
            .unwrap()
            .entry(text.to_string())
            .or_default()
            .push_back(reply);
    }
}

async fn deliver<T>(
    reply: Option<Reply<Result<T, AnalysisError>>>,
    cancel: &CancellationToken,
) -> Result<T, AnalysisError> {
    match reply {
        Some(Reply::Now(outcome)) => outcome,
        Some(Reply::Hold(rx)) => tokio::select! {
            outcome = rx => outcome.unwrap_or(Err(AnalysisError::Aborted)),
            _ = cancel.cancelled() => Err(AnalysisError::Aborted),
        },
        None => {
            cancel.cancelled().await;
            Err(AnalysisError::Aborted)
        }
    }
}

#[async_trait]
impl AnalysisServicePort for ScriptedService {
    async fn analyze(&self, text: &str, cancel: &CancellationToken) -> AnalysisOutcome {
        let reply = self
            .texts
            .lock()
            .unwrap()
            .get_mut(text)
            .and_then(VecDeque::pop_front);
        self.analyze_calls.fetch_add(1, Ordering::SeqCst);
        deliver(reply, cancel).await
    }

    async fn analyze_batch(
        &self,
        _texts: &[String],
        cancel: &CancellationToken,
    ) -> Result<Vec<AnalysisOutcome>, AnalysisError> {
        let reply = self.batches.lock().unwrap().pop_front();
        deliver(reply, cancel).await
    }

    async fn submit_clarification_answers(
        &self,
        record_id: &RecordId,
        answers: &[ClarificationAnswer],
        cancel: &CancellationToken,
    ) -> AnalysisOutcome {
        self.answer_calls
            .lock()
            .unwrap()
            .push((record_id.clone(), answers.to_vec()));
        let reply = self
            .answers
            .lock()
            .unwrap()
            .get_mut(record_id.as_str())
            .and_then(VecDeque::pop_front);
        deliver(reply, cancel).await
    }
}

pub(crate) fn result(code: &str) -> AnalysisResult {
    AnalysisResult::new(vec![ProposedCode::new(code, format!("{} description", code))])
}

pub(crate) fn clarifying_result(code: &str, record_id: &str, question_id: &str) -> AnalysisResult {
    result(code)
        .with_record_id(RecordId::new(record_id).unwrap())
        .with_questions(vec![ClarificationQuestion::new(
            question_id,
            format!("Question {}", question_id),
            "general",
        )])
}

pub(crate) struct Harness {
    pub registry: Arc<dyn TaskRegistryPort>,
    pub cancellation: Arc<CancellationController>,
    pub dispatcher: Arc<Dispatcher>,
    pub reconciler: Arc<Reconciler>,
    pub clarifications: Arc<ClarificationQueue>,
    pub banner: Arc<GlobalBanner>,
    pub sink: Arc<RecordingSink>,
}

pub(crate) fn harness(service: Arc<ScriptedService>) -> Harness {
    harness_with_timeout(service, Duration::from_secs(30))
}

pub(crate) fn harness_with_timeout(service: Arc<ScriptedService>, timeout: Duration) -> Harness {
    let sink = Arc::new(RecordingSink::default());
    let cancellation = Arc::new(CancellationController::new(sink.clone()));
    let registry: Arc<dyn TaskRegistryPort> =
        Arc::new(InMemoryTaskRegistry::new(cancellation.clone()));
    let config = OrchestratorConfig {
        request_timeout: timeout,
        rate_limit_message: RATE_LIMIT_MESSAGE.to_string(),
        ..OrchestratorConfig::default()
    };
    let orchestrator =
        AnalysisOrchestrator::new(config, registry, cancellation, service, sink.clone());

    Harness {
        registry: orchestrator.registry,
        cancellation: orchestrator.cancellation,
        dispatcher: orchestrator.dispatcher,
        reconciler: orchestrator.reconciler,
        clarifications: orchestrator.clarifications,
        banner: orchestrator.banner,
        sink,
    }
}
