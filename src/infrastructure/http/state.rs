//! Application State
//!
//! 包含编排器及所有 Command/Query Handlers 的应用状态

use std::sync::Arc;

use crate::application::{
    // Command handlers
    CancelAllHandler, CancelAnalysisHandler, ClearBannerHandler, CreateTaskHandler,
    DismissClarificationHandler, EditTaskHandler, ReopenClarificationHandler, RemoveTaskHandler,
    ResolveClarificationHandler, SelectCodeHandler, SubmitAnalysisHandler, SubmitBatchHandler,
    // Query handlers
    GetAnalysisStatusHandler, GetCurrentClarificationHandler, GetTaskHandler, ListTasksHandler,
    // Orchestrator
    AnalysisOrchestrator,
};
use crate::infrastructure::events::EventPublisher;

/// 应用状态
pub struct AppState {
    pub orchestrator: AnalysisOrchestrator,
    pub event_publisher: Arc<EventPublisher>,

    // ========== Command Handlers ==========
    pub create_task_handler: CreateTaskHandler,
    pub remove_task_handler: RemoveTaskHandler,
    pub edit_task_handler: EditTaskHandler,
    pub select_code_handler: SelectCodeHandler,
    pub submit_analysis_handler: SubmitAnalysisHandler,
    pub submit_batch_handler: SubmitBatchHandler,
    pub cancel_analysis_handler: CancelAnalysisHandler,
    pub cancel_all_handler: CancelAllHandler,
    pub clear_banner_handler: ClearBannerHandler,
    pub resolve_clarification_handler: ResolveClarificationHandler,
    pub dismiss_clarification_handler: DismissClarificationHandler,
    pub reopen_clarification_handler: ReopenClarificationHandler,

    // ========== Query Handlers ==========
    pub get_task_handler: GetTaskHandler,
    pub list_tasks_handler: ListTasksHandler,
    pub get_analysis_status_handler: GetAnalysisStatusHandler,
    pub get_current_clarification_handler: GetCurrentClarificationHandler,
}

impl AppState {
    /// 创建应用状态
    ///
    /// `orchestrator` 的事件须发布到 `event_publisher`，WebSocket 才能收到
    pub fn new(orchestrator: AnalysisOrchestrator, event_publisher: Arc<EventPublisher>) -> Self {
        let registry = orchestrator.registry.clone();
        let events = orchestrator.events.clone();
        let dispatcher = orchestrator.dispatcher.clone();
        let clarifications = orchestrator.clarifications.clone();

        Self {
            // Command handlers
            create_task_handler: CreateTaskHandler::new(registry.clone(), events.clone()),
            remove_task_handler: RemoveTaskHandler::new(registry.clone(), events.clone()),
            edit_task_handler: EditTaskHandler::new(registry.clone(), events.clone()),
            select_code_handler: SelectCodeHandler::new(registry.clone(), events),
            submit_analysis_handler: SubmitAnalysisHandler::new(dispatcher.clone()),
            submit_batch_handler: SubmitBatchHandler::new(registry.clone(), dispatcher.clone()),
            cancel_analysis_handler: CancelAnalysisHandler::new(dispatcher.clone()),
            cancel_all_handler: CancelAllHandler::new(dispatcher),
            clear_banner_handler: ClearBannerHandler::new(orchestrator.banner.clone()),
            resolve_clarification_handler: ResolveClarificationHandler::new(clarifications.clone()),
            dismiss_clarification_handler: DismissClarificationHandler::new(clarifications.clone()),
            reopen_clarification_handler: ReopenClarificationHandler::new(clarifications.clone()),

            // Query handlers
            get_task_handler: GetTaskHandler::new(registry.clone()),
            list_tasks_handler: ListTasksHandler::new(registry),
            get_analysis_status_handler: GetAnalysisStatusHandler::new(
                orchestrator.cancellation.clone(),
                orchestrator.banner.clone(),
            ),
            get_current_clarification_handler: GetCurrentClarificationHandler::new(clarifications),

            orchestrator,
            event_publisher,
        }
    }
}

#[cfg(test)]
impl AppState {
    /// 使用内置假分析服务的完整状态
    pub(crate) fn with_fake_service(delay: std::time::Duration) -> Self {
        use crate::application::orchestrator::{CancellationController, OrchestratorConfig};
        use crate::application::{AnalysisServicePort, TaskRegistryPort};
        use crate::infrastructure::adapters::{FakeAnalysisClient, FakeAnalysisClientConfig};
        use crate::infrastructure::memory::InMemoryTaskRegistry;

        let publisher = EventPublisher::new().arc();
        let cancellation = Arc::new(CancellationController::new(publisher.clone()));
        let registry: Arc<dyn TaskRegistryPort> =
            Arc::new(InMemoryTaskRegistry::new(cancellation.clone()));
        let service: Arc<dyn AnalysisServicePort> =
            Arc::new(FakeAnalysisClient::new(FakeAnalysisClientConfig { delay }));
        let orchestrator = AnalysisOrchestrator::new(
            OrchestratorConfig::default(),
            registry,
            cancellation,
            service,
            publisher.clone(),
        );
        Self::new(orchestrator, publisher)
    }
}
