//! Task Command Handlers

use std::sync::Arc;

use crate::application::commands::{CreateTask, EditTask, RemoveTask, SelectCode};
use crate::application::error::ApplicationError;
use crate::application::ports::{EventSinkPort, OrchestratorEvent, TaskPatch, TaskRegistryPort};
use crate::application::queries::TaskView;

// ============================================================================
// CreateTask
// ============================================================================

/// CreateTask Handler
pub struct CreateTaskHandler {
    registry: Arc<dyn TaskRegistryPort>,
    events: Arc<dyn EventSinkPort>,
}

impl CreateTaskHandler {
    pub fn new(registry: Arc<dyn TaskRegistryPort>, events: Arc<dyn EventSinkPort>) -> Self {
        Self { registry, events }
    }

    pub async fn handle(&self, command: CreateTask) -> Result<TaskView, ApplicationError> {
        let task = self.registry.create(command.input_text);
        let view = TaskView::from(&task);

        tracing::info!(task_id = %task.id(), ordinal = task.ordinal(), "Task created");
        self.events
            .publish(OrchestratorEvent::TaskChanged { task: view.clone() });

        Ok(view)
    }
}

// ============================================================================
// RemoveTask
// ============================================================================

/// RemoveTask Handler
///
/// 注册表在移除前中止任务的活动请求
pub struct RemoveTaskHandler {
    registry: Arc<dyn TaskRegistryPort>,
    events: Arc<dyn EventSinkPort>,
}

impl RemoveTaskHandler {
    pub fn new(registry: Arc<dyn TaskRegistryPort>, events: Arc<dyn EventSinkPort>) -> Self {
        Self { registry, events }
    }

    pub async fn handle(&self, command: RemoveTask) -> Result<(), ApplicationError> {
        let task = self.registry.remove(&command.task_id)?;

        tracing::info!(task_id = %task.id(), status = %task.status(), "Task removed");
        self.events.publish(OrchestratorEvent::TaskRemoved {
            task_id: command.task_id,
        });

        Ok(())
    }
}

// ============================================================================
// EditTask
// ============================================================================

/// EditTask Handler
pub struct EditTaskHandler {
    registry: Arc<dyn TaskRegistryPort>,
    events: Arc<dyn EventSinkPort>,
}

impl EditTaskHandler {
    pub fn new(registry: Arc<dyn TaskRegistryPort>, events: Arc<dyn EventSinkPort>) -> Self {
        Self { registry, events }
    }

    pub async fn handle(&self, command: EditTask) -> Result<TaskView, ApplicationError> {
        let task = self
            .registry
            .update(&command.task_id, TaskPatch::EditText(command.input_text))?;
        let view = TaskView::from(&task);

        tracing::debug!(task_id = %command.task_id, "Task text edited");
        self.events
            .publish(OrchestratorEvent::TaskChanged { task: view.clone() });

        Ok(view)
    }
}

// ============================================================================
// SelectCode
// ============================================================================

/// SelectCode Handler
pub struct SelectCodeHandler {
    registry: Arc<dyn TaskRegistryPort>,
    events: Arc<dyn EventSinkPort>,
}

impl SelectCodeHandler {
    pub fn new(registry: Arc<dyn TaskRegistryPort>, events: Arc<dyn EventSinkPort>) -> Self {
        Self { registry, events }
    }

    pub async fn handle(&self, command: SelectCode) -> Result<TaskView, ApplicationError> {
        let patch = TaskPatch::Select {
            code: command.code.clone(),
            decision: command.decision,
        };
        let task = self.registry.update(&command.task_id, patch)?;
        let view = TaskView::from(&task);

        tracing::debug!(
            task_id = %command.task_id,
            code = %command.code,
            decision = ?command.decision,
            "Code selection changed"
        );
        self.events
            .publish(OrchestratorEvent::TaskChanged { task: view.clone() });

        Ok(view)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::orchestrator::testing::RecordingSink;
    use crate::application::orchestrator::CancellationController;
    use crate::domain::analysis::{AnalysisResult, ProposedCode};
    use crate::domain::task::{SelectionDecision, TaskId, TaskStatus};
    use crate::infrastructure::memory::InMemoryTaskRegistry;

    fn setup() -> (Arc<dyn TaskRegistryPort>, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::default());
        let cancellation = Arc::new(CancellationController::new(sink.clone()));
        (Arc::new(InMemoryTaskRegistry::new(cancellation)), sink)
    }

    #[tokio::test]
    async fn test_edit_only_while_idle() {
        let (registry, sink) = setup();
        let created = CreateTaskHandler::new(registry.clone(), sink.clone())
            .handle(CreateTask {
                input_text: "first".to_string(),
            })
            .await
            .unwrap();

        let edit = EditTaskHandler::new(registry.clone(), sink.clone());
        let edited = edit
            .handle(EditTask {
                task_id: created.id,
                input_text: "second".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(edited.input_text, "second");

        registry.update(&created.id, TaskPatch::BeginPending).unwrap();
        let err = edit
            .handle(EditTask {
                task_id: created.id,
                input_text: "third".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ApplicationError::InvalidState(_)));
        assert_eq!(sink.events().len(), 2);
    }

    #[tokio::test]
    async fn test_select_rejects_unknown_code() {
        let (registry, sink) = setup();
        let task_id = *registry.create("text".to_string()).id();
        registry.update(&task_id, TaskPatch::BeginPending).unwrap();
        registry
            .update(
                &task_id,
                TaskPatch::Succeed(AnalysisResult::new(vec![ProposedCode::new("A01", "first")])),
            )
            .unwrap();

        let handler = SelectCodeHandler::new(registry.clone(), sink);
        let view = handler
            .handle(SelectCode {
                task_id,
                code: "A01".to_string(),
                decision: SelectionDecision::Deny,
            })
            .await
            .unwrap();
        assert_eq!(view.status, TaskStatus::Succeeded);
        assert_eq!(view.denied, vec!["A01".to_string()]);

        let err = handler
            .handle(SelectCode {
                task_id,
                code: "Z99".to_string(),
                decision: SelectionDecision::Accept,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ApplicationError::ValidationError(_)));
    }

    #[tokio::test]
    async fn test_remove_unknown_task() {
        let (registry, sink) = setup();
        let err = RemoveTaskHandler::new(registry, sink)
            .handle(RemoveTask {
                task_id: TaskId::new(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ApplicationError::NotFound { .. }));
    }
}
