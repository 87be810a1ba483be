//! Task Query Handlers

use std::sync::Arc;

use crate::application::error::ApplicationError;
use crate::application::ports::TaskRegistryPort;
use crate::application::queries::{GetTask, ListTasks, TaskView};

/// GetTask Handler
pub struct GetTaskHandler {
    registry: Arc<dyn TaskRegistryPort>,
}

impl GetTaskHandler {
    pub fn new(registry: Arc<dyn TaskRegistryPort>) -> Self {
        Self { registry }
    }

    pub async fn handle(&self, query: GetTask) -> Result<TaskView, ApplicationError> {
        let task = self
            .registry
            .get(&query.task_id)
            .ok_or_else(|| ApplicationError::not_found("Task", *query.task_id.as_uuid()))?;

        Ok(TaskView::from(&task))
    }
}

/// ListTasks Handler
pub struct ListTasksHandler {
    registry: Arc<dyn TaskRegistryPort>,
}

impl ListTasksHandler {
    pub fn new(registry: Arc<dyn TaskRegistryPort>) -> Self {
        Self { registry }
    }

    pub async fn handle(&self, _query: ListTasks) -> Result<Vec<TaskView>, ApplicationError> {
        Ok(self.registry.list().iter().map(TaskView::from).collect())
    }
}
