//! In-Memory Task Registry Implementation

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::application::orchestrator::CancellationController;
use crate::application::ports::{RegistryError, TaskPatch, TaskRegistryPort};
use crate::domain::task::{Task, TaskId};

/// 内存任务注册表
pub struct InMemoryTaskRegistry {
    /// task_id -> Task
    tasks: DashMap<TaskId, Task>,
    /// 下一个创建序号
    next_ordinal: AtomicU64,
    cancellation: Arc<CancellationController>,
}

impl InMemoryTaskRegistry {
    pub fn new(cancellation: Arc<CancellationController>) -> Self {
        Self {
            tasks: DashMap::new(),
            next_ordinal: AtomicU64::new(1),
            cancellation,
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// 在副本上应用修改，成功后整体替换
    fn apply(task: &mut Task, patch: TaskPatch) -> Result<(), RegistryError> {
        let name = patch.name();
        let mut candidate = task.clone();
        patch.apply(&mut candidate).map_err(|e| {
            tracing::debug!(task_id = %task.id(), patch = name, error = %e, "Task patch rejected");
            RegistryError::Rejected(e)
        })?;
        *task = candidate;
        Ok(())
    }
}

impl TaskRegistryPort for InMemoryTaskRegistry {
    fn create(&self, input_text: String) -> Task {
        let ordinal = self.next_ordinal.fetch_add(1, Ordering::SeqCst);
        let task = Task::new(ordinal, input_text);
        self.tasks.insert(*task.id(), task.clone());
        task
    }

    fn remove(&self, id: &TaskId) -> Result<Task, RegistryError> {
        if !self.tasks.contains_key(id) {
            return Err(RegistryError::NotFound(*id));
        }
        // 先中止活动请求，迟到的结果由陈旧响应检查丢弃
        if let Some(lease) = self.cancellation.abort_task(id) {
            tracing::debug!(
                task_id = %id,
                token_id = %lease.token_id,
                "Aborted request of removed task"
            );
        }
        self.tasks
            .remove(id)
            .map(|(_, task)| task)
            .ok_or(RegistryError::NotFound(*id))
    }

    fn update(&self, id: &TaskId, patch: TaskPatch) -> Result<Task, RegistryError> {
        let mut task = self
            .tasks
            .get_mut(id)
            .ok_or(RegistryError::NotFound(*id))?;
        Self::apply(task.value_mut(), patch)?;
        Ok(task.value().clone())
    }

    fn update_if(
        &self,
        id: &TaskId,
        guard: &dyn Fn(&Task) -> bool,
        patch: TaskPatch,
    ) -> Result<Option<Task>, RegistryError> {
        let mut task = self
            .tasks
            .get_mut(id)
            .ok_or(RegistryError::NotFound(*id))?;
        if !guard(task.value()) {
            return Ok(None);
        }
        Self::apply(task.value_mut(), patch)?;
        Ok(Some(task.value().clone()))
    }

    fn get(&self, id: &TaskId) -> Option<Task> {
        self.tasks.get(id).map(|t| t.clone())
    }

    fn list(&self) -> Vec<Task> {
        let mut tasks: Vec<Task> = self.tasks.iter().map(|t| t.value().clone()).collect();
        tasks.sort_by_key(Task::ordinal);
        tasks
    }
}
