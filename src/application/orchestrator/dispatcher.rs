//! Dispatcher - 请求调度
//!
//! 把任务提交转换为单个或批量远程调用。签发令牌先于任务进入 Pending，
//! 保证任何时刻 Pending 任务都持有一个活动令牌；结算在后台任务中完成，
//! 然后交给 Reconciler 合并。

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;

use super::banner::GlobalBanner;
use super::cancellation::{CancellationController, RequestToken, TokenScope};
use super::reconciler::{Reconciler, Settlement};
use super::settle;
use crate::application::ports::{
    AnalysisError, AnalysisServicePort, EventSinkPort, OrchestratorEvent, RegistryError,
    TaskPatch, TaskRegistryPort,
};
use crate::application::queries::TaskView;
use crate::domain::task::{BatchId, Task, TaskError, TaskId};

/// 全局取消时的横幅文本
pub const CANCELLED_BANNER: &str = "Analysis cancelled";

/// Dispatcher 错误
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Task not found: {0}")]
    NotFound(TaskId),

    #[error("Task {0} has no input text")]
    EmptyInput(TaskId),

    #[error("Batch contains no tasks")]
    EmptyBatch,

    #[error("Task {0} appears more than once in the batch")]
    DuplicateTask(TaskId),

    #[error(transparent)]
    Registry(RegistryError),
}

impl DispatchError {
    fn from_registry(task_id: TaskId, err: RegistryError) -> Self {
        match err {
            RegistryError::NotFound(id) => DispatchError::NotFound(id),
            RegistryError::Rejected(TaskError::EmptyInput) => DispatchError::EmptyInput(task_id),
            other => DispatchError::Registry(other),
        }
    }
}

/// 已发出的请求
#[derive(Debug)]
pub struct Dispatched {
    pub token: RequestToken,
    /// 结算完成（结果已合并）时结束
    pub settled: JoinHandle<()>,
}

pub struct Dispatcher {
    registry: Arc<dyn TaskRegistryPort>,
    cancellation: Arc<CancellationController>,
    reconciler: Arc<Reconciler>,
    service: Arc<dyn AnalysisServicePort>,
    banner: Arc<GlobalBanner>,
    events: Arc<dyn EventSinkPort>,
    request_timeout: Duration,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<dyn TaskRegistryPort>,
        cancellation: Arc<CancellationController>,
        reconciler: Arc<Reconciler>,
        service: Arc<dyn AnalysisServicePort>,
        banner: Arc<GlobalBanner>,
        events: Arc<dyn EventSinkPort>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            cancellation,
            reconciler,
            service,
            banner,
            events,
            request_timeout,
        }
    }

    /// 单个提交
    pub fn submit_individual(&self, task_id: TaskId) -> Result<Dispatched, DispatchError> {
        self.dispatchable(&task_id)?;
        self.banner_reset();

        let token = self.cancellation.issue(TokenScope::Individual(task_id));
        let task = self.begin_pending(&task_id, &token)?;
        let text = task.input_text().to_string();

        tracing::info!(task_id = %task_id, token_id = %token.id(), "Dispatching analysis");

        let service = self.service.clone();
        let reconciler = self.reconciler.clone();
        let signal = token.signal().clone();
        let limit = self.request_timeout;
        let settling = token.clone();
        let settled = tokio::spawn(async move {
            let outcome = settle(service.analyze(&text, &signal), &signal, limit).await;
            reconciler.apply(task_id, &settling, outcome);
        });

        Ok(Dispatched { token, settled })
    }

    /// 批量提交
    ///
    /// 一次远程调用携带全部文本，响应按位置拆分给成员任务
    pub fn submit_batch(&self, task_ids: &[TaskId]) -> Result<Dispatched, DispatchError> {
        if task_ids.is_empty() {
            return Err(DispatchError::EmptyBatch);
        }
        let mut seen = HashSet::new();
        for task_id in task_ids {
            if !seen.insert(*task_id) {
                return Err(DispatchError::DuplicateTask(*task_id));
            }
            self.dispatchable(task_id)?;
        }
        self.banner_reset();

        let members = task_ids.to_vec();
        let batch_id = BatchId::new();
        let token = self.cancellation.issue(TokenScope::Batch {
            batch_id,
            members: members.clone(),
        });

        let mut texts = Vec::with_capacity(members.len());
        for task_id in &members {
            match self.begin_pending(task_id, &token) {
                Ok(task) => texts.push(task.input_text().to_string()),
                Err(e) => {
                    // 已进入 Pending 的成员随令牌一起撤销
                    let retired = self.cancellation.retire(&token);
                    self.reconciler.apply_cancellation(&retired);
                    return Err(e);
                }
            }
        }

        tracing::info!(
            batch_id = %batch_id,
            token_id = %token.id(),
            members = members.len(),
            "Dispatching batch analysis"
        );

        let service = self.service.clone();
        let reconciler = self.reconciler.clone();
        let cancellation = self.cancellation.clone();
        let banner = self.banner.clone();
        let signal = token.signal().clone();
        let limit = self.request_timeout;
        let settling = token.clone();
        let settled = tokio::spawn(async move {
            let outcome = settle(service.analyze_batch(&texts, &signal), &signal, limit).await;

            let settlements: Vec<Settlement> = match outcome {
                Ok(items) => {
                    if items.len() > members.len() {
                        tracing::warn!(
                            batch_id = %batch_id,
                            expected = members.len(),
                            received = items.len(),
                            "Batch response has extra items"
                        );
                    }
                    let mut items = items.into_iter();
                    members
                        .iter()
                        .map(|task_id| {
                            let outcome = items.next().unwrap_or_else(|| {
                                Err(AnalysisError::Malformed("missing batch item".to_string()))
                            });
                            Settlement::new(*task_id, settling.clone(), outcome)
                        })
                        .collect()
                }
                Err(error) => {
                    let still_current = members
                        .iter()
                        .any(|task_id| cancellation.is_current(task_id, settling.id()));
                    if still_current && error != AnalysisError::Aborted {
                        tracing::warn!(
                            batch_id = %batch_id,
                            error = %error,
                            "Batch request failed"
                        );
                        banner.show(format!(
                            "Batch analysis failed: {}",
                            reconciler.classifier().user_message(&error)
                        ));
                    }
                    members
                        .iter()
                        .map(|task_id| {
                            Settlement::new(*task_id, settling.clone(), Err(error.clone()))
                        })
                        .collect()
                }
            };

            reconciler.apply_all(settlements);
        });

        Ok(Dispatched { token, settled })
    }

    /// 取消单个任务
    ///
    /// 返回任务是否因此进入 Cancelled
    pub fn cancel_task(&self, task_id: &TaskId) -> Result<bool, DispatchError> {
        if self.registry.get(task_id).is_none() {
            return Err(DispatchError::NotFound(*task_id));
        }
        let Some(lease) = self.cancellation.abort_task(task_id) else {
            tracing::debug!(task_id = %task_id, "No active request to cancel");
            return Ok(false);
        };
        Ok(self.reconciler.apply_cancellation(&[lease]) > 0)
    }

    /// 全局取消，返回进入 Cancelled 的任务数
    pub fn cancel_all(&self) -> usize {
        let leases = self.cancellation.abort_all();
        if leases.is_empty() {
            return 0;
        }
        let cancelled = self.reconciler.apply_cancellation(&leases);
        self.banner.show(CANCELLED_BANNER);
        tracing::info!(leases = leases.len(), cancelled = cancelled, "Cancel all applied");
        cancelled
    }

    fn dispatchable(&self, task_id: &TaskId) -> Result<Task, DispatchError> {
        let task = self
            .registry
            .get(task_id)
            .ok_or(DispatchError::NotFound(*task_id))?;
        if !task.has_input() {
            return Err(DispatchError::EmptyInput(*task_id));
        }
        Ok(task)
    }

    /// 令牌已签发后进入 Pending；失败时退役该任务的租约
    fn begin_pending(&self, task_id: &TaskId, token: &RequestToken) -> Result<Task, DispatchError> {
        match self.registry.update(task_id, TaskPatch::BeginPending) {
            Ok(task) => {
                self.events.publish(OrchestratorEvent::TaskChanged {
                    task: TaskView::from(&task),
                });
                Ok(task)
            }
            Err(e) => {
                self.cancellation.retire_lease(task_id, token);
                Err(DispatchError::from_registry(*task_id, e))
            }
        }
    }

    fn banner_reset(&self) {
        if self.banner.current().is_some() {
            self.banner.clear();
        }
    }
}
