//! Result Reconciler - 结果合并
//!
//! 把远程结果合并回任务注册表：
//! 1. 陈旧响应检查：令牌不再是任务的活动令牌时整体丢弃，不产生任何修改
//! 2. 取消 -> Cancelled（不作为错误展示）
//! 3. 失败 -> Failed，限流类失败替换为友好提示
//! 4. 成功 -> Succeeded，预选编码，需要澄清时交给澄清队列
//! 5. 无论以上结果如何，都退役该租约

use std::sync::Arc;

use super::cancellation::{CancellationController, RequestToken, RetiredLease};
use super::clarification::{ClarificationItem, ClarificationQueue};
use super::failure::{FailureClassifier, FailureKind};
use crate::application::ports::{
    AnalysisError, AnalysisOutcome, EventSinkPort, OrchestratorEvent, TaskPatch, TaskRegistryPort,
};
use crate::application::queries::TaskView;
use crate::domain::task::{Task, TaskId};

/// 一个已结束的远程工作单元
#[derive(Debug, Clone)]
pub struct Settlement {
    pub task_id: TaskId,
    pub token: RequestToken,
    pub outcome: AnalysisOutcome,
}

impl Settlement {
    pub fn new(task_id: TaskId, token: RequestToken, outcome: AnalysisOutcome) -> Self {
        Self {
            task_id,
            token,
            outcome,
        }
    }
}

/// 合并结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// 陈旧响应或任务已不存在，未做任何修改
    Discarded,
    Cancelled,
    Failed(FailureKind),
    Succeeded { needs_clarification: bool },
}

pub struct Reconciler {
    registry: Arc<dyn TaskRegistryPort>,
    cancellation: Arc<CancellationController>,
    clarifications: Arc<ClarificationQueue>,
    classifier: Arc<FailureClassifier>,
    events: Arc<dyn EventSinkPort>,
}

impl Reconciler {
    pub fn new(
        registry: Arc<dyn TaskRegistryPort>,
        cancellation: Arc<CancellationController>,
        clarifications: Arc<ClarificationQueue>,
        classifier: Arc<FailureClassifier>,
        events: Arc<dyn EventSinkPort>,
    ) -> Self {
        Self {
            registry,
            cancellation,
            clarifications,
            classifier,
            events,
        }
    }

    /// 合并单个结果
    pub fn apply(
        &self,
        task_id: TaskId,
        token: &RequestToken,
        outcome: AnalysisOutcome,
    ) -> Applied {
        self.apply_all(vec![Settlement::new(task_id, token.clone(), outcome)])
            .pop()
            .unwrap_or(Applied::Discarded)
    }

    /// 合并同一时刻结束的多个结果
    ///
    /// 每一项独立合并，一项失败不影响其他项；需要澄清的任务在全部合并后
    /// 一次性交给澄清队列，从而聚合到同一个澄清请求中
    pub fn apply_all(&self, settlements: Vec<Settlement>) -> Vec<Applied> {
        let mut clarifying = Vec::new();
        let applied = settlements
            .into_iter()
            .map(|settlement| {
                let (applied, task) = self.apply_one(settlement);
                if let (Applied::Succeeded { needs_clarification: true }, Some(task)) =
                    (applied, task)
                {
                    clarifying.extend(ClarificationItem::for_task(&task));
                }
                applied
            })
            .collect();

        if !clarifying.is_empty() {
            self.clarifications.enqueue(clarifying);
        }
        applied
    }

    /// 把已被取消控制器退役的租约对应的任务标记为 Cancelled
    ///
    /// 若任务在此期间已被重新提交（签发了新令牌），保持新状态不变
    pub fn apply_cancellation(&self, leases: &[RetiredLease]) -> usize {
        let mut cancelled = 0;
        for lease in leases {
            let still_idle = |_: &Task| self.cancellation.current_token(&lease.task_id).is_none();
            match self
                .registry
                .update_if(&lease.task_id, &still_idle, TaskPatch::Cancel)
            {
                Ok(Some(task)) => {
                    self.publish_task(&task);
                    cancelled += 1;
                }
                Ok(None) => {
                    tracing::debug!(
                        task_id = %lease.task_id,
                        "Task resubmitted before cancellation applied"
                    );
                }
                Err(e) => {
                    tracing::debug!(
                        task_id = %lease.task_id,
                        error = %e,
                        "Cancellation not applied"
                    );
                }
            }
        }
        cancelled
    }

    pub fn classifier(&self) -> &FailureClassifier {
        &self.classifier
    }

    fn apply_one(&self, settlement: Settlement) -> (Applied, Option<Task>) {
        let Settlement {
            task_id,
            token,
            outcome,
        } = settlement;

        let (patch, applied) = match outcome {
            Err(AnalysisError::Aborted) => (TaskPatch::Cancel, Applied::Cancelled),
            Err(error) => {
                let kind = self.classifier.classify(&error);
                tracing::warn!(task_id = %task_id, kind = ?kind, error = %error, "Analysis failed");
                (
                    TaskPatch::Fail(self.classifier.user_message(&error)),
                    Applied::Failed(kind),
                )
            }
            Ok(result) => {
                let needs_clarification = result.needs_clarification();
                (
                    TaskPatch::Succeed(result),
                    Applied::Succeeded {
                        needs_clarification,
                    },
                )
            }
        };

        let is_current = |_: &Task| self.cancellation.is_current(&task_id, token.id());
        let outcome = match self.registry.update_if(&task_id, &is_current, patch) {
            Ok(Some(task)) => {
                tracing::debug!(
                    task_id = %task_id,
                    token_id = %token.id(),
                    status = %task.status(),
                    "Outcome applied"
                );
                self.publish_task(&task);
                (applied, Some(task))
            }
            Ok(None) => {
                tracing::debug!(
                    task_id = %task_id,
                    token_id = %token.id(),
                    "Stale response discarded"
                );
                (Applied::Discarded, None)
            }
            Err(e) => {
                tracing::debug!(task_id = %task_id, error = %e, "Outcome not applied");
                (Applied::Discarded, None)
            }
        };

        self.cancellation.retire_lease(&task_id, &token);
        outcome
    }

    fn publish_task(&self, task: &Task) {
        self.events.publish(OrchestratorEvent::TaskChanged {
            task: TaskView::from(task),
        });
    }
}
