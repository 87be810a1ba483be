//! Cancellation Controller - 请求令牌簿记
//!
//! 每个远程请求（单个或批次）对应一个令牌，令牌按成员任务持有租约：
//! 单个请求一份租约，N 个成员的批次 N 份租约。每份租约恰好退役一次
//! （完成、失败或中止），最后一份租约退役时令牌移除并触发取消信号，
//! 让传输层放弃仍在进行的调用。

use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;

use crate::application::ports::{EventSinkPort, OrchestratorEvent};
use crate::domain::task::{BatchId, TaskId};

/// 令牌标识，在控制器生命周期内单调递增
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct TokenId(u64);

impl std::fmt::Display for TokenId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 令牌作用域
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenScope {
    Individual(TaskId),
    Batch {
        batch_id: BatchId,
        members: Vec<TaskId>,
    },
}

impl TokenScope {
    pub fn members(&self) -> &[TaskId] {
        match self {
            TokenScope::Individual(task_id) => std::slice::from_ref(task_id),
            TokenScope::Batch { members, .. } => members,
        }
    }
}

/// 请求令牌
///
/// 由控制器签发，调度器随请求携带，结果回来时用于陈旧响应检查
#[derive(Debug, Clone)]
pub struct RequestToken {
    id: TokenId,
    scope: TokenScope,
    signal: CancellationToken,
}

impl RequestToken {
    pub fn id(&self) -> TokenId {
        self.id
    }

    pub fn scope(&self) -> &TokenScope {
        &self.scope
    }

    /// 传输层使用的取消信号
    pub fn signal(&self) -> &CancellationToken {
        &self.signal
    }

    pub fn is_aborted(&self) -> bool {
        self.signal.is_cancelled()
    }
}

impl PartialEq for RequestToken {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for RequestToken {}

/// 已退役的租约
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetiredLease {
    pub task_id: TaskId,
    pub token_id: TokenId,
}

struct TokenEntry {
    signal: CancellationToken,
    leases: HashSet<TaskId>,
}

#[derive(Default)]
struct Ledger {
    next_id: u64,
    /// token_id -> 未退役的租约
    tokens: HashMap<TokenId, TokenEntry>,
    /// task_id -> 当前活动令牌
    current: HashMap<TaskId, TokenId>,
}

impl Ledger {
    fn retire_lease(&mut self, task_id: &TaskId, token_id: TokenId) -> bool {
        let Some(entry) = self.tokens.get_mut(&token_id) else {
            return false;
        };
        if !entry.leases.remove(task_id) {
            return false;
        }
        if self.current.get(task_id) == Some(&token_id) {
            self.current.remove(task_id);
        }
        if entry.leases.is_empty() {
            if let Some(entry) = self.tokens.remove(&token_id) {
                entry.signal.cancel();
            }
        }
        true
    }

    fn active_count(&self) -> usize {
        self.tokens.values().map(|e| e.leases.len()).sum()
    }
}

/// 取消控制器
///
/// 令牌生命周期的唯一所有者。`retire_*` 与 `abort_*` 都是纯簿记操作，
/// 幂等且从不失败：完成路径与显式取消路径可能竞争退役同一份租约。
pub struct CancellationController {
    ledger: Mutex<Ledger>,
    events: Arc<dyn EventSinkPort>,
}

impl CancellationController {
    pub fn new(events: Arc<dyn EventSinkPort>) -> Self {
        Self {
            ledger: Mutex::new(Ledger::default()),
            events,
        }
    }

    /// 签发令牌
    ///
    /// 成员任务若仍持有旧令牌的租约，旧租约视为被取代并立即退役
    pub fn issue(&self, scope: TokenScope) -> RequestToken {
        let (token, superseded, active) = {
            let mut ledger = self.ledger();
            ledger.next_id += 1;
            let id = TokenId(ledger.next_id);

            let mut superseded = Vec::new();
            for member in scope.members() {
                if let Some(previous) = ledger.current.get(member).copied() {
                    if ledger.retire_lease(member, previous) {
                        superseded.push(previous);
                    }
                }
            }

            let signal = CancellationToken::new();
            let leases: HashSet<TaskId> = scope.members().iter().copied().collect();
            for member in &leases {
                ledger.current.insert(*member, id);
            }
            ledger.tokens.insert(
                id,
                TokenEntry {
                    signal: signal.clone(),
                    leases,
                },
            );

            let active = ledger.active_count();
            (RequestToken { id, scope, signal }, superseded, active)
        };

        tracing::debug!(
            token_id = %token.id,
            members = token.scope.members().len(),
            superseded = superseded.len(),
            active = active,
            "Cancellation token issued"
        );
        self.publish_active(active);
        token
    }

    /// 该令牌是否仍是任务当前的活动令牌
    pub fn is_current(&self, task_id: &TaskId, token_id: TokenId) -> bool {
        self.ledger().current.get(task_id) == Some(&token_id)
    }

    pub fn current_token(&self, task_id: &TaskId) -> Option<TokenId> {
        self.ledger().current.get(task_id).copied()
    }

    /// 退役某个任务在令牌上的租约，重复调用为空操作
    pub fn retire_lease(&self, task_id: &TaskId, token: &RequestToken) -> bool {
        let (retired, active) = {
            let mut ledger = self.ledger();
            let retired = ledger.retire_lease(task_id, token.id);
            (retired, ledger.active_count())
        };
        if retired {
            tracing::trace!(task_id = %task_id, token_id = %token.id, "Lease retired");
            self.publish_active(active);
        }
        retired
    }

    /// 退役令牌上所有剩余租约
    pub fn retire(&self, token: &RequestToken) -> Vec<RetiredLease> {
        let (retired, active) = {
            let mut ledger = self.ledger();
            let retired: Vec<RetiredLease> = token
                .scope
                .members()
                .iter()
                .filter(|task_id| ledger.retire_lease(task_id, token.id))
                .map(|task_id| RetiredLease {
                    task_id: *task_id,
                    token_id: token.id,
                })
                .collect();
            (retired, ledger.active_count())
        };
        if !retired.is_empty() {
            self.publish_active(active);
        }
        retired
    }

    /// 中止单个任务的活动请求
    ///
    /// 批次成员只退役自己的租约；批次的传输在最后一份租约退役时才被放弃
    pub fn abort_task(&self, task_id: &TaskId) -> Option<RetiredLease> {
        let (lease, active) = {
            let mut ledger = self.ledger();
            let token_id = ledger.current.get(task_id).copied()?;
            ledger.retire_lease(task_id, token_id);
            (
                RetiredLease {
                    task_id: *task_id,
                    token_id,
                },
                ledger.active_count(),
            )
        };
        tracing::debug!(task_id = %task_id, token_id = %lease.token_id, "Task request aborted");
        self.publish_active(active);
        Some(lease)
    }

    /// 中止所有活动请求，返回被退役的租约
    pub fn abort_all(&self) -> Vec<RetiredLease> {
        let retired = {
            let mut ledger = self.ledger();
            let mut retired: Vec<RetiredLease> = ledger
                .current
                .drain()
                .map(|(task_id, token_id)| RetiredLease { task_id, token_id })
                .collect();
            retired.sort_by_key(|lease| lease.token_id);
            for (_, entry) in ledger.tokens.drain() {
                entry.signal.cancel();
            }
            retired
        };
        tracing::info!(count = retired.len(), "All active requests aborted");
        self.publish_active(0);
        retired
    }

    /// 未退役的租约数（每个远程工作单元一份）
    pub fn active_count(&self) -> usize {
        self.ledger().active_count()
    }

    /// 未退役的令牌数
    pub fn active_tokens(&self) -> usize {
        self.ledger().tokens.len()
    }

    fn ledger(&self) -> MutexGuard<'_, Ledger> {
        self.ledger.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn publish_active(&self, active: usize) {
        self.events
            .publish(OrchestratorEvent::ActiveCountChanged { active });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::orchestrator::testing::RecordingSink;

    fn controller() -> CancellationController {
        CancellationController::new(Arc::new(RecordingSink::default()))
    }

    #[test]
    fn test_individual_token_lifecycle() {
        let controller = controller();
        let task_id = TaskId::new();

        let token = controller.issue(TokenScope::Individual(task_id));
        assert_eq!(controller.active_count(), 1);
        assert!(controller.is_current(&task_id, token.id()));

        assert!(controller.retire_lease(&task_id, &token));
        assert!(!controller.retire_lease(&task_id, &token));
        assert_eq!(controller.active_count(), 0);
        assert_eq!(controller.active_tokens(), 0);
        assert!(token.is_aborted());
        assert!(!controller.is_current(&task_id, token.id()));
    }

    #[test]
    fn test_batch_token_counts_one_unit_per_member() {
        let controller = controller();
        let members: Vec<TaskId> = (0..3).map(|_| TaskId::new()).collect();

        let token = controller.issue(TokenScope::Batch {
            batch_id: BatchId::new(),
            members: members.clone(),
        });
        assert_eq!(controller.active_count(), 3);
        assert_eq!(controller.active_tokens(), 1);

        controller.retire_lease(&members[0], &token);
        controller.retire_lease(&members[1], &token);
        assert_eq!(controller.active_count(), 1);
        assert!(!token.is_aborted());

        controller.retire_lease(&members[2], &token);
        assert_eq!(controller.active_count(), 0);
        assert_eq!(controller.active_tokens(), 0);
    }

    #[test]
    fn test_reissue_supersedes_previous_lease() {
        let controller = controller();
        let task_id = TaskId::new();

        let first = controller.issue(TokenScope::Individual(task_id));
        let second = controller.issue(TokenScope::Individual(task_id));

        assert_eq!(controller.active_count(), 1);
        assert!(first.is_aborted());
        assert!(!controller.is_current(&task_id, first.id()));
        assert!(controller.is_current(&task_id, second.id()));
        assert!(!controller.retire_lease(&task_id, &first));
        assert_eq!(controller.active_count(), 1);
    }

    #[test]
    fn test_abort_task_leaves_batch_siblings_in_flight() {
        let controller = controller();
        let members: Vec<TaskId> = (0..2).map(|_| TaskId::new()).collect();
        let token = controller.issue(TokenScope::Batch {
            batch_id: BatchId::new(),
            members: members.clone(),
        });

        let lease = controller.abort_task(&members[0]).unwrap();
        assert_eq!(lease.token_id, token.id());
        assert!(!token.is_aborted());
        assert_eq!(controller.active_count(), 1);
        assert!(controller.abort_task(&members[0]).is_none());

        controller.abort_task(&members[1]);
        assert!(token.is_aborted());
        assert_eq!(controller.active_count(), 0);
    }

    #[test]
    fn test_abort_all_reaches_quiescence() {
        let controller = controller();
        let tokens: Vec<RequestToken> = (0..5)
            .map(|_| controller.issue(TokenScope::Individual(TaskId::new())))
            .collect();

        let retired = controller.abort_all();
        assert_eq!(retired.len(), 5);
        assert_eq!(controller.active_count(), 0);
        assert!(tokens.iter().all(RequestToken::is_aborted));

        // 完成路径随后到达，退役为空操作
        for (token, lease) in tokens.iter().zip(&retired) {
            assert!(!controller.retire_lease(&lease.task_id, token));
        }
        assert!(controller.abort_all().is_empty());
    }
}
