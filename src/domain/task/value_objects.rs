//! Task Context - Value Objects

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// 任务唯一标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(Uuid);

impl TaskId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 批次标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchId(Uuid);

impl BatchId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for BatchId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for BatchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 任务状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// 尚未提交
    Idle,
    /// 等待远程结果
    Pending,
    /// 分析成功
    Succeeded,
    /// 分析失败
    Failed,
    /// 已取消
    Cancelled,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Idle => "idle",
            TaskStatus::Pending => "pending",
            TaskStatus::Succeeded => "succeeded",
            TaskStatus::Failed => "failed",
            TaskStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 澄清状态
///
/// 除 `None` 以外的状态都视为 clarification pending
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClarificationState {
    /// 无需澄清
    None,
    /// 等待展示
    Awaiting,
    /// 正在对话框中展示
    Presented,
    /// 用户关闭对话框，未回答
    Acknowledged,
    /// 回答提交失败
    Unresolved,
}

impl ClarificationState {
    pub fn is_pending(&self) -> bool {
        !matches!(self, ClarificationState::None)
    }

    /// 可由用户手动重新排队
    pub fn is_reopenable(&self) -> bool {
        matches!(
            self,
            ClarificationState::Acknowledged | ClarificationState::Unresolved
        )
    }
}

/// 用户对编码的决定
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionDecision {
    Accept,
    Deny,
    Clear,
}

/// 用户选择
///
/// 不变量: `accepted` 与 `denied` 互不相交
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeSelection {
    accepted: BTreeSet<String>,
    denied: BTreeSet<String>,
}

impl CodeSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// 以预选编码初始化 accepted
    pub fn preselected<'a>(codes: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            accepted: codes.into_iter().map(str::to_string).collect(),
            denied: BTreeSet::new(),
        }
    }

    pub fn apply(&mut self, code: &str, decision: SelectionDecision) {
        match decision {
            SelectionDecision::Accept => {
                self.denied.remove(code);
                self.accepted.insert(code.to_string());
            }
            SelectionDecision::Deny => {
                self.accepted.remove(code);
                self.denied.insert(code.to_string());
            }
            SelectionDecision::Clear => {
                self.accepted.remove(code);
                self.denied.remove(code);
            }
        }
    }

    pub fn accepted(&self) -> &BTreeSet<String> {
        &self.accepted
    }

    pub fn denied(&self) -> &BTreeSet<String> {
        &self.denied
    }

    pub fn is_empty(&self) -> bool {
        self.accepted.is_empty() && self.denied.is_empty()
    }
}
