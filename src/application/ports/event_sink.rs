//! Event Sink Port - 编排事件出站端口
//!
//! 编排器在每次可见状态变化后发布事件，UI 据此刷新

use serde::Serialize;

use crate::application::orchestrator::ClarificationRequest;
use crate::application::queries::TaskView;
use crate::domain::task::TaskId;

/// 编排事件
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data")]
pub enum OrchestratorEvent {
    /// 任务快照变更
    TaskChanged { task: TaskView },
    /// 任务被移除
    TaskRemoved { task_id: TaskId },
    /// 活动请求数变更
    ActiveCountChanged { active: usize },
    /// 展示新的澄清请求
    ClarificationPresented { request: ClarificationRequest },
    /// 当前澄清请求已关闭
    ClarificationCleared { request_id: u64 },
    /// 全局横幅变更
    BannerChanged {
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
}

/// Event Sink Port
pub trait EventSinkPort: Send + Sync {
    fn publish(&self, event: OrchestratorEvent);
}
