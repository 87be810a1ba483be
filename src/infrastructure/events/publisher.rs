//! Event Publisher Implementation
//!
//! 编排事件广播，WebSocket 连接各自订阅

use std::sync::Arc;
use tokio::sync::broadcast;

use crate::application::ports::{EventSinkPort, OrchestratorEvent};

/// 默认广播容量
const DEFAULT_CAPACITY: usize = 256;

/// 事件发布器
pub struct EventPublisher {
    channel: broadcast::Sender<OrchestratorEvent>,
}

impl EventPublisher {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { channel: tx }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// 订阅编排事件
    pub fn subscribe(&self) -> broadcast::Receiver<OrchestratorEvent> {
        self.channel.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.channel.receiver_count()
    }
}

impl EventSinkPort for EventPublisher {
    fn publish(&self, event: OrchestratorEvent) {
        if let Err(e) = self.channel.send(event) {
            tracing::trace!(error = %e, "Event dropped (no receivers)");
        }
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new()
    }
}
