//! Global Banner - 全局横幅
//!
//! 仅用于影响整个当前操作的情况：用户触发的全局取消、批次整体传输失败

use std::sync::{Arc, Mutex};

use crate::application::ports::{EventSinkPort, OrchestratorEvent};

pub struct GlobalBanner {
    message: Mutex<Option<String>>,
    events: Arc<dyn EventSinkPort>,
}

impl GlobalBanner {
    pub fn new(events: Arc<dyn EventSinkPort>) -> Self {
        Self {
            message: Mutex::new(None),
            events,
        }
    }

    pub fn show(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::info!(message = %message, "Global banner shown");
        self.replace(Some(message));
    }

    pub fn clear(&self) {
        self.replace(None);
    }

    pub fn current(&self) -> Option<String> {
        self.message
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn replace(&self, message: Option<String>) {
        *self
            .message
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = message.clone();
        self.events
            .publish(OrchestratorEvent::BannerChanged { message });
    }
}
