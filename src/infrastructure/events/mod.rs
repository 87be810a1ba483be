//! Events - 编排事件广播

mod publisher;

pub use publisher::EventPublisher;
