//! Memory Layer - In-Memory State Management
//!
//! 实现 TaskRegistry，任务状态只保存在内存中

mod task_registry;

pub use task_registry::InMemoryTaskRegistry;
