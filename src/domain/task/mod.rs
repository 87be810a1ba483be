//! Task Context - 分析任务限界上下文
//!
//! 职责:
//! - 任务聚合（输入文本、状态、结果、错误、选择）
//! - 状态迁移规则
//! - 澄清状态

mod entity;
mod errors;
mod value_objects;

pub use entity::Task;
pub use errors::TaskError;
pub use value_objects::{
    BatchId, ClarificationState, CodeSelection, SelectionDecision, TaskId, TaskStatus,
};
