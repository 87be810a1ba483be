//! 应用层 - 查询（读操作）
//!
//! CQRS 查询侧：处理所有读操作

mod analysis_queries;
mod task_queries;
mod views;

pub mod handlers;

pub use analysis_queries::*;
pub use task_queries::*;
pub use views::TaskView;
