//! Command Handlers 实现
//!
//! 所有 CommandHandler 的具体实现

mod analysis_handlers;
mod clarification_handlers;
mod task_handlers;

pub use analysis_handlers::*;
pub use clarification_handlers::*;
pub use task_handlers::*;
