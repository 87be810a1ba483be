//! 应用层 - 命令（写操作）
//!
//! CQRS 命令侧：处理所有写操作

mod analysis_commands;
mod clarification_commands;
mod task_commands;

pub mod handlers;

pub use analysis_commands::*;
pub use clarification_commands::*;
pub use task_commands::*;
