//! Domain Layer - 领域层
//!
//! 包含两个限界上下文:
//! - Task Context: 分析任务及其生命周期
//! - Analysis Context: 远程分析结果的归一化形状

pub mod analysis;
pub mod task;
