//! Application Ports - 出站端口定义
//!
//! 定义应用层与基础设施层的抽象接口

mod analysis_service;
mod event_sink;
mod task_registry;

pub use analysis_service::{AnalysisError, AnalysisOutcome, AnalysisServicePort};
pub use event_sink::{EventSinkPort, OrchestratorEvent};
pub use task_registry::{RegistryError, TaskPatch, TaskRegistryPort};
