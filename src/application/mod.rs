//! 应用层 - 用例编排
//!
//! 包含：
//! - ports: 六边形架构端口定义（AnalysisService、TaskRegistry、EventSink）
//! - orchestrator: 并发分析编排（调度、取消、合并、澄清队列）
//! - commands: CQRS 命令及处理器
//! - queries: CQRS 查询及处理器
//! - error: 应用层错误定义

pub mod commands;
pub mod error;
pub mod orchestrator;
pub mod ports;
pub mod queries;

// Re-exports
pub use commands::{
    // Task commands
    CreateTask,
    EditTask,
    RemoveTask,
    SelectCode,
    // Analysis commands
    CancelAll,
    CancelAnalysis,
    ClearBanner,
    SubmitAnalysis,
    SubmitBatch,
    // Clarification commands
    DismissClarification,
    ReopenClarification,
    ResolveClarification,
    // Handlers
    handlers::{
        CancelAllHandler, CancelAnalysisHandler, ClearBannerHandler, CreateTaskHandler,
        DismissClarificationHandler, EditTaskHandler, ReopenClarificationHandler, RemoveTaskHandler,
        ResolveClarificationHandler, SelectCodeHandler, SubmitAnalysisHandler, SubmitBatchHandler,
    },
};

pub use error::ApplicationError;

pub use orchestrator::{AnalysisOrchestrator, CancellationController, OrchestratorConfig};

pub use ports::{
    // Analysis service
    AnalysisError,
    AnalysisOutcome,
    AnalysisServicePort,
    // Event sink
    EventSinkPort,
    OrchestratorEvent,
    // Task registry
    RegistryError,
    TaskPatch,
    TaskRegistryPort,
};

pub use queries::{
    GetAnalysisStatus,
    GetCurrentClarification,
    GetTask,
    ListTasks,
    TaskView,
    // Handlers
    handlers::{
        GetAnalysisStatusHandler, GetCurrentClarificationHandler, GetTaskHandler,
        ListTasksHandler,
    },
};
