//! CodeLens - 并发文本分析编排服务
//!
//! 架构设计: DDD + CQRS + Hexagonal Architecture
//!
//! 领域层 (domain/):
//! - Task Context: 分析任务及其生命周期
//! - Analysis Context: 归一化的分析结果
//!
//! 应用层 (application/):
//! - Ports: 端口定义（AnalysisService, TaskRegistry, EventSink）
//! - Orchestrator: 调度、取消、合并与澄清队列
//! - Commands / Queries: CQRS 处理器
//!
//! 基础设施层 (infrastructure/):
//! - HTTP: RESTful API + WebSocket
//! - Memory: TaskRegistry 内存实现
//! - Adapters: HTTP / Fake 分析客户端
//! - Events: 事件广播

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::{load_config, AppConfig};
