//! HTTP Layer - RESTful API + WebSocket
//!
//! 任务、分析、澄清三组 JSON 接口与一个事件 WebSocket

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;

pub use error::ApiError;
pub use routes::create_routes;
pub use server::{build_router, HttpServer};
pub use state::AppState;
