//! Analysis Adapter - 分析服务客户端实现

mod fake_analysis_client;
mod http_analysis_client;
mod wire;

pub use fake_analysis_client::{FakeAnalysisClient, FakeAnalysisClientConfig};
pub use http_analysis_client::*;
