//! Configuration Types
//!
//! 定义所有配置结构体

use serde::Deserialize;
use std::time::Duration;

use crate::application::OrchestratorConfig;

/// 应用主配置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// 服务器配置
    #[serde(default)]
    pub server: ServerConfig,

    /// 远程分析服务配置
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,
}

/// 服务器配置
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// 监听地址
    #[serde(default = "default_host")]
    pub host: String,

    /// 监听端口
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5070
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerConfig {
    /// 获取服务器地址
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// 远程分析服务配置
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisConfig {
    /// 分析服务基础 URL
    #[serde(default = "default_analysis_url")]
    pub url: String,

    /// 单个远程调用的超时（秒）
    #[serde(default = "default_analysis_timeout")]
    pub timeout_secs: u64,

    /// 失败消息包含其中任一子串时视为限流
    #[serde(default = "default_rate_limit_markers")]
    pub rate_limit_markers: Vec<String>,

    /// 限流时展示给用户的固定消息
    #[serde(default = "default_rate_limit_message")]
    pub rate_limit_message: String,

    /// 使用进程内的 fake 分析服务（无需后端）
    #[serde(default)]
    pub fake: bool,

    /// fake 服务的模拟延迟（毫秒）
    #[serde(default = "default_fake_delay_ms")]
    pub fake_delay_ms: u64,
}

fn default_analysis_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_analysis_timeout() -> u64 {
    300
}

fn default_rate_limit_markers() -> Vec<String> {
    OrchestratorConfig::default().rate_limit_markers
}

fn default_rate_limit_message() -> String {
    OrchestratorConfig::default().rate_limit_message
}

fn default_fake_delay_ms() -> u64 {
    500
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            url: default_analysis_url(),
            timeout_secs: default_analysis_timeout(),
            rate_limit_markers: default_rate_limit_markers(),
            rate_limit_message: default_rate_limit_message(),
            fake: false,
            fake_delay_ms: default_fake_delay_ms(),
        }
    }
}

impl AnalysisConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// 编排器配置
    pub fn orchestrator(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            request_timeout: self.timeout(),
            rate_limit_markers: self.rate_limit_markers.clone(),
            rate_limit_message: self.rate_limit_message.clone(),
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: String,

    /// 是否启用 JSON 格式
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.addr(), "0.0.0.0:5070");
        assert_eq!(config.analysis.url, "http://localhost:8000");
        assert_eq!(config.analysis.timeout_secs, 300);
        assert!(!config.analysis.fake);
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn test_orchestrator_config_follows_analysis_section() {
        let analysis = AnalysisConfig {
            timeout_secs: 45,
            rate_limit_markers: vec!["slow down".to_string()],
            ..AnalysisConfig::default()
        };
        let orchestrator = analysis.orchestrator();
        assert_eq!(orchestrator.request_timeout, Duration::from_secs(45));
        assert_eq!(orchestrator.rate_limit_markers, vec!["slow down".to_string()]);
        assert_eq!(orchestrator.rate_limit_message, analysis.rate_limit_message);
    }
}
