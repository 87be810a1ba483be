//! Configuration Loader
//!
//! 实现多源配置加载与合并逻辑
//!
//! 优先级（从高到低）：
//! 1. 环境变量
//! 2. 配置文件（config.toml）
//! 3. 默认值

use config::{Config, ConfigError as ConfigCrateError, Environment, File};
use std::path::Path;
use thiserror::Error;

use super::types::AppConfig;

/// 配置加载错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigCrateError> for ConfigError {
    fn from(err: ConfigCrateError) -> Self {
        ConfigError::LoadError(err.to_string())
    }
}

/// 配置文件搜索路径
const CONFIG_FILE_NAMES: &[&str] = &["config", "config.local"];

/// 加载应用配置
///
/// 按优先级从高到低合并配置：
/// 1. 环境变量（前缀 `CODELENS_`，层级分隔符 `__`）
/// 2. 配置文件（config.toml 或 config.local.toml）
/// 3. 默认值
///
/// # 环境变量示例
/// - `CODELENS_SERVER__PORT=8080`
/// - `CODELENS_ANALYSIS__URL=http://analysis:8000`
/// - `CODELENS_ANALYSIS__FAKE=true`
/// - `CODELENS_ANALYSIS__RATE_LIMIT_MARKERS=rate limit,quota`
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from_path(None)
}

/// 从指定路径加载配置
///
/// # 参数
/// - `config_path` - 可选的配置文件路径，如果为 None 则使用默认搜索路径
pub fn load_config_from_path(config_path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let defaults = AppConfig::default();
    let mut builder = Config::builder();

    // 1. 默认值（最低优先级）
    builder = builder
        .set_default("server.host", defaults.server.host)?
        .set_default("server.port", i64::from(defaults.server.port))?
        .set_default("analysis.url", defaults.analysis.url)?
        .set_default("analysis.timeout_secs", defaults.analysis.timeout_secs as i64)?
        .set_default("analysis.rate_limit_markers", defaults.analysis.rate_limit_markers)?
        .set_default("analysis.rate_limit_message", defaults.analysis.rate_limit_message)?
        .set_default("analysis.fake", defaults.analysis.fake)?
        .set_default("analysis.fake_delay_ms", defaults.analysis.fake_delay_ms as i64)?
        .set_default("log.level", defaults.log.level)?
        .set_default("log.json", defaults.log.json)?;

    // 2. 配置文件
    if let Some(path) = config_path {
        builder = builder.add_source(File::from(path).required(true));
    } else {
        for name in CONFIG_FILE_NAMES {
            builder = builder.add_source(File::with_name(name).required(false));
        }
    }

    // 3. 环境变量（最高优先级），标记列表以逗号分隔
    builder = builder.add_source(
        Environment::with_prefix("CODELENS")
            .prefix_separator("_")
            .separator("__")
            .list_separator(",")
            .with_list_parse_key("analysis.rate_limit_markers")
            .try_parsing(true),
    );

    let config = builder.build()?;

    let app_config: AppConfig = config.try_deserialize().map_err(|e| {
        ConfigError::ParseError(format!("Failed to deserialize config: {}", e))
    })?;

    validate_config(&app_config)?;

    Ok(app_config)
}

/// 验证配置有效性
fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "Server port cannot be 0".to_string(),
        ));
    }

    // fake 模式不访问远程服务，但仍要求 URL 以便切换
    if config.analysis.url.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "Analysis URL cannot be empty".to_string(),
        ));
    }

    if config.analysis.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "Analysis timeout cannot be 0".to_string(),
        ));
    }

    if config
        .analysis
        .rate_limit_markers
        .iter()
        .all(|marker| marker.trim().is_empty())
    {
        return Err(ConfigError::ValidationError(
            "At least one rate limit marker is required".to_string(),
        ));
    }

    Ok(())
}

/// 打印配置信息（用于启动时日志）
pub fn print_config(config: &AppConfig) {
    tracing::info!("=== Application Configuration ===");
    tracing::info!("Server: {}", config.server.addr());
    if config.analysis.fake {
        tracing::info!("Analysis: fake ({}ms delay)", config.analysis.fake_delay_ms);
    } else {
        tracing::info!("Analysis URL: {}", config.analysis.url);
    }
    tracing::info!("Analysis Timeout: {}s", config.analysis.timeout_secs);
    tracing::info!("Rate Limit Markers: {:?}", config.analysis.rate_limit_markers);
    tracing::info!("Log Level: {} (json: {})", config.log.level, config.log.json);
    tracing::info!("=================================");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_file_overrides_defaults() {
        let file = write_config(
            r#"
[server]
port = 9100

[analysis]
url = "http://analysis.internal:8000"
timeout_secs = 60
fake = true
"#,
        );

        let config = load_config_from_path(Some(file.path())).unwrap();
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.analysis.url, "http://analysis.internal:8000");
        assert_eq!(config.analysis.timeout_secs, 60);
        assert!(config.analysis.fake);
        assert_eq!(config.analysis.rate_limit_markers.len(), 4);
    }

    #[test]
    fn test_invalid_file_values_are_rejected() {
        let file = write_config("[analysis]\ntimeout_secs = 0\n");
        assert!(matches!(
            load_config_from_path(Some(file.path())),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_missing_explicit_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.toml");
        assert!(matches!(
            load_config_from_path(Some(&missing)),
            Err(ConfigError::LoadError(_))
        ));
    }

    #[test]
    fn test_validation_passes_for_valid_config() {
        assert!(validate_config(&AppConfig::default()).is_ok());
    }

    #[test]
    fn test_validation_error_for_zero_port() {
        let mut config = AppConfig::default();
        config.server.port = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validation_error_for_empty_url() {
        let mut config = AppConfig::default();
        config.analysis.url = "  ".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validation_error_for_empty_markers() {
        let mut config = AppConfig::default();
        config.analysis.rate_limit_markers.clear();
        assert!(validate_config(&config).is_err());
    }
}
