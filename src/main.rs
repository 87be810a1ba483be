//! CodeLens - 并发文本分析编排服务

use std::sync::Arc;
use std::time::Duration;

use codelens::application::{
    AnalysisOrchestrator, AnalysisServicePort, CancellationController, TaskRegistryPort,
};
use codelens::config::{load_config, print_config, AppConfig};
use codelens::infrastructure::adapters::{
    FakeAnalysisClient, FakeAnalysisClientConfig, HttpAnalysisClient, HttpAnalysisClientConfig,
};
use codelens::infrastructure::events::EventPublisher;
use codelens::infrastructure::http::{AppState, HttpServer};
use codelens::infrastructure::memory::InMemoryTaskRegistry;

fn init_tracing(config: &AppConfig) {
    let log_filter = format!(
        "{},codelens={},tower_http=debug",
        config.log.level, config.log.level
    );
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_filter));

    if config.log.json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn analysis_service(config: &AppConfig) -> anyhow::Result<Arc<dyn AnalysisServicePort>> {
    if config.analysis.fake {
        return Ok(Arc::new(FakeAnalysisClient::new(FakeAnalysisClientConfig {
            delay: Duration::from_millis(config.analysis.fake_delay_ms),
        })));
    }

    let client_config = HttpAnalysisClientConfig::new(&config.analysis.url)
        .with_timeout(config.analysis.timeout_secs);
    let client = HttpAnalysisClient::new(client_config)
        .map_err(|e| anyhow::anyhow!("Failed to create analysis client: {}", e))?;
    Ok(Arc::new(client))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 加载配置（优先级：环境变量 > 配置文件 > 默认值）
    let config = load_config().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

    init_tracing(&config);

    tracing::info!("CodeLens - 并发文本分析编排服务");
    print_config(&config);

    let service = analysis_service(&config)?;
    if !config.analysis.fake && !service.health_check().await {
        tracing::warn!(url = %config.analysis.url, "Analysis service is not reachable yet");
    }

    // 事件发布器 → 取消控制器 → 任务注册表 → 编排器
    let event_publisher = EventPublisher::new().arc();
    let cancellation = Arc::new(CancellationController::new(event_publisher.clone()));
    let registry: Arc<dyn TaskRegistryPort> =
        InMemoryTaskRegistry::new(cancellation.clone()).arc();
    let orchestrator = AnalysisOrchestrator::new(
        config.analysis.orchestrator(),
        registry,
        cancellation,
        service,
        event_publisher.clone(),
    );

    let state = AppState::new(orchestrator.clone(), event_publisher);
    let server = HttpServer::bind(&config.server, state).await?;

    // 收到 ctrl-c 后停止接收请求，再关闭编排器
    server
        .serve(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
            tracing::info!("Received shutdown signal");
        })
        .await?;

    orchestrator.shutdown();
    tracing::info!(
        active = orchestrator.cancellation.active_count(),
        "Server shutdown complete"
    );

    Ok(())
}
