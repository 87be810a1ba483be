//! HTTP Server
//!
//! 先绑定端口再开始服务：绑定失败在启动阶段暴露，测试可用端口 0 取得实际地址。
//! 停止信号到达后不再接收新连接；在途分析由调用方通过编排器关闭

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::{middleware, Router};
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::middleware::request_logging_middleware;
use super::routes::create_routes;
use super::state::AppState;
use crate::config::ServerConfig;

/// 请求体上限，只承载任务文本与澄清回答
const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// 浏览器缓存预检结果的时长
const CORS_MAX_AGE: Duration = Duration::from_secs(3600);

/// 完整的应用 Router（路由 + 中间件 + 状态）
pub fn build_router(state: Arc<AppState>) -> Router {
    create_routes()
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(middleware::from_fn(request_logging_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer())
        .with_state(state)
}

/// UI 与服务不同源，放开所有来源
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .max_age(CORS_MAX_AGE)
}

/// 已绑定端口的 HTTP 服务器
pub struct HttpServer {
    listener: TcpListener,
    router: Router,
}

impl HttpServer {
    pub async fn bind(config: &ServerConfig, state: AppState) -> io::Result<Self> {
        let listener = TcpListener::bind(config.addr()).await?;
        Ok(Self {
            listener,
            router: build_router(Arc::new(state)),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// 服务直到 `shutdown` 完成
    pub async fn serve<F>(self, shutdown: F) -> io::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let addr = self.local_addr()?;
        tracing::info!(addr = %addr, "HTTP server listening");

        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!(addr = %addr, "HTTP server stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode};
    use tokio::sync::oneshot;
    use tower::util::ServiceExt;

    fn router() -> Router {
        build_router(Arc::new(AppState::with_fake_service(Duration::from_millis(5))))
    }

    #[tokio::test]
    async fn test_serves_until_shutdown() {
        let config = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        };
        let state = AppState::with_fake_service(Duration::from_millis(5));
        let server = HttpServer::bind(&config, state).await.unwrap();
        let addr = server.local_addr().unwrap();
        assert_ne!(addr.port(), 0);

        let (stop, stopped) = oneshot::channel::<()>();
        let serving = tokio::spawn(server.serve(async move {
            let _ = stopped.await;
        }));

        let body: serde_json::Value = reqwest::get(format!("http://{}/api/ping", addr))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["errno"], 0);
        assert_eq!(body["data"]["status"], "ok");

        stop.send(()).unwrap();
        serving.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_bind_conflict_is_reported() {
        let first = HttpServer::bind(
            &ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
            },
            AppState::with_fake_service(Duration::from_millis(5)),
        )
        .await
        .unwrap();
        let taken = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: first.local_addr().unwrap().port(),
        };

        let second =
            HttpServer::bind(&taken, AppState::with_fake_service(Duration::from_millis(5))).await;
        assert!(second.is_err());
    }

    #[tokio::test]
    async fn test_oversized_body_is_rejected() {
        let text = "x".repeat(MAX_BODY_BYTES + 1);
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/task/create")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::json!({ "input_text": text }).to_string()))
            .unwrap();

        let response = router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_cors_preflight_allows_any_origin() {
        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/api/task/create")
            .header("origin", "http://localhost:3000")
            .header("access-control-request-method", "POST")
            .header("access-control-request-headers", "content-type")
            .body(Body::empty())
            .unwrap();

        let response = router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["access-control-allow-origin"], "*");
    }
}
