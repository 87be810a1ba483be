//! HTTP Routes
//!
//! API Endpoints:
//! - /api/ping                     GET   健康检查
//! - /api/task/create              POST  新建任务
//! - /api/task/remove              POST  移除任务（中止其进行中的分析）
//! - /api/task/edit                POST  修改输入文本（仅未提交的任务）
//! - /api/task/get                 POST  获取任务
//! - /api/task/list                GET   按创建顺序列出任务
//! - /api/task/select              POST  接受/拒绝/清除编码
//! - /api/analysis/submit          POST  提交单个任务
//! - /api/analysis/batch           POST  批量提交
//! - /api/analysis/cancel          POST  取消单个任务
//! - /api/analysis/cancel_all      POST  取消全部
//! - /api/analysis/status          GET   未结算计数与横幅
//! - /api/analysis/clear_banner    POST  清除横幅
//! - /api/clarification/current    GET   当前展示的澄清请求
//! - /api/clarification/resolve    POST  提交澄清回答
//! - /api/clarification/dismiss    POST  关闭当前澄清请求
//! - /api/clarification/reopen     POST  重新打开任务的澄清
//! - /ws/events                    WS    编排事件流

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use super::handlers;
use super::state::AppState;

/// 创建所有路由
pub fn create_routes() -> Router<Arc<AppState>> {
    Router::new()
        .nest("/api", api_routes())
        .route("/ws/events", get(handlers::events_websocket_handler))
}

/// API 路由
fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/ping", get(handlers::ping))
        .nest("/task", task_routes())
        .nest("/analysis", analysis_routes())
        .nest("/clarification", clarification_routes())
}

/// Task 路由
fn task_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/create", post(handlers::create_task))
        .route("/remove", post(handlers::remove_task))
        .route("/edit", post(handlers::edit_task))
        .route("/get", post(handlers::get_task))
        .route("/list", get(handlers::list_tasks))
        .route("/select", post(handlers::select_code))
}

/// Analysis 路由
fn analysis_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/submit", post(handlers::submit_analysis))
        .route("/batch", post(handlers::submit_batch))
        .route("/cancel", post(handlers::cancel_analysis))
        .route("/cancel_all", post(handlers::cancel_all))
        .route("/status", get(handlers::analysis_status))
        .route("/clear_banner", post(handlers::clear_banner))
}

/// Clarification 路由
fn clarification_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/current", get(handlers::current_clarification))
        .route("/resolve", post(handlers::resolve_clarification))
        .route("/dismiss", post(handlers::dismiss_clarification))
        .route("/reopen", post(handlers::reopen_clarification))
}
