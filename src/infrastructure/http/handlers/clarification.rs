//! Clarification Handlers

use axum::{extract::State, Json};
use std::collections::HashMap;
use std::sync::Arc;

use crate::application::commands::handlers::{DismissResponse, ResolveResponse};
use crate::application::orchestrator::ClarificationRequest;
use crate::application::{
    DismissClarification, GetCurrentClarification, ReopenClarification, ResolveClarification,
};
use crate::infrastructure::http::dto::{
    ApiResponse, Empty, ResolveClarificationRequest, TaskIdRequest,
};
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::state::AppState;

/// 当前展示的澄清请求，没有时 `data` 为 null
pub async fn current_clarification(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Option<ClarificationRequest>>>, ApiError> {
    let request = state
        .get_current_clarification_handler
        .handle(GetCurrentClarification)
        .await?;
    Ok(Json(ApiResponse::success(request)))
}

pub async fn resolve_clarification(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ResolveClarificationRequest>,
) -> Result<Json<ApiResponse<ResolveResponse>>, ApiError> {
    // 同一记录出现多次时合并其回答
    let mut answers: HashMap<_, Vec<_>> = HashMap::new();
    for record in req.records {
        answers.entry(record.record_id).or_default().extend(record.answers);
    }

    let response = state
        .resolve_clarification_handler
        .handle(ResolveClarification { answers })
        .await?;
    Ok(Json(ApiResponse::success(response)))
}

pub async fn dismiss_clarification(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<DismissResponse>>, ApiError> {
    let response = state
        .dismiss_clarification_handler
        .handle(DismissClarification)
        .await?;
    Ok(Json(ApiResponse::success(response)))
}

pub async fn reopen_clarification(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TaskIdRequest>,
) -> Result<Json<ApiResponse<Empty>>, ApiError> {
    state
        .reopen_clarification_handler
        .handle(ReopenClarification { task_id: req.id })
        .await?;
    Ok(Json(ApiResponse::ok()))
}
