//! Analysis Handlers
//!
//! 提交立即返回，结果通过 `/ws/events` 推送

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::application::commands::handlers::{CancelResponse, SubmitResponse};
use crate::application::queries::handlers::AnalysisStatusResponse;
use crate::application::{
    CancelAll, CancelAnalysis, ClearBanner, GetAnalysisStatus, SubmitAnalysis, SubmitBatch,
};
use crate::infrastructure::http::dto::{ApiResponse, Empty, SubmitBatchRequest, TaskIdRequest};
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::state::AppState;

pub async fn submit_analysis(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TaskIdRequest>,
) -> Result<Json<ApiResponse<SubmitResponse>>, ApiError> {
    let response = state
        .submit_analysis_handler
        .handle(SubmitAnalysis { task_id: req.id })
        .await?;
    Ok(Json(ApiResponse::success(response)))
}

pub async fn submit_batch(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SubmitBatchRequest>,
) -> Result<Json<ApiResponse<SubmitResponse>>, ApiError> {
    let response = state
        .submit_batch_handler
        .handle(SubmitBatch { task_ids: req.ids })
        .await?;
    Ok(Json(ApiResponse::success(response)))
}

pub async fn cancel_analysis(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TaskIdRequest>,
) -> Result<Json<ApiResponse<CancelResponse>>, ApiError> {
    let response = state
        .cancel_analysis_handler
        .handle(CancelAnalysis { task_id: req.id })
        .await?;
    Ok(Json(ApiResponse::success(response)))
}

pub async fn cancel_all(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<CancelResponse>>, ApiError> {
    let response = state.cancel_all_handler.handle(CancelAll).await?;
    Ok(Json(ApiResponse::success(response)))
}

pub async fn analysis_status(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<AnalysisStatusResponse>>, ApiError> {
    let response = state
        .get_analysis_status_handler
        .handle(GetAnalysisStatus)
        .await?;
    Ok(Json(ApiResponse::success(response)))
}

pub async fn clear_banner(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Empty>>, ApiError> {
    state.clear_banner_handler.handle(ClearBanner).await?;
    Ok(Json(ApiResponse::ok()))
}
