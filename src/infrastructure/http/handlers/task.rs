//! Task Handlers

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::application::{
    CreateTask, EditTask, GetTask, ListTasks, RemoveTask, SelectCode, TaskView,
};
use crate::infrastructure::http::dto::{
    ApiResponse, CreateTaskRequest, EditTaskRequest, Empty, SelectCodeRequest, TaskIdRequest,
};
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::state::AppState;

pub async fn create_task(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateTaskRequest>,
) -> Result<Json<ApiResponse<TaskView>>, ApiError> {
    let view = state
        .create_task_handler
        .handle(CreateTask {
            input_text: req.input_text,
        })
        .await?;
    Ok(Json(ApiResponse::success(view)))
}

pub async fn remove_task(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TaskIdRequest>,
) -> Result<Json<ApiResponse<Empty>>, ApiError> {
    state
        .remove_task_handler
        .handle(RemoveTask { task_id: req.id })
        .await?;
    Ok(Json(ApiResponse::ok()))
}

pub async fn edit_task(
    State(state): State<Arc<AppState>>,
    Json(req): Json<EditTaskRequest>,
) -> Result<Json<ApiResponse<TaskView>>, ApiError> {
    let view = state
        .edit_task_handler
        .handle(EditTask {
            task_id: req.id,
            input_text: req.input_text,
        })
        .await?;
    Ok(Json(ApiResponse::success(view)))
}

pub async fn get_task(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TaskIdRequest>,
) -> Result<Json<ApiResponse<TaskView>>, ApiError> {
    let view = state
        .get_task_handler
        .handle(GetTask { task_id: req.id })
        .await?;
    Ok(Json(ApiResponse::success(view)))
}

pub async fn list_tasks(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<TaskView>>>, ApiError> {
    let views = state.list_tasks_handler.handle(ListTasks).await?;
    Ok(Json(ApiResponse::success(views)))
}

/// 接受/拒绝/清除一个编码
pub async fn select_code(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SelectCodeRequest>,
) -> Result<Json<ApiResponse<TaskView>>, ApiError> {
    let view = state
        .select_code_handler
        .handle(SelectCode {
            task_id: req.id,
            code: req.code,
            decision: req.decision,
        })
        .await?;
    Ok(Json(ApiResponse::success(view)))
}
