// src/handlers/tasks.rs
//! Task query endpoints - single task and full listing

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde_json::json;
use std::sync::Arc;

use crate::tasks::TaskId;
use crate::AppState;

/// GET /api/tasks/:task_id - full task record including steps
pub async fn get_task(
    Path(task_id): Path<TaskId>,
    Extension(state): Extension<Arc<AppState>>,
) -> impl IntoResponse {
    match state.task_store.get(task_id).await {
        Some(task) => (StatusCode::OK, Json(task)).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Task not found" })),
        )
            .into_response(),
    }
}

/// GET /api/tasks - every task, in creation order
pub async fn get_all_tasks(Extension(state): Extension<Arc<AppState>>) -> impl IntoResponse {
    let tasks = state.task_store.list().await;
    (StatusCode::OK, Json(tasks)).into_response()
}

pub fn task_routes() -> Router {
    Router::new()
        .route("/api/tasks/:task_id", get(get_task))
        .route("/api/tasks", get(get_all_tasks))
}
