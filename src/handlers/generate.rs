// src/handlers/generate.rs
//! Submission endpoint - allocates a task and launches its pipeline

use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::post,
    Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub scene_description: Option<String>,
}

/// POST /api/generate-pov - start a generation task, return 202 immediately
pub async fn generate_pov(
    Extension(state): Extension<Arc<AppState>>,
    Json(request): Json<GenerateRequest>,
) -> impl IntoResponse {
    let scene_description = match request.scene_description {
        Some(s) if !s.trim().is_empty() => s,
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "Scene description is required" })),
            )
                .into_response();
        }
    };

    let task_id = state.task_store.create(&scene_description).await;
    state.workflow.clone().spawn(task_id);

    (
        StatusCode::ACCEPTED,
        Json(json!({
            "message": "POV generation started",
            "task_id": task_id,
        })),
    )
        .into_response()
}

pub fn generate_routes() -> Router {
    Router::new().route("/api/generate-pov", post(generate_pov))
}
