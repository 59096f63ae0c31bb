// src/handlers/system.rs
//! Health probe and credential presence reporting

use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde_json::json;
use std::sync::Arc;

use crate::AppState;

/// GET /api/health
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// GET /api/credentials - which credentials are configured; values stay private
pub async fn get_credentials(Extension(state): Extension<Arc<AppState>>) -> impl IntoResponse {
    (StatusCode::OK, Json(state.credentials.report()))
}

/// POST /api/credentials - credentials are env-managed, nothing to write
pub async fn set_credentials() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "message": "Credentials are managed by environment variables in production."
        })),
    )
}

pub fn system_routes() -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/credentials", get(get_credentials).post(set_credentials))
}
