use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;

use crate::AppState;

pub async fn home() -> impl IntoResponse {
    (StatusCode::OK, "AngelBot attivo")
}

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

pub async fn status(State(state): State<AppState>) -> impl IntoResponse {
    let data = state.store.load().await;

    Json(json!({
        "status": "ok",
        "users": data.users.len(),
        "watches": data.watch_count(),
    }))
}

pub async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "not found")
}
