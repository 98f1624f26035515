use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::{AppState, bot, models::telegram::Update};

/// Telegram update endpoint. Well-formed updates always get `{"ok": true}` so
/// Telegram does not redeliver them; problems are logged and reported in chat.
pub async fn post_webhook(State(state): State<AppState>, body: Bytes) -> Response {
    let update: Update = match serde_json::from_slice(&body) {
        Ok(u) => u,
        Err(e) => {
            tracing::warn!(error = %e, "malformed update");
            return (StatusCode::BAD_REQUEST, Json(json!({ "ok": false }))).into_response();
        }
    };

    bot::handle_update(&state, update).await;

    (StatusCode::OK, Json(json!({ "ok": true }))).into_response()
}
