use axum::{
    extract::State,
    http::{HeaderMap, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::AppState;

pub const SECRET_HEADER: &str = "X-Telegram-Bot-Api-Secret-Token";

fn secret_matches(headers: &HeaderMap, expected: &str) -> bool {
    headers
        .get(SECRET_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|v| v == expected)
        .unwrap_or(false)
}

/// Rejects webhook calls without the configured secret token. Other paths pass.
pub async fn require_webhook_secret(
    State(state): State<AppState>,
    req: Request<axum::body::Body>,
    next: Next,
) -> Response {
    let Some(expected) = state.settings.webhook_secret.as_deref() else {
        return next.run(req).await;
    };

    if req.uri().path() != "/webhook" || secret_matches(req.headers(), expected) {
        return next.run(req).await;
    }

    tracing::warn!("webhook call with missing or wrong secret token");
    StatusCode::UNAUTHORIZED.into_response()
}
