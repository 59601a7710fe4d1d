//! Authentication middleware for admin endpoints

use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use tracing::info;

use crate::state::AppState;

pub const METRICS_TOKEN_HEADER: &str = "x-metrics-token";

/// Reject requests whose metrics token is missing or wrong. With no token
/// configured every request is rejected.
pub async fn require_metrics_token(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(expected) = app_state.config.metrics_auth_token.as_deref() else {
        info!("{} - rejected, no metrics token configured", request.uri().path());
        return Err(StatusCode::UNAUTHORIZED);
    };

    match extract_metrics_token(&headers) {
        Some(token) if token == expected => Ok(next.run(request).await),
        _ => {
            info!("{} - rejected, invalid metrics token", request.uri().path());
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}

/// Extract the metrics token header, if present and valid UTF-8
pub fn extract_metrics_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(METRICS_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
}
