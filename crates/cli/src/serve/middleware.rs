//! Request middleware: per-IP rate limiting and optional API-key auth.

use std::sync::Arc;

use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;

use super::state::AppState;

pub(crate) async fn rate_limit_middleware(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<std::net::SocketAddr>,
    request: Request<axum::body::Body>,
    next: Next,
) -> Response {
    if let Err(retry_after) = state.rate_limiter.check(addr.ip()).await {
        let body = serde_json::json!({
            "error": "rate limit exceeded",
            "retry_after": retry_after,
        });
        return (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
    }
    next.run(request).await
}

/// The key a request presented, via `Authorization: Bearer <key>` or
/// `X-API-Key: <key>`.
fn presented_key(headers: &HeaderMap) -> Option<&str> {
    if let Some(auth) = headers.get("authorization").and_then(|v| v.to_str().ok()) {
        if let Some(token) = auth.strip_prefix("Bearer ") {
            return Some(token);
        }
    }
    headers.get("x-api-key").and_then(|v| v.to_str().ok())
}

/// When `SIGNET_API_KEY` is configured, reject unauthenticated requests
/// with 401 and wrong-key requests with 403. /health stays open so load
/// balancers can probe it.
pub(crate) async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    request: Request<axum::body::Body>,
    next: Next,
) -> Response {
    let expected = match &state.api_key {
        Some(k) => k.as_str(),
        None => return next.run(request).await,
    };
    if request.uri().path() == "/health" {
        return next.run(request).await;
    }

    match presented_key(request.headers()) {
        Some(key) if key == expected => next.run(request).await,
        Some(_) => super::json_error(StatusCode::FORBIDDEN, "invalid API key").into_response(),
        None => {
            super::json_error(StatusCode::UNAUTHORIZED, "authentication required").into_response()
        }
    }
}
