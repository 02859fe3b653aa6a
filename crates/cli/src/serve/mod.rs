//! `signet serve` -- HTTP JSON API server for the document engine.
//!
//! Exposes the engine as an async HTTP service using `axum` + `tokio`,
//! backed by the in-memory store. Supports concurrent request handling;
//! conflicting commits surface as 409 with `retryable: true`.
//!
//! Hardening: permissive CORS for local development, per-IP rate limiting
//! (default 60 req/min, `SIGNET_RATE_LIMIT`), and optional API-key auth
//! (`SIGNET_API_KEY`; /health stays open).
//!
//! Endpoints:
//! - GET  /health                        - Server status (exempt from auth)
//! - POST /documents                     - Create a document
//! - GET  /documents                     - List document ids
//! - GET  /documents/{id}                - Folded read view
//! - GET  /documents/{id}/audit          - Audit log with chain verification
//! - GET  /documents/{id}/changes        - Long-poll for the next commit
//! - POST /documents/{id}/operations     - Commit one mutation
//!
//! All responses use Content-Type: application/json.

mod handlers;
mod middleware;
mod state;

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{Method, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{middleware as axum_middleware, Json, Router};
use tower_http::cors::{Any, CorsLayer};

use signet_engine::{DocumentEngine, StaticDirectory};
use signet_storage::MemoryStore;

use self::handlers::{
    handle_changes, handle_create_document, handle_get_audit, handle_get_document, handle_health,
    handle_list_documents, handle_not_found, handle_operation,
};
use self::middleware::{auth_middleware, rate_limit_middleware};
use self::state::{AppState, RateLimiter};

/// Maximum request body size: 1 MB.
const MAX_BODY_SIZE: usize = 1024 * 1024;

/// Default rate limit: 60 requests per minute per IP.
const DEFAULT_RATE_LIMIT: u64 = 60;

/// Rate limit window duration in seconds (1 minute).
const RATE_LIMIT_WINDOW_SECS: u64 = 60;

/// JSON error body with the given status code.
fn json_error(status: StatusCode, message: &str) -> impl IntoResponse {
    (status, Json(serde_json::json!({"error": message})))
}

/// Load the document directory from a JSON file mapping references to
/// display names, e.g. `{"SOP-042": "Cleaning SOP"}`.
fn load_directory(path: &PathBuf) -> Result<StaticDirectory, Box<dyn std::error::Error>> {
    let text = std::fs::read_to_string(path)?;
    let entries: std::collections::BTreeMap<String, String> = serde_json::from_str(&text)?;
    let count = entries.len();
    let mut directory = StaticDirectory::new();
    for (reference, display_name) in entries {
        directory = directory.with_entry(reference, display_name);
    }
    eprintln!("Loaded {} directory entries from {}", count, path.display());
    Ok(directory)
}

/// Start the HTTP server on the given port, optionally loading a document
/// directory for `link_document` resolution.
pub async fn start_server(
    port: u16,
    directory_path: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let directory = match &directory_path {
        Some(path) => load_directory(path)?,
        None => StaticDirectory::new(),
    };

    let rate_limit = std::env::var("SIGNET_RATE_LIMIT")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(DEFAULT_RATE_LIMIT);

    let api_key = std::env::var("SIGNET_API_KEY")
        .ok()
        .filter(|k| !k.is_empty());

    if api_key.is_some() {
        eprintln!("API key authentication enabled");
    }
    eprintln!("Rate limit: {} requests per minute per IP", rate_limit);

    let engine = DocumentEngine::new(Arc::new(MemoryStore::new()), Arc::new(directory));

    let state = Arc::new(AppState {
        engine,
        rate_limiter: RateLimiter::new(rate_limit),
        api_key,
    });

    // Permissive CORS; this is a local development surface.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    let app = Router::new()
        .route("/health", get(handle_health))
        .route("/documents", post(handle_create_document))
        .route("/documents", get(handle_list_documents))
        .route("/documents/{id}", get(handle_get_document))
        .route("/documents/{id}/audit", get(handle_get_audit))
        .route("/documents/{id}/changes", get(handle_changes))
        .route("/documents/{id}/operations", post(handle_operation))
        .fallback(handle_not_found)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .layer(cors)
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
        .with_state(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    eprintln!("Signet document engine listening on http://0.0.0.0:{}", port);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    eprintln!("\nServer shut down.");
    Ok(())
}

/// Wait for a shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        eprintln!("warning: failed to install Ctrl+C handler");
        return;
    }
    eprintln!("\nReceived shutdown signal...");
}
