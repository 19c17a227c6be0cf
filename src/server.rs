//! HTTP ingestion front door.
//!
//! Accepts capture payloads from browser extensions and capture tools and
//! feeds them straight into the [`Pipeline`]. The body is the same shape as
//! a watcher capture file: a URL plus optional pre-rendered HTML and an
//! optional base64 screenshot.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/bookmark` | Ingest one bookmark payload |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "fetch_not_found", "message": "..." } }
//! ```
//!
//! The `code` is the stable pipeline error kind (`fetch_forbidden`,
//! `extraction_empty`, `summarization`, ...) or `bad_request` for payload
//! validation failures.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so browser extensions
//! can post captures cross-origin.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::error::{FetchError, PipelineError};
use crate::fingerprint::fingerprint;
use crate::models::IngestionRecord;
use crate::pipeline::Pipeline;

/// Shared application state passed to route handlers via Axum's `State`
/// extractor.
#[derive(Clone)]
struct AppState {
    pipeline: Arc<Pipeline>,
}

/// Starts the ingestion HTTP server.
///
/// Binds to the address configured in `[server].bind` and runs until the
/// process is terminated.
pub async fn run_server(config: &Config, pipeline: Arc<Pipeline>) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = router(pipeline).layer(cors);

    println!("Ingestion server listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Builds the route table. Split out so tests can serve it on an ephemeral
/// port.
pub fn router(pipeline: Arc<Pipeline>) -> Router {
    Router::new()
        .route("/api/bookmark", post(handle_bookmark))
        .route("/health", get(handle_health))
        .with_state(AppState { pipeline })
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    /// Machine-readable error code (e.g. `"bad_request"`, `"fetch_not_found"`).
    code: String,
    /// Human-readable error message.
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

/// Maps pipeline failures to HTTP statuses while keeping the stable error
/// kind as the response code. Only malformed input is a 4xx; every
/// processing exception is 5xx, with upstream page problems as 502 so the
/// client can tell "the target site failed" apart from "the pipeline is
/// broken".
fn classify_pipeline_error(err: PipelineError) -> AppError {
    let status = match &err {
        PipelineError::Fetch(FetchError::NotFound { .. })
        | PipelineError::Fetch(FetchError::Forbidden { .. })
        | PipelineError::Fetch(FetchError::ServerError { .. })
        | PipelineError::Fetch(FetchError::UnexpectedStatus { .. })
        | PipelineError::Fetch(FetchError::Transport { .. }) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    AppError {
        status,
        code: err.kind().to_string(),
        message: err.to_string(),
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    /// Always `"ok"` when the server is running.
    status: String,
    /// The crate version from `Cargo.toml`.
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ POST /api/bookmark ============

#[derive(Serialize)]
struct BookmarkResponse {
    status: String,
    fingerprint: String,
    markdown: String,
    filename: Option<String>,
    folder: Option<String>,
}

/// Handler for `POST /api/bookmark`.
///
/// Runs the full pipeline synchronously and responds once the note is on
/// disk. A repeated URL is a cheap cache hit, so clients may retry freely.
async fn handle_bookmark(
    State(state): State<AppState>,
    Json(record): Json<IngestionRecord>,
) -> Result<Json<BookmarkResponse>, AppError> {
    if record.url.trim().is_empty() {
        return Err(bad_request("url must not be empty"));
    }

    let markdown = state
        .pipeline
        .process(
            &record.url,
            record.html_content.as_deref(),
            record.screenshot.as_deref(),
        )
        .await
        .map_err(classify_pipeline_error)?;

    let fp = fingerprint(&record.url);
    let note = crate::records::find_note(state.pipeline.pool(), &fp)
        .await
        .map_err(|e| classify_pipeline_error(e.into()))?;

    Ok(Json(BookmarkResponse {
        status: "success".to_string(),
        fingerprint: fp,
        markdown,
        filename: note.as_ref().map(|n| n.filename.clone()),
        folder: note.map(|n| n.folder),
    }))
}
