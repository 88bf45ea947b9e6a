//! HTTP surface (feature `server`).
//!
//! | Route                | Success                         | Errors |
//! |----------------------|---------------------------------|--------|
//! | `POST /scan`         | `200 {"sha256": "<id>"}`        | `400 {"error": "File is empty"}`, `400 {"error": "Invalid file type"}` |
//! | `GET /lookup/{hash}` | `200 <PdfMetadataRecord JSON>`  | `404 {"error": "Metadata not found"}`, `400 {"error": "Invalid hash format"}` |
//! | `GET /health`        | `200 {"status": "ok", "stats": {..}}` | |
//!
//! `/scan` reads the multipart field `file`. `/lookup` takes the rest of the
//! path, percent-decoded, so a Base64 identifier containing `/` works whether
//! or not the client escaped it. `+` is kept literally.

use crate::error::ScanError;
use crate::ingest::{IngestStats, IngestionPipeline};
use crate::lookup::LookupService;
use crate::model::PdfMetadataRecord;
use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::PathRejection;
use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Listener settings for [`serve`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Default: `0.0.0.0:8080`.
    pub bind: SocketAddr,
    /// Largest accepted request body. Default: 64 MiB.
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 8080)),
            max_upload_bytes: 64 * 1024 * 1024,
        }
    }
}

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<IngestionPipeline>,
    pub lookup: LookupService,
}

// ── Response bodies ──────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct ScanResponse {
    pub sha256: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub stats: IngestStats,
}

/// Status code plus the `{"error": ..}` body.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl From<ScanError> for ApiError {
    fn from(e: ScanError) -> Self {
        match e {
            ScanError::EmptyPayload => Self::new(StatusCode::BAD_REQUEST, "File is empty"),
            ScanError::InvalidFileType { .. } => {
                Self::new(StatusCode::BAD_REQUEST, "Invalid file type")
            }
            ScanError::MalformedIdentifier { .. } => {
                Self::new(StatusCode::BAD_REQUEST, "Invalid hash format")
            }
            ScanError::PipelineClosed => {
                Self::new(StatusCode::SERVICE_UNAVAILABLE, e.to_string())
            }
            other => {
                error!("Request failed: {}", other);
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}

// ── Handlers ─────────────────────────────────────────────────────────────────

async fn scan(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ScanResponse>, ApiError> {
    let mut multipart = multipart.map_err(|r| ApiError::new(r.status(), r.body_text()))?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::new(e.status(), e.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_owned();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::new(e.status(), e.body_text()))?;

        let id = state.pipeline.submit(bytes, &filename)?;
        return Ok(Json(ScanResponse {
            sha256: id.into_string(),
        }));
    }

    Err(ApiError::new(
        StatusCode::BAD_REQUEST,
        "Required multipart field 'file' is missing",
    ))
}

async fn lookup(
    State(state): State<AppState>,
    uri: Uri,
    hash: Result<Path<String>, PathRejection>,
) -> Result<Json<PdfMetadataRecord>, ApiError> {
    let Path(hash) = hash.map_err(|rejection| {
        warn!("Invalid hash format for lookup: {}", uri.path());
        ScanError::MalformedIdentifier {
            input: uri.path().to_string(),
            reason: rejection.body_text(),
        }
    })?;

    match state.lookup.lookup(&hash).await? {
        Some(record) => Ok(Json(record)),
        None => Err(ApiError::new(StatusCode::NOT_FOUND, "Metadata not found")),
    }
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        stats: state.pipeline.stats(),
    })
}

// ── Router & server ──────────────────────────────────────────────────────────

pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/scan", post(scan))
        .route("/lookup/{*hash}", get(lookup))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(state)
}

/// Bind `config.bind` and serve until `shutdown` resolves.
///
/// Stops accepting connections first, then drains the ingestion pipeline so
/// every accepted submission finishes.
pub async fn serve<F>(state: AppState, config: &ServerConfig, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    info!(
        "Listening on http://{} ({} extraction workers)",
        listener.local_addr()?,
        state.pipeline.config().workers
    );

    let pipeline = Arc::clone(&state.pipeline);
    axum::serve(listener, router(state, config.max_upload_bytes))
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("HTTP server stopped; draining ingestion pipeline");
    pipeline.shutdown().await;
    Ok(())
}
