//! HTTP server for the chat service.
//!
//! Exposes ingestion, document management, chat, and history as a JSON API.
//!
//! # Endpoints
//!
//! | Method   | Path            | Description |
//! |----------|-----------------|-------------|
//! | `GET`    | `/health`       | Health check (returns version) |
//! | `POST`   | `/ingest`       | Upload a document (multipart `file`) |
//! | `GET`    | `/documents`    | List indexed source file names |
//! | `DELETE` | `/documents`    | Delete one source's chunks, or wipe all |
//! | `POST`   | `/chat`         | Run one chat turn, returns `{text}` |
//! | `GET`    | `/chat/history` | The caller's recent turns, oldest first |
//!
//! # Authentication
//!
//! Every endpoint except `/health` requires `Authorization: Bearer <token>`;
//! tokens map to opaque user ids via the `[auth.keys]` config table. An
//! unknown token is rejected with `401` before any pipeline work runs.
//!
//! # Error Contract
//!
//! Non-chat endpoints report failures as:
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "no file field in upload" } }
//! ```
//!
//! Error codes: `bad_request` (400), `unauthorized` (401),
//! `embedding_error` (502), `generation_error` (502), `store_error` (500).
//!
//! The chat endpoint is the deliberate exception: upstream failures come
//! back as a *successful* `{text}` response whose text is a readable error
//! message, so client UIs never have to branch on transport failures.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted to support browser
//! clients.

use axum::{
    extract::{DefaultBodyLimit, FromRequestParts, Multipart, Query, State},
    http::{header, request::Parts, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::chat::ChatPipeline;
use crate::config::Config;
use crate::db;
use crate::embedding::{create_embedding_client, EmbeddingClient};
use crate::error::ServiceError;
use crate::extract;
use crate::generation::create_generation_client;
use crate::ingest::ingest_document;
use crate::models::ChatTurn;
use crate::store::sqlite::SqliteStore;
use crate::store::Store;

/// Default and maximum number of turns returned by the history endpoint.
const HISTORY_DEFAULT_LIMIT: usize = 50;
const HISTORY_MAX_LIMIT: usize = 200;

/// Maximum accepted upload size.
const MAX_UPLOAD_BYTES: usize = 32 * 1024 * 1024;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
    store: Arc<dyn Store>,
    embedder: Arc<dyn EmbeddingClient>,
    pipeline: Arc<ChatPipeline>,
}

/// Starts the HTTP server.
///
/// Builds the service clients once (the process entry point owns their
/// lifecycle), binds to `[server].bind`, and serves until terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let config = Arc::new(config.clone());

    let pool = db::connect(&config).await?;
    let store: Arc<dyn Store> = Arc::new(SqliteStore::new(pool, config.embedding.dims));
    let embedder = create_embedding_client(&config.embedding)?;
    let generator = create_generation_client(&config.generation)?;
    let pipeline = Arc::new(ChatPipeline::new(
        store.clone(),
        embedder.clone(),
        generator,
        config.retrieval.top_k,
    ));

    let state = AppState {
        config,
        store,
        embedder,
        pipeline,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/health", get(handle_health))
        .route("/ingest", post(handle_ingest))
        .route(
            "/documents",
            get(handle_list_documents).delete(handle_delete_documents),
        )
        .route("/chat", post(handle_chat))
        .route("/chat/history", get(handle_history))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(cors)
        .with_state(state);

    tracing::info!(bind = %bind_addr, "chat service listening");

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    /// Machine-readable error code (e.g., `"bad_request"`).
    code: String,
    /// Human-readable error message.
    message: String,
}

/// Internal error type that converts into an HTTP response.
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

fn unauthorized(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::UNAUTHORIZED,
        code: "unauthorized".to_string(),
        message: message.into(),
    }
}

/// Map a pipeline error to the transport contract.
impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        let message = err.to_string();
        match err {
            ServiceError::Input(_) => bad_request(message),
            ServiceError::Auth(_) => unauthorized(message),
            ServiceError::EmbeddingService(_) => AppError {
                status: StatusCode::BAD_GATEWAY,
                code: "embedding_error".to_string(),
                message,
            },
            ServiceError::GenerationService(_) => AppError {
                status: StatusCode::BAD_GATEWAY,
                code: "generation_error".to_string(),
                message,
            },
            ServiceError::Store(_) => AppError {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                code: "store_error".to_string(),
                message,
            },
        }
    }
}

// ============ Authentication ============

/// Verified caller identity, resolved from the bearer token before any
/// handler logic runs. Rejection happens here, at the boundary.
struct CallerIdentity {
    user_id: String,
}

impl FromRequestParts<AppState> for CallerIdentity {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or_else(|| unauthorized("missing bearer token"))?;

        let user_id = state
            .config
            .auth
            .verify(token)
            .ok_or_else(|| unauthorized("unknown token"))?;

        Ok(CallerIdentity {
            user_id: user_id.to_string(),
        })
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ POST /ingest ============

#[derive(Serialize)]
struct IngestResponse {
    file_name: String,
    chunk_count: usize,
}

/// Accepts a multipart upload with a `file` field, extracts its text, and
/// runs the ingestion pipeline. A document yielding zero chunks is a
/// success with `chunk_count: 0`.
async fn handle_ingest(
    State(state): State<AppState>,
    _caller: CallerIdentity,
    mut multipart: Multipart,
) -> Result<Json<IngestResponse>, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(format!("malformed multipart body: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| bad_request("file field has no file name"))?;
        let content_type = field
            .content_type()
            .map(str::to_string)
            .unwrap_or_else(|| extract::detect_content_type(&file_name).to_string());
        let bytes = field
            .bytes()
            .await
            .map_err(|e| bad_request(format!("failed to read upload: {}", e)))?;

        let text = extract::extract_text(&bytes, &content_type).map_err(AppError::from)?;

        let report = ingest_document(
            state.store.as_ref(),
            state.embedder.as_ref(),
            state.config.chunking.min_chars,
            &file_name,
            &text,
        )
        .await?;

        return Ok(Json(IngestResponse {
            file_name,
            chunk_count: report.chunk_count,
        }));
    }

    Err(bad_request("no file field in upload"))
}

// ============ GET /documents ============

#[derive(Serialize)]
struct SourcesResponse {
    sources: Vec<String>,
}

async fn handle_list_documents(
    State(state): State<AppState>,
    _caller: CallerIdentity,
) -> Result<Json<SourcesResponse>, AppError> {
    let sources = state.store.list_sources().await?;
    Ok(Json(SourcesResponse { sources }))
}

// ============ DELETE /documents ============

#[derive(Deserialize)]
struct DeleteRequest {
    file_name: Option<String>,
    #[serde(default)]
    delete_all: bool,
}

#[derive(Serialize)]
struct DeleteResponse {
    deleted: u64,
}

/// Deletes one source's chunks, or everything with `delete_all`. Both
/// forms are idempotent; zero matches is still success.
async fn handle_delete_documents(
    State(state): State<AppState>,
    _caller: CallerIdentity,
    Json(request): Json<DeleteRequest>,
) -> Result<Json<DeleteResponse>, AppError> {
    if request.delete_all {
        state.store.delete_all().await?;
        return Ok(Json(DeleteResponse { deleted: 0 }));
    }

    let file_name = request
        .file_name
        .ok_or_else(|| bad_request("provide file_name or delete_all"))?;
    let deleted = state.store.delete_by_source(&file_name).await?;
    Ok(Json(DeleteResponse { deleted }))
}

// ============ POST /chat ============

#[derive(Deserialize)]
struct ChatRequest {
    /// Externally-shaped message records; normalized inside the pipeline.
    messages: Vec<serde_json::Value>,
}

#[derive(Serialize)]
struct ChatResponse {
    text: String,
}

/// Runs one chat turn. Always answers `200 {text}`: pipeline failures are
/// folded into the text payload so the client UI stays simple.
async fn handle_chat(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Json(request): Json<ChatRequest>,
) -> Json<ChatResponse> {
    let text = state
        .pipeline
        .answer_with_fallback(&caller.user_id, &request.messages)
        .await;
    Json(ChatResponse { text })
}

// ============ GET /chat/history ============

#[derive(Deserialize)]
struct HistoryParams {
    limit: Option<usize>,
}

async fn handle_history(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Query(params): Query<HistoryParams>,
) -> Result<Json<Vec<ChatTurn>>, AppError> {
    let limit = params
        .limit
        .unwrap_or(HISTORY_DEFAULT_LIMIT)
        .min(HISTORY_MAX_LIMIT);
    let turns = state.store.recent_turns(&caller.user_id, limit).await?;
    Ok(Json(turns))
}
