//! HTTP surface for Rusty Paper.
//!
//! Each user interaction is an explicit handler:
//!
//! - `GET /` – Single-page UI: file picker, question box, answer area, and query history.
//! - `POST /sessions` – Open an idle session and return its id.
//! - `GET /sessions/:id` / `DELETE /sessions/:id` – Inspect or close a session.
//! - `POST /sessions/:id/upload` – Multipart upload (field `file`) of a PDF; indexes it as the
//!   session's active document.
//! - `POST /sessions/:id/query` – `{ "query": "…" }`; routed to the summary engine when the
//!   query mentions "summarize", otherwise to the vector engine.
//! - `GET /sessions/:id/history` – Answered queries in the order they were asked.
//! - `GET /metrics` – Indexing and query counters.
//! - `GET /commands` – Machine-readable catalog of the routes above.
//!
//! Failures are returned as `{ "error": "…" }` with a status derived from the error kind.

use crate::index::QueryError;
use crate::ingestion::{LoadError, UploadError, UploadedFile};
use crate::metrics::MetricsSnapshot;
use crate::service::{Answer, PipelineError, RagApi, ServiceError, SessionInfo, UploadOutcome};
use crate::session::HistoryEntry;
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path, State, multipart::MultipartError},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

const INDEX_PAGE: &str = include_str!("../static/index.html");
const UPLOAD_FIELD: &str = "file";

/// Build the HTTP router. `max_upload_bytes` bounds every request body.
pub fn create_router<S>(service: Arc<S>, max_upload_bytes: usize) -> Router
where
    S: RagApi + 'static,
{
    Router::new()
        .route("/", get(index_page))
        .route("/sessions", post(open_session::<S>))
        .route(
            "/sessions/:session_id",
            get(session_info::<S>).delete(close_session::<S>),
        )
        .route("/sessions/:session_id/upload", post(upload_document::<S>))
        .route("/sessions/:session_id/query", post(ask_question::<S>))
        .route("/sessions/:session_id/history", get(get_history::<S>))
        .route("/metrics", get(get_metrics::<S>))
        .route("/commands", get(get_commands))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(service)
}

async fn index_page() -> Html<&'static str> {
    Html(INDEX_PAGE)
}

async fn open_session<S>(State(service): State<Arc<S>>) -> (StatusCode, Json<SessionInfo>)
where
    S: RagApi,
{
    (StatusCode::CREATED, Json(service.open_session().await))
}

async fn session_info<S>(
    State(service): State<Arc<S>>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionInfo>, AppError>
where
    S: RagApi,
{
    Ok(Json(service.session_info(session_id).await?))
}

async fn close_session<S>(
    State(service): State<Arc<S>>,
    Path(session_id): Path<Uuid>,
) -> Result<StatusCode, AppError>
where
    S: RagApi,
{
    service.close_session(session_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Accept a multipart upload and index the `file` field as the session's document.
///
/// Other fields are ignored. Uploads over the body limit are rejected before indexing starts.
async fn upload_document<S>(
    State(service): State<Arc<S>>,
    Path(session_id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<UploadOutcome>, AppError>
where
    S: RagApi,
{
    let mut upload = None;
    while let Some(field) = multipart.next_field().await.map_err(AppError::multipart)? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let file_name = field
            .file_name()
            .map(str::to_string)
            .unwrap_or_else(|| "upload.pdf".to_string());
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.map_err(AppError::multipart)?;
        upload = Some(UploadedFile {
            file_name,
            content_type,
            bytes: bytes.to_vec(),
        });
        break;
    }

    let file = upload.ok_or_else(|| {
        AppError::new(
            StatusCode::BAD_REQUEST,
            format!("multipart field '{UPLOAD_FIELD}' is required"),
        )
    })?;
    tracing::debug!(%session_id, file_name = %file.file_name, bytes = file.bytes.len(), "Upload received");

    let outcome = service.upload(session_id, file).await?;
    tracing::info!(
        %session_id,
        file_name = %outcome.document.file_name,
        indexed_chunks = outcome.document.indexed_chunks,
        dropped_chunks = outcome.document.dropped_chunks,
        cached = outcome.cached,
        "Upload request completed"
    );
    Ok(Json(outcome))
}

/// Request body for `POST /sessions/:id/query`.
#[derive(Deserialize)]
struct QueryRequest {
    /// Question about the active document.
    query: String,
}

async fn ask_question<S>(
    State(service): State<Arc<S>>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<Answer>, AppError>
where
    S: RagApi,
{
    let answer = service.ask(session_id, request.query).await?;
    tracing::info!(
        %session_id,
        route = answer.route.as_str(),
        sources = answer.sources.len(),
        "Query request completed"
    );
    Ok(Json(answer))
}

/// Response body for `GET /sessions/:id/history`.
#[derive(Serialize)]
struct HistoryResponse {
    session_id: Uuid,
    entries: Vec<HistoryEntry>,
}

async fn get_history<S>(
    State(service): State<Arc<S>>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<HistoryResponse>, AppError>
where
    S: RagApi,
{
    let entries = service.history(session_id).await?;
    Ok(Json(HistoryResponse {
        session_id,
        entries,
    }))
}

async fn get_metrics<S>(State(service): State<Arc<S>>) -> Json<MetricsSnapshot>
where
    S: RagApi,
{
    Json(service.metrics_snapshot())
}

/// Descriptor for a single command in the discovery catalog.
#[derive(Serialize)]
struct CommandDescriptor {
    name: &'static str,
    method: &'static str,
    path: &'static str,
    description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_example: Option<serde_json::Value>,
}

/// Response body for `GET /commands`.
#[derive(Serialize)]
struct CommandsResponse {
    commands: Vec<CommandDescriptor>,
}

async fn get_commands() -> Json<CommandsResponse> {
    Json(CommandsResponse {
        commands: vec![
            CommandDescriptor {
                name: "open_session",
                method: "POST",
                path: "/sessions",
                description: "Open an idle session. Response returns { \"session_id\": uuid, \"phase\": \"idle\" }.",
                request_example: None,
            },
            CommandDescriptor {
                name: "session_info",
                method: "GET",
                path: "/sessions/:session_id",
                description: "Return the session phase, the active document, and the history length.",
                request_example: None,
            },
            CommandDescriptor {
                name: "close_session",
                method: "DELETE",
                path: "/sessions/:session_id",
                description: "Close the session and drop its document and history.",
                request_example: None,
            },
            CommandDescriptor {
                name: "upload",
                method: "POST",
                path: "/sessions/:session_id/upload",
                description: "Upload a PDF as multipart field 'file'. The document is split into chunks and indexed for the session.",
                request_example: None,
            },
            CommandDescriptor {
                name: "query",
                method: "POST",
                path: "/sessions/:session_id/query",
                description: "Ask a question about the uploaded PDF. Queries mentioning 'summarize' use the summary engine; all others use vector retrieval.",
                request_example: Some(json!({ "query": "What are the main findings?" })),
            },
            CommandDescriptor {
                name: "history",
                method: "GET",
                path: "/sessions/:session_id/history",
                description: "Return answered queries in the order they were asked.",
                request_example: None,
            },
            CommandDescriptor {
                name: "metrics",
                method: "GET",
                path: "/metrics",
                description: "Return indexing and query counters.",
                request_example: None,
            },
        ],
    })
}

/// Error response carrying a status and a user-facing message.
#[derive(Debug)]
struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn multipart(error: MultipartError) -> Self {
        let status = error.status();
        let status = if status.is_server_error() {
            StatusCode::BAD_REQUEST
        } else {
            status
        };
        Self::new(status, format!("invalid upload: {}", error.body_text()))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = %self.status, error = %self.message, "Request failed");
        }
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<ServiceError> for AppError {
    fn from(error: ServiceError) -> Self {
        Self::new(status_for(&error), error.to_string())
    }
}

fn status_for(error: &ServiceError) -> StatusCode {
    match error {
        ServiceError::SessionNotFound(_) => StatusCode::NOT_FOUND,
        ServiceError::NoDocument | ServiceError::Superseded => StatusCode::CONFLICT,
        ServiceError::EmptyQuery => StatusCode::BAD_REQUEST,
        ServiceError::Upload(UploadError::Io(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        ServiceError::Upload(_) => StatusCode::BAD_REQUEST,
        ServiceError::Pipeline(PipelineError::Load(
            LoadError::Io { .. } | LoadError::Interrupted(_),
        )) => StatusCode::INTERNAL_SERVER_ERROR,
        ServiceError::Pipeline(PipelineError::Load(_) | PipelineError::NoChunks) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        ServiceError::Pipeline(PipelineError::Index(_)) => StatusCode::BAD_GATEWAY,
        ServiceError::Query(error) if error.is_remote() => StatusCode::BAD_GATEWAY,
        ServiceError::Query(QueryError::DimensionMismatch { .. }) => StatusCode::BAD_GATEWAY,
        ServiceError::Query(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
