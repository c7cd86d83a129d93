//! HTTP API
//!
//! # Endpoints
//!
//! - GET  /health - Service status
//! - POST /api/conversation/ - Send a message, get the assistant's turn
//! - GET  /api/conversation/ - List conversations
//! - GET  /api/conversation/:id - Fetch one conversation
//! - POST /api/sandbox/execute - Run R code directly
//! - POST /api/sandbox/upload-file - Multipart upload (field `file`)
//! - POST /api/sandbox/upload-file-base64 - JSON upload with base64 content
//! - GET  /api/sandbox/info - R version and installed packages

use crate::services::Services;
use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use sdk::{
    CodeExecutionRequest, Conversation, ConversationRequest, ConversationResponse,
    ConversationSummary, EngineError, EngineErrorExt, ExecutionResult, FileUploadRequest,
    HealthResponse, SandboxInfo, UploadResponse,
};
use serde_json::json;
use std::future::Future;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Errors returned to HTTP clients as `{"detail": ...}`.
///
/// Internal errors also carry the error's user hint as `hint`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{detail}")]
    Internal {
        detail: String,
        hint: String,
        recoverable: bool,
    },
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::InvalidFilename(_) | EngineError::InvalidEncoding(_) => {
                ApiError::BadRequest(err.to_string())
            }
            other => ApiError::Internal {
                detail: other.to_string(),
                hint: other.user_hint().to_string(),
                recoverable: other.is_recoverable(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ApiError::BadRequest(detail) => (StatusCode::BAD_REQUEST, json!({ "detail": detail })),
            ApiError::NotFound(detail) => (StatusCode::NOT_FOUND, json!({ "detail": detail })),
            ApiError::Internal {
                detail,
                hint,
                recoverable,
            } => {
                error!(%detail, recoverable, "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "detail": detail, "hint": hint }),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

/// Build the application router
pub fn router(services: Services) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/api/conversation",
            post(create_turn).get(list_conversations),
        )
        .route(
            "/api/conversation/",
            post(create_turn).get(list_conversations),
        )
        .route("/api/conversation/:id", get(get_conversation))
        .route("/api/sandbox/execute", post(execute_code))
        .route("/api/sandbox/upload-file", post(upload_file))
        .route("/api/sandbox/upload-file-base64", post(upload_file_base64))
        .route("/api/sandbox/info", get(sandbox_info))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(services)
}

/// Serve until `shutdown` resolves, then release the sandbox session
pub async fn serve<F>(services: Services, shutdown: F) -> Result<(), EngineError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = services.config.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| EngineError::Network(format!("Failed to bind to {}: {}", addr, e)))?;

    info!("API server listening on http://{}", addr);

    let app = router(services.clone());
    let result = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| EngineError::Network(format!("Server error: {}", e)));

    info!("API server stopped, closing sandbox");
    services.shutdown().await;
    result
}

/// Resolves on Ctrl-C or, on unix, SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl-C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}

async fn health(State(services): State<Services>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        env: services.config.core.environment.clone(),
    })
}

async fn create_turn(
    State(services): State<Services>,
    Json(request): Json<ConversationRequest>,
) -> ApiResult<ConversationResponse> {
    if request.message.trim().is_empty() {
        return Err(ApiError::BadRequest("message must not be empty".to_string()));
    }

    let (conversation, response) = services
        .orchestrator
        .process_turn(request.conversation_id.as_deref(), &request.message)
        .await?;

    Ok(Json(ConversationResponse {
        conversation,
        response,
    }))
}

async fn list_conversations(State(services): State<Services>) -> Json<Vec<ConversationSummary>> {
    Json(services.store.list())
}

async fn get_conversation(
    State(services): State<Services>,
    Path(id): Path<String>,
) -> ApiResult<Conversation> {
    services
        .store
        .get(&id)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Conversation not found".to_string()))
}

async fn execute_code(
    State(services): State<Services>,
    Json(request): Json<CodeExecutionRequest>,
) -> Json<ExecutionResult> {
    Json(
        services
            .harvester
            .run_and_harvest(&request.code, request.timeout_ms)
            .await,
    )
}

async fn upload_file(
    State(services): State<Services>,
    mut multipart: Multipart,
) -> ApiResult<UploadResponse> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| ApiError::BadRequest("file field has no filename".to_string()))?;
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;

        let path = services
            .sandbox
            .upload_bytes(&filename, &bytes, &content_type)
            .await?;
        return Ok(Json(UploadResponse { filename, path }));
    }

    Err(ApiError::BadRequest("missing multipart field 'file'".to_string()))
}

async fn upload_file_base64(
    State(services): State<Services>,
    Json(request): Json<FileUploadRequest>,
) -> ApiResult<UploadResponse> {
    let path = services
        .sandbox
        .upload(&request.filename, &request.content, &request.content_type)
        .await?;

    Ok(Json(UploadResponse {
        filename: request.filename,
        path,
    }))
}

async fn sandbox_info(State(services): State<Services>) -> Json<SandboxInfo> {
    Json(services.sandbox.info().await)
}
