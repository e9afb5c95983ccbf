use anyhow::{Context, Result};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::services::ServeDir;
use tracing::{error, info, warn};

use super::metrics::metrics_handler;
use super::state::{GuardedLibrary, GuardedPipeline, ServerState};
use super::{log_requests, ServerConfig};
use crate::error::PipelineError;
use crate::generation::{
    ExplanationRequest, GenerationPipeline, ProgressionRequest, TablatureRequest,
};
use crate::library::{LibraryEntry, LibraryItem, LibraryService};
use crate::llm::LlmError;
use crate::progression::{
    ChordFingering, ConversationTurn, ExplanationRecord, NormalizedKey, ProgressionRecord,
    ProgressionSignature,
};

#[derive(Serialize)]
struct ServerStats {
    pub uptime: String,
    pub provider: String,
    pub model: String,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

#[derive(Serialize)]
struct ProgressionResponse {
    result: ProgressionRecord,
    signature: ProgressionSignature,
    key: NormalizedKey,
    input: Vec<ConversationTurn>,
    newly_registered: Option<bool>,
}

#[derive(Serialize)]
struct ExplanationResponse {
    result: ExplanationRecord,
    signature: ProgressionSignature,
    key: NormalizedKey,
    input: Vec<ConversationTurn>,
    persisted: bool,
}

#[derive(Serialize)]
struct TablatureResponse {
    result: Vec<ChordFingering>,
    input: Vec<ConversationTurn>,
}

#[derive(Serialize)]
struct ResultResponse<T: Serialize> {
    result: T,
}

impl PipelineError {
    fn status_code(&self) -> StatusCode {
        match self {
            PipelineError::InvalidRequest { .. } | PipelineError::InvalidKey(_) => {
                StatusCode::BAD_REQUEST
            }
            PipelineError::Service(LlmError::RateLimited) => StatusCode::TOO_MANY_REQUESTS,
            PipelineError::Service(LlmError::Timeout) => StatusCode::GATEWAY_TIMEOUT,
            PipelineError::Service(LlmError::Api { status, .. }) => StatusCode::from_u16(*status)
                .ok()
                .filter(|s| s.is_client_error() || s.is_server_error())
                .unwrap_or(StatusCode::BAD_GATEWAY),
            PipelineError::Service(_) => StatusCode::BAD_GATEWAY,
            PipelineError::MalformedCompletion(_) | PipelineError::SchemaViolation { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            PipelineError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for PipelineError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        } else {
            warn!("Request rejected: {}", self);
        }
        let body = json!({
            "error": {
                "kind": self.kind(),
                "message": self.to_string(),
            }
        });
        (status, Json(body)).into_response()
    }
}

/// Unwraps a JSON body, turning axum's rejection into our error shape.
fn parse_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, PipelineError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| PipelineError::invalid_request("body", rejection.body_text()))
}

async fn home(State(state): State<ServerState>) -> impl IntoResponse {
    let provider = state.pipeline.provider();
    let stats = ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
        provider: provider.name().to_string(),
        model: provider.model().to_string(),
    };
    Json(stats)
}

async fn post_progression(
    State(pipeline): State<GuardedPipeline>,
    payload: Result<Json<ProgressionRequest>, JsonRejection>,
) -> Result<Json<ProgressionResponse>, PipelineError> {
    let request = parse_body(payload)?;
    let generated = pipeline.generate_progression(request).await?;
    Ok(Json(ProgressionResponse {
        result: generated.record,
        signature: generated.signature,
        key: generated.key,
        input: generated.prompt,
        newly_registered: generated.newly_registered,
    }))
}

async fn post_explanation(
    State(pipeline): State<GuardedPipeline>,
    payload: Result<Json<ExplanationRequest>, JsonRejection>,
) -> Result<Json<ExplanationResponse>, PipelineError> {
    let request = parse_body(payload)?;
    let generated = pipeline.explain_progression(request).await?;
    Ok(Json(ExplanationResponse {
        result: generated.record,
        signature: generated.signature,
        key: generated.key,
        input: generated.prompt,
        persisted: generated.persisted,
    }))
}

async fn post_tablature(
    State(pipeline): State<GuardedPipeline>,
    payload: Result<Json<TablatureRequest>, JsonRejection>,
) -> Result<Json<TablatureResponse>, PipelineError> {
    let request = parse_body(payload)?;
    let generated = pipeline.tabulate_progression(request).await?;
    Ok(Json(TablatureResponse {
        result: generated.fingering,
        input: generated.prompt,
    }))
}

async fn get_library(
    State(library): State<GuardedLibrary>,
) -> Result<Json<ResultResponse<Vec<LibraryEntry>>>, PipelineError> {
    let result = library.list()?;
    Ok(Json(ResultResponse { result }))
}

async fn get_library_item(
    State(library): State<GuardedLibrary>,
    Path(key): Path<String>,
) -> Result<Json<ResultResponse<LibraryItem>>, PipelineError> {
    let result = library.fetch(&key)?;
    Ok(Json(ResultResponse { result }))
}

pub fn make_app(
    config: ServerConfig,
    pipeline: Arc<GenerationPipeline>,
    library: Arc<LibraryService>,
) -> Router {
    let state = ServerState {
        config: config.clone(),
        start_time: Instant::now(),
        pipeline,
        library,
    };

    let generation_routes: Router = Router::new()
        .route("/progression", post(post_progression))
        .route("/explanation", post(post_explanation))
        .route("/tablature", post(post_tablature))
        .with_state(state.clone());

    let library_routes: Router = Router::new()
        .route("/", get(get_library))
        .route("/{key}", get(get_library_item))
        .with_state(state.clone());

    let home_router: Router = match config.frontend_dir_path {
        Some(frontend_path) => {
            let static_files_service =
                ServeDir::new(frontend_path).append_index_html_on_directories(true);
            Router::new().fallback_service(static_files_service)
        }
        None => Router::new()
            .route("/", get(home))
            .with_state(state.clone()),
    };

    home_router
        .nest("/v1", generation_routes)
        .nest("/v1/library", library_routes)
        .layer(middleware::from_fn_with_state(state, log_requests))
}

pub fn make_metrics_app() -> Router {
    Router::new().route("/metrics", get(metrics_handler))
}

pub async fn run_server(
    pipeline: Arc<GenerationPipeline>,
    library: Arc<LibraryService>,
    config: ServerConfig,
) -> Result<()> {
    let port = config.port;
    let metrics_port = config.metrics_port;
    let app = make_app(config, pipeline, library);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port))
        .await
        .with_context(|| format!("Failed to bind HTTP port {}", port))?;
    let metrics_listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", metrics_port))
        .await
        .with_context(|| format!("Failed to bind metrics port {}", metrics_port))?;

    info!("Ready to serve at port {}!", port);
    info!("Metrics available at port {}!", metrics_port);

    tokio::select! {
        result = axum::serve(listener, app) => {
            result.context("HTTP server stopped")
        },
        result = axum::serve(metrics_listener, make_metrics_app()) => {
            result.context("Metrics server stopped")
        },
    }
}
