//! Server entry points: REST over HTTP and MCP over stdio.
//!
//! [`create_router`] builds the axum REST surface under `/api/v1`;
//! [`serve_http`] and [`serve_stdio`] wire the cognitive core into a running
//! server.

use std::sync::Arc;

use anyhow::Result;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use rmcp::ServiceExt;
use serde::Deserialize;

use crate::cognition::Cognition;
use crate::config::CognisConfig;
use crate::error::CognitiveError;
use crate::learning::LearningExperience;
use crate::memory::{MemoryKind, RetrievalQuery, DEFAULT_IMPORTANCE};
use crate::reasoning::{ReasoningMode, ReasoningRequest};
use crate::tools::CognisTools;

type AppState = Arc<Cognition>;

/// A [`CognitiveError`] rendered as an HTTP response.
pub struct ApiError(CognitiveError);

impl From<CognitiveError> for ApiError {
    fn from(e: CognitiveError) -> Self {
        Self(e)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self.0 {
            CognitiveError::Validation(_) => StatusCode::BAD_REQUEST,
            CognitiveError::InsufficientEvidence => StatusCode::UNPROCESSABLE_ENTITY,
            CognitiveError::AlreadyRunning => StatusCode::CONFLICT,
            CognitiveError::OracleTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            CognitiveError::Oracle(_) => StatusCode::BAD_GATEWAY,
            CognitiveError::Storage(_) | CognitiveError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }
        let body = serde_json::json!({
            "error": self.0.kind(),
            "message": self.0.to_string(),
        });
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

/// Run a synchronous core operation off the async runtime.
async fn blocking<T, F>(state: &AppState, op: F) -> ApiResult<T>
where
    T: Send + 'static,
    F: FnOnce(&Cognition) -> crate::error::Result<T> + Send + 'static,
{
    let core = Arc::clone(state);
    tokio::task::spawn_blocking(move || op(&core))
        .await
        .map_err(|e| CognitiveError::Internal(format!("task failed: {e}")))?
        .map_err(ApiError::from)
}

// ── Request bodies ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct StoreRequest {
    pub content: String,
    pub kind: String,
    pub importance: Option<f64>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct RetrieveRequest {
    pub query: String,
    pub limit: Option<usize>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub query: String,
    pub context: Option<serde_json::Value>,
    pub mode: Option<String>,
}

// ── Router ────────────────────────────────────────────────────────────────────

/// Create the REST router with all routes configured.
pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/memory/store", post(store_memory))
        .route("/memory/retrieve", post(retrieve_memories))
        .route("/memory/stats", get(memory_stats))
        .route("/reasoning/analyze", post(analyze))
        .route("/learning/experience", post(record_experience))
        .route("/learning/stats", get(learning_stats))
        .route("/evolution/status", get(evolution_status))
        .route("/evolution/history", get(evolution_history))
        .route("/evolution/trigger", post(trigger_evolution));

    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api)
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "oracle": state.reasoning().oracle_name(),
        "persistent": state.journal().is_some(),
        "evolution": state.evolution().state(),
        "operations": state.operations(),
    }))
}

async fn store_memory(
    State(state): State<AppState>,
    Json(body): Json<StoreRequest>,
) -> ApiResult<impl IntoResponse> {
    let kind: MemoryKind = body.kind.parse()?;
    let importance = body.importance.unwrap_or(DEFAULT_IMPORTANCE);
    let entry = blocking(&state, move |core| {
        core.store(&body.content, kind, importance, &body.tags)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

async fn retrieve_memories(
    State(state): State<AppState>,
    Json(body): Json<RetrieveRequest>,
) -> ApiResult<impl IntoResponse> {
    let mut query = RetrievalQuery::new(body.query).with_tags(body.tags);
    query.limit = body.limit;
    let results = blocking(&state, move |core| core.retrieve(&query)).await?;
    Ok(Json(serde_json::json!({
        "memories": results,
        "total": results.len(),
    })))
}

async fn memory_stats(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    Ok(Json(blocking(&state, |core| core.memory_stats()).await?))
}

async fn analyze(
    State(state): State<AppState>,
    Json(body): Json<AnalyzeRequest>,
) -> ApiResult<impl IntoResponse> {
    let mode = match body.mode.as_deref() {
        Some(m) => m.parse::<ReasoningMode>()?,
        None => ReasoningMode::default(),
    };
    let request = ReasoningRequest {
        query: body.query,
        context: body.context,
        mode,
    };
    Ok(Json(state.analyze(&request).await?))
}

async fn record_experience(
    State(state): State<AppState>,
    Json(body): Json<LearningExperience>,
) -> ApiResult<impl IntoResponse> {
    blocking(&state, move |core| core.record(body)).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(serde_json::json!({ "status": "accepted" })),
    ))
}

async fn learning_stats(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    Ok(Json(blocking(&state, |core| core.learning_stats()).await?))
}

async fn evolution_status(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    Ok(Json(blocking(&state, |core| core.evolution_status()).await?))
}

async fn evolution_history(
    State(state): State<AppState>,
    Query(params): Query<HistoryParams>,
) -> ApiResult<impl IntoResponse> {
    let limit = params.limit.unwrap_or(state.config().evolution.report_limit);
    let cycles = blocking(&state, move |core| core.evolution().history(limit)).await?;
    Ok(Json(serde_json::json!({
        "cycles": cycles,
        "total": cycles.len(),
    })))
}

async fn trigger_evolution(State(state): State<AppState>) -> ApiResult<Response> {
    let core = Arc::clone(&state);
    let result = tokio::task::spawn_blocking(move || core.trigger_evolution())
        .await
        .map_err(|e| CognitiveError::Internal(format!("task failed: {e}")))?;
    match result {
        Ok(outcome) => Ok(Json(serde_json::json!({
            "status": "accepted",
            "cycle": outcome,
        }))
        .into_response()),
        Err(CognitiveError::AlreadyRunning) => Ok((
            StatusCode::CONFLICT,
            Json(serde_json::json!({ "status": "already_running" })),
        )
            .into_response()),
        Err(e) => Err(e.into()),
    }
}

// ── Entry points ──────────────────────────────────────────────────────────────

/// Start the REST server.
pub async fn serve_http(config: CognisConfig) -> Result<()> {
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);

    let core = Arc::new(Cognition::from_config(config)?);
    let background = core.spawn_background();
    let router = create_router(Arc::clone(&core));

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "REST server listening at http://{bind_addr}/api/v1");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c");
            }
            tracing::info!("shutting down REST server");
        })
        .await?;

    if let Some(handle) = background {
        handle.abort();
    }
    Ok(())
}

/// Start the MCP server over stdio transport.
pub async fn serve_stdio(config: CognisConfig) -> Result<()> {
    tracing::info!("starting Cognis MCP server on stdio");

    let core = Arc::new(Cognition::from_config(config)?);
    let background = core.spawn_background();

    let tools = CognisTools::new(core);
    let server = tools.serve(rmcp::transport::stdio()).await?;
    tracing::info!("MCP server running, waiting for client");

    server.waiting().await?;
    tracing::info!("MCP server shut down");

    if let Some(handle) = background {
        handle.abort();
    }
    Ok(())
}
