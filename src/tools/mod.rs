pub mod analyze;
pub mod recall_memory;
pub mod record_experience;
pub mod store_memory;

use std::sync::Arc;

use analyze::AnalyzeParams;
use recall_memory::RecallMemoryParams;
use record_experience::RecordExperienceParams;
use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::{tool, tool_handler, tool_router, ServerHandler};
use serde::Serialize;
use store_memory::StoreMemoryParams;

use crate::cognition::Cognition;
use crate::error::CognitiveError;
use crate::learning::LearningExperience;
use crate::memory::{MemoryKind, RetrievalQuery, DEFAULT_IMPORTANCE};
use crate::reasoning::{ReasoningMode, ReasoningRequest};

/// The Cognis MCP tool handler. Holds the shared cognitive core and exposes
/// every operation via the `#[tool_router]` macro.
#[derive(Clone)]
pub struct CognisTools {
    tool_router: ToolRouter<Self>,
    core: Arc<Cognition>,
}

fn to_json<T: Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string(value).map_err(|e| format!("serialization failed: {e}"))
}

fn tool_error(e: CognitiveError) -> String {
    format!("{}: {e}", e.kind())
}

/// Run a synchronous core operation off the async runtime.
async fn blocking<T, F>(core: &Arc<Cognition>, op: F) -> Result<T, String>
where
    T: Send + 'static,
    F: FnOnce(&Cognition) -> crate::error::Result<T> + Send + 'static,
{
    let core = Arc::clone(core);
    tokio::task::spawn_blocking(move || op(&core))
        .await
        .map_err(|e| format!("task failed: {e}"))?
        .map_err(tool_error)
}

#[tool_router]
impl CognisTools {
    pub fn new(core: Arc<Cognition>) -> Self {
        Self {
            tool_router: Self::tool_router(),
            core,
        }
    }

    /// Store a new memory.
    #[tool(description = "Store a new memory. Kinds: episodic (a specific event), semantic (general facts), procedural (how-to/processes). Importance 0-1 is clamped.")]
    async fn store_memory(
        &self,
        Parameters(params): Parameters<StoreMemoryParams>,
    ) -> Result<String, String> {
        let kind: MemoryKind = params.kind.parse().map_err(tool_error)?;
        let importance = params.importance.unwrap_or(DEFAULT_IMPORTANCE);

        tracing::info!(content_len = params.content.len(), kind = %kind, "store_memory called");

        let entry = blocking(&self.core, move |core| {
            core.store(&params.content, kind, importance, &params.tags)
        })
        .await?;
        to_json(&entry)
    }

    /// Retrieve memories ranked by term overlap and importance.
    #[tool(description = "Retrieve memories relevant to a free-text query, ranked by term overlap times importance. Every returned memory has its access count incremented.")]
    async fn recall_memory(
        &self,
        Parameters(params): Parameters<RecallMemoryParams>,
    ) -> Result<String, String> {
        tracing::info!(query = %params.query, "recall_memory called");

        let mut query = RetrievalQuery::new(params.query).with_tags(params.tags);
        query.limit = params.limit;
        let results = blocking(&self.core, move |core| core.retrieve(&query)).await?;
        to_json(&serde_json::json!({
            "memories": results,
            "total": results.len(),
        }))
    }

    /// Memory store statistics.
    #[tool(description = "Get memory store statistics: total, recent (last 24h), counts by kind, approximate storage size.")]
    async fn memory_stats(&self) -> Result<String, String> {
        let stats = blocking(&self.core, |core| core.memory_stats()).await?;
        to_json(&stats)
    }

    /// Reason over retrieved memories and optional context.
    #[tool(description = "Reason about a query using retrieved memories and optional context. Returns a conclusion, the reasoning chain, a confidence score, and cited evidence (memory ids or quoted context).")]
    async fn analyze(
        &self,
        Parameters(params): Parameters<AnalyzeParams>,
    ) -> Result<String, String> {
        let mode = match params.mode.as_deref() {
            Some(m) => m.parse::<ReasoningMode>().map_err(tool_error)?,
            None => ReasoningMode::default(),
        };
        tracing::info!(query = %params.query, mode = %mode, "analyze called");

        let request = ReasoningRequest {
            query: params.query,
            context: params.context,
            mode,
        };
        let response = self.core.analyze(&request).await.map_err(tool_error)?;
        to_json(&response)
    }

    /// Record an experience and its outcome.
    #[tool(description = "Record an experience and its outcome. Polarity is inferred from feedback, then outcome, and updates the adaptation score.")]
    async fn record_experience(
        &self,
        Parameters(params): Parameters<RecordExperienceParams>,
    ) -> Result<String, String> {
        tracing::info!(experience_len = params.experience.len(), "record_experience called");

        let experience = LearningExperience {
            experience: params.experience,
            outcome: params.outcome,
            feedback: params.feedback,
            importance: params.importance,
        };
        let state = blocking(&self.core, move |core| core.record(experience)).await?;
        to_json(&state)
    }

    /// Learning statistics.
    #[tool(description = "Get learning statistics: total experiences, learning rate, adaptation score, knowledge growth since the previous read, and recent experiences.")]
    async fn learning_stats(&self) -> Result<String, String> {
        let stats = blocking(&self.core, |core| core.learning_stats()).await?;
        to_json(&stats)
    }

    /// Evolution status.
    #[tool(description = "Get evolution status: generation, fitness score, mutation count, recent improvements, recent cycles (fitness trajectory), last evolution time, and whether a cycle is running.")]
    async fn evolution_status(&self) -> Result<String, String> {
        let status = blocking(&self.core, |core| core.evolution_status()).await?;
        to_json(&status)
    }

    /// Trigger one evolution cycle.
    #[tool(description = "Run one evolution cycle now. Returns already_running if a cycle is in progress; poll evolution_status instead of retrying.")]
    async fn trigger_evolution(&self) -> Result<String, String> {
        let core = Arc::clone(&self.core);
        let result = tokio::task::spawn_blocking(move || core.trigger_evolution())
            .await
            .map_err(|e| format!("task failed: {e}"))?;
        match result {
            Ok(outcome) => to_json(&serde_json::json!({
                "status": "accepted",
                "cycle": outcome,
            })),
            Err(CognitiveError::AlreadyRunning) => {
                to_json(&serde_json::json!({ "status": "already_running" }))
            }
            Err(e) => Err(tool_error(e)),
        }
    }
}

#[tool_handler]
impl ServerHandler for CognisTools {
    fn get_info(&self) -> rmcp::model::ServerInfo {
        rmcp::model::ServerInfo {
            instructions: Some(
                "Cognis is a cognitive memory and reasoning server. Use store_memory and \
                 recall_memory for memories, analyze to reason over them, record_experience \
                 to feed outcomes back, and evolution_status to watch adaptation."
                    .into(),
            ),
            capabilities: rmcp::model::ServerCapabilities::builder()
                .enable_tools()
                .build(),
            ..Default::default()
        }
    }
}
