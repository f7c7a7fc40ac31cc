//! Reasoning engine: explainable conclusions over retrieved memories.
//!
//! The engine seeds an ordered chain of statements from the retrieved
//! memories and any caller context, frames it by [`ReasoningMode`], and asks a
//! [`TextOracle`] for the final synthesis. Confidence is computed from the
//! evidence alone; the oracle never influences it.

pub mod chain;

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::config::ReasoningConfig;
use crate::error::{CognitiveError, Result};
use crate::memory::ScoredEntry;
use crate::oracle::{Prompt, TextOracle};

/// How the reasoning chain is framed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasoningMode {
    /// General statements narrowed to a specific conclusion.
    #[default]
    Deductive,
    /// Specific observations generalized into a conclusion.
    Inductive,
    /// Best-explaining hypothesis under incomplete evidence; confidence is capped.
    Abductive,
}

impl ReasoningMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deductive => "deductive",
            Self::Inductive => "inductive",
            Self::Abductive => "abductive",
        }
    }
}

impl std::fmt::Display for ReasoningMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ReasoningMode {
    type Err = CognitiveError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "deductive" => Ok(Self::Deductive),
            "inductive" => Ok(Self::Inductive),
            "abductive" => Ok(Self::Abductive),
            _ => Err(CognitiveError::Validation(format!(
                "unknown reasoning mode: {s} (expected deductive, inductive, or abductive)"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReasoningRequest {
    pub query: String,
    /// Free-form structured context; its string leaves become quotable evidence.
    #[serde(default)]
    pub context: Option<serde_json::Value>,
    #[serde(default)]
    pub mode: ReasoningMode,
}

impl ReasoningRequest {
    pub fn new(query: impl Into<String>, mode: ReasoningMode) -> Self {
        Self {
            query: query.into(),
            context: None,
            mode,
        }
    }

    pub fn with_context(mut self, context: serde_json::Value) -> Self {
        self.context = Some(context);
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReasoningResponse {
    pub conclusion: String,
    /// Memory ids and quoted context excerpts, in chain order.
    pub evidence: Vec<String>,
    pub confidence: f64,
    pub reasoning_chain: Vec<String>,
    pub mode: ReasoningMode,
    /// Name of the oracle that produced the conclusion.
    pub oracle: String,
    pub duration_ms: u64,
}

pub struct ReasoningEngine {
    oracle: Arc<dyn TextOracle>,
    timeout: Duration,
    abductive_ceiling: f64,
    max_chain_statements: usize,
    excerpt_chars: usize,
}

impl ReasoningEngine {
    pub fn new(config: &ReasoningConfig, oracle: Arc<dyn TextOracle>) -> Self {
        Self {
            oracle,
            timeout: config.timeout(),
            abductive_ceiling: config.abductive_ceiling,
            max_chain_statements: config.max_chain_statements,
            excerpt_chars: config.excerpt_chars,
        }
    }

    /// Override the oracle timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn oracle_name(&self) -> &str {
        self.oracle.name()
    }

    /// Reason over `memories` (already ranked) and the request context.
    ///
    /// Fails with `InsufficientEvidence` when there are no memories and the
    /// context holds nothing quotable, and with `OracleTimeout` when the
    /// oracle does not answer in time. The oracle is called at most once.
    pub async fn analyze(
        &self,
        request: &ReasoningRequest,
        memories: &[ScoredEntry],
    ) -> Result<ReasoningResponse> {
        if request.query.trim().is_empty() {
            return Err(CognitiveError::Validation("query must not be empty".into()));
        }
        let context = request
            .context
            .as_ref()
            .map(chain::flatten_context)
            .unwrap_or_default();
        if memories.is_empty() && context.is_empty() {
            return Err(CognitiveError::InsufficientEvidence);
        }

        let started = Instant::now();
        let evidence = chain::gather(memories, &context, self.excerpt_chars);
        let chain = chain::build(
            request.mode,
            &request.query,
            evidence,
            self.max_chain_statements,
        );
        let prompt = Prompt {
            query: request.query.clone(),
            instruction: chain::instruction(request.mode).to_string(),
            steps: chain.steps.clone(),
        };

        let conclusion = tokio::time::timeout(self.timeout, self.oracle.complete(&prompt))
            .await
            .map_err(|_| {
                tracing::warn!(oracle = self.oracle.name(), timeout = ?self.timeout, "oracle timed out");
                CognitiveError::OracleTimeout(self.timeout)
            })??;

        let confidence = chain::confidence(request.mode, &chain.evidence, self.abductive_ceiling);
        let duration_ms = started.elapsed().as_millis() as u64;

        tracing::debug!(
            mode = %request.mode,
            evidence = chain.evidence.len(),
            confidence,
            duration_ms,
            "analysis complete"
        );

        Ok(ReasoningResponse {
            conclusion,
            evidence: chain.evidence.into_iter().map(|e| e.citation).collect(),
            confidence,
            reasoning_chain: chain.steps,
            mode: request.mode,
            oracle: self.oracle.name().to_string(),
            duration_ms,
        })
    }
}
