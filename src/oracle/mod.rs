//! Text-completion oracles used for the final synthesis step of reasoning.
//!
//! Provides the [`TextOracle`] trait and two implementations: an HTTP client
//! for a local Ollama server and an offline extractive oracle. The oracle is
//! created via [`create_oracle`] from configuration.

pub mod extractive;
pub mod ollama;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::OracleConfig;
use crate::error::Result;

/// What the reasoning engine hands to an oracle.
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    pub query: String,
    /// How the conclusion should be framed for the reasoning mode.
    pub instruction: String,
    /// The ordered reasoning chain.
    pub steps: Vec<String>,
}

impl Prompt {
    /// Flatten into a single plain-text prompt for text models.
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&self.instruction);
        out.push_str("\n\nQuestion: ");
        out.push_str(&self.query);
        out.push_str("\n\nReasoning steps:\n");
        for (i, step) in self.steps.iter().enumerate() {
            out.push_str(&format!("{}. {}\n", i + 1, step));
        }
        out.push_str("\nState the conclusion in one or two sentences.\nConclusion:");
        out
    }
}

/// Opaque text-completion oracle.
///
/// Implementations are not retried by callers; a call may have side effects
/// on the remote end.
#[async_trait]
pub trait TextOracle: Send + Sync {
    /// Short provider label reported alongside conclusions.
    fn name(&self) -> &str;

    async fn complete(&self, prompt: &Prompt) -> Result<String>;
}

/// Create an oracle from config.
///
/// Supported providers: `"extractive"` (offline) and `"ollama"`.
pub fn create_oracle(config: &OracleConfig) -> anyhow::Result<Arc<dyn TextOracle>> {
    match config.provider.as_str() {
        "extractive" => Ok(Arc::new(extractive::ExtractiveOracle)),
        "ollama" => {
            let oracle = ollama::OllamaOracle::new(config)?;
            Ok(Arc::new(oracle))
        }
        other => anyhow::bail!("unknown oracle provider: {other}. Supported: extractive, ollama"),
    }
}
