//! Offline oracle that answers from the reasoning chain itself.
//!
//! Deterministic: the conclusion is the chain's closing statement, introduced
//! according to whether the query reads as a question. Used when no language
//! model is attached.

use async_trait::async_trait;

use super::{Prompt, TextOracle};
use crate::error::{CognitiveError, Result};

const QUESTION_WORDS: &[&str] = &["what", "how", "why", "when", "where", "which", "who"];

#[derive(Debug, Clone, Copy, Default)]
pub struct ExtractiveOracle;

fn is_question(query: &str) -> bool {
    let trimmed = query.trim();
    if trimmed.ends_with('?') {
        return true;
    }
    trimmed
        .split_whitespace()
        .next()
        .map(|w| QUESTION_WORDS.contains(&w.to_lowercase().as_str()))
        .unwrap_or(false)
}

#[async_trait]
impl TextOracle for ExtractiveOracle {
    fn name(&self) -> &str {
        "extractive"
    }

    async fn complete(&self, prompt: &Prompt) -> Result<String> {
        let closing = prompt
            .steps
            .last()
            .ok_or_else(|| CognitiveError::Oracle("no reasoning steps to conclude from".into()))?;

        let lead = if is_question(&prompt.query) {
            "In answer to"
        } else {
            "Regarding"
        };
        let support = prompt.steps.len() - 1;
        Ok(match support {
            0 => format!("{lead} \"{}\": {closing}", prompt.query.trim()),
            n => format!(
                "{lead} \"{}\": {closing} (drawing on {n} supporting statement{})",
                prompt.query.trim(),
                if n == 1 { "" } else { "s" }
            ),
        })
    }
}
