//! MCP `analyze` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct AnalyzeParams {
    #[schemars(description = "The question or statement to reason about")]
    pub query: String,

    #[schemars(
        description = "Optional structured context. Its string values may be cited as evidence."
    )]
    pub context: Option<serde_json::Value>,

    #[schemars(
        description = "Reasoning mode: 'deductive' (general to specific), 'inductive' (observations to generalization), 'abductive' (best explanation, capped confidence). Defaults to deductive."
    )]
    pub mode: Option<String>,
}
