//! MCP `store_memory` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct StoreMemoryParams {
    #[schemars(description = "The natural language content of the memory")]
    pub content: String,

    #[schemars(
        description = "Memory kind: 'episodic' (a specific event), 'semantic' (general facts/knowledge), 'procedural' (how-to/processes)"
    )]
    pub kind: String,

    #[schemars(
        description = "Importance 0.0-1.0. Out-of-range values are clamped. Defaults to 0.5."
    )]
    pub importance: Option<f64>,

    #[schemars(description = "Optional tags. Tags filter retrieval but never affect ranking.")]
    #[serde(default)]
    pub tags: Vec<String>,
}
