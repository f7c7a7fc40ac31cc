//! MCP `recall_memory` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `recall_memory` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct RecallMemoryParams {
    /// Free-text query. An empty query matches every entry above the relevance floor.
    #[schemars(description = "Free-text query matched against memory content by term overlap")]
    pub query: String,

    /// Maximum number of results. Defaults to the configured limit.
    #[schemars(description = "Maximum number of results to return. Defaults to 10, capped at 100.")]
    pub limit: Option<usize>,

    /// Only return memories carrying all of these tags.
    #[schemars(description = "Only return memories that carry all of these tags")]
    #[serde(default)]
    pub tags: Vec<String>,
}
