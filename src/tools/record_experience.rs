//! MCP `record_experience` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct RecordExperienceParams {
    #[schemars(description = "What was attempted or happened")]
    pub experience: String,

    #[schemars(description = "What came of it, e.g. 'success' or 'failed with timeout'")]
    pub outcome: String,

    #[schemars(
        description = "Optional explicit feedback. When it expresses a polarity it overrides the outcome text."
    )]
    pub feedback: Option<String>,

    #[schemars(description = "Weight 0.0-1.0. Defaults to 0.5.")]
    pub importance: Option<f64>,
}
