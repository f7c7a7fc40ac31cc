//! Core memory type definitions.
//!
//! Defines [`MemoryKind`] (the three cognitive memory categories) and
//! [`MemoryEntry`] (a full record as handed to callers).

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CognitiveError;

/// Importance assumed when a caller does not supply one.
pub const DEFAULT_IMPORTANCE: f64 = 0.5;

/// The three cognitive memory kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryKind {
    /// A recollection tied to a specific occurrence.
    Episodic,
    /// General factual knowledge, not tied to an event.
    Semantic,
    /// A learned process or method.
    Procedural,
}

impl MemoryKind {
    pub const ALL: [MemoryKind; 3] = [Self::Episodic, Self::Semantic, Self::Procedural];

    /// SQL-compatible string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Episodic => "episodic",
            Self::Semantic => "semantic",
            Self::Procedural => "procedural",
        }
    }

    /// Whether entries of this kind state general rules rather than specific observations.
    pub fn is_general(&self) -> bool {
        matches!(self, Self::Semantic | Self::Procedural)
    }
}

impl std::fmt::Display for MemoryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MemoryKind {
    type Err = CognitiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "episodic" => Ok(Self::Episodic),
            "semantic" => Ok(Self::Semantic),
            "procedural" => Ok(Self::Procedural),
            _ => Err(CognitiveError::Validation(format!(
                "unknown memory kind: {s} (expected episodic, semantic, or procedural)"
            ))),
        }
    }
}

/// A memory record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryEntry {
    /// UUID v7 (time-sortable), never reused.
    pub id: String,
    pub content: String,
    pub kind: MemoryKind,
    /// Caller-assigned weight in `[0.0, 1.0]`, fixed at write time.
    pub importance: f64,
    pub tags: BTreeSet<String>,
    pub created_at: DateTime<Utc>,
    /// Number of completed retrievals whose result included this entry.
    pub access_count: u64,
}
