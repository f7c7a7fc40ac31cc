//! Error taxonomy for the cognitive core.
//!
//! Every public operation on the memory store, reasoning engine, learning
//! tracker, and evolution scheduler returns [`Result`]. Programming-logic
//! faults (a generation that fails to advance, an overflowing counter) are
//! not represented here; they panic, because they mean the in-memory state
//! is corrupt.

use std::time::Duration;

use thiserror::Error;

/// Errors surfaced by the cognitive core.
#[derive(Error, Debug)]
pub enum CognitiveError {
    /// Malformed input (unknown kind or mode, empty content, non-finite importance).
    #[error("validation error: {0}")]
    Validation(String),

    /// Reasoning was asked to conclude with no retrieved memories and no context.
    #[error("insufficient evidence: no memories matched and no context was supplied")]
    InsufficientEvidence,

    /// The text-completion oracle did not answer within the configured timeout.
    #[error("oracle timed out after {0:?}")]
    OracleTimeout(Duration),

    /// An evolution cycle is already in progress.
    #[error("an evolution cycle is already running")]
    AlreadyRunning,

    /// The oracle answered with a transport or protocol failure.
    #[error("oracle error: {0}")]
    Oracle(String),

    /// The on-disk journal failed.
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// A lock was poisoned by a panicking writer.
    #[error("internal error: {0}")]
    Internal(String),
}

impl CognitiveError {
    /// Whether the caller may retry (possibly after broadening the query or backing off).
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::InsufficientEvidence | Self::OracleTimeout(_) | Self::Oracle(_)
        )
    }

    /// Stable snake_case label used in API error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::InsufficientEvidence => "insufficient_evidence",
            Self::OracleTimeout(_) => "oracle_timeout",
            Self::AlreadyRunning => "already_running",
            Self::Oracle(_) => "oracle_error",
            Self::Storage(_) => "storage_error",
            Self::Internal(_) => "internal_error",
        }
    }

    pub(crate) fn poisoned(what: &str) -> Self {
        Self::Internal(format!("{what} lock poisoned"))
    }
}

/// Result alias for cognitive core operations.
pub type Result<T> = std::result::Result<T, CognitiveError>;
