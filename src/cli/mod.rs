//! Offline terminal commands. Each opens the configured journal, restores the
//! cognitive core from it, and prints a report.

pub mod doctor;
pub mod evolve;
pub mod search;
pub mod stats;

pub use doctor::doctor;
pub use evolve::evolve;
pub use search::search;
pub use stats::stats;

use anyhow::Result;

use crate::cognition::Cognition;
use crate::config::CognisConfig;

/// Restore the core for a one-shot command, warning when nothing is persisted.
fn open_core(config: &CognisConfig) -> Result<Cognition> {
    if !config.storage.persist {
        println!("Note: storage.persist is off; showing an empty in-memory state.");
        println!();
    }
    Cognition::from_config(config.clone())
}

/// Truncate on a char boundary for single-line previews.
fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
