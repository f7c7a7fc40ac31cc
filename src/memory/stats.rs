use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use super::store::StoredEntry;
use super::types::MemoryKind;

/// Fixed per-entry overhead counted by the storage estimate (timestamps, counters, kind, importance).
const ENTRY_OVERHEAD_BYTES: u64 = 40;

/// Read-only aggregate over the memory store, computed on demand.
#[derive(Debug, Clone, Serialize)]
pub struct MemoryStats {
    pub total: u64,
    /// Entries created inside the rolling recent window.
    pub recent: u64,
    pub by_kind: BTreeMap<String, u64>,
    /// Approximate in-memory footprint of all entries.
    pub storage_bytes: u64,
    pub total_accesses: u64,
    pub mean_importance: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oldest_memory: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub newest_memory: Option<DateTime<Utc>>,
}

/// Aggregate a set of entries as of `now`.
pub(crate) fn compute<'a, I>(entries: I, now: DateTime<Utc>, recent_window: Duration) -> MemoryStats
where
    I: IntoIterator<Item = &'a StoredEntry>,
{
    let mut by_kind: BTreeMap<String, u64> = MemoryKind::ALL
        .iter()
        .map(|k| (k.as_str().to_string(), 0))
        .collect();

    let cutoff = now - recent_window;
    let mut total = 0u64;
    let mut recent = 0u64;
    let mut storage_bytes = 0u64;
    let mut total_accesses = 0u64;
    let mut importance_sum = 0.0;
    let mut oldest: Option<DateTime<Utc>> = None;
    let mut newest: Option<DateTime<Utc>> = None;

    for entry in entries {
        total += 1;
        if entry.created_at >= cutoff {
            recent += 1;
        }
        *by_kind.entry(entry.kind.as_str().to_string()).or_insert(0) += 1;
        storage_bytes += entry_size(entry);
        total_accesses += entry.access_count();
        importance_sum += entry.importance;
        oldest = Some(oldest.map_or(entry.created_at, |t| t.min(entry.created_at)));
        newest = Some(newest.map_or(entry.created_at, |t| t.max(entry.created_at)));
    }

    let mean_importance = if total == 0 {
        0.0
    } else {
        importance_sum / total as f64
    };

    MemoryStats {
        total,
        recent,
        by_kind,
        storage_bytes,
        total_accesses,
        mean_importance,
        oldest_memory: oldest,
        newest_memory: newest,
    }
}

fn entry_size(entry: &StoredEntry) -> u64 {
    let tag_bytes: usize = entry.tags.iter().map(String::len).sum();
    (entry.id.len() + entry.content.len() + tag_bytes) as u64 + ENTRY_OVERHEAD_BYTES
}
