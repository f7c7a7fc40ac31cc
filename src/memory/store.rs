//! Write and read paths for memory entries.
//!
//! [`MemoryStore`] owns every [`MemoryEntry`]. Inserts are published under a
//! short write lock so readers never see a half-built entry; retrievals only
//! take the read lock and bump access counters atomically, so concurrent
//! retrievals of the same entry are all counted.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Duration, Utc};

use super::search::{tokenize, RetrievalQuery, RetrievalRanker, ScoredEntry};
use super::stats::{self, MemoryStats};
use super::types::{MemoryEntry, MemoryKind};
use crate::config::RetrievalConfig;
use crate::db::Journal;
use crate::error::{CognitiveError, Result};

/// An entry as held by the store: immutable fields plus a live access counter.
#[derive(Debug)]
pub(crate) struct StoredEntry {
    pub(crate) id: String,
    pub(crate) content: String,
    pub(crate) kind: MemoryKind,
    pub(crate) importance: f64,
    pub(crate) tags: BTreeSet<String>,
    pub(crate) created_at: DateTime<Utc>,
    /// Content terms, computed once at insert.
    pub(crate) terms: HashSet<String>,
    access_count: AtomicU64,
}

impl StoredEntry {
    pub(crate) fn new(entry: MemoryEntry) -> Self {
        let terms = tokenize(&entry.content);
        Self {
            id: entry.id,
            content: entry.content,
            kind: entry.kind,
            importance: entry.importance,
            tags: entry.tags,
            created_at: entry.created_at,
            terms,
            access_count: AtomicU64::new(entry.access_count),
        }
    }

    pub(crate) fn access_count(&self) -> u64 {
        self.access_count.load(Ordering::Acquire)
    }

    /// Count one more retrieval and return the new total.
    fn record_access(&self) -> u64 {
        let previous = self.access_count.fetch_add(1, Ordering::AcqRel);
        assert!(previous < u64::MAX, "access counter overflow on {}", self.id);
        previous + 1
    }

    pub(crate) fn snapshot(&self) -> MemoryEntry {
        self.to_entry(self.access_count())
    }

    fn to_entry(&self, access_count: u64) -> MemoryEntry {
        MemoryEntry {
            id: self.id.clone(),
            content: self.content.clone(),
            kind: self.kind,
            importance: self.importance,
            tags: self.tags.clone(),
            created_at: self.created_at,
            access_count,
        }
    }
}

/// Clamp a caller-supplied importance into `[0, 1]`.
///
/// Out-of-range values are clamped, never rejected; only NaN and infinities
/// are refused because they have no meaningful position in the range.
pub fn clamp_importance(importance: f64) -> Result<f64> {
    if !importance.is_finite() {
        return Err(CognitiveError::Validation(format!(
            "importance must be a finite number, got {importance}"
        )));
    }
    Ok(importance.clamp(0.0, 1.0))
}

/// The typed memory store.
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, Arc<StoredEntry>>>,
    ranker: RetrievalRanker,
    recent_window: Duration,
    journal: Option<Journal>,
}

impl MemoryStore {
    /// An empty, purely in-memory store.
    pub fn new(config: &RetrievalConfig) -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
            ranker: RetrievalRanker::new(config),
            recent_window: Duration::hours(config.recent_window_hours),
            journal: None,
        }
    }

    /// A store backed by a journal, pre-loaded with every journaled entry.
    pub fn with_journal(config: &RetrievalConfig, journal: Journal) -> Result<Self> {
        let loaded = journal.load_memories()?;
        let count = loaded.len();
        let entries = loaded
            .into_iter()
            .map(|e| (e.id.clone(), Arc::new(StoredEntry::new(e))))
            .collect();

        tracing::info!(entries = count, "memory store restored from journal");

        Ok(Self {
            entries: RwLock::new(entries),
            ranker: RetrievalRanker::new(config),
            recent_window: Duration::hours(config.recent_window_hours),
            journal: Some(journal),
        })
    }

    /// Store a new entry. Importance is clamped into `[0, 1]`; blank tags are dropped.
    pub fn store<I, S>(
        &self,
        content: &str,
        kind: MemoryKind,
        importance: f64,
        tags: I,
    ) -> Result<MemoryEntry>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if content.trim().is_empty() {
            return Err(CognitiveError::Validation("content must not be empty".into()));
        }
        let importance = clamp_importance(importance)?;
        let tags: BTreeSet<String> = tags
            .into_iter()
            .map(|t| t.as_ref().trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();

        let entry = MemoryEntry {
            id: uuid::Uuid::now_v7().to_string(),
            content: content.to_string(),
            kind,
            importance,
            tags,
            created_at: Utc::now(),
            access_count: 0,
        };

        // Journal first: an entry that could not be made durable is never published.
        if let Some(journal) = &self.journal {
            journal.insert_memory(&entry)?;
        }

        let stored = Arc::new(StoredEntry::new(entry.clone()));
        self.entries
            .write()
            .map_err(|_| CognitiveError::poisoned("memory store"))?
            .insert(entry.id.clone(), stored);

        tracing::debug!(id = %entry.id, kind = %entry.kind, importance = entry.importance, "memory stored");
        Ok(entry)
    }

    /// Rank entries against `query`, truncate to the effective limit, and count
    /// one access on every returned entry.
    pub fn retrieve(&self, query: &RetrievalQuery) -> Result<Vec<ScoredEntry>> {
        let results = self.ranked(query, true)?;

        if let Some(journal) = &self.journal {
            let ids: Vec<&str> = results.iter().map(|r| r.entry.id.as_str()).collect();
            if let Err(e) = journal.record_access(&ids) {
                tracing::warn!(error = %e, "failed to journal access counts");
            }
        }

        tracing::debug!(query = %query.query, returned = results.len(), "memories retrieved");
        Ok(results)
    }

    /// Rank like [`retrieve`](Self::retrieve) without counting an access,
    /// in memory or in the journal.
    ///
    /// For readers that do not own the journal, such as offline commands run
    /// beside a server whose in-memory counters would never see the access.
    pub fn peek(&self, query: &RetrievalQuery) -> Result<Vec<ScoredEntry>> {
        self.ranked(query, false)
    }

    fn ranked(&self, query: &RetrievalQuery, count_access: bool) -> Result<Vec<ScoredEntry>> {
        let limit = self.ranker.effective_limit(query);
        let entries = self
            .entries
            .read()
            .map_err(|_| CognitiveError::poisoned("memory store"))?;

        let mut ranked = self
            .ranker
            .rank(query, entries.values().map(|e| e.as_ref()));
        ranked.truncate(limit);

        Ok(ranked
            .into_iter()
            .map(|r| {
                let entry = if count_access {
                    r.entry.to_entry(r.entry.record_access())
                } else {
                    r.entry.snapshot()
                };
                ScoredEntry {
                    entry,
                    score: r.score,
                }
            })
            .collect())
    }

    /// Look up a single entry without counting an access.
    pub fn get(&self, id: &str) -> Result<Option<MemoryEntry>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| CognitiveError::poisoned("memory store"))?;
        Ok(entries.get(id).map(|e| e.snapshot()))
    }

    pub fn contains(&self, id: &str) -> Result<bool> {
        let entries = self
            .entries
            .read()
            .map_err(|_| CognitiveError::poisoned("memory store"))?;
        Ok(entries.contains_key(id))
    }

    /// Aggregate statistics, computed fresh on every call.
    pub fn stats(&self) -> Result<MemoryStats> {
        let entries = self
            .entries
            .read()
            .map_err(|_| CognitiveError::poisoned("memory store"))?;
        Ok(stats::compute(
            entries.values().map(|e| e.as_ref()),
            Utc::now(),
            self.recent_window,
        ))
    }

    pub fn len(&self) -> Result<usize> {
        let entries = self
            .entries
            .read()
            .map_err(|_| CognitiveError::poisoned("memory store"))?;
        Ok(entries.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}
