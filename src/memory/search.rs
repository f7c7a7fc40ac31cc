use std::cmp::Ordering;
use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use super::store::StoredEntry;
use super::types::MemoryEntry;
use crate::config::RetrievalConfig;

// ── Public types ──────────────────────────────────────────────────────────────

/// A free-text retrieval request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetrievalQuery {
    pub query: String,
    /// Maximum number of results; the configured default applies when absent.
    #[serde(default)]
    pub limit: Option<usize>,
    /// All-of tag filter. Tags never contribute to the score.
    #[serde(default)]
    pub tags: BTreeSet<String>,
}

impl RetrievalQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }
}

/// A retrieved entry together with the relevance score that placed it.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredEntry {
    #[serde(flatten)]
    pub entry: MemoryEntry,
    /// Lexical overlap multiplied by importance, in `[0.0, 1.0]`.
    pub score: f64,
}

/// Scores and orders memory entries against a query.
///
/// The score is `overlap × importance`, where `overlap` is the fraction of
/// distinct query terms that also occur in the entry's content. Ordering is
/// by descending score, then higher importance, then more accesses, then
/// newer creation time, then ascending identifier, so a fixed store always
/// yields the same sequence.
#[derive(Debug, Clone)]
pub struct RetrievalRanker {
    relevance_floor: f64,
    default_limit: usize,
    max_limit: usize,
}

/// One ranked candidate, borrowed from the store.
pub(crate) struct Ranked<'a> {
    pub(crate) entry: &'a StoredEntry,
    pub(crate) score: f64,
    access_count: u64,
}

impl RetrievalRanker {
    pub fn new(config: &RetrievalConfig) -> Self {
        Self {
            relevance_floor: config.relevance_floor,
            default_limit: config.default_limit,
            max_limit: config.max_limit,
        }
    }

    /// The number of results a query may return after ranking.
    pub fn effective_limit(&self, query: &RetrievalQuery) -> usize {
        query.limit.unwrap_or(self.default_limit).min(self.max_limit)
    }

    /// Rank every qualifying entry. The result is complete and untruncated;
    /// callers apply the limit afterwards, so truncation never changes which
    /// entries qualified.
    pub(crate) fn rank<'a, I>(&self, query: &RetrievalQuery, entries: I) -> Vec<Ranked<'a>>
    where
        I: IntoIterator<Item = &'a StoredEntry>,
    {
        let query_terms = tokenize(&query.query);

        let mut ranked: Vec<Ranked<'a>> = entries
            .into_iter()
            .filter(|e| e.importance >= self.relevance_floor)
            .filter(|e| query.tags.iter().all(|t| e.tags.contains(t)))
            .filter_map(|e| {
                let overlap = lexical_overlap(&query_terms, &e.terms);
                if overlap <= 0.0 {
                    return None;
                }
                Some(Ranked {
                    entry: e,
                    score: overlap * e.importance,
                    access_count: e.access_count(),
                })
            })
            .collect();

        ranked.sort_by(compare_ranked);
        ranked
    }
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// Words too common to carry relevance on their own.
const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "in", "is", "it", "of", "on", "or",
    "that", "the", "this", "to", "was", "were", "with",
];

/// Split text into lowercase alphanumeric terms, dropping stopwords.
pub fn tokenize(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .filter(|w| !STOPWORDS.contains(&w.as_str()))
        .collect()
}

/// Fraction of query terms present in the content terms.
///
/// A query without terms matches everything with full overlap.
fn lexical_overlap(query_terms: &HashSet<String>, content_terms: &HashSet<String>) -> f64 {
    if query_terms.is_empty() {
        return 1.0;
    }
    let shared = query_terms
        .iter()
        .filter(|t| content_terms.contains(*t))
        .count();
    shared as f64 / query_terms.len() as f64
}

fn compare_ranked(a: &Ranked<'_>, b: &Ranked<'_>) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| b.entry.importance.total_cmp(&a.entry.importance))
        .then_with(|| b.access_count.cmp(&a.access_count))
        .then_with(|| b.entry.created_at.cmp(&a.entry.created_at))
        .then_with(|| a.entry.id.cmp(&b.entry.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::types::MemoryKind;
    use chrono::{Duration, Utc};

    fn entry(id: &str, content: &str, importance: f64, age_secs: i64) -> StoredEntry {
        StoredEntry::new(MemoryEntry {
            id: id.to_string(),
            content: content.to_string(),
            kind: MemoryKind::Semantic,
            importance,
            tags: BTreeSet::new(),
            created_at: Utc::now() - Duration::seconds(age_secs),
            access_count: 0,
        })
    }

    fn ranker() -> RetrievalRanker {
        RetrievalRanker::new(&RetrievalConfig::default())
    }

    fn ids(ranked: &[Ranked<'_>]) -> Vec<String> {
        ranked.iter().map(|r| r.entry.id.clone()).collect()
    }

    #[test]
    fn tokenize_lowercases_and_drops_stopwords() {
        let terms = tokenize("The Deploy-Pipeline is GREEN!");
        assert!(terms.contains("deploy"));
        assert!(terms.contains("pipeline"));
        assert!(terms.contains("green"));
        assert!(!terms.contains("the"));
        assert!(!terms.contains("is"));
    }

    #[test]
    fn overlap_is_fraction_of_query_terms() {
        let q = tokenize("rust borrow checker");
        let c = tokenize("the borrow checker rejects aliasing");
        assert!((lexical_overlap(&q, &c) - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn higher_score_ranks_first() {
        let entries = vec![
            entry("a", "rust compiler", 0.5, 0),
            entry("b", "rust compiler internals", 0.9, 0),
        ];
        let ranked = ranker().rank(&RetrievalQuery::new("rust compiler"), &entries);
        assert_eq!(ids(&ranked), vec!["b", "a"]);
    }

    #[test]
    fn entries_without_overlap_are_excluded() {
        let entries = vec![entry("a", "python scripts", 1.0, 0)];
        let ranked = ranker().rank(&RetrievalQuery::new("rust"), &entries);
        assert!(ranked.is_empty());
    }

    #[test]
    fn entries_below_floor_are_excluded() {
        let entries = vec![entry("a", "rust", 0.01, 0), entry("b", "rust", 0.2, 0)];
        let ranked = ranker().rank(&RetrievalQuery::new("rust"), &entries);
        assert_eq!(ids(&ranked), vec!["b"]);
    }

    #[test]
    fn ties_break_on_recency_then_id() {
        let c = entry("c", "rust", 0.5, 100);
        let a = StoredEntry::new(MemoryEntry {
            id: "a".into(),
            ..c.snapshot()
        });
        let entries = vec![c, entry("b", "rust", 0.5, 0), a];

        let ranked = ranker().rank(&RetrievalQuery::new("rust"), &entries);
        assert_eq!(ids(&ranked), vec!["b", "a", "c"]);
    }

    #[test]
    fn access_count_breaks_exact_ties() {
        let a = entry("a", "rust", 0.5, 10);
        let b = StoredEntry::new(MemoryEntry {
            id: "b".into(),
            access_count: 3,
            created_at: a.created_at,
            ..a.snapshot()
        });
        let entries = vec![a, b];
        let ranked = ranker().rank(&RetrievalQuery::new("rust"), &entries);
        assert_eq!(ids(&ranked), vec!["b", "a"]);
    }

    #[test]
    fn tag_filter_requires_all_tags() {
        let mut tagged = entry("a", "rust", 0.5, 0).snapshot();
        tagged.tags = ["lang".to_string(), "systems".to_string()].into();
        let entries = vec![StoredEntry::new(tagged), entry("b", "rust", 0.9, 0)];

        let query = RetrievalQuery::new("rust").with_tags(["lang"]);
        let ranked = ranker().rank(&query, &entries);
        assert_eq!(ids(&ranked), vec!["a"]);
    }

    #[test]
    fn empty_query_matches_everything_by_importance() {
        let entries = vec![entry("a", "alpha", 0.3, 0), entry("b", "beta", 0.8, 0)];
        let ranked = ranker().rank(&RetrievalQuery::new(""), &entries);
        assert_eq!(ids(&ranked), vec!["b", "a"]);
    }

    #[test]
    fn effective_limit_defaults_and_caps() {
        let r = ranker();
        assert_eq!(r.effective_limit(&RetrievalQuery::new("x")), 10);
        assert_eq!(r.effective_limit(&RetrievalQuery::new("x").with_limit(3)), 3);
        assert_eq!(r.effective_limit(&RetrievalQuery::new("x").with_limit(10_000)), 100);
    }
}
