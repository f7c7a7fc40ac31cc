//! The assembled cognitive core.
//!
//! [`Cognition`] is constructed once from configuration, restores every
//! component from the journal when persistence is on, and wires the data flow
//! between them: experiences feed the learning tracker (and, optionally, the
//! memory store), analysis retrieves before reasoning, and evolution reads
//! snapshots of both.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use serde::Serialize;

use crate::config::CognisConfig;
use crate::db::Journal;
use crate::error::{CognitiveError, Result};
use crate::evolution::{CycleOutcome, EvolutionScheduler, EvolutionStatus};
use crate::learning::{self, LearningExperience, LearningState, LearningStats, LearningTracker};
use crate::memory::{MemoryEntry, MemoryKind, MemoryStats, MemoryStore, RetrievalQuery, ScoredEntry};
use crate::oracle::{create_oracle, TextOracle};
use crate::reasoning::{ReasoningEngine, ReasoningRequest, ReasoningResponse};

/// Tag carried by memories created from recorded experiences.
pub const EXPERIENCE_TAG: &str = "experience";

/// Requests served by this process since startup, successful or not.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OperationCounts {
    /// Stores and retrievals.
    pub memory_operations: u64,
    pub reasoning_requests: u64,
    pub learning_sessions: u64,
}

#[derive(Default)]
struct OperationCounters {
    memory: AtomicU64,
    reasoning: AtomicU64,
    learning: AtomicU64,
}

impl OperationCounters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> OperationCounts {
        OperationCounts {
            memory_operations: self.memory.load(Ordering::Relaxed),
            reasoning_requests: self.reasoning.load(Ordering::Relaxed),
            learning_sessions: self.learning.load(Ordering::Relaxed),
        }
    }
}

pub struct Cognition {
    config: CognisConfig,
    memory: Arc<MemoryStore>,
    learning: Arc<LearningTracker>,
    evolution: Arc<EvolutionScheduler>,
    reasoning: ReasoningEngine,
    journal: Option<Journal>,
    operations: OperationCounters,
}

impl Cognition {
    /// Build every component from `config`, opening the journal if persistence is on.
    pub fn from_config(config: CognisConfig) -> anyhow::Result<Self> {
        let oracle = create_oracle(&config.oracle)?;
        let journal = if config.storage.persist {
            let path = config.resolved_db_path();
            let journal = Journal::open(&path)
                .with_context(|| format!("failed to open journal at {}", path.display()))?;
            tracing::info!(path = %path.display(), "journal opened");
            Some(journal)
        } else {
            None
        };
        Ok(Self::new(config, oracle, journal)?)
    }

    /// Build from explicit parts.
    pub fn new(
        config: CognisConfig,
        oracle: Arc<dyn TextOracle>,
        journal: Option<Journal>,
    ) -> Result<Self> {
        let (memory, learning) = match &journal {
            Some(j) => (
                MemoryStore::with_journal(&config.retrieval, j.clone())?,
                LearningTracker::with_journal(&config.learning, j.clone())?,
            ),
            None => (
                MemoryStore::new(&config.retrieval),
                LearningTracker::new(&config.learning),
            ),
        };
        let memory = Arc::new(memory);
        let learning = Arc::new(learning);

        let evolution = match &journal {
            Some(j) => EvolutionScheduler::with_journal(
                &config.evolution,
                Arc::clone(&memory),
                Arc::clone(&learning),
                j.clone(),
            )?,
            None => EvolutionScheduler::new(
                &config.evolution,
                Arc::clone(&memory),
                Arc::clone(&learning),
            )?,
        };
        let reasoning = ReasoningEngine::new(&config.reasoning, oracle);

        tracing::info!(
            oracle = reasoning.oracle_name(),
            persistent = journal.is_some(),
            "cognitive core ready"
        );

        Ok(Self {
            config,
            memory,
            learning,
            evolution: Arc::new(evolution),
            reasoning,
            journal,
            operations: OperationCounters::default(),
        })
    }

    pub fn config(&self) -> &CognisConfig {
        &self.config
    }

    pub fn memory(&self) -> &Arc<MemoryStore> {
        &self.memory
    }

    pub fn learning(&self) -> &Arc<LearningTracker> {
        &self.learning
    }

    pub fn evolution(&self) -> &Arc<EvolutionScheduler> {
        &self.evolution
    }

    pub fn reasoning(&self) -> &ReasoningEngine {
        &self.reasoning
    }

    pub fn journal(&self) -> Option<&Journal> {
        self.journal.as_ref()
    }

    pub fn operations(&self) -> OperationCounts {
        self.operations.snapshot()
    }

    // ── Memory ────────────────────────────────────────────────────────────────

    pub fn store(
        &self,
        content: &str,
        kind: MemoryKind,
        importance: f64,
        tags: &[String],
    ) -> Result<MemoryEntry> {
        OperationCounters::bump(&self.operations.memory);
        self.memory.store(content, kind, importance, tags)
    }

    pub fn retrieve(&self, query: &RetrievalQuery) -> Result<Vec<ScoredEntry>> {
        OperationCounters::bump(&self.operations.memory);
        self.memory.retrieve(query)
    }

    pub fn memory_stats(&self) -> Result<MemoryStats> {
        self.memory.stats()
    }

    // ── Reasoning ─────────────────────────────────────────────────────────────

    /// Retrieve memories for the query, then reason over them.
    pub async fn analyze(&self, request: &ReasoningRequest) -> Result<ReasoningResponse> {
        OperationCounters::bump(&self.operations.reasoning);
        let memory = Arc::clone(&self.memory);
        let query = RetrievalQuery::new(request.query.clone());
        let memories = tokio::task::spawn_blocking(move || memory.retrieve(&query))
            .await
            .map_err(|e| CognitiveError::Internal(format!("retrieval task failed: {e}")))??;
        self.reasoning.analyze(request, &memories).await
    }

    // ── Learning ──────────────────────────────────────────────────────────────

    /// Record an experience and, when configured, remember it as an episodic memory.
    ///
    /// Both writes happen under [`EvolutionScheduler::hold_snapshots`], so an
    /// evolution cycle sees the new adaptation and the remembered experience
    /// together or not at all.
    pub fn record(&self, experience: LearningExperience) -> Result<LearningState> {
        OperationCounters::bump(&self.operations.learning);
        let polarity = learning::classify(&experience);
        let remembered = self.config.learning.remember_experiences.then(|| {
            (
                format!("{} → {}", experience.experience.trim(), experience.outcome.trim()),
                experience
                    .importance
                    .unwrap_or(self.config.learning.default_importance),
            )
        });

        let _hold = self.evolution.hold_snapshots()?;
        let state = self.learning.record(experience)?;

        if let Some((content, importance)) = remembered {
            let tags = [EXPERIENCE_TAG, polarity.as_str()];
            if let Err(e) = self.memory.store(&content, MemoryKind::Episodic, importance, tags) {
                tracing::warn!(error = %e, "failed to remember experience as a memory");
            }
        }
        Ok(state)
    }

    /// Learning report. Resets knowledge growth.
    pub fn learning_stats(&self) -> Result<LearningStats> {
        self.learning.stats()
    }

    // ── Evolution ─────────────────────────────────────────────────────────────

    pub fn evolution_status(&self) -> Result<EvolutionStatus> {
        self.evolution.status()
    }

    pub fn trigger_evolution(&self) -> Result<CycleOutcome> {
        self.evolution.trigger()
    }

    /// Start the periodic evolution loop if enabled in config.
    pub fn spawn_background(&self) -> Option<tokio::task::JoinHandle<()>> {
        if !self.config.evolution.enabled {
            return None;
        }
        let interval = Duration::from_secs(self.config.evolution.interval_secs);
        tracing::info!(interval_secs = interval.as_secs(), "periodic evolution enabled");
        Some(Arc::clone(&self.evolution).spawn_periodic(interval))
    }
}
