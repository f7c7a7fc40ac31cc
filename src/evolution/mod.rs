//! Evolution scheduler: a guarded Idle/Running cycle that advances the
//! generation counter and recomputes fitness from learning and memory
//! snapshots.
//!
//! At most one cycle runs at a time. A second `trigger()` while a cycle is
//! running fails fast with [`CognitiveError::AlreadyRunning`]; it never waits.
//! Stores, retrievals, and recorded experiences stay available during a cycle
//! because the cycle only reads snapshots.
//!
//! With a journal, the next generation is chosen under the database write
//! lock. Cycles appended by another process sharing the journal (the `evolve`
//! command next to a running server) are folded in first, so generations stay
//! consecutive across processes.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::EvolutionConfig;
use crate::db::Journal;
use crate::error::{CognitiveError, Result};
use crate::learning::LearningTracker;
use crate::memory::MemoryStore;

/// Weight of the adaptation score in fitness; the remainder goes to memory health.
const ADAPTATION_WEIGHT: f64 = 0.6;
/// Store size at which memory volume contributes half its weight.
const MEMORY_HALF_SATURATION: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleState {
    Idle,
    Running,
}

/// One entry in the append-only improvement log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Improvement {
    pub generation: u64,
    pub description: String,
    pub recorded_at: DateTime<Utc>,
}

/// A completed cycle as journaled.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleRecord {
    pub generation: u64,
    pub fitness_score: f64,
    /// Mutations detected in this cycle alone.
    pub mutations: u64,
    pub adaptation_score: f64,
    pub memory_total: u64,
    pub improvements: Vec<String>,
    pub completed_at: DateTime<Utc>,
}

/// What a successful `trigger()` produced.
#[derive(Debug, Clone, Serialize)]
pub struct CycleOutcome {
    pub generation: u64,
    pub fitness_score: f64,
    pub mutations: u64,
    pub improvements: Vec<String>,
    pub completed_at: DateTime<Utc>,
}

/// One point on the fitness trajectory.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleSummary {
    pub generation: u64,
    pub fitness_score: f64,
    pub mutations: u64,
    /// Fitness fell below the previous cycle's.
    pub fitness_declined: bool,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EvolutionStatus {
    pub generation: u64,
    pub fitness_score: f64,
    pub mutation_count: u64,
    /// Most recent improvements, oldest first.
    pub improvements: Vec<Improvement>,
    /// Most recent completed cycles, oldest first.
    pub recent_cycles: Vec<CycleSummary>,
    pub last_evolution: Option<DateTime<Utc>>,
    pub state: CycleState,
    /// Fitness computed from the live snapshots, without advancing the generation.
    pub current_fitness: f64,
}

/// The aggregates a cycle reads, captured once at cycle start.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Observation {
    adaptation: f64,
    memory_total: u64,
    mean_importance: f64,
}

impl Observation {
    fn fitness(&self) -> f64 {
        let total = self.memory_total as f64;
        let volume = total / (total + MEMORY_HALF_SATURATION);
        let score = ADAPTATION_WEIGHT * (self.adaptation / 100.0)
            + (1.0 - ADAPTATION_WEIGHT) * self.mean_importance * volume;
        score.clamp(0.0, 1.0)
    }
}

struct EvolutionState {
    generation: u64,
    fitness: f64,
    mutation_count: u64,
    improvements: Vec<Improvement>,
    history: VecDeque<CycleSummary>,
    last_evolution: Option<DateTime<Utc>>,
    /// What the previous cycle (or construction) observed; deltas are measured from here.
    baseline: Observation,
}

impl EvolutionState {
    /// Fold one completed cycle into the state.
    ///
    /// Panics unless `cycle` is the next generation.
    fn apply(&mut self, cycle: &CycleRecord, observed: Observation, history_limit: usize) {
        let previous = self.generation;
        assert_eq!(
            cycle.generation,
            previous + 1,
            "generation must advance by exactly one"
        );
        let fitness_declined = previous > 0 && cycle.fitness_score < self.fitness;

        self.generation = cycle.generation;
        self.fitness = cycle.fitness_score;
        self.mutation_count = self
            .mutation_count
            .checked_add(cycle.mutations)
            .expect("mutation counter overflow");
        self.last_evolution = Some(cycle.completed_at);
        self.baseline = observed;
        self.improvements
            .extend(cycle.improvements.iter().map(|d| Improvement {
                generation: cycle.generation,
                description: d.clone(),
                recorded_at: cycle.completed_at,
            }));
        self.history.push_back(CycleSummary {
            generation: cycle.generation,
            fitness_score: cycle.fitness_score,
            mutations: cycle.mutations,
            fitness_declined,
            completed_at: cycle.completed_at,
        });
        while self.history.len() > history_limit {
            self.history.pop_front();
        }
    }

    /// Fold in cycles journaled elsewhere, rejecting gaps in the generation sequence.
    fn catch_up(&mut self, cycles: &[CycleRecord], history_limit: usize) -> Result<()> {
        for cycle in cycles {
            if cycle.generation != self.generation + 1 {
                return Err(CognitiveError::Internal(format!(
                    "journaled generation {} follows {}",
                    cycle.generation, self.generation
                )));
            }
            let observed = Observation {
                adaptation: cycle.adaptation_score,
                memory_total: cycle.memory_total,
                mean_importance: self.baseline.mean_importance,
            };
            self.apply(cycle, observed, history_limit);
        }
        Ok(())
    }
}

pub struct EvolutionScheduler {
    memory: Arc<MemoryStore>,
    learning: Arc<LearningTracker>,
    significance_threshold: f64,
    report_limit: usize,
    history_limit: usize,
    running: AtomicBool,
    state: Mutex<EvolutionState>,
    /// Held exclusively while observing; writers spanning components hold it shared.
    snapshot_gate: RwLock<()>,
    journal: Option<Journal>,
}

impl EvolutionScheduler {
    pub fn new(
        config: &EvolutionConfig,
        memory: Arc<MemoryStore>,
        learning: Arc<LearningTracker>,
    ) -> Result<Self> {
        let baseline = read_observation(&memory, &learning)?;
        Ok(Self {
            memory,
            learning,
            significance_threshold: config.significance_threshold,
            report_limit: config.report_limit,
            history_limit: config.history_limit.max(1),
            running: AtomicBool::new(false),
            state: Mutex::new(EvolutionState {
                generation: 0,
                fitness: baseline.fitness(),
                mutation_count: 0,
                improvements: Vec::new(),
                history: VecDeque::new(),
                last_evolution: None,
                baseline,
            }),
            snapshot_gate: RwLock::new(()),
            journal: None,
        })
    }

    /// A scheduler that journals each cycle, resuming from the journaled history.
    pub fn with_journal(
        config: &EvolutionConfig,
        memory: Arc<MemoryStore>,
        learning: Arc<LearningTracker>,
        journal: Journal,
    ) -> Result<Self> {
        let mut scheduler = Self::new(config, memory, learning)?;
        let cycles = journal.load_cycles()?;
        {
            let history_limit = scheduler.history_limit;
            let state = scheduler
                .state
                .get_mut()
                .map_err(|_| CognitiveError::poisoned("evolution state"))?;
            state.catch_up(&cycles, history_limit)?;
            tracing::info!(
                generation = state.generation,
                cycles = cycles.len(),
                "evolution state restored from journal"
            );
        }
        scheduler.journal = Some(journal);
        Ok(scheduler)
    }

    /// Move Idle → Running, or fail with `AlreadyRunning`.
    ///
    /// The returned guard moves back to Idle when dropped, whether or not the
    /// cycle was completed.
    pub fn begin(&self) -> Result<CycleGuard<'_>> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| CognitiveError::AlreadyRunning)?;
        Ok(CycleGuard { scheduler: self })
    }

    /// Run one full cycle.
    pub fn trigger(&self) -> Result<CycleOutcome> {
        self.begin()?.complete()
    }

    pub fn state(&self) -> CycleState {
        if self.running.load(Ordering::Acquire) {
            CycleState::Running
        } else {
            CycleState::Idle
        }
    }

    pub fn status(&self) -> Result<EvolutionStatus> {
        let current_fitness = self.observe()?.fitness();
        let state = self.lock()?;
        let skip = state.improvements.len().saturating_sub(self.report_limit);
        let cycles_skip = state.history.len().saturating_sub(self.report_limit);
        Ok(EvolutionStatus {
            generation: state.generation,
            fitness_score: state.fitness,
            mutation_count: state.mutation_count,
            improvements: state.improvements[skip..].to_vec(),
            recent_cycles: state.history.iter().skip(cycles_skip).cloned().collect(),
            last_evolution: state.last_evolution,
            state: self.state(),
            current_fitness,
        })
    }

    /// Up to `limit` most recent cycles, oldest first.
    pub fn history(&self, limit: usize) -> Result<Vec<CycleSummary>> {
        let state = self.lock()?;
        let skip = state.history.len().saturating_sub(limit);
        Ok(state.history.iter().skip(skip).cloned().collect())
    }

    /// Hold off cycle observations until the returned guard drops.
    ///
    /// Held across a write that touches both the learning tracker and the
    /// memory store, so a cycle observes all of it or none of it.
    pub fn hold_snapshots(&self) -> Result<RwLockReadGuard<'_, ()>> {
        self.snapshot_gate
            .read()
            .map_err(|_| CognitiveError::poisoned("snapshot gate"))
    }

    /// Trigger a cycle every `interval` until the task is aborted.
    ///
    /// Ticks that land while a cycle is already running are skipped.
    pub fn spawn_periodic(self: Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // The first tick fires immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let scheduler = Arc::clone(&self);
                match tokio::task::spawn_blocking(move || scheduler.trigger()).await {
                    Ok(Ok(outcome)) => tracing::info!(
                        generation = outcome.generation,
                        fitness = outcome.fitness_score,
                        "periodic evolution cycle completed"
                    ),
                    Ok(Err(CognitiveError::AlreadyRunning)) => {
                        tracing::debug!("evolution cycle already running, skipping tick")
                    }
                    Ok(Err(e)) => tracing::warn!(error = %e, "periodic evolution cycle failed"),
                    Err(e) => tracing::error!(error = %e, "evolution task panicked"),
                }
            }
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, EvolutionState>> {
        self.state
            .lock()
            .map_err(|_| CognitiveError::poisoned("evolution state"))
    }

    fn observe(&self) -> Result<Observation> {
        let _gate = self
            .snapshot_gate
            .write()
            .map_err(|_| CognitiveError::poisoned("snapshot gate"))?;
        read_observation(&self.memory, &self.learning)
    }

    /// The record for the cycle after `state`, measured against its baseline.
    fn next_record(&self, state: &EvolutionState, observed: Observation) -> CycleRecord {
        let mut improvements = Vec::new();
        let adaptation_delta = observed.adaptation - state.baseline.adaptation;
        if adaptation_delta > self.significance_threshold {
            improvements.push(format!(
                "adaptation score rose by {adaptation_delta:.2} to {:.2}",
                observed.adaptation
            ));
        }
        if observed.memory_total > state.baseline.memory_total {
            let grown = observed.memory_total - state.baseline.memory_total;
            improvements.push(format!(
                "memory store grew by {grown} entr{} to {}",
                if grown == 1 { "y" } else { "ies" },
                observed.memory_total
            ));
        }

        CycleRecord {
            generation: state.generation + 1,
            fitness_score: observed.fitness(),
            mutations: improvements.len() as u64,
            adaptation_score: observed.adaptation,
            memory_total: observed.memory_total,
            improvements,
            completed_at: Utc::now(),
        }
    }

    fn run_cycle(&self) -> Result<CycleOutcome> {
        let observed = self.observe()?;
        let mut state = self.lock()?;

        let record = match &self.journal {
            Some(journal) => {
                let history_limit = self.history_limit;
                let known = state.generation;
                journal.append_cycle(known, |newer| {
                    if !newer.is_empty() {
                        tracing::info!(
                            from = known,
                            to = known + newer.len() as u64,
                            "catching up on cycles journaled by another process"
                        );
                    }
                    state.catch_up(newer, history_limit)?;
                    Ok(self.next_record(&state, observed))
                })?
            }
            None => self.next_record(&state, observed),
        };
        state.apply(&record, observed, self.history_limit);

        tracing::info!(
            generation = record.generation,
            fitness = record.fitness_score,
            mutations = record.mutations,
            "evolution cycle completed"
        );

        Ok(CycleOutcome {
            generation: record.generation,
            fitness_score: record.fitness_score,
            mutations: record.mutations,
            improvements: record.improvements,
            completed_at: record.completed_at,
        })
    }
}

/// Proof that this caller owns the single Running slot.
pub struct CycleGuard<'a> {
    scheduler: &'a EvolutionScheduler,
}

impl CycleGuard<'_> {
    /// Run the cycle and return to Idle.
    pub fn complete(self) -> Result<CycleOutcome> {
        self.scheduler.run_cycle()
    }
}

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        self.scheduler.running.store(false, Ordering::Release);
    }
}

fn read_observation(memory: &MemoryStore, learning: &LearningTracker) -> Result<Observation> {
    let learning = learning.current()?;
    let memory = memory.stats()?;
    Ok(Observation {
        adaptation: learning.adaptation_score,
        memory_total: memory.total,
        mean_importance: memory.mean_importance,
    })
}
