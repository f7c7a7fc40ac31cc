//! Learning tracker: turns discrete experience/outcome events into smoothed
//! adaptation statistics.
//!
//! Each recorded experience is classified as positive, neutral, or negative
//! from a small fixed vocabulary (explicit feedback wins over the outcome
//! text), converted to a signal on the 0–100 adaptation scale, and folded
//! into the adaptation score with an exponential moving average:
//!
//! ```text
//! signal     = 50 + 50 × polarity × importance      (polarity ∈ {+1, 0, −1})
//! adaptation = adaptation × (1 − α) + signal × α
//! ```

use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::LearningConfig;
use crate::db::Journal;
use crate::error::{CognitiveError, Result};
use crate::memory::search::tokenize;
use crate::memory::store::clamp_importance;

/// Midpoint of the adaptation scale; a neutral signal pulls the score here.
const NEUTRAL_SIGNAL: f64 = 50.0;

const POSITIVE_TERMS: &[&str] = &[
    "accepted", "amazing", "correct", "excellent", "fixed", "good", "great", "helpful",
    "improved", "like", "love", "passed", "positive", "resolved", "solved", "succeeded",
    "success", "successful", "wonderful", "worked", "works", "yes",
];

const NEGATIVE_TERMS: &[&str] = &[
    "awful", "bad", "broken", "crash", "crashed", "dislike", "error", "errors", "fail",
    "failed", "failing", "failure", "hate", "horrible", "incorrect", "negative", "no",
    "regression", "rejected", "terrible", "timeout", "unhelpful", "wrong",
];

/// Direction of an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    Positive,
    Neutral,
    Negative,
}

impl Polarity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Neutral => "neutral",
            Self::Negative => "negative",
        }
    }

    fn sign(&self) -> f64 {
        match self {
            Self::Positive => 1.0,
            Self::Neutral => 0.0,
            Self::Negative => -1.0,
        }
    }
}

impl std::fmt::Display for Polarity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Polarity {
    type Err = CognitiveError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "positive" => Ok(Self::Positive),
            "neutral" => Ok(Self::Neutral),
            "negative" => Ok(Self::Negative),
            _ => Err(CognitiveError::Validation(format!("unknown polarity: {s}"))),
        }
    }
}

/// Polarity of a piece of text, or `None` if it uses none of the vocabulary.
pub fn infer_polarity(text: &str) -> Option<Polarity> {
    let terms = tokenize(text);
    let positive = terms.iter().filter(|t| POSITIVE_TERMS.contains(&t.as_str())).count();
    let negative = terms.iter().filter(|t| NEGATIVE_TERMS.contains(&t.as_str())).count();
    match (positive, negative) {
        (0, 0) => None,
        (p, n) if p > n => Some(Polarity::Positive),
        (p, n) if n > p => Some(Polarity::Negative),
        _ => Some(Polarity::Neutral),
    }
}

/// Classify an experience: explicit feedback first, then the outcome text.
pub fn classify(experience: &LearningExperience) -> Polarity {
    experience
        .feedback
        .as_deref()
        .and_then(infer_polarity)
        .or_else(|| infer_polarity(&experience.outcome))
        .unwrap_or(Polarity::Neutral)
}

/// An experience as submitted by a caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningExperience {
    pub experience: String,
    pub outcome: String,
    #[serde(default)]
    pub feedback: Option<String>,
    /// Weight in `[0, 1]`; the configured default applies when absent.
    #[serde(default)]
    pub importance: Option<f64>,
}

impl LearningExperience {
    pub fn new(experience: impl Into<String>, outcome: impl Into<String>) -> Self {
        Self {
            experience: experience.into(),
            outcome: outcome.into(),
            feedback: None,
            importance: None,
        }
    }

    pub fn with_feedback(mut self, feedback: impl Into<String>) -> Self {
        self.feedback = Some(feedback.into());
        self
    }

    pub fn with_importance(mut self, importance: f64) -> Self {
        self.importance = Some(importance);
        self
    }
}

/// A classified, timestamped experience as kept in history and the journal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExperienceRecord {
    pub experience: String,
    pub outcome: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
    pub importance: f64,
    pub polarity: Polarity,
    pub recorded_at: DateTime<Utc>,
}

/// Point-in-time learning statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LearningState {
    pub total_experiences: u64,
    pub learning_rate: f64,
    /// Smoothed score in `[0, 100]`.
    pub adaptation_score: f64,
    /// Change in adaptation score since the previous snapshot.
    pub knowledge_growth: f64,
}

/// The learning-stats report: a snapshot plus history.
#[derive(Debug, Clone, Serialize)]
pub struct LearningStats {
    #[serde(flatten)]
    pub state: LearningState,
    pub by_polarity: BTreeMap<String, u64>,
    pub recent_experiences: Vec<ExperienceRecord>,
}

struct TrackerState {
    total: u64,
    adaptation: f64,
    /// Adaptation score at the previous snapshot.
    baseline: f64,
    by_polarity: BTreeMap<&'static str, u64>,
    recent: VecDeque<ExperienceRecord>,
}

/// Owns the [`LearningState`].
pub struct LearningTracker {
    state: Mutex<TrackerState>,
    learning_rate: f64,
    default_importance: f64,
    recent_capacity: usize,
    journal: Option<Journal>,
}

impl LearningTracker {
    pub fn new(config: &LearningConfig) -> Self {
        let by_polarity = [Polarity::Positive, Polarity::Neutral, Polarity::Negative]
            .iter()
            .map(|p| (p.as_str(), 0))
            .collect();
        Self {
            state: Mutex::new(TrackerState {
                total: 0,
                adaptation: config.initial_adaptation,
                baseline: config.initial_adaptation,
                by_polarity,
                recent: VecDeque::with_capacity(config.recent_history),
            }),
            learning_rate: config.learning_rate,
            default_importance: config.default_importance,
            recent_capacity: config.recent_history,
            journal: None,
        }
    }

    /// A tracker that journals every event, rebuilt by replaying the journal in order.
    pub fn with_journal(config: &LearningConfig, journal: Journal) -> Result<Self> {
        let mut tracker = Self::new(config);
        let history = journal.load_experiences()?;
        let replayed = history.len();
        {
            let state = tracker
                .state
                .get_mut()
                .map_err(|_| CognitiveError::poisoned("learning tracker"))?;
            for record in history {
                tracker_apply(state, record, tracker.learning_rate, tracker.recent_capacity);
            }
            state.baseline = state.adaptation;
        }
        tracker.journal = Some(journal);
        tracing::info!(experiences = replayed, "learning tracker restored from journal");
        Ok(tracker)
    }

    /// Record one experience and return the updated state.
    ///
    /// The experience count increases by exactly one per accepted call,
    /// whatever the polarity.
    pub fn record(&self, experience: LearningExperience) -> Result<LearningState> {
        if experience.experience.trim().is_empty() {
            return Err(CognitiveError::Validation(
                "experience must not be empty".into(),
            ));
        }
        let importance = clamp_importance(experience.importance.unwrap_or(self.default_importance))?;
        let polarity = classify(&experience);

        let record = ExperienceRecord {
            experience: experience.experience,
            outcome: experience.outcome,
            feedback: experience.feedback,
            importance,
            polarity,
            recorded_at: Utc::now(),
        };

        let mut state = self.lock()?;
        // Journal under the lock so replay order matches application order.
        if let Some(journal) = &self.journal {
            journal.insert_experience(&record)?;
        }
        tracker_apply(&mut state, record, self.learning_rate, self.recent_capacity);

        tracing::debug!(
            polarity = %polarity,
            importance,
            adaptation = state.adaptation,
            total = state.total,
            "experience recorded"
        );
        Ok(self.state_view(&state))
    }

    /// Read the state and reset knowledge growth to zero.
    pub fn snapshot(&self) -> Result<LearningState> {
        let mut state = self.lock()?;
        let view = self.state_view(&state);
        state.baseline = state.adaptation;
        Ok(view)
    }

    /// Read the state without resetting knowledge growth.
    pub fn current(&self) -> Result<LearningState> {
        let state = self.lock()?;
        Ok(self.state_view(&state))
    }

    /// Full learning report. Counts as a snapshot read.
    pub fn stats(&self) -> Result<LearningStats> {
        let mut state = self.lock()?;
        let view = self.state_view(&state);
        state.baseline = state.adaptation;
        Ok(LearningStats {
            state: view,
            by_polarity: state
                .by_polarity
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect(),
            recent_experiences: state.recent.iter().rev().cloned().collect(),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, TrackerState>> {
        self.state
            .lock()
            .map_err(|_| CognitiveError::poisoned("learning tracker"))
    }

    fn state_view(&self, state: &TrackerState) -> LearningState {
        LearningState {
            total_experiences: state.total,
            learning_rate: self.learning_rate,
            adaptation_score: state.adaptation,
            knowledge_growth: state.adaptation - state.baseline,
        }
    }
}

fn tracker_apply(state: &mut TrackerState, record: ExperienceRecord, alpha: f64, capacity: usize) {
    let signal = NEUTRAL_SIGNAL + NEUTRAL_SIGNAL * record.polarity.sign() * record.importance;
    state.adaptation = (state.adaptation * (1.0 - alpha) + signal * alpha).clamp(0.0, 100.0);
    state.total = state
        .total
        .checked_add(1)
        .expect("experience counter overflow");
    *state.by_polarity.entry(record.polarity.as_str()).or_insert(0) += 1;

    if capacity > 0 {
        if state.recent.len() == capacity {
            state.recent.pop_front();
        }
        state.recent.push_back(record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> LearningTracker {
        LearningTracker::new(&LearningConfig::default())
    }

    #[test]
    fn polarity_from_vocabulary() {
        assert_eq!(infer_polarity("success"), Some(Polarity::Positive));
        assert_eq!(infer_polarity("the build failed"), Some(Polarity::Negative));
        assert_eq!(infer_polarity("good but wrong"), Some(Polarity::Neutral));
        assert_eq!(infer_polarity("shipped on tuesday"), None);
    }

    #[test]
    fn feedback_overrides_outcome() {
        let exp = LearningExperience::new("deploy", "success").with_feedback("actually broken");
        assert_eq!(classify(&exp), Polarity::Negative);

        let exp = LearningExperience::new("deploy", "success").with_feedback("noted");
        assert_eq!(classify(&exp), Polarity::Positive);
    }

    #[test]
    fn positive_outcome_raises_adaptation() {
        let t = tracker();
        let before = t.snapshot().unwrap();
        let after = t
            .record(LearningExperience::new("solved bug", "success").with_importance(0.8))
            .unwrap();
        assert!(after.adaptation_score > before.adaptation_score);
        // 50 × 0.7 + 90 × 0.3
        assert!((after.adaptation_score - 62.0).abs() < 1e-9);

        let stats = t.snapshot().unwrap();
        assert!(stats.knowledge_growth > 0.0);
    }

    #[test]
    fn negative_outcome_lowers_adaptation() {
        let t = tracker();
        let state = t
            .record(LearningExperience::new("migration", "failed").with_importance(1.0))
            .unwrap();
        assert!(state.adaptation_score < 50.0);
        assert!(state.knowledge_growth < 0.0);
    }

    #[test]
    fn count_increments_for_every_polarity() {
        let t = tracker();
        for outcome in ["success", "failed", "meh"] {
            t.record(LearningExperience::new("x", outcome)).unwrap();
        }
        let stats = t.stats().unwrap();
        assert_eq!(stats.state.total_experiences, 3);
        assert_eq!(stats.by_polarity["positive"], 1);
        assert_eq!(stats.by_polarity["negative"], 1);
        assert_eq!(stats.by_polarity["neutral"], 1);
    }

    #[test]
    fn snapshot_resets_growth_but_current_does_not() {
        let t = tracker();
        t.record(LearningExperience::new("x", "great")).unwrap();
        assert!(t.current().unwrap().knowledge_growth > 0.0);
        assert!(t.current().unwrap().knowledge_growth > 0.0);
        assert!(t.snapshot().unwrap().knowledge_growth > 0.0);
        assert_eq!(t.snapshot().unwrap().knowledge_growth, 0.0);
    }

    #[test]
    fn adaptation_stays_bounded() {
        let t = tracker();
        for _ in 0..200 {
            t.record(LearningExperience::new("x", "excellent").with_importance(1.0))
                .unwrap();
        }
        let high = t.current().unwrap().adaptation_score;
        assert!(high <= 100.0 && high > 99.0);
    }

    #[test]
    fn out_of_range_importance_is_clamped() {
        let t = tracker();
        let state = t
            .record(LearningExperience::new("x", "success").with_importance(7.0))
            .unwrap();
        // Clamped to 1.0: 50 × 0.7 + 100 × 0.3
        assert!((state.adaptation_score - 65.0).abs() < 1e-9);
    }

    #[test]
    fn empty_experience_rejected() {
        let t = tracker();
        let err = t.record(LearningExperience::new("  ", "success")).unwrap_err();
        assert!(matches!(err, CognitiveError::Validation(_)));
        assert_eq!(t.current().unwrap().total_experiences, 0);
    }

    #[test]
    fn recent_history_is_bounded_and_newest_first() {
        let t = tracker();
        for i in 0..8 {
            t.record(LearningExperience::new(format!("exp {i}"), "ok")).unwrap();
        }
        let stats = t.stats().unwrap();
        assert_eq!(stats.recent_experiences.len(), 5);
        assert_eq!(stats.recent_experiences[0].experience, "exp 7");
    }

    #[test]
    fn journal_replay_restores_state() {
        let journal = Journal::in_memory().unwrap();
        let config = LearningConfig::default();

        let expected = {
            let t = LearningTracker::with_journal(&config, journal.clone()).unwrap();
            t.record(LearningExperience::new("a", "success").with_importance(0.9)).unwrap();
            t.record(LearningExperience::new("b", "failed").with_importance(0.4)).unwrap();
            t.current().unwrap().adaptation_score
        };

        let restored = LearningTracker::with_journal(&config, journal).unwrap();
        let state = restored.current().unwrap();
        assert_eq!(state.total_experiences, 2);
        assert!((state.adaptation_score - expected).abs() < 1e-9);
        assert_eq!(state.knowledge_growth, 0.0);
    }
}
