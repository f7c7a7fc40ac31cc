//! Mode-framed reasoning chains and evidence-derived confidence.

use std::collections::BTreeMap;

use serde_json::Value;

use super::ReasoningMode;
use crate::memory::search::tokenize;
use crate::memory::ScoredEntry;

/// Support assigned to a caller-supplied context excerpt, which has no ranking score.
const CONTEXT_SUPPORT: f64 = 0.5;
/// Evidence count at which coverage reaches 1 − 1/e.
const COVERAGE_SCALE: f64 = 3.0;
/// Floor of the support factor; a single weak item still yields some confidence.
const SUPPORT_BASE: f64 = 0.4;
const MAX_THEMES: usize = 3;

/// One citable piece of evidence feeding the chain.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Evidence {
    /// A memory id, or the quoted context excerpt itself.
    pub(crate) citation: String,
    pub(crate) statement: String,
    /// Ranking score for memories, a fixed value for context.
    pub(crate) support: f64,
    pub(crate) source: Source,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Source {
    General,
    Specific,
    Context,
}

#[derive(Debug, Clone)]
pub(crate) struct Chain {
    pub(crate) steps: Vec<String>,
    /// The evidence actually cited by `steps`, in chain order.
    pub(crate) evidence: Vec<Evidence>,
}

/// Flatten a free-form context value into its non-empty leaf strings.
///
/// Object keys are dropped; only values are kept so every excerpt is a
/// literal substring of the context.
pub fn flatten_context(value: &Value) -> Vec<String> {
    let mut out = Vec::new();
    collect_leaves(value, &mut out);
    out
}

fn collect_leaves(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Null => {}
        Value::Bool(b) => out.push(b.to_string()),
        Value::Number(n) => out.push(n.to_string()),
        Value::String(s) => {
            let s = s.trim();
            if !s.is_empty() {
                out.push(s.to_string());
            }
        }
        Value::Array(items) => items.iter().for_each(|v| collect_leaves(v, out)),
        Value::Object(map) => map.values().for_each(|v| collect_leaves(v, out)),
    }
}

/// Truncate on a char boundary.
pub(crate) fn excerpt(text: &str, max_chars: usize) -> String {
    let trimmed = text.trim();
    match trimmed.char_indices().nth(max_chars) {
        Some((idx, _)) => trimmed[..idx].trim_end().to_string(),
        None => trimmed.to_string(),
    }
}

/// Turn retrieved memories and context excerpts into citable evidence.
pub(crate) fn gather(memories: &[ScoredEntry], context: &[String], max_chars: usize) -> Vec<Evidence> {
    let from_memory = memories.iter().map(|m| Evidence {
        citation: m.entry.id.clone(),
        statement: excerpt(&m.entry.content, max_chars),
        support: m.score.clamp(0.0, 1.0),
        source: if m.entry.kind.is_general() {
            Source::General
        } else {
            Source::Specific
        },
    });
    let from_context = context.iter().map(|c| {
        let text = excerpt(c, max_chars);
        Evidence {
            citation: format!("\"{text}\""),
            statement: text,
            support: CONTEXT_SUPPORT,
            source: Source::Context,
        }
    });
    from_memory.chain(from_context).collect()
}

/// Build the chain for `mode`, keeping at most `max_steps` statements
/// including the closing one.
pub(crate) fn build(mode: ReasoningMode, query: &str, evidence: Vec<Evidence>, max_steps: usize) -> Chain {
    let mut evidence = evidence;
    if mode == ReasoningMode::Deductive {
        // General premises first; stable, so rank order holds within each group.
        evidence.sort_by_key(|e| match e.source {
            Source::General => 0,
            Source::Specific => 1,
            Source::Context => 2,
        });
    }
    evidence.truncate(max_steps.saturating_sub(1).max(1));

    let mut steps: Vec<String> = evidence
        .iter()
        .enumerate()
        .map(|(i, e)| match mode {
            ReasoningMode::Deductive => match e.source {
                Source::General => format!("General: {}", e.statement),
                Source::Specific => format!("Specific: {}", e.statement),
                Source::Context => format!("Given: \"{}\"", e.statement),
            },
            ReasoningMode::Inductive => format!("Observation {}: {}", i + 1, e.statement),
            ReasoningMode::Abductive => format!("Clue: {}", e.statement),
        })
        .collect();

    if let Some(closing) = closing_statement(mode, query, &evidence) {
        steps.push(closing);
    }
    Chain { steps, evidence }
}

fn closing_statement(mode: ReasoningMode, query: &str, evidence: &[Evidence]) -> Option<String> {
    let top = evidence.first()?;
    let query = query.trim();
    Some(match mode {
        ReasoningMode::Deductive => {
            let general = evidence.iter().filter(|e| e.source == Source::General).count();
            let focus = evidence
                .iter()
                .find(|e| e.source != Source::General)
                .unwrap_or(top);
            if general == 0 {
                format!("With no general premise, the most specific statement bearing on \"{query}\" is: {}", focus.statement)
            } else {
                format!(
                    "Applying {general} general statement{} to \"{query}\" narrows to: {}",
                    if general == 1 { "" } else { "s" },
                    focus.statement
                )
            }
        }
        ReasoningMode::Inductive => {
            let themes = shared_themes(evidence);
            let n = evidence.len();
            let plural = if n == 1 { "" } else { "s" };
            if themes.is_empty() {
                format!("Generalizing from {n} observation{plural} about \"{query}\": {}", top.statement)
            } else {
                format!(
                    "Generalizing from {n} observation{plural} about \"{query}\", the recurring themes are {}",
                    themes.join(", ")
                )
            }
        }
        ReasoningMode::Abductive => format!(
            "Best available explanation for \"{query}\" (evidence is incomplete): {}",
            top.statement
        ),
    })
}

/// Terms that recur across at least two pieces of evidence, most frequent first.
fn shared_themes(evidence: &[Evidence]) -> Vec<String> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for e in evidence {
        for term in tokenize(&e.statement) {
            *counts.entry(term).or_insert(0) += 1;
        }
    }
    let mut shared: Vec<(String, usize)> = counts.into_iter().filter(|(_, c)| *c >= 2).collect();
    shared.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    shared.into_iter().take(MAX_THEMES).map(|(t, _)| t).collect()
}

/// Confidence from evidence count and support, in `[0, 1]`.
///
/// `coverage × (base + (1 − base) × mean support)`; abductive results are
/// additionally capped at `abductive_ceiling`.
pub(crate) fn confidence(mode: ReasoningMode, evidence: &[Evidence], abductive_ceiling: f64) -> f64 {
    if evidence.is_empty() {
        return 0.0;
    }
    let n = evidence.len() as f64;
    let coverage = 1.0 - (-n / COVERAGE_SCALE).exp();
    let mean_support = evidence.iter().map(|e| e.support).sum::<f64>() / n;
    let raw = (coverage * (SUPPORT_BASE + (1.0 - SUPPORT_BASE) * mean_support)).clamp(0.0, 1.0);
    match mode {
        ReasoningMode::Abductive => raw.min(abductive_ceiling),
        ReasoningMode::Deductive | ReasoningMode::Inductive => raw,
    }
}

/// How the oracle is asked to frame its conclusion.
pub(crate) fn instruction(mode: ReasoningMode) -> &'static str {
    match mode {
        ReasoningMode::Deductive => {
            "Reason deductively: start from the general statements and narrow them to a specific conclusion that answers the question."
        }
        ReasoningMode::Inductive => {
            "Reason inductively: generalize from the specific observations to a broader conclusion."
        }
        ReasoningMode::Abductive => {
            "Reason abductively: propose the single most plausible explanation given incomplete evidence, and say that it is tentative."
        }
    }
}
