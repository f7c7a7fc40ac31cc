//! Cognitive memory and reasoning core.
//!
//! Cognis keeps a store of weighted, typed recollections that a reasoning
//! process consults to produce explainable conclusions, plus a learning and
//! evolution loop that maintains system-wide adaptation metrics.
//!
//! | Kind | Purpose |
//! |------|---------|
//! | **Episodic** | A recollection tied to a specific event |
//! | **Semantic** | General factual knowledge |
//! | **Procedural** | A learned process or method |
//!
//! # Architecture
//!
//! - **Memory**: in-memory store with lock-free access counters, ranked by
//!   term overlap × importance
//! - **Reasoning**: mode-framed chains (deductive, inductive, abductive)
//!   synthesized by a pluggable text oracle (Ollama or offline extractive)
//! - **Learning**: exponentially smoothed adaptation score from classified outcomes
//! - **Evolution**: a guarded Idle/Running cycle that advances a generation counter
//! - **Persistence**: optional SQLite journal replayed at startup
//! - **Transport**: REST (axum) under `/api/v1`, or MCP over stdio
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from TOML files and environment variables
//! - [`error`]: The [`CognitiveError`](error::CognitiveError) taxonomy
//! - [`db`]: SQLite journal, schema, migrations, and health checks
//! - [`memory`]: Memory store, retrieval ranking, and statistics
//! - [`oracle`]: Text-completion oracles
//! - [`reasoning`]: Reasoning engine
//! - [`learning`]: Learning tracker
//! - [`evolution`]: Evolution scheduler
//! - [`cognition`]: The assembled core
//! - [`server`]: REST router and server entry points

pub mod cli;
pub mod cognition;
pub mod config;
pub mod db;
pub mod error;
pub mod evolution;
pub mod learning;
pub mod memory;
pub mod oracle;
pub mod reasoning;
pub mod server;
pub mod tools;

pub use cognition::Cognition;
pub use error::{CognitiveError, Result};
