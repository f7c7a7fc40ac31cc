#![allow(dead_code)]

use std::sync::Arc;

use cognis::config::CognisConfig;
use cognis::db::Journal;
use cognis::memory::{MemoryEntry, MemoryKind};
use cognis::oracle::extractive::ExtractiveOracle;
use cognis::Cognition;
use rusqlite::Connection;

/// Open a fresh in-memory database with schema and migrations applied.
pub fn test_db() -> Connection {
    let mut conn = Connection::open_in_memory().unwrap();
    cognis::db::schema::init_schema(&conn).unwrap();
    cognis::db::migrations::run_migrations(&mut conn).unwrap();
    conn
}

/// Default config with persistence off.
pub fn test_config() -> CognisConfig {
    let mut config = CognisConfig::default();
    config.storage.persist = false;
    config
}

/// A purely in-memory core using the offline oracle.
pub fn test_core() -> Arc<Cognition> {
    Arc::new(Cognition::new(test_config(), Arc::new(ExtractiveOracle), None).unwrap())
}

/// A core journaled to `journal`, using the offline oracle.
pub fn journaled_core(journal: Journal) -> Cognition {
    Cognition::new(test_config(), Arc::new(ExtractiveOracle), Some(journal)).unwrap()
}

/// Store a memory with no tags. Returns the stored entry.
pub fn remember(core: &Cognition, content: &str, kind: MemoryKind, importance: f64) -> MemoryEntry {
    core.store(content, kind, importance, &[]).unwrap()
}
