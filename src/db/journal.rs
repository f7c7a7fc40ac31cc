//! Write-through journal for memories, learning events, and evolution cycles.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, TransactionBehavior};

use crate::error::{CognitiveError, Result};
use crate::evolution::CycleRecord;
use crate::learning::{ExperienceRecord, Polarity};
use crate::memory::types::{MemoryEntry, MemoryKind};

/// Shared handle to the journal database. Cheap to clone.
#[derive(Clone)]
pub struct Journal {
    conn: Arc<Mutex<Connection>>,
}

impl Journal {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Open (or create) a journal file with the schema up to date.
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        Ok(Self::new(super::open_database(path)?))
    }

    /// A throwaway journal backed by an in-memory database.
    pub fn in_memory() -> anyhow::Result<Self> {
        Ok(Self::new(super::open_memory_database()?))
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| CognitiveError::poisoned("journal"))
    }

    // ── Memories ──────────────────────────────────────────────────────────────

    pub fn insert_memory(&self, entry: &MemoryEntry) -> Result<()> {
        let tags = tags_to_json(&entry.tags);
        self.lock()?.execute(
            "INSERT INTO memories (id, kind, content, importance, tags, created_at, access_count) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                entry.id,
                entry.kind.as_str(),
                entry.content,
                entry.importance,
                tags,
                entry.created_at.to_rfc3339(),
                entry.access_count as i64,
            ],
        )?;
        Ok(())
    }

    /// Add one access to each listed memory. Additive, so concurrent callers never lose counts.
    pub fn record_access(&self, ids: &[&str]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        {
            let mut stmt =
                tx.prepare("UPDATE memories SET access_count = access_count + 1 WHERE id = ?1")?;
            for id in ids {
                stmt.execute(params![id])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub fn load_memories(&self) -> Result<Vec<MemoryEntry>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, kind, content, importance, tags, created_at, access_count \
             FROM memories ORDER BY created_at, id",
        )?;
        let rows = stmt
            .query_map([], |row| {
                let kind: String = row.get(1)?;
                let tags: String = row.get(4)?;
                let created_at: String = row.get(5)?;
                let access_count: i64 = row.get(6)?;
                Ok(MemoryEntry {
                    id: row.get(0)?,
                    kind: parse_column(1, &kind, |s| s.parse::<MemoryKind>())?,
                    content: row.get(2)?,
                    importance: row.get(3)?,
                    tags: parse_column(4, &tags, |s| serde_json::from_str::<BTreeSet<String>>(s))?,
                    created_at: parse_timestamp(5, &created_at)?,
                    access_count: u64::try_from(access_count).map_err(|e| {
                        rusqlite::Error::FromSqlConversionFailure(
                            6,
                            rusqlite::types::Type::Integer,
                            Box::new(e),
                        )
                    })?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    // ── Learning events ───────────────────────────────────────────────────────

    pub fn insert_experience(&self, record: &ExperienceRecord) -> Result<()> {
        self.lock()?.execute(
            "INSERT INTO learning_events (experience, outcome, feedback, importance, polarity, recorded_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                record.experience,
                record.outcome,
                record.feedback,
                record.importance,
                record.polarity.as_str(),
                record.recorded_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// All journaled experiences in recording order.
    pub fn load_experiences(&self) -> Result<Vec<ExperienceRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT experience, outcome, feedback, importance, polarity, recorded_at \
             FROM learning_events ORDER BY id",
        )?;
        let rows = stmt
            .query_map([], |row| {
                let polarity: String = row.get(4)?;
                let recorded_at: String = row.get(5)?;
                Ok(ExperienceRecord {
                    experience: row.get(0)?,
                    outcome: row.get(1)?,
                    feedback: row.get(2)?,
                    importance: row.get(3)?,
                    polarity: parse_column(4, &polarity, |s| s.parse::<Polarity>())?,
                    recorded_at: parse_timestamp(5, &recorded_at)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    // ── Evolution cycles ──────────────────────────────────────────────────────

    pub fn insert_cycle(&self, record: &CycleRecord) -> Result<()> {
        write_cycle(&*self.lock()?, record)
    }

    /// Append the next cycle while holding the database write lock.
    ///
    /// Cycles journaled after generation `after` by another process sharing
    /// this file are handed to `build` first, so the caller can catch up
    /// before choosing its own generation. Nothing is written if `build`
    /// fails.
    pub fn append_cycle<F>(&self, after: u64, build: F) -> Result<CycleRecord>
    where
        F: FnOnce(&[CycleRecord]) -> Result<CycleRecord>,
    {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let newer = select_cycles(&tx, after)?;
        let record = build(&newer)?;
        write_cycle(&tx, &record)?;
        tx.commit()?;
        Ok(record)
    }

    /// All journaled cycles in generation order.
    pub fn load_cycles(&self) -> Result<Vec<CycleRecord>> {
        Ok(select_cycles(&*self.lock()?, 0)?)
    }
}

fn write_cycle(conn: &Connection, record: &CycleRecord) -> Result<()> {
    let improvements = serde_json::to_string(&record.improvements)
        .map_err(|e| CognitiveError::Internal(format!("serialize improvements: {e}")))?;
    conn.execute(
        "INSERT INTO evolution_cycles \
         (generation, fitness_score, mutations, adaptation_score, memory_total, improvements, completed_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            record.generation as i64,
            record.fitness_score,
            record.mutations as i64,
            record.adaptation_score,
            record.memory_total as i64,
            improvements,
            record.completed_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

/// Cycles with a generation above `after`, in generation order.
fn select_cycles(conn: &Connection, after: u64) -> rusqlite::Result<Vec<CycleRecord>> {
    let mut stmt = conn.prepare(
        "SELECT generation, fitness_score, mutations, adaptation_score, memory_total, improvements, completed_at \
         FROM evolution_cycles WHERE generation > ?1 ORDER BY generation",
    )?;
    let rows = stmt
        .query_map(params![after as i64], |row| {
            let improvements: String = row.get(5)?;
            let completed_at: String = row.get(6)?;
            Ok(CycleRecord {
                generation: row.get::<_, i64>(0)? as u64,
                fitness_score: row.get(1)?,
                mutations: row.get::<_, i64>(2)? as u64,
                adaptation_score: row.get(3)?,
                memory_total: row.get::<_, i64>(4)? as u64,
                improvements: parse_column(5, &improvements, |s| {
                    serde_json::from_str::<Vec<String>>(s)
                })?,
                completed_at: parse_timestamp(6, &completed_at)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

fn tags_to_json(tags: &BTreeSet<String>) -> String {
    // Serializing a set of strings cannot fail
    serde_json::to_string(tags).unwrap_or_else(|_| "[]".into())
}

/// Parse a TEXT column, mapping failures to a rusqlite conversion error.
fn parse_column<T, E, F>(idx: usize, raw: &str, parse: F) -> rusqlite::Result<T>
where
    F: FnOnce(&str) -> std::result::Result<T, E>,
    E: std::error::Error + Send + Sync + 'static,
{
    parse(raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn parse_timestamp(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    parse_column(idx, raw, |s| DateTime::parse_from_rfc3339(s)).map(|t| t.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str) -> MemoryEntry {
        MemoryEntry {
            id: id.to_string(),
            content: format!("content of {id}"),
            kind: MemoryKind::Procedural,
            importance: 0.4,
            tags: ["a".to_string()].into(),
            created_at: Utc::now(),
            access_count: 0,
        }
    }

    #[test]
    fn memory_insert_and_load() {
        let journal = Journal::in_memory().unwrap();
        journal.insert_memory(&entry("m1")).unwrap();
        journal.insert_memory(&entry("m2")).unwrap();

        let loaded = journal.load_memories().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].kind, MemoryKind::Procedural);
        assert!(loaded[0].tags.contains("a"));
    }

    #[test]
    fn duplicate_id_is_storage_error() {
        let journal = Journal::in_memory().unwrap();
        journal.insert_memory(&entry("dup")).unwrap();
        let err = journal.insert_memory(&entry("dup")).unwrap_err();
        assert!(matches!(err, CognitiveError::Storage(_)));
    }

    #[test]
    fn access_counts_are_additive() {
        let journal = Journal::in_memory().unwrap();
        journal.insert_memory(&entry("m1")).unwrap();
        journal.record_access(&["m1"]).unwrap();
        journal.record_access(&["m1", "missing"]).unwrap();

        let loaded = journal.load_memories().unwrap();
        assert_eq!(loaded[0].access_count, 2);
    }

    #[test]
    fn experiences_load_in_order() {
        let journal = Journal::in_memory().unwrap();
        for (i, polarity) in [Polarity::Positive, Polarity::Negative].into_iter().enumerate() {
            journal
                .insert_experience(&ExperienceRecord {
                    experience: format!("exp {i}"),
                    outcome: "outcome".into(),
                    feedback: None,
                    importance: 0.5,
                    polarity,
                    recorded_at: Utc::now(),
                })
                .unwrap();
        }
        let loaded = journal.load_experiences().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].experience, "exp 0");
        assert_eq!(loaded[1].polarity, Polarity::Negative);
    }

    #[test]
    fn cycles_round_trip() {
        let journal = Journal::in_memory().unwrap();
        journal
            .insert_cycle(&CycleRecord {
                generation: 1,
                fitness_score: 0.42,
                mutations: 1,
                adaptation_score: 55.0,
                memory_total: 3,
                improvements: vec!["memory store grew by 3 entries".into()],
                completed_at: Utc::now(),
            })
            .unwrap();
        let cycles = journal.load_cycles().unwrap();
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].generation, 1);
        assert_eq!(cycles[0].improvements.len(), 1);
    }

    fn cycle(generation: u64) -> CycleRecord {
        CycleRecord {
            generation,
            fitness_score: 0.3,
            mutations: 0,
            adaptation_score: 50.0,
            memory_total: 0,
            improvements: Vec::new(),
            completed_at: Utc::now(),
        }
    }

    #[test]
    fn append_sees_cycles_written_elsewhere() {
        let journal = Journal::in_memory().unwrap();
        journal.insert_cycle(&cycle(1)).unwrap();
        journal.insert_cycle(&cycle(2)).unwrap();

        let appended = journal
            .append_cycle(1, |newer| {
                assert_eq!(newer.len(), 1);
                assert_eq!(newer[0].generation, 2);
                Ok(cycle(3))
            })
            .unwrap();
        assert_eq!(appended.generation, 3);
        assert_eq!(journal.load_cycles().unwrap().len(), 3);
    }

    #[test]
    fn failed_build_writes_nothing() {
        let journal = Journal::in_memory().unwrap();
        let err = journal
            .append_cycle(0, |_| Err(CognitiveError::Internal("nope".into())))
            .unwrap_err();
        assert!(matches!(err, CognitiveError::Internal(_)));
        assert!(journal.load_cycles().unwrap().is_empty());
    }
}
