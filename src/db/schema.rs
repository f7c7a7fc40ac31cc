//! SQL DDL for the base journal tables.
//!
//! Defines the `memories` and `schema_meta` tables. Tables added after v1 are
//! created by [`super::migrations`]. All DDL uses `IF NOT EXISTS` for
//! idempotent initialization.

use rusqlite::Connection;

const SCHEMA_SQL: &str = r#"
-- Memory entries; the in-memory store is rebuilt from this table at startup
CREATE TABLE IF NOT EXISTS memories (
    id TEXT PRIMARY KEY,
    kind TEXT NOT NULL CHECK(kind IN ('episodic','semantic','procedural')),
    content TEXT NOT NULL,
    importance REAL NOT NULL CHECK(importance >= 0.0 AND importance <= 1.0),
    tags TEXT NOT NULL DEFAULT '[]',
    created_at TEXT NOT NULL,
    access_count INTEGER NOT NULL DEFAULT 0 CHECK(access_count >= 0)
);

CREATE INDEX IF NOT EXISTS idx_memories_kind ON memories(kind);
CREATE INDEX IF NOT EXISTS idx_memories_created ON memories(created_at);

-- Schema metadata
CREATE TABLE IF NOT EXISTS schema_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// Initialize the base tables. Idempotent (uses IF NOT EXISTS).
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;

    // Set initial schema version if not already present
    conn.execute(
        "INSERT OR IGNORE INTO schema_meta (key, value) VALUES ('schema_version', '1')",
        [],
    )?;

    Ok(())
}
