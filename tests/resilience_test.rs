use cognis::db;
use tempfile::TempDir;

#[test]
fn open_creates_new_db_at_nonexistent_path() {
    let tmp = TempDir::new().unwrap();
    let db_path = tmp.path().join("subdir").join("new.db");

    assert!(!db_path.exists());

    let conn = db::open_database(&db_path).unwrap();

    assert!(db_path.exists());

    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM memories", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 0);
}

#[test]
fn health_check_passes_on_valid_db() {
    let conn = db::open_memory_database().unwrap();

    let report = db::check_database_health(&conn).unwrap();
    assert!(report.integrity_ok);
    assert_eq!(report.schema_version, db::migrations::CURRENT_SCHEMA_VERSION);
    assert_eq!(report.memory_count, 0);
    assert_eq!(report.experience_count, 0);
    assert_eq!(report.cycle_count, 0);
}

#[test]
fn busy_timeout_is_set() {
    let tmp = TempDir::new().unwrap();
    let db_path = tmp.path().join("test.db");

    let conn = db::open_database(&db_path).unwrap();

    let timeout: i64 = conn
        .pragma_query_value(None, "busy_timeout", |row| row.get(0))
        .unwrap();
    assert_eq!(timeout, 5000);
}

#[test]
fn importance_outside_range_is_rejected_by_schema() {
    let conn = db::open_memory_database().unwrap();
    let err = conn.execute(
        "INSERT INTO memories (id, kind, content, importance, created_at) \
         VALUES ('x', 'semantic', 'c', 1.5, '2024-01-01T00:00:00Z')",
        [],
    );
    assert!(err.is_err());
}

#[test]
fn unknown_kind_is_rejected_by_schema() {
    let conn = db::open_memory_database().unwrap();
    let err = conn.execute(
        "INSERT INTO memories (id, kind, content, importance, created_at) \
         VALUES ('x', 'entity', 'c', 0.5, '2024-01-01T00:00:00Z')",
        [],
    );
    assert!(err.is_err());
}
