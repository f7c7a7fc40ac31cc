//! CLI `doctor` command: run journal diagnostics and print a health report.

use anyhow::{Context, Result};

use crate::config::CognisConfig;
use crate::db;

/// Run journal diagnostics and print a health report.
pub fn doctor(config: &CognisConfig) -> Result<()> {
    let db_path = config.resolved_db_path();

    println!("Cognis Health Report");
    println!("====================");
    println!();
    println!("Oracle:            {} ({})", config.oracle.provider, config.oracle.model);
    println!("Persistence:       {}", if config.storage.persist { "on" } else { "off" });

    if !db_path.exists() {
        println!("Journal:           not found at {}", db_path.display());
        println!("Run `cognis serve` to initialize.");
        return Ok(());
    }

    let file_size = std::fs::metadata(&db_path).map(|m| m.len()).unwrap_or(0);

    let conn = db::open_database(&db_path).context("failed to open journal (may be corrupt)")?;
    let report = db::check_database_health(&conn).context("failed to run health check")?;

    println!("Journal:           {}", db_path.display());
    println!("File size:         {}", format_bytes(file_size));
    println!("Schema version:    {}", report.schema_version);
    println!();
    println!("Row counts:");
    println!("  Memories:        {}", report.memory_count);
    println!("  Experiences:     {}", report.experience_count);
    println!("  Cycles:          {}", report.cycle_count);
    println!();
    if report.integrity_ok {
        println!("Integrity check:   PASSED");
    } else {
        println!("Integrity check:   FAILED ({})", report.integrity_details);
        println!();
        println!("Recovery steps:");
        println!("  1. Stop any running `cognis serve` process.");
        println!("  2. Restore from a backup: cp backup.db {}", db_path.display());
    }

    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
