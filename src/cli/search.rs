use anyhow::Result;

use crate::config::CognisConfig;
use crate::memory::RetrievalQuery;

/// Rank memories from the terminal.
///
/// Read-only: no access is counted, so a server sharing the journal keeps
/// counters that match what it has served.
pub fn search(config: &CognisConfig, query: &str, limit: Option<usize>) -> Result<()> {
    let core = super::open_core(config)?;

    let mut request = RetrievalQuery::new(query);
    request.limit = limit;
    let results = core.memory().peek(&request)?;

    if results.is_empty() {
        println!("No results found.");
        return Ok(());
    }

    println!("Found {} result(s)\n", results.len());

    for (i, result) in results.iter().enumerate() {
        let entry = &result.entry;
        println!(
            "  {}. [{}] {} (importance: {:.2}, score: {:.4}, accesses: {})",
            i + 1,
            entry.kind,
            entry.id,
            entry.importance,
            result.score,
            entry.access_count,
        );
        println!("     {}", super::preview(&entry.content, 120));
        if !entry.tags.is_empty() {
            let tags: Vec<&str> = entry.tags.iter().map(String::as_str).collect();
            println!("     tags: {}", tags.join(", "));
        }
        println!();
    }

    Ok(())
}
