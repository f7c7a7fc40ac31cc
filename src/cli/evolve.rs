//! CLI `evolve` command: run one evolution cycle against the journal.

use anyhow::Result;

use crate::config::CognisConfig;
use crate::error::CognitiveError;

pub fn evolve(config: &CognisConfig) -> Result<()> {
    let core = super::open_core(config)?;

    match core.trigger_evolution() {
        Ok(outcome) => {
            println!("Evolution cycle complete");
            println!("{}", "=".repeat(40));
            println!("  Generation:          {}", outcome.generation);
            println!("  Fitness:             {:.4}", outcome.fitness_score);
            println!("  Mutations:           {}", outcome.mutations);
            if outcome.improvements.is_empty() {
                println!("  No measurable change since the previous cycle.");
            } else {
                println!();
                println!("Improvements:");
                for improvement in &outcome.improvements {
                    println!("  - {improvement}");
                }
            }
            Ok(())
        }
        Err(CognitiveError::AlreadyRunning) => {
            println!("An evolution cycle is already running.");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
