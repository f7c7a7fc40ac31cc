use anyhow::Result;

use crate::config::CognisConfig;
use crate::memory::MemoryKind;

/// Display memory, learning, and evolution statistics in the terminal.
pub fn stats(config: &CognisConfig) -> Result<()> {
    let core = super::open_core(config)?;
    let memory = core.memory_stats()?;
    let learning = core.learning().current()?;
    let evolution = core.evolution_status()?;

    println!("Memory Statistics");
    println!("{}", "=".repeat(40));
    println!("  Total memories:      {}", memory.total);
    println!("  Recent (window):     {}", memory.recent);
    println!("  Total accesses:      {}", memory.total_accesses);
    println!("  Mean importance:     {:.3}", memory.mean_importance);
    println!("  Approx. size:        {} bytes", memory.storage_bytes);
    println!();

    println!("By Kind:");
    for kind in MemoryKind::ALL {
        let count = memory.by_kind.get(kind.as_str()).copied().unwrap_or(0);
        println!("  {:<12} {}", kind.as_str(), count);
    }
    println!();

    if let Some(ref oldest) = memory.oldest_memory {
        println!("Oldest memory:         {oldest}");
    }
    if let Some(ref newest) = memory.newest_memory {
        println!("Newest memory:         {newest}");
    }
    println!();

    println!("Learning");
    println!("{}", "=".repeat(40));
    println!("  Experiences:         {}", learning.total_experiences);
    println!("  Learning rate:       {}", learning.learning_rate);
    println!("  Adaptation score:    {:.2}", learning.adaptation_score);
    println!();

    println!("Evolution");
    println!("{}", "=".repeat(40));
    println!("  Generation:          {}", evolution.generation);
    println!("  Fitness:             {:.4}", evolution.fitness_score);
    println!("  Current fitness:     {:.4}", evolution.current_fitness);
    println!("  Mutations:           {}", evolution.mutation_count);
    match evolution.last_evolution {
        Some(at) => println!("  Last evolution:      {at}"),
        None => println!("  Last evolution:      never"),
    }

    if !evolution.recent_cycles.is_empty() {
        println!();
        println!("Recent cycles:");
        for cycle in &evolution.recent_cycles {
            println!(
                "  gen {:<6} fitness {:.4}  mutations {}{}",
                cycle.generation,
                cycle.fitness_score,
                cycle.mutations,
                if cycle.fitness_declined { "  (declined)" } else { "" },
            );
        }
    }

    Ok(())
}
