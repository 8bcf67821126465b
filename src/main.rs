use anyhow::{Context, Result};
use clap::Parser;
use log::LevelFilter;

use capacity_scheduler::domain::scheduling_model::resource::resource::CapacityType;
use capacity_scheduler::generate_scenario;
use capacity_scheduler::logger;

/// Loads a capacity scenario and prints a summary of its resources and activities.
#[derive(Parser)]
#[command(name = "capacity-scheduler", version)]
struct Args {
    /// Scenario JSON file.
    #[arg(long)]
    scenario: String,

    /// Log at debug level.
    #[arg(long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    if args.verbose {
        logger::init_with_level(LevelFilter::Debug);
    } else {
        logger::init();
    }

    let (scenario, _clock) = generate_scenario(&args.scenario).with_context(|| format!("loading scenario '{}'", args.scenario))?;

    let engine = scenario.read();
    println!("Scenario '{}' at tick {}", args.scenario, engine.now());

    println!("Resources:");
    for (_, resource) in engine.resources() {
        let kind = match resource.capacity_type() {
            CapacityType::SingleTasking => "single-tasking",
            CapacityType::MultiTasking => "multi-tasking",
            CapacityType::Infinite => "infinite",
        };
        let online = resource.intervals().iter().filter(|i| i.online && !i.past_planning_horizon).count();
        println!(
            "  {:<24} {:<15} continuity={:<5} intervals={} online={} horizon={}",
            resource.get_name(),
            kind,
            resource.tracks_continuity(),
            resource.intervals().len() - 1,
            online,
            resource.intervals().horizon_end()
        );
    }

    println!("Activities:");
    for (id, activity) in engine.activities() {
        let links: Vec<String> = engine
            .successors(id)
            .iter()
            .filter_map(|link| engine.activity(link.successor).ok().map(|s| (s, link.max_delay)))
            .map(|(successor, delay)| match delay {
                Some(delay) => format!("{} (max delay {})", successor.name, delay),
                None => successor.name.to_string(),
            })
            .collect();
        println!("  {:<24} quantity={} requirements={} successors=[{}]", activity.name, activity.quantity, activity.requirements().len(), links.join(", "));
    }

    Ok(())
}
