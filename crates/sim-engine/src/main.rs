//! Emergence simulation harness
//!
//! Runs one or more simulations of a scenario against the persistent event
//! memory, saving the memory snapshot after every run so learning carries
//! across sessions.

use clap::Parser;
use sim_engine::memory::EventMemory;
use sim_engine::oracle::ScriptedOracle;
use sim_engine::scenario::setup_scenario;
use sim_engine::scheduler::{RunLimits, RunSummary, Scheduler};
use sim_engine::SimConfig;
use std::path::PathBuf;
use std::process::ExitCode;

/// Command line arguments for the simulation harness
#[derive(Parser, Debug)]
#[command(name = "emergence")]
#[command(about = "A turn-based multi-agent emergence simulation")]
struct Args {
    /// Scenario to run
    #[arg(long, default_value = "safehouse")]
    scenario: String,

    /// Number of runs in this session
    #[arg(long, default_value_t = 1)]
    runs: u32,

    /// Random seed for reproducibility
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Memory persistence file
    #[arg(long, default_value = "memory.json")]
    memory_file: PathBuf,

    /// Max simulated time per run (overrides config)
    #[arg(long)]
    max_time: Option<f64>,

    /// Max rounds per run (overrides config)
    #[arg(long)]
    max_rounds: Option<u64>,

    /// Configuration file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// One selected actor per round instead of a full pass
    #[arg(long)]
    single_actor: Option<bool>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => match SimConfig::from_file(path) {
            Ok(config) => config,
            Err(error) => {
                eprintln!("Failed to load config {}: {error}", path.display());
                return ExitCode::FAILURE;
            }
        },
        None => SimConfig::default(),
    };
    if let Some(max_time) = args.max_time {
        config.scheduler.max_time = max_time;
    }
    if let Some(max_rounds) = args.max_rounds {
        config.scheduler.max_rounds = max_rounds;
    }
    if let Some(single_actor) = args.single_actor {
        config.scheduler.single_actor = single_actor;
    }

    println!("Emergence Simulation");
    println!("====================");
    println!("Scenario: {}", args.scenario);
    println!("Runs: {}", args.runs);
    println!("Seed: {}", args.seed);
    println!("Memory file: {}", args.memory_file.display());
    println!();

    // Learning carries across sessions through the snapshot.
    let mut memory = if args.memory_file.exists() {
        match EventMemory::load(&args.memory_file, config.memory.clone()) {
            Ok(memory) => {
                println!(
                    "Loaded {} events and {} patterns from memory",
                    memory.len(),
                    memory.patterns().len()
                );
                memory
            }
            Err(error) => {
                eprintln!(
                    "Failed to load memory {}: {error}",
                    args.memory_file.display()
                );
                return ExitCode::FAILURE;
            }
        }
    } else {
        EventMemory::new(config.memory.clone())
    };

    let limits = RunLimits::from_config(&config);
    let mut summaries: Vec<RunSummary> = Vec::new();

    for run_index in 0..args.runs {
        println!("\nRun {}/{}", run_index + 1, args.runs);
        println!("--------------------");

        let (world, roster) = match setup_scenario(&args.scenario, &config.environment) {
            Ok(setup) => setup,
            Err(error) => {
                eprintln!("{error}");
                return ExitCode::FAILURE;
            }
        };

        let oracle = Box::new(ScriptedOracle::default());
        let mut scheduler = Scheduler::new(
            world,
            roster,
            memory,
            oracle,
            config.clone(),
            args.seed.wrapping_add(u64::from(run_index)),
        );
        let summary = scheduler.run(&limits);
        let (world, finished_memory) = scheduler.into_parts();
        memory = finished_memory;

        println!(
            "Complete: {} rounds, {} actions, stop: {}",
            summary.rounds, summary.actions, summary.stop_reason
        );
        println!(
            "Threat: {:.2} | cooperation: {} | communication: {} | patterns: {}",
            summary.final_threat,
            summary.cooperation_events,
            summary.communication_events,
            summary.patterns_discovered
        );

        if let Err(error) = memory.save(&args.memory_file, world.time) {
            eprintln!(
                "Failed to save memory {}: {error}",
                args.memory_file.display()
            );
            return ExitCode::FAILURE;
        }
        println!(
            "Memory saved: {} events, {} patterns",
            memory.len(),
            memory.patterns().len()
        );

        summaries.push(summary);
    }

    print_session_summary(&summaries, &memory);
    ExitCode::SUCCESS
}

fn print_session_summary(summaries: &[RunSummary], memory: &EventMemory) {
    println!("\nSession Summary");
    println!("===============");
    println!("Runs completed: {}", summaries.len());
    println!("Total events in memory: {}", memory.len());
    println!("Total patterns discovered: {}", memory.patterns().len());
    if !summaries.is_empty() {
        let average: f64 =
            summaries.iter().map(|s| s.duration).sum::<f64>() / summaries.len() as f64;
        println!("Average simulated time per run: {average:.1}");
    }

    if summaries.len() > 1 {
        let cooperation: Vec<usize> = summaries.iter().map(|s| s.cooperation_events).collect();
        let communication: Vec<usize> = summaries.iter().map(|s| s.communication_events).collect();
        println!("\nEmergence Analysis");
        println!("Cooperation events per run: {cooperation:?}");
        println!("Communication events per run: {communication:?}");

        if cooperation.len() > 3 {
            let early: f64 = cooperation[..3].iter().sum::<usize>() as f64 / 3.0;
            let recent: f64 =
                cooperation[cooperation.len() - 3..].iter().sum::<usize>() as f64 / 3.0;
            println!("Early runs average: {early:.1} cooperation events");
            println!("Recent runs average: {recent:.1} cooperation events");
            if recent > early * 1.5 {
                println!("Trend: cooperation strategies developing");
            } else if recent < early * 0.5 {
                println!("Trend: cooperation declining");
            } else {
                println!("Trend: stable cooperation levels");
            }
        }
    }
}
