//! Mob Field Simulation
//!
//! Runs the field headless, writing snapshots, a stats log and an optional
//! checkpoint under the output directory.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use thiserror::Error;
use tracing::{error, info, warn};

use mob_core::config::{Config, ConfigError, DEFAULT_CONFIG_PATH};
use mob_core::output::{
    capture_snapshot, write_summary, Checkpoint, CheckpointError, OutputError, SnapshotWriter,
    StatsLogger,
};
use mob_core::{RunControl, SimError, Simulation};

/// Command line arguments for the simulation
#[derive(Parser, Debug)]
#[command(name = "mobfield")]
#[command(about = "Grid of brain-driven mobs competing for sunlight and food")]
struct Args {
    /// TOML configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Random seed, overrides the config
    #[arg(long)]
    seed: Option<u64>,

    /// Number of epochs to run, overrides the config
    #[arg(long)]
    epochs: Option<u64>,

    /// Directory for snapshots, stats and summaries
    #[arg(long, default_value = "output")]
    output: PathBuf,

    /// Epochs between snapshots, overrides the config (0 disables)
    #[arg(long)]
    snapshot_interval: Option<u64>,

    /// Resume from a checkpoint instead of seeding a fresh field
    #[arg(long)]
    resume: Option<PathBuf>,

    /// Write a checkpoint here when the run ends
    #[arg(long)]
    checkpoint: Option<PathBuf>,

    /// Sleep between epochs, in microseconds
    #[arg(long, default_value_t = 0)]
    delay_us: u64,

    /// Write the default configuration to this path and exit
    #[arg(long)]
    write_default_config: Option<PathBuf>,
}

#[derive(Debug, Error)]
enum AppError {
    #[error("config: {0}")]
    Config(#[from] ConfigError),
    #[error("simulation: {0}")]
    Sim(#[from] SimError),
    #[error("output: {0}")]
    Output(#[from] OutputError),
    #[error("checkpoint: {0}")]
    Checkpoint(#[from] CheckpointError),
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn main() -> ExitCode {
    init_tracing();
    let args = Args::parse();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), AppError> {
    if let Some(path) = &args.write_default_config {
        std::fs::write(path, Config::default().to_toml()?).map_err(ConfigError::from)?;
        println!("Wrote default configuration to {}", path.display());
        return Ok(());
    }

    let (mut sim, resumed) = match &args.resume {
        Some(path) => {
            let checkpoint = Checkpoint::load(path)?;
            info!(epoch = checkpoint.epoch, mobs = checkpoint.mobs.len(), "resuming from {}", path.display());
            if args.seed.is_some() {
                warn!("--seed is ignored when resuming");
            }
            (checkpoint.restore()?, true)
        }
        None => (Simulation::new(load_config(&args)?)?, false),
    };

    let config = sim.config().clone();
    let epochs = args.epochs.unwrap_or(config.simulation.epochs);
    let snapshot_interval = args
        .snapshot_interval
        .unwrap_or(config.simulation.snapshot_interval);

    println!("Mob Field Simulation");
    println!("====================");
    println!("Seed: {}", config.simulation.seed);
    println!("Field: {}x{}", config.field.width, config.field.height);
    println!("Epochs: {} (starting at {})", epochs, sim.epoch());
    println!("Snapshot interval: {}", snapshot_interval);
    println!();

    let mut snapshots = SnapshotWriter::new(&args.output, snapshot_interval)?;
    let mut stats_log = StatsLogger::new(
        args.output.join("stats.jsonl"),
        config.simulation.stats_interval,
        resumed,
    )?;

    let initial = capture_snapshot(&sim);
    if snapshots.should_snapshot(sim.epoch()) {
        snapshots.write_snapshot_to_dir(&initial)?;
    }
    snapshots.write_current_state(&initial)?;

    let control = RunControl::with_delay_us(args.delay_us);
    let summary = sim.run(epochs, &control, |sim, stats| {
        if let Err(e) = stats_log.record(stats) {
            warn!("could not log stats for epoch {}: {}", stats.epoch, e);
        }
        if snapshots.should_snapshot(sim.epoch()) {
            let snapshot = capture_snapshot(sim);
            if let Err(e) = snapshots.write_snapshot_to_dir(&snapshot) {
                warn!("could not write snapshot at epoch {}: {}", sim.epoch(), e);
            }
            if let Err(e) = snapshots.write_current_state(&snapshot) {
                warn!("could not write current state at epoch {}: {}", sim.epoch(), e);
            }
        }
        if stats_log.should_log(stats.epoch) {
            info!(
                epoch = stats.epoch,
                population = stats.population,
                mean_energy = stats.mean_energy,
                "progress"
            );
        }
    });
    stats_log.flush()?;

    snapshots.write_current_state(&capture_snapshot(&sim))?;
    write_summary(&summary, args.output.join("summary.json"))?;

    if let Some(path) = &args.checkpoint {
        save_checkpoint(&sim, path)?;
    }

    println!();
    println!(
        "Simulation complete. Ran {} epochs, final population {} (peak {} at epoch {}).",
        summary.epochs_run(),
        summary.final_population,
        summary.peak_population,
        summary.peak_epoch
    );
    if summary.extinct {
        println!("The population died out.");
    }
    println!("Generated {} snapshots.", snapshots.snapshot_count());
    Ok(())
}

fn load_config(args: &Args) -> Result<Config, ConfigError> {
    let mut config = Config::load_or_default(&args.config)?;
    if let Some(seed) = args.seed {
        config.simulation.seed = seed;
    }
    Ok(config)
}

fn save_checkpoint(sim: &Simulation, path: &Path) -> Result<(), CheckpointError> {
    Checkpoint::capture(sim).save(path)?;
    info!(epoch = sim.epoch(), "checkpoint written to {}", path.display());
    Ok(())
}
