//! Command-line shell around the territory simulation.

mod telemetry;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use territory_core::{BoundaryPolicy, Error, MovementPolicy, SimulationConfig};
use territory_world::Simulation;
use tracing::info;

#[derive(Parser)]
#[command(name = "territory")]
#[command(about = "Grid simulation of territorial organisms")]
struct Cli {
    /// Log at debug level (overridden by RUST_LOG)
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a simulation and print every step
    Run(RunArgs),
    /// Dump the default configuration to stdout
    DumpDefaultConfig,
}

#[derive(clap::Args)]
struct RunArgs {
    /// Path to config file (JSON); flags below override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Grid width
    #[arg(long)]
    width: Option<i32>,

    /// Grid height
    #[arg(long)]
    height: Option<i32>,

    /// Number of simulation steps
    #[arg(long, allow_negative_numbers = true)]
    steps: Option<i64>,

    /// Share of cells holding a resource each step, 0-100
    #[arg(long, allow_negative_numbers = true)]
    density_percent: Option<i64>,

    /// Random seed
    #[arg(long)]
    seed: Option<u64>,

    /// Destination selection policy
    #[arg(long, value_enum)]
    movement: Option<MovementArg>,

    /// Wrap neighbors around the grid edges
    #[arg(long)]
    toroidal: bool,

    /// Only print the final statistics
    #[arg(long)]
    quiet: bool,

    /// Print each step as a JSON object instead of a grid
    #[arg(long)]
    json: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum MovementArg {
    Contest,
    EmptyOnly,
}

impl From<MovementArg> for MovementPolicy {
    fn from(arg: MovementArg) -> Self {
        match arg {
            MovementArg::Contest => MovementPolicy::Contest,
            MovementArg::EmptyOnly => MovementPolicy::EmptyOnly,
        }
    }
}

impl RunArgs {
    /// Merge the flags into a base configuration
    fn to_config(&self) -> Result<SimulationConfig> {
        let mut config = match &self.config {
            Some(path) => SimulationConfig::load(path)
                .with_context(|| format!("failed to load config from {}", path.display()))?,
            None => SimulationConfig::default(),
        };

        if let Some(width) = self.width {
            config.world.width = width;
        }
        if let Some(height) = self.height {
            config.world.height = height;
        }
        if let Some(steps) = self.steps {
            config.num_steps = u64::try_from(steps).map_err(|_| {
                Error::InvalidConfiguration(format!("step count must not be negative, got {steps}"))
            })?;
        }
        if let Some(percent) = self.density_percent {
            if !(0..=100).contains(&percent) {
                return Err(Error::InvalidConfiguration(format!(
                    "resource density must be within 0-100, got {percent}"
                ))
                .into());
            }
            config.world.resource_density = percent as f64 / 100.0;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(movement) = self.movement {
            config.rules.movement = movement.into();
        }
        if self.toroidal {
            config.world.boundary = BoundaryPolicy::Toroidal;
        }

        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    telemetry::init_telemetry(cli.verbose)?;

    match cli.command {
        Commands::Run(args) => run(&args),
        Commands::DumpDefaultConfig => {
            let json = serde_json::to_string_pretty(&SimulationConfig::default())?;
            println!("{json}");
            Ok(())
        }
    }
}

fn run(args: &RunArgs) -> Result<()> {
    let config = args.to_config()?;
    info!(
        width = config.world.width,
        height = config.world.height,
        steps = config.num_steps,
        resource_density = config.world.resource_density,
        seed = config.seed,
        "Starting territory simulation"
    );

    let steps = config.num_steps;
    let mut sim = Simulation::new(config)?;

    if !args.quiet && !args.json {
        println!("Initial state");
        print!("{}", sim.snapshot());
    }

    let summary = sim.run_with(steps, |snapshot| {
        if args.quiet {
            return Ok(());
        }
        if args.json {
            println!("{}", snapshot.to_json()?);
        } else {
            println!();
            println!("Step {}", snapshot.step);
            print!("{snapshot}");
        }
        Ok(())
    })?;

    if args.json {
        println!("{}", serde_json::to_string(&summary)?);
    } else {
        println!();
        println!("{summary}");
    }

    Ok(())
}
