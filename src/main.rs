// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/lotline

//! LotLine - Synthetic Plant Telemetry and Lot Completion

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use lotline::lots::ProductOutcome;
use lotline::{Config, Database, Engine, NewLot, NAME, VERSION};

/// LotLine - Synthetic Plant Telemetry and Lot Completion
#[derive(Parser, Debug)]
#[command(name = "lotline")]
#[command(author = "LotLine Project")]
#[command(version = VERSION)]
#[command(about = "Simulated machine telemetry with lot completion detection")]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Database file path
    #[arg(long)]
    database: Option<PathBuf>,

    /// Fixed simulation seed
    #[arg(long)]
    seed: Option<u64>,

    /// Completion strategy: threshold, cycle or both
    #[arg(long)]
    strategy: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Enable trace-level logging
    #[arg(long)]
    trace: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the simulation and the completion loops chosen by the strategy until Ctrl+C
    Run,

    /// Manage lots
    #[command(subcommand)]
    Lots(LotsCommand),
}

#[derive(Subcommand, Debug)]
enum LotsCommand {
    /// Start a new lot in processing
    Create {
        number: String,
        #[arg(long, default_value = "")]
        machine: String,
    },

    /// List every lot, newest first
    List,

    /// Show one lot
    Show { number: String },

    /// Record product counts for a lot
    Outcome {
        number: String,
        #[arg(long)]
        good: Option<i64>,
        #[arg(long)]
        defect: Option<i64>,
        #[arg(long)]
        conclusion: Option<String>,
    },

    /// Delete a lot
    Delete { number: String },

    /// Product figures of every lot
    Products,

    /// Compute averages and operation hours for completed lots missing them
    Backfill {
        /// Measurement to average over (defaults to the simulator's)
        #[arg(long)]
        measurement: Option<String>,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Load or create configuration; reported once logging is up
    let config_path = args.config.clone().unwrap_or_else(Config::default_path);
    let (mut config, load_error) = match Config::load_or_create(&config_path) {
        Ok(config) => (config, None),
        Err(e) => (Config::default(), Some(e)),
    };

    // Initialize logging
    let level = if args.trace {
        "trace"
    } else if args.debug {
        "debug"
    } else {
        config.log_level.as_str()
    };
    let filter = if args.trace || args.debug {
        EnvFilter::new(level)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_file(args.debug)
        .with_line_number(args.debug)
        .init();

    match load_error {
        Some(e) => warn!("Config at {:?} unusable ({:#}), using defaults", config_path, e),
        None => info!("Configuration loaded from {:?}", config_path),
    }

    // Environment, then command line
    config.apply_env();
    config.apply_cli_overrides(args.database, args.seed, args.strategy);
    let settings = config.settings();

    match args.command.unwrap_or(Command::Run) {
        Command::Run => {
            info!("{} v{}", config.app_name, VERSION);
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(run(settings))
        }
        Command::Lots(command) => {
            let db = Database::open(&settings.database_path)?;
            lots(&db, &settings, command)
        }
    }
}

/// Run until Ctrl+C
async fn run(settings: lotline::Settings) -> Result<()> {
    let mut engine = Engine::new(settings)?;
    engine.start();

    info!("Press Ctrl+C to shutdown");
    tokio::signal::ctrl_c().await?;

    info!("Shutdown signal received, cleaning up...");
    engine.stop().await;

    info!("{} shutdown complete", NAME);
    Ok(())
}

fn lots(db: &Database, settings: &lotline::Settings, command: LotsCommand) -> Result<()> {
    match command {
        LotsCommand::Create { number, machine } => {
            let lot = db.create_lot(&NewLot::new(number, machine))?;
            println!("{}", serde_json::to_string_pretty(&lot)?);
        }
        LotsCommand::List => {
            let lots = db.list_lots()?;
            println!("{}", serde_json::to_string_pretty(&lots)?);
        }
        LotsCommand::Show { number } => {
            let lot = db.get_lot_by_number(&number)?;
            println!("{}", serde_json::to_string_pretty(&lot)?);
        }
        LotsCommand::Outcome {
            number,
            good,
            defect,
            conclusion,
        } => {
            let outcome = ProductOutcome {
                good_product: good,
                defect_product: defect,
                conclusion,
            };
            let lot = db.record_product_outcome(&number, &outcome)?;
            println!("{}", serde_json::to_string_pretty(&lot)?);
        }
        LotsCommand::Delete { number } => {
            db.delete_lot_by_number(&number)?;
            println!("deleted {}", number);
        }
        LotsCommand::Products => {
            let products = db.list_product_data()?;
            println!("{}", serde_json::to_string_pretty(&products)?);
        }
        LotsCommand::Backfill { measurement } => {
            let measurement = measurement.unwrap_or_else(|| settings.simulation.measurement.clone());
            let updated = db.backfill_computed_fields(&measurement)?;
            println!("{}", serde_json::to_string_pretty(&serde_json::json!({ "updated": updated }))?);
        }
    }
    Ok(())
}
