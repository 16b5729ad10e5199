//! LightScout CLI - forward-looking traffic light proximity alerts
//!
//! This binary drives the `lightscout` library from the command line.

mod commands;
mod error;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use lightscout::index::DEFAULT_HEADING_CONE_DEG;
use lightscout::pipeline::DEFAULT_SEARCH_RADIUS_M;

use commands::query::QueryArgs;
use commands::run::RunArgs;

#[derive(Parser)]
#[command(name = "lightscout")]
#[command(version, about = "Traffic light proximity alerts from a GPS receiver", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Track position and raise proximity alerts until Ctrl+C
    Run(RunCommand),

    /// Query the dataset once around a point
    Query(QueryCommand),

    /// Show dataset statistics
    Info {
        /// Dataset file (.json or .json.gz)
        #[arg(long)]
        dataset: PathBuf,
    },
}

#[derive(Args)]
struct RunCommand {
    /// Configuration file (default: ~/.lightscout/config.ini)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Dataset file (.json or .json.gz)
    #[arg(long)]
    dataset: Option<PathBuf>,

    /// GPS channel: serial device, tcp://host:port or file://path
    #[arg(long)]
    gps: Option<String>,

    /// GPS baud rate
    #[arg(long)]
    baud: Option<u32>,

    /// Actuator channel: serial device or tcp://host:port
    #[arg(long)]
    actuator: Option<String>,

    /// Search radius in meters
    #[arg(long)]
    radius: Option<f64>,

    /// Seconds between proximity queries
    #[arg(long)]
    interval: Option<f64>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Args)]
struct QueryCommand {
    /// Dataset file (.json or .json.gz)
    #[arg(long)]
    dataset: PathBuf,

    /// Latitude in decimal degrees
    #[arg(long, allow_negative_numbers = true)]
    lat: f64,

    /// Longitude in decimal degrees
    #[arg(long, allow_negative_numbers = true)]
    lon: f64,

    /// Search radius in meters
    #[arg(long, default_value_t = DEFAULT_SEARCH_RADIUS_M)]
    radius: f64,

    /// Heading in degrees; limits results to the cone ahead
    #[arg(long)]
    heading: Option<f64>,

    /// Half-width of the heading cone in degrees
    #[arg(long, default_value_t = DEFAULT_HEADING_CONE_DEG)]
    cone: f64,
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run(cmd) => commands::run::run(RunArgs {
            config: cmd.config,
            dataset: cmd.dataset,
            gps: cmd.gps,
            baud: cmd.baud,
            actuator: cmd.actuator,
            radius: cmd.radius,
            interval: cmd.interval,
            verbose: cmd.verbose,
        }),
        Commands::Query(cmd) => commands::query::run(QueryArgs {
            dataset: cmd.dataset,
            lat: cmd.lat,
            lon: cmd.lon,
            radius: cmd.radius,
            heading: cmd.heading,
            cone: cmd.cone,
        }),
        Commands::Info { dataset } => commands::info::run(dataset),
    };

    if let Err(e) = result {
        e.exit();
    }
}
