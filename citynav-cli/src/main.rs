//! CityNav CLI - Command-line interface
//!
//! Replays recorded position fixes against a route and inspects route
//! documents, using the `citynav` navigation engine.

mod commands;
mod error;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::config::ConfigCommands;
use commands::inspect::InspectArgs;
use commands::replay::ReplayArgs;
use error::CliError;

#[derive(Parser)]
#[command(name = "citynav")]
#[command(version = citynav::VERSION)]
#[command(about = "Turn-by-turn navigation tracking for city traffic", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a fix log against a route and print navigation events
    Replay {
        /// Route document (JSON)
        #[arg(long)]
        route: PathBuf,

        /// Fix log (JSON array of position fixes)
        #[arg(long)]
        fixes: PathBuf,

        /// Replacement routes handed out, in order, when the driver goes off route
        #[arg(long)]
        reroute: Vec<PathBuf>,

        /// Configuration file (defaults to the user config)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Print events as JSON lines
        #[arg(long)]
        json: bool,
    },

    /// Validate a route document and list its maneuvers
    Inspect {
        /// Route document (JSON)
        #[arg(long)]
        route: PathBuf,

        /// Configuration file (defaults to the user config)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// View configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

fn init_logging(verbose: bool) {
    let directive = if verbose { "citynav=debug" } else { "citynav=info" };
    let filter = EnvFilter::from_default_env();
    let filter = match directive.parse() {
        Ok(d) => filter.add_directive(d),
        Err(_) => filter,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Replay {
            route,
            fixes,
            reroute,
            config,
            json,
        } => commands::replay::run(ReplayArgs {
            route,
            fixes,
            reroute,
            config,
            json,
        }),
        Commands::Inspect { route, config } => commands::inspect::run(InspectArgs { route, config }),
        Commands::Config { command } => commands::config::run(command),
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
