//! fogmap CLI - Command-line interface
//!
//! Inspects the visited-region database, replays recorded tracks through a
//! fog session, and renders overlay ellipses for a viewport.

mod commands;
mod error;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use console::style;
use fogmap::logging::init_logging;

use commands::common::Context;
use commands::config::ConfigCommands;
use commands::overlay::OverlayArgs;
use commands::regions::RegionsAction;
use commands::replay::ReplayArgs;
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "fogmap")]
#[command(version, about = "Track and inspect explored areas on a fog-of-war map")]
struct Cli {
    /// Configuration file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Region database, overriding storage.database
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Inspect or clear visited regions
    Regions {
        #[command(subcommand)]
        action: RegionsAction,
    },

    /// Replay a CSV track of fixes through a fog session
    Replay(ReplayArgs),

    /// Print reveal ellipses for a viewport as JSON
    Overlay(OverlayArgs),

    /// View or modify configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            e.exit_code()
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let ctx = Context::load(cli.config, cli.database)?;

    let logging = if cli.verbose {
        ctx.config.logging.clone().with_level("debug")
    } else {
        ctx.config.logging.clone()
    };
    // Held until exit so buffered file output is flushed
    let _log_guard = init_logging(&logging).unwrap_or_else(|e| {
        eprintln!("Warning: logging disabled: {}", e);
        None
    });

    match cli.command {
        Commands::Regions { action } => commands::regions::run(action, &ctx),
        Commands::Replay(args) => commands::replay::run(args, &ctx),
        Commands::Overlay(args) => commands::overlay::run(args, &ctx),
        Commands::Config { command } => commands::config::run(command, ctx),
    }
}
