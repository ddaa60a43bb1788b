//! Configuration CLI commands.
//!
//! Provides `config path` and `config show` for locating and viewing the
//! navigation settings.

use std::path::{Path, PathBuf};

use clap::Subcommand;
use citynav::config::{config_file_path, ConfigFile};

use crate::error::CliError;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Show the configuration file path
    Path,

    /// Show the effective settings as INI
    Show {
        /// Read this file instead of the default location
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

/// Run a config subcommand.
pub fn run(command: ConfigCommands) -> Result<(), CliError> {
    match command {
        ConfigCommands::Path => run_path(),
        ConfigCommands::Show { config } => run_show(config.as_deref()),
    }
}

/// Show the configuration file path.
fn run_path() -> Result<(), CliError> {
    match config_file_path() {
        Some(path) => {
            let marker = if path.exists() { "" } else { " (not created, defaults apply)" };
            println!("{}{}", path.display(), marker);
            Ok(())
        }
        None => Err(CliError::Input(
            "No configuration directory on this platform".to_string(),
        )),
    }
}

/// Show the effective settings.
fn run_show(path: Option<&Path>) -> Result<(), CliError> {
    print!("{}", render(path)?);
    Ok(())
}

fn render(path: Option<&Path>) -> Result<String, CliError> {
    let file = match path {
        Some(path) => ConfigFile::load_from(path)?,
        None => ConfigFile::load()?,
    };
    Ok(file.to_ini_string())
}
