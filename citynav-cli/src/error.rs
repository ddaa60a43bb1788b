//! CLI error type.

use std::path::PathBuf;

use citynav::config::ConfigError;
use citynav::route::RouteError;
use citynav::session::SessionError;
use thiserror::Error;

/// Errors surfaced to the user by CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Route error: {0}")]
    Route(#[from] RouteError),

    #[error("Navigation error: {0}")]
    Session(#[from] SessionError),

    #[error("Failed to serialize output: {0}")]
    Output(#[source] serde_json::Error),

    #[error("{0}")]
    Input(String),
}
