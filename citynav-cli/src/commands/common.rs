//! Common helpers shared across CLI commands.

use std::path::Path;

use citynav::config::{ConfigFile, NavigationConfig};
use citynav::fix::PositionFix;
use citynav::route::Route;
use serde::de::DeserializeOwned;

use crate::error::CliError;

/// Read and deserialize a JSON file.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, CliError> {
    let contents = std::fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&contents).map_err(|source| CliError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Load a route document.
pub fn load_route(path: &Path) -> Result<Route, CliError> {
    let route: Route = read_json(path)?;
    tracing::debug!(
        path = %path.display(),
        coordinates = route.coordinates.len(),
        steps = route.steps.len(),
        "Loaded route"
    );
    Ok(route)
}

/// Load a fix log: a JSON array of fixes in arrival order.
pub fn load_fixes(path: &Path) -> Result<Vec<PositionFix>, CliError> {
    let fixes: Vec<PositionFix> = read_json(path)?;
    if fixes.is_empty() {
        return Err(CliError::Input(format!(
            "Fix log {} contains no fixes",
            path.display()
        )));
    }
    tracing::debug!(path = %path.display(), fixes = fixes.len(), "Loaded fix log");
    Ok(fixes)
}

/// Navigation settings from `--config`, or from the default config file.
pub fn load_config(path: Option<&Path>) -> Result<NavigationConfig, CliError> {
    let file = match path {
        Some(path) => ConfigFile::load_from(path)?,
        None => ConfigFile::load()?,
    };
    Ok(file.navigation)
}
