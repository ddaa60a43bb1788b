//! Inspect command - validate a route document and list its maneuvers.

use std::path::{Path, PathBuf};

use citynav::config::NavigationConfig;
use citynav::route::{self, Route};

use super::common::{load_config, load_route};
use crate::error::CliError;

/// Arguments for the inspect command.
pub struct InspectArgs {
    pub route: PathBuf,
    pub config: Option<PathBuf>,
}

/// Run the inspect command.
pub fn run(args: InspectArgs) -> Result<(), CliError> {
    let config = load_config(args.config.as_deref())?;
    let original = load_route(&args.route)?;
    let had_steps = !original.steps.is_empty();

    let route = route::prepare(original, config.guidance())?;
    for line in describe_route(&args.route, &route, had_steps, &config) {
        println!("{}", line);
    }
    Ok(())
}

/// Summary lines for a validated route.
pub fn describe_route(
    path: &Path,
    route: &Route,
    had_steps: bool,
    config: &NavigationConfig,
) -> Vec<String> {
    let mut lines = vec![
        format!("Route: {}", path.display()),
        format!("  Coordinates:  {}", route.coordinates.len()),
        format!(
            "  Distance:     {:.2} km (provider), {:.2} km (measured)",
            route.total_distance_km(),
            citynav::geo::polyline_length_meters(&route.coordinates) / 1000.0
        ),
        format!("  Duration:     {:.1} min", route.total_duration_minutes),
    ];

    if let Some(destination) = route.destination() {
        lines.push(format!("  Destination:  {}", destination));
    }

    let source = if had_steps {
        "provider"
    } else if config.require_guidance {
        "synthesized"
    } else {
        "none, distance-only guidance"
    };
    lines.push(format!("  Steps:        {} ({})", route.steps.len(), source));

    for (i, step) in route.steps.iter().enumerate() {
        let mut line = format!(
            "    {:>3}  @{:<5} {:<16} {}",
            i,
            step.coordinate_index,
            step.maneuver.as_str(),
            step.instruction
        );
        if let Some(street) = &step.street_name {
            line.push_str(&format!(" [{}]", street));
        }
        lines.push(line);
    }

    lines
}
