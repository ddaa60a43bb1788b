//! Route model and validation.
//!
//! A [`Route`] is what the routing provider hands back: a polyline, maneuver
//! steps anchored to its vertices, and aggregate estimates. Before a session
//! tracks a route it goes through [`validate`], which enforces the invariants
//! the tracker relies on:
//!
//! - at least two coordinates, all inside WGS84 ranges
//! - every step anchored to an existing vertex
//! - step anchors strictly increasing along the route
//! - finite, non-negative distance and duration totals
//!
//! Routes without steps are still trackable. When turn-by-turn guidance is
//! required, validation reports [`RouteError::EmptySteps`] and the caller
//! replaces the step list with [`synthesize_steps`].

mod error;
mod synthesize;
mod types;

pub use error::RouteError;
pub use synthesize::synthesize_steps;
pub use types::{Lane, LaneDirection, ManeuverType, Route, Step, ARRIVE_INSTRUCTION};

/// Whether the caller needs maneuver steps from the route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GuidanceRequirement {
    /// Distance and ETA only; an empty step list is fine.
    DistanceOnly,
    /// Turn-by-turn guidance; an empty step list is reported.
    #[default]
    TurnByTurn,
}

/// Check a route's structural invariants.
pub fn validate(route: &Route, guidance: GuidanceRequirement) -> Result<(), RouteError> {
    let len = route.coordinates.len();
    if len < 2 {
        return Err(RouteError::InsufficientCoordinates { count: len });
    }

    if let Some(index) = route.coordinates.iter().position(|c| !c.is_valid()) {
        return Err(RouteError::InvalidCoordinate { index });
    }

    let usable = |value: f64| value.is_finite() && value >= 0.0;
    if !usable(route.total_distance_meters) || !usable(route.total_duration_minutes) {
        return Err(RouteError::InvalidTotals {
            distance_meters: route.total_distance_meters,
            duration_minutes: route.total_duration_minutes,
        });
    }

    let mut previous: Option<usize> = None;
    for (step, s) in route.steps.iter().enumerate() {
        if s.coordinate_index >= len {
            return Err(RouteError::StepIndexOutOfRange {
                step,
                coordinate_index: s.coordinate_index,
                len,
            });
        }
        if previous.is_some_and(|p| s.coordinate_index <= p) {
            return Err(RouteError::StepsNotIncreasing { step });
        }
        previous = Some(s.coordinate_index);
    }

    if route.steps.is_empty() && guidance == GuidanceRequirement::TurnByTurn {
        return Err(RouteError::EmptySteps);
    }

    Ok(())
}

/// Validate, synthesizing a coarse step list when guidance is required but
/// the provider sent none.
pub fn prepare(route: Route, guidance: GuidanceRequirement) -> Result<Route, RouteError> {
    match validate(&route, guidance) {
        Ok(()) => Ok(route),
        Err(RouteError::EmptySteps) => {
            let steps = synthesize_steps(&route.coordinates);
            tracing::debug!(
                coordinates = route.coordinates.len(),
                synthesized_steps = steps.len(),
                "Route has no maneuver steps, synthesized coarse guidance"
            );
            Ok(Route { steps, ..route })
        }
        Err(e) => Err(e),
    }
}
