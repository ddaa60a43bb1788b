//! Route progress computation.
//!
//! [`ProgressTracker::update`] is a pure function of a route and a fix. It
//! knows nothing about session phases: off-route hysteresis and arrival are
//! decided by the session from the numbers produced here.
//!
//! # Algorithm
//!
//! ```text
//! closest      = nearest route vertex to the fix
//! remaining    = Σ distance(c[i], c[i+1]) for i in closest..last
//! time         = total_minutes × (remaining / 1000) / total_km   (0 unless total_km > 0)
//! next step    = first step with coordinate_index > closest, else synthesized arrive
//! step dist    = straight line c[closest] → c[next.coordinate_index]
//! ```
//!
//! Remaining distance is recomputed in full on every fix. Routes are tens to
//! a few hundred vertices and fixes arrive at most once a second.

use serde::Serialize;

use crate::fix::PositionFix;
use crate::geo::{closest_point_on_polyline, distance_meters, path_distance_meters};
use crate::route::{Route, Step};

/// The step the driver is heading towards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpcomingStep {
    /// Position in `route.steps`, or `route.steps.len()` for the synthesized
    /// arrive step.
    pub index: usize,
    /// The step itself.
    pub step: Step,
    /// Whether the step was synthesized because no route step remains.
    pub synthesized: bool,
}

impl UpcomingStep {
    /// First step anchored strictly after `closest_index`.
    pub fn after(route: &Route, closest_index: usize) -> Self {
        match route
            .steps
            .iter()
            .enumerate()
            .find(|(_, s)| s.coordinate_index > closest_index)
        {
            Some((index, step)) => Self {
                index,
                step: step.clone(),
                synthesized: false,
            },
            None => Self {
                index: route.steps.len(),
                step: Step::arrive(route.last_index()),
                synthesized: true,
            },
        }
    }
}

/// Tracker output for one fix.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressResult {
    /// Index of the route vertex nearest the fix.
    pub closest_index: usize,
    /// Distance from the fix to that vertex.
    pub distance_to_route_meters: f64,
    /// Path distance from the closest vertex to the end of the route.
    pub remaining_distance_meters: f64,
    /// Remaining time scaled from the route's duration estimate.
    pub remaining_time_minutes: f64,
    /// Next maneuver.
    pub next_step: UpcomingStep,
    /// Straight-line distance from the closest vertex to the next maneuver.
    pub distance_to_next_step_meters: f64,
    /// Straight-line distance from the fix to the final route vertex.
    pub distance_to_destination_meters: f64,
}

/// Stateless progress calculator.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProgressTracker;

impl ProgressTracker {
    /// Compute progress along `route` for `fix`.
    ///
    /// `route` must have passed validation (at least two coordinates).
    /// An empty polyline yields a zeroed result anchored at index 0.
    pub fn update(route: &Route, fix: &PositionFix) -> ProgressResult {
        let position = fix.coordinate();
        let closest = closest_point_on_polyline(position, &route.coordinates);
        let (closest_index, distance_to_route_meters) = closest
            .map(|c| (c.index, c.distance_meters))
            .unwrap_or((0, 0.0));

        let remaining_distance_meters = path_distance_meters(&route.coordinates, closest_index);
        let remaining_time_minutes = remaining_time(route, remaining_distance_meters);

        let next_step = UpcomingStep::after(route, closest_index);
        let distance_to_next_step_meters = match (
            route.coordinates.get(closest_index),
            route.coordinates.get(next_step.step.coordinate_index),
        ) {
            (Some(from), Some(to)) => distance_meters(*from, *to),
            _ => 0.0,
        };

        let distance_to_destination_meters = route
            .destination()
            .map(|dest| distance_meters(position, dest))
            .unwrap_or(0.0);

        ProgressResult {
            closest_index,
            distance_to_route_meters,
            remaining_distance_meters,
            remaining_time_minutes,
            next_step,
            distance_to_next_step_meters,
            distance_to_destination_meters,
        }
    }

    /// Progress before any fix: at the first vertex with the whole route ahead.
    pub fn initial(route: &Route) -> ProgressResult {
        let remaining_distance_meters = path_distance_meters(&route.coordinates, 0);
        let next_step = UpcomingStep::after(route, 0);
        let distance_to_next_step_meters = match (
            route.coordinates.first(),
            route.coordinates.get(next_step.step.coordinate_index),
        ) {
            (Some(from), Some(to)) => distance_meters(*from, *to),
            _ => 0.0,
        };
        let distance_to_destination_meters = match (route.coordinates.first(), route.destination()) {
            (Some(from), Some(to)) => distance_meters(*from, to),
            _ => 0.0,
        };

        ProgressResult {
            closest_index: 0,
            distance_to_route_meters: 0.0,
            remaining_distance_meters,
            remaining_time_minutes: remaining_time(route, remaining_distance_meters),
            next_step,
            distance_to_next_step_meters,
            distance_to_destination_meters,
        }
    }
}

/// Scale the route's duration estimate by the share of distance remaining.
fn remaining_time(route: &Route, remaining_distance_meters: f64) -> f64 {
    let total_km = route.total_distance_km();
    if total_km.is_nan() || total_km <= 0.0 {
        return 0.0;
    }
    route.total_duration_minutes * (remaining_distance_meters / 1000.0) / total_km
}
