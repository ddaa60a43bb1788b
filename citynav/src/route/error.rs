//! Route validation errors.

use thiserror::Error;

/// Reasons a route cannot be tracked.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RouteError {
    /// Fewer than two coordinates.
    #[error("Route needs at least 2 coordinates, got {count}")]
    InsufficientCoordinates { count: usize },

    /// A coordinate is non-finite or outside WGS84 ranges.
    #[error("Route coordinate {index} is not a valid position")]
    InvalidCoordinate { index: usize },

    /// A step points past the end of the polyline.
    #[error("Step {step} references coordinate {coordinate_index} but route has {len} coordinates")]
    StepIndexOutOfRange {
        step: usize,
        coordinate_index: usize,
        len: usize,
    },

    /// Total distance or duration is negative or not finite.
    #[error("Route totals are not usable: {distance_meters} m, {duration_minutes} min")]
    InvalidTotals {
        distance_meters: f64,
        duration_minutes: f64,
    },

    /// Step anchors are not strictly increasing.
    #[error("Step {step} does not come after the previous step on the route")]
    StepsNotIncreasing { step: usize },

    /// Turn-by-turn guidance was required but the route has no steps.
    #[error("Route has no maneuver steps")]
    EmptySteps,

    /// Session was started without an origin.
    #[error("Navigation origin is missing")]
    MissingOrigin,

    /// Session was started without a destination.
    #[error("Navigation destination is missing")]
    MissingDestination,
}
