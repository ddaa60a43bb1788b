//! Coarse step synthesis for routes without maneuver detail.
//!
//! When the provider returns geometry only, distance and ETA still work but
//! there is nothing to announce. This derives a step per significant bend in
//! the polyline from the change of bearing at each interior vertex:
//!
//! ```text
//! |Δ| > 170°  → uturn
//! |Δ| > 120°  → sharp-left / sharp-right
//! |Δ| >  60°  → turn-left / turn-right
//! |Δ| >  20°  → keep-left / keep-right
//! otherwise   → straight (no step)
//! ```
//!
//! A final arrive step is placed on the last vertex.

use super::types::{ManeuverType, Step};
use crate::geo::{bearing_degrees, distance_meters, relative_turn_degrees, Coordinate};

/// Vertices closer than this to their neighbour carry no usable bearing.
const MIN_SEGMENT_LENGTH_M: f64 = 1.0;

/// Build a coarse step list from the polyline geometry.
///
/// Returns an empty list for polylines with fewer than two vertices.
pub fn synthesize_steps(coords: &[Coordinate]) -> Vec<Step> {
    if coords.len() < 2 {
        return Vec::new();
    }

    let mut steps = Vec::new();

    for i in 1..coords.len() - 1 {
        let (prev, here, next) = (coords[i - 1], coords[i], coords[i + 1]);
        if distance_meters(prev, here) < MIN_SEGMENT_LENGTH_M
            || distance_meters(here, next) < MIN_SEGMENT_LENGTH_M
        {
            continue;
        }

        let turn = relative_turn_degrees(bearing_degrees(prev, here), bearing_degrees(here, next));
        let maneuver = classify_turn(turn);
        if maneuver == ManeuverType::Straight {
            continue;
        }

        steps.push(Step::new(i, maneuver, capitalize(maneuver.phrase())));
    }

    steps.push(Step::arrive(coords.len() - 1));
    steps
}

/// Classify a signed bearing change (positive = right).
fn classify_turn(angle: f64) -> ManeuverType {
    let abs_angle = angle.abs();
    let right = angle > 0.0;

    if abs_angle > 170.0 {
        ManeuverType::UTurn
    } else if abs_angle > 120.0 {
        if right {
            ManeuverType::SharpRight
        } else {
            ManeuverType::SharpLeft
        }
    } else if abs_angle > 60.0 {
        if right {
            ManeuverType::TurnRight
        } else {
            ManeuverType::TurnLeft
        }
    } else if abs_angle > 20.0 {
        if right {
            ManeuverType::KeepRight
        } else {
            ManeuverType::KeepLeft
        }
    } else {
        ManeuverType::Straight
    }
}

fn capitalize(phrase: &str) -> String {
    let mut chars = phrase.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
