//! Route, step and maneuver types.
//!
//! These mirror what the routing provider returns: a coordinate polyline,
//! maneuver steps anchored to vertices of that polyline, and aggregate
//! distance/duration estimates.

use serde::{Deserialize, Serialize};

use crate::geo::{polyline_length_meters, Coordinate};

/// Instruction text used for the synthesized terminal step.
pub const ARRIVE_INSTRUCTION: &str = "Arrive at destination";

/// Kind of maneuver a step asks the driver to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ManeuverType {
    Straight,
    TurnLeft,
    TurnRight,
    SharpLeft,
    SharpRight,
    KeepLeft,
    KeepRight,
    #[serde(rename = "uturn")]
    UTurn,
    Merge,
    RoundaboutEnter,
    RoundaboutExit,
    Exit,
    Arrive,
}

impl ManeuverType {
    /// Spoken verb phrase for this maneuver, lower case.
    pub fn phrase(&self) -> &'static str {
        match self {
            ManeuverType::Straight => "continue straight",
            ManeuverType::TurnLeft => "turn left",
            ManeuverType::TurnRight => "turn right",
            ManeuverType::SharpLeft => "turn sharp left",
            ManeuverType::SharpRight => "turn sharp right",
            ManeuverType::KeepLeft => "keep left",
            ManeuverType::KeepRight => "keep right",
            ManeuverType::UTurn => "make a U-turn",
            ManeuverType::Merge => "merge",
            ManeuverType::RoundaboutEnter => "enter the roundabout",
            ManeuverType::RoundaboutExit => "exit the roundabout",
            ManeuverType::Exit => "take the exit",
            ManeuverType::Arrive => "arrive at destination",
        }
    }

    /// Stable identifier, matching the serialized form.
    pub fn as_str(&self) -> &'static str {
        match self {
            ManeuverType::Straight => "straight",
            ManeuverType::TurnLeft => "turn-left",
            ManeuverType::TurnRight => "turn-right",
            ManeuverType::SharpLeft => "sharp-left",
            ManeuverType::SharpRight => "sharp-right",
            ManeuverType::KeepLeft => "keep-left",
            ManeuverType::KeepRight => "keep-right",
            ManeuverType::UTurn => "uturn",
            ManeuverType::Merge => "merge",
            ManeuverType::RoundaboutEnter => "roundabout-enter",
            ManeuverType::RoundaboutExit => "roundabout-exit",
            ManeuverType::Exit => "exit",
            ManeuverType::Arrive => "arrive",
        }
    }
}

impl std::fmt::Display for ManeuverType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Direction a lane allows at an intersection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LaneDirection {
    Left,
    SlightLeft,
    Straight,
    SlightRight,
    Right,
    #[serde(rename = "uturn")]
    UTurn,
}

/// One lane of a lane-guidance descriptor, ordered left to right.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lane {
    /// Directions this lane permits.
    pub directions: Vec<LaneDirection>,
    /// Whether this lane is recommended for the upcoming maneuver.
    #[serde(default)]
    pub recommended: bool,
}

/// A single turn-by-turn instruction anchored to a route vertex.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// Index into [`Route::coordinates`] where the maneuver happens.
    pub coordinate_index: usize,
    /// Maneuver to perform.
    pub maneuver: ManeuverType,
    /// Provider-supplied instruction text.
    pub instruction: String,
    /// Street the maneuver leads onto, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street_name: Option<String>,
    /// Lane guidance, ordered left to right.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lanes: Option<Vec<Lane>>,
}

impl Step {
    /// Create a step without street name or lane guidance.
    pub fn new(coordinate_index: usize, maneuver: ManeuverType, instruction: impl Into<String>) -> Self {
        Self {
            coordinate_index,
            maneuver,
            instruction: instruction.into(),
            street_name: None,
            lanes: None,
        }
    }

    /// Terminal arrive step on the given vertex.
    pub fn arrive(coordinate_index: usize) -> Self {
        Self::new(coordinate_index, ManeuverType::Arrive, ARRIVE_INSTRUCTION)
    }

    /// Set the street name.
    pub fn with_street_name(mut self, street_name: impl Into<String>) -> Self {
        self.street_name = Some(street_name.into());
        self
    }

    /// Set lane guidance.
    pub fn with_lanes(mut self, lanes: Vec<Lane>) -> Self {
        self.lanes = Some(lanes);
        self
    }
}

/// A precomputed route.
///
/// Immutable once handed to a session; recalculation always produces a new
/// `Route`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    /// Ordered polyline, at least two vertices once validated.
    pub coordinates: Vec<Coordinate>,
    /// Ordered maneuver steps with strictly increasing `coordinate_index`.
    #[serde(default)]
    pub steps: Vec<Step>,
    /// Provider's total distance estimate.
    pub total_distance_meters: f64,
    /// Provider's total duration estimate.
    pub total_duration_minutes: f64,
}

impl Route {
    /// Create a route from provider data.
    pub fn new(
        coordinates: Vec<Coordinate>,
        steps: Vec<Step>,
        total_distance_meters: f64,
        total_duration_minutes: f64,
    ) -> Self {
        Self {
            coordinates,
            steps,
            total_distance_meters,
            total_duration_minutes,
        }
    }

    /// Create a route whose total distance is measured from the polyline.
    pub fn from_coordinates(
        coordinates: Vec<Coordinate>,
        steps: Vec<Step>,
        total_duration_minutes: f64,
    ) -> Self {
        let total_distance_meters = polyline_length_meters(&coordinates);
        Self::new(coordinates, steps, total_distance_meters, total_duration_minutes)
    }

    /// Index of the final vertex, or 0 for an empty route.
    pub fn last_index(&self) -> usize {
        self.coordinates.len().saturating_sub(1)
    }

    /// The final vertex: the destination as the router resolved it.
    pub fn destination(&self) -> Option<Coordinate> {
        self.coordinates.last().copied()
    }

    /// Total distance in kilometers.
    pub fn total_distance_km(&self) -> f64 {
        self.total_distance_meters / 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_maneuver_serialized_names() {
        let names: Vec<String> = [
            ManeuverType::TurnLeft,
            ManeuverType::UTurn,
            ManeuverType::RoundaboutEnter,
            ManeuverType::Arrive,
        ]
        .iter()
        .map(|m| serde_json::to_string(m).unwrap())
        .collect();
        assert_eq!(
            names,
            vec![
                "\"turn-left\"",
                "\"uturn\"",
                "\"roundabout-enter\"",
                "\"arrive\""
            ]
        );
    }

    #[test]
    fn test_maneuver_as_str_matches_serde() {
        for m in [
            ManeuverType::Straight,
            ManeuverType::SharpRight,
            ManeuverType::KeepLeft,
            ManeuverType::Merge,
            ManeuverType::RoundaboutExit,
            ManeuverType::Exit,
        ] {
            assert_eq!(serde_json::to_string(&m).unwrap(), format!("\"{}\"", m));
        }
    }

    #[test]
    fn test_route_deserialize_minimal() {
        let json = r#"{
            "coordinates": [[0.0, 0.0], {"lat": 0.0, "lon": 0.01}],
            "total_distance_meters": 1112.0,
            "total_duration_minutes": 2.0
        }"#;
        let route: Route = serde_json::from_str(json).unwrap();
        assert_eq!(route.coordinates.len(), 2);
        assert!(route.steps.is_empty());
        assert_eq!(route.destination(), Some(Coordinate::new(0.0, 0.01)));
    }

    #[test]
    fn test_step_deserialize_with_lanes() {
        let json = r#"{
            "coordinate_index": 3,
            "maneuver": "keep-right",
            "instruction": "Keep right onto A7",
            "street_name": "A7",
            "lanes": [
                {"directions": ["straight"]},
                {"directions": ["straight", "slight-right"], "recommended": true}
            ]
        }"#;
        let step: Step = serde_json::from_str(json).unwrap();
        assert_eq!(step.maneuver, ManeuverType::KeepRight);
        let lanes = step.lanes.unwrap();
        assert!(!lanes[0].recommended);
        assert!(lanes[1].recommended);
        assert_eq!(lanes[1].directions[1], LaneDirection::SlightRight);
    }

    #[test]
    fn test_from_coordinates_measures_length() {
        let route = Route::from_coordinates(
            vec![Coordinate::new(0.0, 0.0), Coordinate::new(0.0, 1.0)],
            Vec::new(),
            60.0,
        );
        assert!((route.total_distance_km() - 111.19).abs() < 0.01);
        assert_eq!(route.last_index(), 1);
    }

    #[test]
    fn test_arrive_step() {
        let step = Step::arrive(4);
        assert_eq!(step.coordinate_index, 4);
        assert_eq!(step.maneuver, ManeuverType::Arrive);
        assert_eq!(step.instruction, ARRIVE_INSTRUCTION);
    }
}
