//! Position fixes and travel heading.
//!
//! A [`PositionFix`] is one reading from the geolocation provider. The engine
//! never starts a geolocation watch itself; callers feed fixes in arrival
//! order through [`crate::session::NavigationSession::apply_fix`].
//!
//! # Heading
//!
//! Heading is used for rendering only and never feeds tracking math. The
//! session keeps the best available reading:
//!
//! 1. heading reported on the fix
//! 2. compass heading from the orientation provider
//! 3. bearing derived from consecutive fixes once they are far enough apart

use serde::{Deserialize, Serialize};

use crate::geo::{bearing_degrees, distance_meters, Coordinate};

/// One reported device position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionFix {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Reported horizontal accuracy radius.
    #[serde(default)]
    pub accuracy_meters: f64,
    /// Ground speed in meters per second, if reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed_mps: Option<f64>,
    /// Direction of travel, 0 = North, if reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading_degrees: Option<f64>,
    /// Provider timestamp in milliseconds since the Unix epoch.
    pub timestamp_millis: u64,
}

impl PositionFix {
    /// Create a fix with no accuracy, speed or heading metadata.
    pub fn new(latitude: f64, longitude: f64, timestamp_millis: u64) -> Self {
        Self {
            latitude,
            longitude,
            accuracy_meters: 0.0,
            speed_mps: None,
            heading_degrees: None,
            timestamp_millis,
        }
    }

    /// Create a fix at a coordinate.
    pub fn at(position: Coordinate, timestamp_millis: u64) -> Self {
        Self::new(position.lat, position.lon, timestamp_millis)
    }

    /// Set the accuracy radius.
    pub fn with_accuracy(mut self, accuracy_meters: f64) -> Self {
        self.accuracy_meters = accuracy_meters;
        self
    }

    /// Set the reported speed.
    pub fn with_speed(mut self, speed_mps: f64) -> Self {
        self.speed_mps = Some(speed_mps);
        self
    }

    /// Set the reported heading.
    pub fn with_heading(mut self, heading_degrees: f64) -> Self {
        self.heading_degrees = Some(heading_degrees);
        self
    }

    /// The fix position as a coordinate.
    #[inline]
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }
}

/// Where a heading value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeadingSource {
    /// Reported by the geolocation provider on the fix.
    Fix,
    /// From the orientation/compass provider.
    Compass,
    /// Calculated from consecutive fix positions.
    Derived,
}

impl std::fmt::Display for HeadingSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fix => write!(f, "Fix"),
            Self::Compass => write!(f, "Compass"),
            Self::Derived => write!(f, "Derived"),
        }
    }
}

/// A heading value with its provenance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeadingReading {
    /// Heading in degrees, `[0, 360)`.
    pub degrees: f64,
    /// Provenance of the value.
    pub source: HeadingSource,
}

impl HeadingReading {
    /// Create a reading, normalizing the angle into `[0, 360)`.
    pub fn new(degrees: f64, source: HeadingSource) -> Self {
        Self {
            degrees: degrees.rem_euclid(360.0) % 360.0,
            source,
        }
    }
}

/// Pick the heading to display after a new fix arrives.
///
/// `previous_fix` is the last fix before `fix`; `current` is the reading held
/// so far. A compass reading survives fixes without a reported heading, and a
/// derived bearing only replaces another derived bearing or an empty slot.
pub(crate) fn resolve_heading(
    current: Option<HeadingReading>,
    previous_fix: Option<&PositionFix>,
    fix: &PositionFix,
    min_movement_m: f64,
) -> Option<HeadingReading> {
    if let Some(degrees) = fix.heading_degrees.filter(|d| d.is_finite()) {
        return Some(HeadingReading::new(degrees, HeadingSource::Fix));
    }

    if let Some(reading) = current.filter(|r| r.source == HeadingSource::Compass) {
        return Some(reading);
    }

    let derived = previous_fix.and_then(|prev| {
        let (from, to) = (prev.coordinate(), fix.coordinate());
        if distance_meters(from, to) < min_movement_m {
            return None;
        }
        Some(HeadingReading::new(bearing_degrees(from, to), HeadingSource::Derived))
    });

    derived.or(current)
}
