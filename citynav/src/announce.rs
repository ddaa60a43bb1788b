//! Voice announcement timing.
//!
//! Decides *when* and *what* to say; speaking is left to the TTS sink that
//! consumes [`crate::session::NavigationEvent::Announce`].
//!
//! # Tiers
//!
//! ```text
//! near:     imminent_m < distance < near_m     (30 m < d < 100 m)
//! imminent: distance <= imminent_m             (d <= 30 m)
//! ```
//!
//! Each `(step index, tier)` pair is spoken at most once per route. A step is
//! typically announced twice over its approach: near, then imminent.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::config::NavigationConfig;
use crate::route::{Lane, ManeuverType};
use crate::tracker::UpcomingStep;

/// Fixed prompt spoken when the driver leaves the route.
pub const OFF_ROUTE_ANNOUNCEMENT: &str = "You appear to be off route. Recalculating when ready.";

/// Proximity band used to gate announcements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Approaching the maneuver.
    Near,
    /// At the maneuver.
    Imminent,
}

impl Tier {
    /// Tier for a distance to the next maneuver, if any.
    pub fn for_distance(distance_m: f64, config: &NavigationConfig) -> Option<Self> {
        if distance_m <= config.imminent_tier_m {
            Some(Tier::Imminent)
        } else if distance_m < config.near_tier_m {
            Some(Tier::Near)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Near => "near",
            Tier::Imminent => "imminent",
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Set of `(step index, tier)` pairs already spoken on the current route.
///
/// Values are immutable: [`AnnouncedTiers::with`] returns a new set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AnnouncedTiers(BTreeSet<(usize, Tier)>);

impl AnnouncedTiers {
    /// Empty set, as after a route change.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a pair has been spoken.
    pub fn contains(&self, step_index: usize, tier: Tier) -> bool {
        self.0.contains(&(step_index, tier))
    }

    /// A copy of this set with one more pair.
    pub fn with(&self, step_index: usize, tier: Tier) -> Self {
        let mut next = self.0.clone();
        next.insert((step_index, tier));
        Self(next)
    }

    /// Tiers already spoken for a step.
    pub fn tiers_for(&self, step_index: usize) -> impl Iterator<Item = Tier> + '_ {
        self.0
            .range((step_index, Tier::Near)..=(step_index, Tier::Imminent))
            .map(|(_, tier)| *tier)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Something to speak.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Announcement {
    /// Text for the speech sink.
    pub text: String,
    /// Step the announcement is about; `None` for the off-route prompt.
    pub step_index: Option<usize>,
    /// Tier that triggered it; `None` for the off-route prompt.
    pub tier: Option<Tier>,
}

impl Announcement {
    /// The fixed off-route prompt. Not subject to tier bookkeeping.
    pub fn off_route() -> Self {
        Self {
            text: OFF_ROUTE_ANNOUNCEMENT.to_string(),
            step_index: None,
            tier: None,
        }
    }
}

/// Tier gate and instruction formatter.
#[derive(Debug, Clone)]
pub struct AnnouncementPolicy {
    config: NavigationConfig,
}

impl AnnouncementPolicy {
    pub fn new(config: NavigationConfig) -> Self {
        Self { config }
    }

    /// Decide whether to announce the upcoming step.
    ///
    /// Returns the announcement and the updated tier set, or `None` when the
    /// step is out of range or this tier was already spoken.
    pub fn evaluate(
        &self,
        next_step: &UpcomingStep,
        distance_to_next_step_m: f64,
        announced: &AnnouncedTiers,
    ) -> Option<(Announcement, AnnouncedTiers)> {
        let tier = Tier::for_distance(distance_to_next_step_m, &self.config)?;
        if announced.contains(next_step.index, tier) {
            return None;
        }

        let announcement = Announcement {
            text: format_instruction(next_step, distance_to_next_step_m, tier),
            step_index: Some(next_step.index),
            tier: Some(tier),
        };
        tracing::debug!(
            step = next_step.index,
            tier = %tier,
            distance_m = distance_to_next_step_m,
            text = %announcement.text,
            "Announcing maneuver"
        );

        Some((announcement, announced.with(next_step.index, tier)))
    }
}

/// Build the spoken instruction for a step.
///
/// `"In 80 meters, turn right onto Main Street."` Near-tier announcements add
/// lane advice when the step recommends lanes.
pub fn format_instruction(next_step: &UpcomingStep, distance_m: f64, tier: Tier) -> String {
    let step = &next_step.step;
    let mut text = format!("In {}, {}", format_distance(distance_m), step.maneuver.phrase());

    if step.maneuver != ManeuverType::Arrive {
        if let Some(street) = step.street_name.as_deref().filter(|s| !s.trim().is_empty()) {
            text.push_str(" onto ");
            text.push_str(street.trim());
        }
    }
    text.push('.');

    if tier == Tier::Near {
        if let Some(advice) = step.lanes.as_deref().and_then(lane_advice) {
            text.push(' ');
            text.push_str(&advice);
        }
    }

    text
}

/// Spoken distance, rounded to 10 m below a kilometer.
pub fn format_distance(meters: f64) -> String {
    if meters >= 1000.0 {
        format!("{:.1} kilometers", meters / 1000.0)
    } else {
        let rounded = ((meters / 10.0).round() as i64 * 10).max(0);
        if rounded == 0 {
            "less than 10 meters".to_string()
        } else {
            format!("{} meters", rounded)
        }
    }
}

/// "Use lane 2 of 3." / "Use lanes 1 and 2 of 3." / "Use lanes 1, 2 and 3 of 4."
fn lane_advice(lanes: &[Lane]) -> Option<String> {
    let recommended: Vec<String> = lanes
        .iter()
        .enumerate()
        .filter(|(_, lane)| lane.recommended)
        .map(|(i, _)| (i + 1).to_string())
        .collect();

    // Every lane works: nothing worth saying
    if recommended.is_empty() || recommended.len() == lanes.len() {
        return None;
    }

    let list = match recommended.split_last() {
        Some((last, [])) => return Some(format!("Use lane {} of {}.", last, lanes.len())),
        Some((last, rest)) => format!("{} and {}", rest.join(", "), last),
        None => return None,
    };
    Some(format!("Use lanes {} of {}.", list, lanes.len()))
}
