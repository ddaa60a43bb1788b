//! Session phases and navigation state snapshots.

use std::sync::Arc;

use serde::Serialize;

use crate::announce::AnnouncedTiers;
use crate::fix::PositionFix;
use crate::geo::Coordinate;
use crate::route::Route;
use crate::tracker::{ProgressResult, UpcomingStep};

/// Navigation session state machine.
///
/// ```text
/// Init --start--> Tracking <--> OffRoute --request--> Recalculating
///                    ^                                     |
///                    +------------- new route -------------+
/// Tracking --arrival--> Arrived (terminal)
/// any --stop--> Stopped (terminal)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// No route yet.
    #[default]
    Init,
    /// Following the route.
    Tracking,
    /// Further than the off-route threshold from the route.
    OffRoute,
    /// Waiting for a replacement route.
    Recalculating,
    /// Destination reached.
    Arrived,
    /// Stopped by the caller.
    Stopped,
}

impl SessionPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionPhase::Init => "init",
            SessionPhase::Tracking => "tracking",
            SessionPhase::OffRoute => "off_route",
            SessionPhase::Recalculating => "recalculating",
            SessionPhase::Arrived => "arrived",
            SessionPhase::Stopped => "stopped",
        }
    }

    /// Whether no further transitions happen until reset.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionPhase::Arrived | SessionPhase::Stopped)
    }

    /// Whether fixes update the navigation state in this phase.
    pub fn accepts_fixes(&self) -> bool {
        matches!(self, SessionPhase::Tracking | SessionPhase::OffRoute)
    }
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Immutable snapshot of navigation progress.
///
/// The session replaces its snapshot wholesale on every accepted fix and
/// shares it as `Arc<NavigationState>`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NavigationState {
    /// Route being followed.
    pub route: Arc<Route>,
    /// Where the session started or was last rerouted from.
    pub origin: Coordinate,
    /// Requested destination.
    pub destination: Coordinate,
    /// Route vertex nearest the last fix.
    pub closest_index: usize,
    /// Distance from the last fix to that vertex.
    pub distance_to_route_meters: f64,
    /// Path distance left to the end of the route.
    pub remaining_distance_meters: f64,
    /// Time left, scaled from the route estimate.
    pub remaining_time_minutes: f64,
    /// Next maneuver, possibly the synthesized arrive step.
    pub next_step: UpcomingStep,
    /// Straight-line distance from the closest vertex to the next maneuver.
    pub distance_to_next_step_meters: f64,
    /// Off-route flag with hysteresis.
    pub is_off_route: bool,
    /// Announcements already spoken on this route.
    pub announced_tiers: AnnouncedTiers,
    /// Terminal arrival flag.
    pub is_arrived: bool,
    /// Fix this snapshot was computed from.
    pub last_fix: Option<PositionFix>,
}

impl NavigationState {
    /// Fresh state for a newly started or replaced route.
    pub(crate) fn fresh(
        route: Arc<Route>,
        origin: Coordinate,
        destination: Coordinate,
        progress: ProgressResult,
    ) -> Self {
        Self {
            route,
            origin,
            destination,
            closest_index: progress.closest_index,
            distance_to_route_meters: progress.distance_to_route_meters,
            remaining_distance_meters: progress.remaining_distance_meters,
            remaining_time_minutes: progress.remaining_time_minutes,
            next_step: progress.next_step,
            distance_to_next_step_meters: progress.distance_to_next_step_meters,
            is_off_route: false,
            announced_tiers: AnnouncedTiers::new(),
            is_arrived: false,
            last_fix: None,
        }
    }

    /// Next snapshot on the same route after a fix.
    pub(crate) fn advanced(
        &self,
        fix: PositionFix,
        progress: ProgressResult,
        is_off_route: bool,
        is_arrived: bool,
    ) -> Self {
        Self {
            route: Arc::clone(&self.route),
            origin: self.origin,
            destination: self.destination,
            closest_index: progress.closest_index,
            distance_to_route_meters: progress.distance_to_route_meters,
            remaining_distance_meters: progress.remaining_distance_meters,
            remaining_time_minutes: progress.remaining_time_minutes,
            next_step: progress.next_step,
            distance_to_next_step_meters: progress.distance_to_next_step_meters,
            is_off_route,
            announced_tiers: self.announced_tiers.clone(),
            is_arrived,
            last_fix: Some(fix),
        }
    }

    /// Copy with a different tier set.
    pub(crate) fn with_announced(&self, announced_tiers: AnnouncedTiers) -> Self {
        Self {
            announced_tiers,
            ..self.clone()
        }
    }
}

/// Why a fix did not update the navigation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IgnoreReason {
    /// Session has not started.
    NotStarted,
    /// A replacement route is pending.
    Recalculating,
    /// Destination already reached.
    Arrived,
    /// Session was stopped.
    Stopped,
    /// Fix position is not a usable coordinate.
    InvalidPosition,
}

impl IgnoreReason {
    pub(crate) fn for_phase(phase: SessionPhase) -> Option<Self> {
        match phase {
            SessionPhase::Init => Some(IgnoreReason::NotStarted),
            SessionPhase::Recalculating => Some(IgnoreReason::Recalculating),
            SessionPhase::Arrived => Some(IgnoreReason::Arrived),
            SessionPhase::Stopped => Some(IgnoreReason::Stopped),
            SessionPhase::Tracking | SessionPhase::OffRoute => None,
        }
    }
}

/// Result of offering a fix to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FixOutcome {
    /// The fix produced a new snapshot.
    Applied,
    /// The fix was accepted without effect.
    Ignored(IgnoreReason),
}

impl FixOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, FixOutcome::Applied)
    }
}
