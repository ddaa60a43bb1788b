//! Navigation session state machine.
//!
//! [`NavigationSession`] owns the active route and turns a stream of position
//! fixes into [`NavigationState`] snapshots and [`NavigationEvent`]s. It is
//! the only stateful component of the engine; geometry, progress and
//! announcement decisions are delegated to pure helpers.
//!
//! # Phases
//!
//! ```text
//! Init --start--> Tracking --(d > off-route threshold)--> OffRoute
//!                    ^  ^----------(d <= threshold)-----------+
//!                    |                                        |
//!                    |                          request_recalculation
//!                    |                                        v
//!                    +------- complete_recalculation(Ok) -- Recalculating
//!                                                             |
//!                 OffRoute <--- complete_recalculation(Err) --+
//!
//! Tracking/OffRoute --(within arrival radius)--> Arrived
//! any non-terminal --stop--> Stopped
//! any --reset--> Init
//! ```
//!
//! # Events
//!
//! Every accepted fix emits exactly one of `ProgressChanged` or `Arrived`,
//! preceded by `OffRoute`/`BackOnRoute` when the off-route flag flips and
//! followed by at most one `Announce`.

mod error;
mod events;
mod state;

pub use error::{SessionError, SessionResult};
pub use events::{EventLog, EventSink, NavigationEvent, NullSink};
pub use state::{FixOutcome, IgnoreReason, NavigationState, SessionPhase};

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::announce::{Announcement, AnnouncementPolicy};
use crate::config::NavigationConfig;
use crate::fix::{resolve_heading, HeadingReading, HeadingSource, PositionFix};
use crate::geo::Coordinate;
use crate::route::{self, Route, RouteError};
use crate::routing::{RecalculationTicket, RouteOptions, RoutingError, RoutingService};
use crate::tracker::ProgressTracker;

/// Turn-by-turn tracking for one trip at a time.
///
/// All methods are synchronous and return once the new snapshot exists.
/// Events go to the sink handed in at construction.
///
/// # Example
///
/// ```
/// use citynav::config::NavigationConfig;
/// use citynav::fix::PositionFix;
/// use citynav::geo::Coordinate;
/// use citynav::route::Route;
/// use citynav::session::{EventLog, NavigationSession, SessionPhase};
///
/// let route = Route::from_coordinates(
///     vec![Coordinate::new(0.0, 0.0), Coordinate::new(0.0, 0.01)],
///     Vec::new(),
///     2.0,
/// );
///
/// let log = EventLog::new();
/// let mut session = NavigationSession::new(NavigationConfig::default(), Box::new(log.clone()));
/// session
///     .start(route, Some(Coordinate::new(0.0, 0.0)), Some(Coordinate::new(0.0, 0.01)))
///     .unwrap();
///
/// session.apply_fix(PositionFix::new(0.0, 0.0001, 1_000));
/// assert_eq!(session.phase(), SessionPhase::Tracking);
/// assert_eq!(log.names(), vec!["started", "progress-changed"]);
/// ```
pub struct NavigationSession {
    config: NavigationConfig,
    policy: AnnouncementPolicy,
    sink: Box<dyn EventSink>,
    route_options: RouteOptions,
    phase: SessionPhase,
    state: Option<Arc<NavigationState>>,
    heading: Option<HeadingReading>,
    latest_fix: Option<PositionFix>,
    pending: Option<RecalculationTicket>,
    next_ticket_id: u64,
    /// Whether the next off-route fix should emit `OffRoute` and the prompt.
    off_route_prompt_armed: bool,
}

impl std::fmt::Debug for NavigationSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NavigationSession")
            .field("phase", &self.phase)
            .field("config", &self.config)
            .field("pending", &self.pending)
            .field("heading", &self.heading)
            .finish_non_exhaustive()
    }
}

impl NavigationSession {
    /// Create an idle session.
    pub fn new(config: NavigationConfig, sink: Box<dyn EventSink>) -> Self {
        Self {
            policy: AnnouncementPolicy::new(config.clone()),
            config,
            sink,
            route_options: RouteOptions::default(),
            phase: SessionPhase::Init,
            state: None,
            heading: None,
            latest_fix: None,
            pending: None,
            next_ticket_id: 1,
            off_route_prompt_armed: true,
        }
    }

    /// Routing preferences copied into recalculation tickets.
    pub fn with_route_options(mut self, options: RouteOptions) -> Self {
        self.route_options = options;
        self
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Begin tracking `route`.
    ///
    /// Only valid from [`SessionPhase::Init`]. A route without steps gets a
    /// synthesized step list when the configuration requires guidance. On
    /// failure the session stays in `Init`.
    pub fn start(
        &mut self,
        route: Route,
        origin: Option<Coordinate>,
        destination: Option<Coordinate>,
    ) -> SessionResult<Arc<NavigationState>> {
        if self.phase != SessionPhase::Init {
            return Err(SessionError::InvalidTransition {
                operation: "start",
                phase: self.phase,
            });
        }

        let origin = origin.ok_or(RouteError::MissingOrigin)?;
        let destination = destination.ok_or(RouteError::MissingDestination)?;
        let route = route::prepare(route, self.config.guidance())?;

        let progress = ProgressTracker::initial(&route);
        let state = Arc::new(NavigationState::fresh(
            Arc::new(route),
            origin,
            destination,
            progress,
        ));

        info!(
            coordinates = state.route.coordinates.len(),
            steps = state.route.steps.len(),
            distance_m = state.route.total_distance_meters,
            %origin,
            %destination,
            "Navigation started"
        );

        self.state = Some(Arc::clone(&state));
        self.phase = SessionPhase::Tracking;
        self.off_route_prompt_armed = true;
        self.sink.emit(NavigationEvent::Started {
            state: Arc::clone(&state),
        });

        Ok(state)
    }

    /// Stop the session.
    ///
    /// Idempotent. From any non-terminal phase this enters
    /// [`SessionPhase::Stopped`], drops the pending recalculation and emits
    /// `Stopped` once; the caller should release its position and orientation
    /// subscriptions. Stopping an arrived or stopped session does nothing.
    pub fn stop(&mut self) {
        if self.phase.is_terminal() {
            debug!(phase = %self.phase, "Stop ignored, session already finished");
            return;
        }

        let previous = self.phase;
        self.phase = SessionPhase::Stopped;
        self.state = None;
        self.pending = None;

        info!(previous = %previous, "Navigation stopped");
        self.sink.emit(NavigationEvent::Stopped { previous });
    }

    /// Return to [`SessionPhase::Init`] from any phase, discarding the route,
    /// the pending recalculation, the heading and the latest fix.
    pub fn reset(&mut self) {
        debug!(phase = %self.phase, "Navigation session reset");
        self.phase = SessionPhase::Init;
        self.state = None;
        self.heading = None;
        self.latest_fix = None;
        self.pending = None;
        self.off_route_prompt_armed = true;
    }

    // =========================================================================
    // Sensor input
    // =========================================================================

    /// Offer a position fix.
    ///
    /// Fixes are processed in call order. Outside `Tracking`/`OffRoute` the
    /// fix is ignored without error; while recalculating it is still kept as
    /// the latest known position.
    pub fn apply_fix(&mut self, fix: PositionFix) -> FixOutcome {
        if !fix.coordinate().is_valid() {
            debug!(
                latitude = fix.latitude,
                longitude = fix.longitude,
                "Ignoring fix with invalid position"
            );
            return FixOutcome::Ignored(IgnoreReason::InvalidPosition);
        }

        if let Some(reason) = IgnoreReason::for_phase(self.phase) {
            if self.phase == SessionPhase::Recalculating {
                self.remember_fix(fix);
            }
            debug!(
                phase = %self.phase,
                timestamp_ms = fix.timestamp_millis,
                "Ignoring stale fix"
            );
            return FixOutcome::Ignored(reason);
        }

        let Some(current) = self.state.clone() else {
            return FixOutcome::Ignored(IgnoreReason::NotStarted);
        };
        self.remember_fix(fix);

        let progress = ProgressTracker::update(&current.route, &fix);
        // Arrival wins over the off-route gate
        let is_arrived = progress.distance_to_destination_meters < self.config.arrival_radius_m;
        let beyond_threshold =
            !is_arrived && progress.distance_to_route_meters > self.config.off_route_threshold_m;
        let was_off_route = self.phase == SessionPhase::OffRoute;

        // Entry fix: announce the excursion instead of the next maneuver
        let mut announcement = None;
        if beyond_threshold {
            self.phase = SessionPhase::OffRoute;
            if self.off_route_prompt_armed {
                self.off_route_prompt_armed = false;
                info!(
                    distance_to_route_m = progress.distance_to_route_meters,
                    threshold_m = self.config.off_route_threshold_m,
                    "Off route"
                );
                self.sink.emit(NavigationEvent::OffRoute {
                    distance_to_route_meters: progress.distance_to_route_meters,
                });
                announcement = Some(Announcement::off_route());
            }
        } else if was_off_route {
            self.phase = SessionPhase::Tracking;
            self.off_route_prompt_armed = true;
            info!(
                distance_to_route_m = progress.distance_to_route_meters,
                "Back on route"
            );
            self.sink.emit(NavigationEvent::BackOnRoute {
                distance_to_route_meters: progress.distance_to_route_meters,
            });
        }

        let distance_to_destination_m = progress.distance_to_destination_meters;

        let mut next = current.advanced(fix, progress, beyond_threshold, is_arrived);
        if announcement.is_none() {
            if let Some((spoken, tiers)) = self.policy.evaluate(
                &next.next_step,
                next.distance_to_next_step_meters,
                &next.announced_tiers,
            ) {
                next = next.with_announced(tiers);
                announcement = Some(spoken);
            }
        }

        debug!(
            closest_index = next.closest_index,
            distance_to_route_m = next.distance_to_route_meters,
            remaining_m = next.remaining_distance_meters,
            next_step = next.next_step.index,
            distance_to_next_step_m = next.distance_to_next_step_meters,
            "Progress updated"
        );

        let next = Arc::new(next);
        self.state = Some(Arc::clone(&next));

        if is_arrived {
            self.phase = SessionPhase::Arrived;
            info!(distance_to_destination_m, "Arrived at destination");
            self.sink.emit(NavigationEvent::Arrived { state: next });
        } else {
            self.sink.emit(NavigationEvent::ProgressChanged { state: next });
        }

        if let Some(Announcement {
            text,
            step_index,
            tier,
        }) = announcement
        {
            self.sink.emit(NavigationEvent::Announce {
                text,
                step_index,
                tier,
            });
        }

        FixOutcome::Applied
    }

    /// Record a compass heading. Never recomputes progress.
    pub fn update_heading(&mut self, degrees: f64) {
        if !degrees.is_finite() {
            debug!(degrees, "Ignoring non-finite compass heading");
            return;
        }
        self.heading = Some(HeadingReading::new(degrees, HeadingSource::Compass));
    }

    fn remember_fix(&mut self, fix: PositionFix) {
        let previous = self.latest_fix.replace(fix);
        if let Some(prev) = previous.as_ref() {
            if fix.timestamp_millis < prev.timestamp_millis {
                debug!(
                    previous_ms = prev.timestamp_millis,
                    timestamp_ms = fix.timestamp_millis,
                    "Fix timestamp went backwards, processing in arrival order"
                );
            }
        }
        self.heading = resolve_heading(
            self.heading,
            previous.as_ref(),
            &fix,
            self.config.heading_min_movement_m,
        );
    }

    // =========================================================================
    // Recalculation
    // =========================================================================

    /// Ask for a replacement route starting at `new_origin`.
    ///
    /// Only valid while off route, and only one request may be outstanding.
    /// The returned ticket tells the caller what to ask the router for; the
    /// answer goes back through [`Self::complete_recalculation`].
    pub fn request_recalculation(&mut self, new_origin: Coordinate) -> SessionResult<RecalculationTicket> {
        if let Some(pending) = &self.pending {
            return Err(SessionError::RecalculationPending {
                ticket_id: pending.id,
            });
        }

        let destination = match (&self.state, self.phase) {
            (Some(state), SessionPhase::OffRoute) => state.destination,
            _ => {
                return Err(SessionError::InvalidTransition {
                    operation: "request recalculation",
                    phase: self.phase,
                })
            }
        };

        let ticket = RecalculationTicket {
            id: self.next_ticket_id,
            origin: new_origin,
            destination,
            options: self.route_options.clone(),
        };
        self.next_ticket_id += 1;
        self.pending = Some(ticket.clone());
        self.phase = SessionPhase::Recalculating;

        info!(
            ticket_id = ticket.id,
            origin = %ticket.origin,
            destination = %ticket.destination,
            "Route recalculation requested"
        );
        self.sink.emit(NavigationEvent::RecalculationRequested {
            ticket_id: ticket.id,
            origin: ticket.origin,
            destination: ticket.destination,
        });

        Ok(ticket)
    }

    /// Deliver the router's answer for an outstanding ticket.
    ///
    /// A valid route replaces the current one with a fresh snapshot and
    /// resumes tracking. A routing error or an invalid route keeps the
    /// previous route, returns to `OffRoute` and re-arms the off-route prompt.
    pub fn complete_recalculation(
        &mut self,
        ticket_id: u64,
        result: Result<Route, RoutingError>,
    ) -> SessionResult<Arc<NavigationState>> {
        let ticket = match self.pending.take() {
            Some(ticket) if ticket.id == ticket_id => ticket,
            other => {
                self.pending = other;
                return Err(SessionError::UnknownTicket { ticket_id });
            }
        };

        let guidance = self.config.guidance();
        let prepared = result
            .and_then(|replacement| route::prepare(replacement, guidance).map_err(RoutingError::from));

        match prepared {
            Ok(route) => {
                let progress = ProgressTracker::initial(&route);
                let state = Arc::new(NavigationState::fresh(
                    Arc::new(route),
                    ticket.origin,
                    ticket.destination,
                    progress,
                ));

                info!(
                    ticket_id,
                    coordinates = state.route.coordinates.len(),
                    steps = state.route.steps.len(),
                    distance_m = state.route.total_distance_meters,
                    "Route replaced"
                );

                self.state = Some(Arc::clone(&state));
                self.phase = SessionPhase::Tracking;
                self.off_route_prompt_armed = true;
                self.sink.emit(NavigationEvent::RouteReplaced {
                    state: Arc::clone(&state),
                });
                Ok(state)
            }
            Err(e) => {
                let reason = e.to_string();
                warn!(ticket_id, error = %reason, "Route recalculation failed, keeping previous route");

                self.phase = SessionPhase::OffRoute;
                self.off_route_prompt_armed = true;
                self.sink.emit(NavigationEvent::RecalculationFailed {
                    reason: reason.clone(),
                });
                Err(SessionError::RecalculationFailed(reason))
            }
        }
    }

    /// Request, fetch and complete a recalculation with a synchronous router.
    pub fn recalculate(
        &mut self,
        routing: &dyn RoutingService,
        new_origin: Coordinate,
    ) -> SessionResult<Arc<NavigationState>> {
        let ticket = self.request_recalculation(new_origin)?;
        let result = routing.get_route(ticket.origin, ticket.destination, &ticket.options);
        self.complete_recalculation(ticket.id, result)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Current snapshot, `None` before start and after stop or reset.
    pub fn state(&self) -> Option<Arc<NavigationState>> {
        self.state.clone()
    }

    /// Heading for map rendering.
    pub fn heading(&self) -> Option<HeadingReading> {
        self.heading
    }

    /// Most recent usable fix, including fixes received while recalculating.
    pub fn latest_fix(&self) -> Option<PositionFix> {
        self.latest_fix
    }

    pub fn pending_recalculation(&self) -> Option<&RecalculationTicket> {
        self.pending.as_ref()
    }

    pub fn config(&self) -> &NavigationConfig {
        &self.config
    }

    pub fn route_options(&self) -> &RouteOptions {
        &self.route_options
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::announce::OFF_ROUTE_ANNOUNCEMENT;
    use crate::geo::EARTH_RADIUS_M;
    use crate::route::{ManeuverType, Step};

    /// Point `meters` east of (0, 0) along the equator.
    fn east(meters: f64) -> Coordinate {
        Coordinate::new(0.0, (meters / EARTH_RADIUS_M).to_degrees())
    }

    /// Point `meters_east` along the equator and `meters_north` above it.
    fn offset(meters_east: f64, meters_north: f64) -> Coordinate {
        Coordinate::new((meters_north / EARTH_RADIUS_M).to_degrees(), east(meters_east).lon)
    }

    fn straight_route() -> Route {
        let coords: Vec<Coordinate> = (0..5).map(|i| east(i as f64 * 250.0)).collect();
        Route::from_coordinates(coords, vec![Step::new(2, ManeuverType::TurnRight, "Turn right")], 2.0)
    }

    fn started() -> (NavigationSession, EventLog) {
        let log = EventLog::new();
        let mut session = NavigationSession::new(NavigationConfig::default(), Box::new(log.clone()));
        session
            .start(straight_route(), Some(east(0.0)), Some(east(1000.0)))
            .unwrap();
        log.drain();
        (session, log)
    }

    fn off_route(session: &mut NavigationSession) {
        session.apply_fix(PositionFix::at(offset(250.0, 200.0), 10));
        assert_eq!(session.phase(), SessionPhase::OffRoute);
    }

    #[test]
    fn test_start_requires_origin_and_destination() {
        let log = EventLog::new();
        let mut session = NavigationSession::new(NavigationConfig::default(), Box::new(log.clone()));

        let err = session.start(straight_route(), None, Some(east(1000.0))).unwrap_err();
        assert_eq!(err, SessionError::InvalidRoute(RouteError::MissingOrigin));

        let err = session.start(straight_route(), Some(east(0.0)), None).unwrap_err();
        assert_eq!(err, SessionError::InvalidRoute(RouteError::MissingDestination));

        assert_eq!(session.phase(), SessionPhase::Init);
        assert!(session.state().is_none());
        assert!(log.events().is_empty());
    }

    #[test]
    fn test_start_rejects_short_route() {
        let mut session = NavigationSession::new(NavigationConfig::default(), Box::new(NullSink));
        let route = Route::from_coordinates(vec![east(0.0)], Vec::new(), 1.0);
        let err = session.start(route, Some(east(0.0)), Some(east(0.0))).unwrap_err();
        assert_eq!(
            err,
            SessionError::InvalidRoute(RouteError::InsufficientCoordinates { count: 1 })
        );
        assert_eq!(session.phase(), SessionPhase::Init);
    }

    #[test]
    fn test_start_rejects_negative_total_distance() {
        let mut session = NavigationSession::new(NavigationConfig::default(), Box::new(NullSink));
        let route = Route::new(
            vec![east(0.0), east(250.0), east(500.0)],
            vec![Step::arrive(2)],
            -200.0,
            10.0,
        );
        let err = session.start(route, Some(east(0.0)), Some(east(500.0))).unwrap_err();
        assert!(matches!(
            err,
            SessionError::InvalidRoute(RouteError::InvalidTotals { .. })
        ));
        assert_eq!(session.phase(), SessionPhase::Init);
    }

    #[test]
    fn test_start_twice_is_invalid_transition() {
        let (mut session, log) = started();
        let err = session
            .start(straight_route(), Some(east(0.0)), Some(east(1000.0)))
            .unwrap_err();
        assert_eq!(
            err,
            SessionError::InvalidTransition {
                operation: "start",
                phase: SessionPhase::Tracking,
            }
        );
        assert!(log.events().is_empty());
    }

    #[test]
    fn test_start_synthesizes_steps_when_missing() {
        let coords = vec![east(0.0), east(300.0), offset(300.0, -300.0)];
        let route = Route::from_coordinates(coords, Vec::new(), 2.0);

        let mut session = NavigationSession::new(NavigationConfig::default(), Box::new(NullSink));
        let state = session
            .start(route, Some(east(0.0)), Some(offset(300.0, -300.0)))
            .unwrap();

        let maneuvers: Vec<ManeuverType> = state.route.steps.iter().map(|s| s.maneuver).collect();
        assert_eq!(maneuvers, vec![ManeuverType::TurnRight, ManeuverType::Arrive]);
        assert_eq!(state.next_step.index, 0);
        assert!(!state.next_step.synthesized);
    }

    #[test]
    fn test_fix_before_start_is_ignored() {
        let mut session = NavigationSession::new(NavigationConfig::default(), Box::new(NullSink));
        let outcome = session.apply_fix(PositionFix::at(east(0.0), 1));
        assert_eq!(outcome, FixOutcome::Ignored(IgnoreReason::NotStarted));
        assert!(session.latest_fix().is_none());
    }

    #[test]
    fn test_invalid_fix_is_ignored() {
        let (mut session, log) = started();
        let outcome = session.apply_fix(PositionFix::new(f64::NAN, 0.0, 1));
        assert_eq!(outcome, FixOutcome::Ignored(IgnoreReason::InvalidPosition));
        assert!(log.events().is_empty());
    }

    #[test]
    fn test_on_route_fix_emits_progress() {
        let (mut session, log) = started();
        let outcome = session.apply_fix(PositionFix::at(east(10.0), 1));

        assert!(outcome.is_applied());
        assert_eq!(log.names(), vec!["progress-changed"]);
        let state = session.state().unwrap();
        assert_eq!(state.closest_index, 0);
        assert!(!state.is_off_route);
        assert_eq!(state.last_fix, Some(PositionFix::at(east(10.0), 1)));
    }

    #[test]
    fn test_off_route_entry_and_exit() {
        let (mut session, log) = started();

        off_route(&mut session);
        assert_eq!(log.names(), vec!["off-route", "progress-changed", "announce"]);
        assert_eq!(log.announcements(), vec![OFF_ROUTE_ANNOUNCEMENT.to_string()]);
        assert!(session.state().unwrap().is_off_route);
        log.drain();

        // Still away: no second off-route event
        session.apply_fix(PositionFix::at(offset(260.0, 210.0), 11));
        assert_eq!(log.count("off-route"), 0);

        session.apply_fix(PositionFix::at(offset(255.0, 20.0), 12));
        assert_eq!(session.phase(), SessionPhase::Tracking);
        assert_eq!(log.count("back-on-route"), 1);
        assert!(!session.state().unwrap().is_off_route);
    }

    #[test]
    fn test_request_recalculation_only_when_off_route() {
        let (mut session, _log) = started();
        let err = session.request_recalculation(east(10.0)).unwrap_err();
        assert_eq!(
            err,
            SessionError::InvalidTransition {
                operation: "request recalculation",
                phase: SessionPhase::Tracking,
            }
        );
    }

    #[test]
    fn test_second_request_while_pending_fails() {
        let (mut session, log) = started();
        off_route(&mut session);

        let ticket = session.request_recalculation(offset(250.0, 200.0)).unwrap();
        assert_eq!(ticket.id, 1);
        assert_eq!(ticket.destination, east(1000.0));
        assert_eq!(session.phase(), SessionPhase::Recalculating);
        assert_eq!(log.count("recalculation-requested"), 1);

        let err = session.request_recalculation(offset(250.0, 200.0)).unwrap_err();
        assert_eq!(err, SessionError::RecalculationPending { ticket_id: 1 });
        assert_eq!(session.pending_recalculation(), Some(&ticket));
    }

    #[test]
    fn test_unknown_ticket_keeps_pending_request() {
        let (mut session, _log) = started();
        off_route(&mut session);
        let ticket = session.request_recalculation(offset(250.0, 200.0)).unwrap();

        let err = session
            .complete_recalculation(ticket.id + 1, Ok(straight_route()))
            .unwrap_err();
        assert_eq!(err, SessionError::UnknownTicket { ticket_id: ticket.id + 1 });
        assert_eq!(session.phase(), SessionPhase::Recalculating);
        assert!(session.pending_recalculation().is_some());
    }

    #[test]
    fn test_fix_while_recalculating_is_remembered_not_applied() {
        let (mut session, log) = started();
        off_route(&mut session);
        session.request_recalculation(offset(250.0, 200.0)).unwrap();
        let before = session.state().unwrap();
        log.drain();

        let fix = PositionFix::at(offset(270.0, 190.0), 20);
        let outcome = session.apply_fix(fix);

        assert_eq!(outcome, FixOutcome::Ignored(IgnoreReason::Recalculating));
        assert_eq!(session.latest_fix(), Some(fix));
        assert_eq!(session.state().unwrap(), before);
        assert!(log.events().is_empty());
    }

    #[test]
    fn test_failed_recalculation_rearms_off_route_prompt() {
        let (mut session, log) = started();
        off_route(&mut session);
        let ticket = session.request_recalculation(offset(250.0, 200.0)).unwrap();
        let route_before = Arc::clone(&session.state().unwrap().route);
        log.drain();

        let err = session
            .complete_recalculation(ticket.id, Err(RoutingError::NoRoute))
            .unwrap_err();
        assert!(matches!(err, SessionError::RecalculationFailed(_)));
        assert_eq!(session.phase(), SessionPhase::OffRoute);
        assert!(session.pending_recalculation().is_none());
        assert!(Arc::ptr_eq(&route_before, &session.state().unwrap().route));
        assert_eq!(log.names(), vec!["recalculation-failed"]);

        session.apply_fix(PositionFix::at(offset(260.0, 200.0), 30));
        assert_eq!(log.count("off-route"), 1);
        assert_eq!(log.announcements(), vec![OFF_ROUTE_ANNOUNCEMENT.to_string()]);
    }

    #[test]
    fn test_invalid_replacement_route_is_a_failed_recalculation() {
        let (mut session, log) = started();
        off_route(&mut session);
        let ticket = session.request_recalculation(offset(250.0, 200.0)).unwrap();

        let broken = Route::from_coordinates(vec![east(0.0)], Vec::new(), 1.0);
        let err = session.complete_recalculation(ticket.id, Ok(broken)).unwrap_err();

        assert!(matches!(err, SessionError::RecalculationFailed(_)));
        assert_eq!(session.phase(), SessionPhase::OffRoute);
        assert_eq!(log.count("recalculation-failed"), 1);
    }

    #[test]
    fn test_recalculate_with_routing_service() {
        use crate::routing::QueuedRoutingService;

        let (mut session, log) = started();
        off_route(&mut session);

        let origin = offset(250.0, 200.0);
        let replacement = Route::from_coordinates(vec![origin, east(1000.0)], Vec::new(), 1.5);
        let routing = QueuedRoutingService::with_routes([replacement]);

        let state = session.recalculate(&routing, origin).unwrap();
        assert_eq!(session.phase(), SessionPhase::Tracking);
        assert_eq!(state.origin, origin);
        assert!(state.announced_tiers.is_empty());
        assert!(!state.is_off_route);
        assert_eq!(log.count("route-replaced"), 1);
        assert_eq!(routing.remaining(), 0);
    }

    #[test]
    fn test_stop_is_idempotent() {
        let (mut session, log) = started();
        session.stop();
        session.stop();

        assert_eq!(session.phase(), SessionPhase::Stopped);
        assert!(session.state().is_none());
        assert_eq!(log.names(), vec!["stopped"]);
        assert_eq!(
            session.apply_fix(PositionFix::at(east(0.0), 1)),
            FixOutcome::Ignored(IgnoreReason::Stopped)
        );
    }

    #[test]
    fn test_stop_drops_pending_recalculation() {
        let (mut session, _log) = started();
        off_route(&mut session);
        let ticket = session.request_recalculation(offset(250.0, 200.0)).unwrap();

        session.stop();
        assert!(session.pending_recalculation().is_none());
        assert_eq!(
            session.complete_recalculation(ticket.id, Ok(straight_route())),
            Err(SessionError::UnknownTicket { ticket_id: ticket.id })
        );
    }

    #[test]
    fn test_reset_allows_new_trip() {
        let (mut session, _log) = started();
        session.update_heading(90.0);
        session.stop();
        session.reset();

        assert_eq!(session.phase(), SessionPhase::Init);
        assert!(session.heading().is_none());
        session
            .start(straight_route(), Some(east(0.0)), Some(east(1000.0)))
            .unwrap();
        assert_eq!(session.phase(), SessionPhase::Tracking);
    }

    #[test]
    fn test_heading_sources() {
        let (mut session, _log) = started();

        session.update_heading(-90.0);
        let heading = session.heading().unwrap();
        assert_eq!(heading.source, HeadingSource::Compass);
        assert!((heading.degrees - 270.0).abs() < 1e-9);

        // Compass reading survives fixes without heading
        session.apply_fix(PositionFix::at(east(0.0), 1));
        session.apply_fix(PositionFix::at(east(20.0), 2));
        assert_eq!(session.heading().unwrap().source, HeadingSource::Compass);

        session.apply_fix(PositionFix::at(east(40.0), 3).with_heading(85.0));
        let heading = session.heading().unwrap();
        assert_eq!(heading.source, HeadingSource::Fix);
        assert!((heading.degrees - 85.0).abs() < 1e-9);
    }

    #[test]
    fn test_heading_derived_from_movement() {
        let (mut session, _log) = started();
        session.apply_fix(PositionFix::at(east(0.0), 1));
        assert!(session.heading().is_none());

        session.apply_fix(PositionFix::at(east(5.0), 2));
        assert!(session.heading().is_none(), "below minimum movement");

        session.apply_fix(PositionFix::at(east(40.0), 3));
        let heading = session.heading().unwrap();
        assert_eq!(heading.source, HeadingSource::Derived);
        assert!((heading.degrees - 90.0).abs() < 0.01);
    }

    #[test]
    fn test_arrival_is_terminal() {
        let (mut session, log) = started();
        session.apply_fix(PositionFix::at(east(990.0), 1));

        assert_eq!(session.phase(), SessionPhase::Arrived);
        assert!(session.state().unwrap().is_arrived);
        assert_eq!(log.count("arrived"), 1);

        let outcome = session.apply_fix(PositionFix::at(east(500.0), 2));
        assert_eq!(outcome, FixOutcome::Ignored(IgnoreReason::Arrived));
        assert!(session.state().unwrap().is_arrived);

        session.stop();
        assert_eq!(session.phase(), SessionPhase::Arrived);
        assert_eq!(log.count("stopped"), 0);
    }

    #[test]
    fn test_arrival_inside_radius_beyond_tight_off_route_threshold() {
        let config = NavigationConfig {
            off_route_threshold_m: 20.0,
            ..NavigationConfig::default()
        };
        let log = EventLog::new();
        let mut session = NavigationSession::new(config, Box::new(log.clone()));
        session
            .start(straight_route(), Some(east(0.0)), Some(east(1000.0)))
            .unwrap();

        // 25 m from the destination: past the 20 m gate, inside the 30 m radius
        let outcome = session.apply_fix(PositionFix::at(offset(1000.0, 25.0), 1));

        assert_eq!(outcome, FixOutcome::Applied);
        assert_eq!(session.phase(), SessionPhase::Arrived);
        let state = session.state().unwrap();
        assert!(state.is_arrived);
        assert!(!state.is_off_route);
        assert_eq!(log.count("arrived"), 1);
        assert_eq!(log.count("off-route"), 0);
    }

    #[test]
    fn test_out_of_order_timestamps_processed_in_arrival_order() {
        let (mut session, log) = started();

        let first = PositionFix::at(east(250.0), 2_000);
        let second = PositionFix::at(east(500.0), 1_000);
        assert_eq!(session.apply_fix(first), FixOutcome::Applied);
        assert_eq!(session.apply_fix(second), FixOutcome::Applied);

        let state = session.state().unwrap();
        assert_eq!(state.closest_index, 2);
        assert_eq!(state.last_fix, Some(second));
        assert_eq!(session.latest_fix(), Some(second));
        assert_eq!(log.count("progress-changed"), 2);
    }
}
