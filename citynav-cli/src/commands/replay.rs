//! Replay command - run a recorded fix log against a route.
//!
//! Every event the session emits is printed as it happens. When the driver
//! leaves the route and `--reroute` files remain, the next one is handed to
//! the session as the recalculated route.

use std::path::PathBuf;

use citynav::config::NavigationConfig;
use citynav::fix::PositionFix;
use citynav::route::Route;
use citynav::routing::QueuedRoutingService;
use citynav::session::{EventLog, FixOutcome, NavigationEvent, NavigationSession, SessionPhase};

use super::common::{load_config, load_fixes, load_route};
use crate::error::CliError;

/// Arguments for the replay command.
pub struct ReplayArgs {
    pub route: PathBuf,
    pub fixes: PathBuf,
    pub reroute: Vec<PathBuf>,
    pub config: Option<PathBuf>,
    pub json: bool,
}

/// What happened over a replay.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplaySummary {
    /// Phase after the last fix, before the session was stopped.
    pub phase: SessionPhase,
    pub fixes_applied: usize,
    pub fixes_ignored: usize,
    pub recalculations: usize,
    pub announcements: usize,
    /// Remaining path distance after the last fix.
    pub remaining_distance_meters: f64,
}

/// Run the replay command.
pub fn run(args: ReplayArgs) -> Result<(), CliError> {
    let config = load_config(args.config.as_deref())?;
    let route = load_route(&args.route)?;
    let fixes = load_fixes(&args.fixes)?;
    let reroutes = args
        .reroute
        .iter()
        .map(|path| load_route(path))
        .collect::<Result<Vec<_>, _>>()?;

    let json = args.json;
    let summary = replay(config, route, &fixes, reroutes, |event| {
        if json {
            let line = serde_json::to_string(event).map_err(CliError::Output)?;
            println!("{}", line);
        } else {
            println!("{}", describe_event(event));
        }
        Ok(())
    })?;

    if !json {
        println!();
        println!("Replay finished: {}", summary.phase);
        println!(
            "  Fixes:           {} applied, {} ignored",
            summary.fixes_applied, summary.fixes_ignored
        );
        println!("  Recalculations:  {}", summary.recalculations);
        println!("  Announcements:   {}", summary.announcements);
        println!("  Remaining:       {:.0} m", summary.remaining_distance_meters);
    }

    Ok(())
}

/// Drive a session through `fixes`, passing every event to `on_event`.
///
/// The route's first vertex is used as origin and its last vertex as
/// destination. Stops early once the session reaches a terminal phase, and
/// stops the session at the end.
pub fn replay<F>(
    config: NavigationConfig,
    route: Route,
    fixes: &[PositionFix],
    reroutes: Vec<Route>,
    mut on_event: F,
) -> Result<ReplaySummary, CliError>
where
    F: FnMut(&NavigationEvent) -> Result<(), CliError>,
{
    let log = EventLog::new();
    let routing = QueuedRoutingService::with_routes(reroutes);

    let origin = route.coordinates.first().copied();
    let destination = route.destination();
    let mut session = NavigationSession::new(config, Box::new(log.clone()));
    session.start(route, origin, destination)?;

    let mut summary = ReplaySummary {
        phase: session.phase(),
        fixes_applied: 0,
        fixes_ignored: 0,
        recalculations: 0,
        announcements: 0,
        remaining_distance_meters: 0.0,
    };
    forward(&log, &mut summary, &mut on_event)?;

    for fix in fixes {
        match session.apply_fix(*fix) {
            FixOutcome::Applied => summary.fixes_applied += 1,
            FixOutcome::Ignored(reason) => {
                summary.fixes_ignored += 1;
                tracing::debug!(?reason, timestamp_ms = fix.timestamp_millis, "Fix ignored");
            }
        }

        if session.phase() == SessionPhase::OffRoute && routing.remaining() > 0 {
            summary.recalculations += 1;
            if let Err(e) = session.recalculate(&routing, fix.coordinate()) {
                tracing::warn!(error = %e, "Recalculation failed during replay");
            }
        }

        forward(&log, &mut summary, &mut on_event)?;

        if session.phase().is_terminal() {
            break;
        }
    }

    summary.phase = session.phase();
    summary.remaining_distance_meters = session
        .state()
        .map(|s| s.remaining_distance_meters)
        .unwrap_or(0.0);

    session.stop();
    forward(&log, &mut summary, &mut on_event)?;

    Ok(summary)
}

fn forward<F>(log: &EventLog, summary: &mut ReplaySummary, on_event: &mut F) -> Result<(), CliError>
where
    F: FnMut(&NavigationEvent) -> Result<(), CliError>,
{
    for event in log.drain() {
        if matches!(event, NavigationEvent::Announce { .. }) {
            summary.announcements += 1;
        }
        on_event(&event)?;
    }
    Ok(())
}

/// One-line human readable rendering of an event.
pub fn describe_event(event: &NavigationEvent) -> String {
    match event {
        NavigationEvent::Started { state } => format!(
            "started       {} coordinates, {} steps, {:.2} km",
            state.route.coordinates.len(),
            state.route.steps.len(),
            state.route.total_distance_km()
        ),
        NavigationEvent::ProgressChanged { state } => {
            let mut line = format!(
                "progress      vertex {}, {:.0} m left ({:.1} min), next {} in {:.0} m",
                state.closest_index,
                state.remaining_distance_meters,
                state.remaining_time_minutes,
                state.next_step.step.maneuver,
                state.distance_to_next_step_meters
            );
            if state.is_off_route {
                line.push_str(&format!(" [off route by {:.0} m]", state.distance_to_route_meters));
            }
            line
        }
        NavigationEvent::OffRoute {
            distance_to_route_meters,
        } => format!("off-route     {:.0} m from route", distance_to_route_meters),
        NavigationEvent::BackOnRoute {
            distance_to_route_meters,
        } => format!("back-on-route {:.0} m from route", distance_to_route_meters),
        NavigationEvent::Announce { text, .. } => format!("announce      \"{}\"", text),
        NavigationEvent::Arrived { state } => format!(
            "arrived       at vertex {} of {}",
            state.closest_index,
            state.route.last_index()
        ),
        NavigationEvent::RecalculationRequested {
            ticket_id,
            origin,
            destination,
        } => format!("reroute #{}    from {} to {}", ticket_id, origin, destination),
        NavigationEvent::RouteReplaced { state } => format!(
            "route-replaced {} coordinates, {} steps, {:.2} km",
            state.route.coordinates.len(),
            state.route.steps.len(),
            state.route.total_distance_km()
        ),
        NavigationEvent::RecalculationFailed { reason } => format!("reroute-failed {}", reason),
        NavigationEvent::Stopped { previous } => format!("stopped       (was {})", previous),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use citynav::geo::Coordinate;

    const DEG_PER_100M: f64 = 0.000_899_32;

    fn route() -> Route {
        let coords = (0..4)
            .map(|i| Coordinate::new(0.0, i as f64 * DEG_PER_100M))
            .collect();
        Route::from_coordinates(coords, Vec::new(), 1.0)
    }

    fn along(i: f64, ts: u64) -> PositionFix {
        PositionFix::new(0.0, i * DEG_PER_100M, ts)
    }

    fn collect(
        route: Route,
        fixes: &[PositionFix],
        reroutes: Vec<Route>,
    ) -> (ReplaySummary, Vec<&'static str>) {
        let mut names = Vec::new();
        let summary = replay(NavigationConfig::default(), route, fixes, reroutes, |e| {
            names.push(e.name());
            Ok(())
        })
        .unwrap();
        (summary, names)
    }

    #[test]
    fn test_replay_to_arrival() {
        let fixes = [along(0.0, 1), along(1.0, 2), along(2.0, 3), along(2.95, 4), along(3.0, 5)];
        let (summary, names) = collect(route(), &fixes, Vec::new());

        assert_eq!(summary.phase, SessionPhase::Arrived);
        assert_eq!(summary.fixes_applied, 4);
        assert_eq!(summary.fixes_ignored, 0);
        assert_eq!(names.first(), Some(&"started"));
        assert!(names.contains(&"arrived"));
        // Arrived is terminal, so stop() at the end emits nothing
        assert!(!names.contains(&"stopped"));
    }

    #[test]
    fn test_replay_reroutes_from_files() {
        let detour_start = Coordinate::new(0.002, DEG_PER_100M);
        let reroute = Route::from_coordinates(
            vec![detour_start, Coordinate::new(0.0, 3.0 * DEG_PER_100M)],
            Vec::new(),
            1.0,
        );
        let fixes = [along(0.0, 1), PositionFix::at(detour_start, 2), along(1.5, 3)];

        let (summary, names) = collect(route(), &fixes, vec![reroute]);

        assert_eq!(summary.recalculations, 1);
        assert!(names.contains(&"off-route"));
        assert!(names.contains(&"recalculation-requested"));
        assert!(names.contains(&"route-replaced"));
        assert_eq!(names.last(), Some(&"stopped"));
        assert!(summary.announcements >= 1);
    }

    #[test]
    fn test_replay_without_reroutes_stays_off_route() {
        let fixes = [along(0.0, 1), PositionFix::new(0.002, DEG_PER_100M, 2)];
        let (summary, names) = collect(route(), &fixes, Vec::new());

        assert_eq!(summary.phase, SessionPhase::OffRoute);
        assert_eq!(summary.recalculations, 0);
        assert!(!names.contains(&"recalculation-requested"));
    }

    #[test]
    fn test_describe_event() {
        let line = describe_event(&NavigationEvent::Announce {
            text: "In 80 meters, turn right.".to_string(),
            step_index: Some(0),
            tier: None,
        });
        assert_eq!(line, "announce      \"In 80 meters, turn right.\"");

        let line = describe_event(&NavigationEvent::Stopped {
            previous: SessionPhase::OffRoute,
        });
        assert_eq!(line, "stopped       (was off_route)");
    }
}
