//! Session output events and sinks.
//!
//! The session pushes every event to a single injected [`EventSink`]. UI
//! layers subscribe by handing in a channel sender; tests and the CLI use an
//! [`EventLog`].
//!
//! # Example
//!
//! ```
//! use citynav::config::NavigationConfig;
//! use citynav::session::{NavigationEvent, NavigationSession};
//!
//! let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<NavigationEvent>();
//! let mut session = NavigationSession::new(NavigationConfig::default(), Box::new(tx));
//! session.stop();
//! assert_eq!(rx.try_recv().unwrap().name(), "stopped");
//! ```

use std::sync::{Arc, Mutex};

use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;

use super::state::{NavigationState, SessionPhase};
use crate::announce::Tier;
use crate::geo::Coordinate;

/// Something the UI, speech sink or routing collaborator may react to.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum NavigationEvent {
    /// Session started tracking a route.
    Started { state: Arc<NavigationState> },

    /// A fix produced a new snapshot.
    ProgressChanged { state: Arc<NavigationState> },

    /// Fix left the route. Emitted once per excursion.
    OffRoute { distance_to_route_meters: f64 },

    /// Fix returned to the route without a recalculation.
    BackOnRoute { distance_to_route_meters: f64 },

    /// Text for the speech sink.
    Announce {
        text: String,
        step_index: Option<usize>,
        tier: Option<Tier>,
    },

    /// Destination reached. Terminal.
    Arrived { state: Arc<NavigationState> },

    /// A replacement route was requested.
    RecalculationRequested {
        ticket_id: u64,
        origin: Coordinate,
        destination: Coordinate,
    },

    /// A replacement route is now being followed.
    RouteReplaced { state: Arc<NavigationState> },

    /// The replacement route could not be obtained; the previous route stays.
    RecalculationFailed { reason: String },

    /// Session stopped; position subscriptions can be released.
    Stopped { previous: SessionPhase },
}

impl NavigationEvent {
    /// Short name for logging and CLI output.
    pub fn name(&self) -> &'static str {
        match self {
            NavigationEvent::Started { .. } => "started",
            NavigationEvent::ProgressChanged { .. } => "progress-changed",
            NavigationEvent::OffRoute { .. } => "off-route",
            NavigationEvent::BackOnRoute { .. } => "back-on-route",
            NavigationEvent::Announce { .. } => "announce",
            NavigationEvent::Arrived { .. } => "arrived",
            NavigationEvent::RecalculationRequested { .. } => "recalculation-requested",
            NavigationEvent::RouteReplaced { .. } => "route-replaced",
            NavigationEvent::RecalculationFailed { .. } => "recalculation-failed",
            NavigationEvent::Stopped { .. } => "stopped",
        }
    }
}

/// Receiver of session events.
///
/// # Implementors
///
/// - [`EventLog`] - Shared in-memory log
/// - [`NullSink`] - Discards everything
/// - `tokio::sync::mpsc::UnboundedSender<NavigationEvent>` - Channel to a UI task
pub trait EventSink: Send {
    /// Deliver one event. Must not block.
    fn emit(&mut self, event: NavigationEvent);
}

/// Sink that discards events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&mut self, _event: NavigationEvent) {}
}

impl EventSink for UnboundedSender<NavigationEvent> {
    fn emit(&mut self, event: NavigationEvent) {
        if self.send(event).is_err() {
            // Subscriber went away; the session keeps running headless
            tracing::trace!("Navigation event dropped, receiver closed");
        }
    }
}

/// Cloneable in-memory event log.
///
/// Hand one clone to the session and keep another to read what was emitted.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<NavigationEvent>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of all events so far.
    pub fn events(&self) -> Vec<NavigationEvent> {
        self.lock().clone()
    }

    /// Remove and return all events so far.
    pub fn drain(&self) -> Vec<NavigationEvent> {
        std::mem::take(&mut *self.lock())
    }

    /// Names of all events so far.
    pub fn names(&self) -> Vec<&'static str> {
        self.lock().iter().map(NavigationEvent::name).collect()
    }

    /// Number of events with the given name.
    pub fn count(&self, name: &str) -> usize {
        self.lock().iter().filter(|e| e.name() == name).count()
    }

    /// Texts of all announcements so far.
    pub fn announcements(&self) -> Vec<String> {
        self.lock()
            .iter()
            .filter_map(|e| match e {
                NavigationEvent::Announce { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<NavigationEvent>> {
        self.events.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl EventSink for EventLog {
    fn emit(&mut self, event: NavigationEvent) {
        self.lock().push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_log_shared_between_clones() {
        let log = EventLog::new();
        let mut sink = log.clone();
        sink.emit(NavigationEvent::OffRoute {
            distance_to_route_meters: 120.0,
        });
        sink.emit(NavigationEvent::Announce {
            text: "hello".to_string(),
            step_index: None,
            tier: None,
        });

        assert_eq!(log.names(), vec!["off-route", "announce"]);
        assert_eq!(log.count("announce"), 1);
        assert_eq!(log.announcements(), vec!["hello".to_string()]);

        let drained = log.drain();
        assert_eq!(drained.len(), 2);
        assert!(log.events().is_empty());
    }

    #[test]
    fn test_channel_sink_delivers_and_survives_closed_receiver() {
        let (mut tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        tx.emit(NavigationEvent::RecalculationFailed {
            reason: "offline".to_string(),
        });
        assert_eq!(rx.try_recv().unwrap().name(), "recalculation-failed");

        drop(rx);
        tx.emit(NavigationEvent::Stopped {
            previous: SessionPhase::Tracking,
        });
    }

    #[test]
    fn test_event_serializes_with_tag() {
        let json = serde_json::to_value(NavigationEvent::BackOnRoute {
            distance_to_route_meters: 12.5,
        })
        .unwrap();
        assert_eq!(json["event"], "back_on_route");
        assert_eq!(json["distance_to_route_meters"], 12.5);
    }
}
