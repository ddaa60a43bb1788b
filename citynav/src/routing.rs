//! Routing service boundary.
//!
//! The engine never fetches routes itself. Recalculation is modelled as a
//! ticket: the session hands out a [`RecalculationTicket`] describing what to
//! ask the router for, the caller performs the (usually asynchronous) request,
//! and reports the outcome back with the ticket id. At most one ticket is
//! outstanding per session.
//!
//! Callers with a synchronous router can implement [`RoutingService`] and use
//! [`crate::session::NavigationSession::recalculate`] instead.

use std::collections::VecDeque;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geo::Coordinate;
use crate::route::{Route, RouteError};

/// Errors reported by a routing provider.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RoutingError {
    /// Provider could not be reached or answered with an error.
    #[error("Routing service unavailable: {0}")]
    Unavailable(String),

    /// Provider found no route between the points.
    #[error("No route found")]
    NoRoute,

    /// Provider answered with a route that fails validation.
    #[error("Routing service returned an invalid route: {0}")]
    InvalidRoute(#[from] RouteError),
}

/// Routing preferences forwarded to the provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteOptions {
    /// Avoid toll roads.
    #[serde(default)]
    pub avoid_tolls: bool,
    /// Avoid motorways.
    #[serde(default)]
    pub avoid_highways: bool,
    /// Steer around reported incidents and roadworks.
    #[serde(default)]
    pub avoid_incidents: bool,
}

/// Route provider collaborator.
///
/// # Implementors
///
/// - [`QueuedRoutingService`] - Replays canned responses (tests, replays)
pub trait RoutingService {
    /// Fetch a route from `origin` to `destination`.
    fn get_route(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        options: &RouteOptions,
    ) -> Result<Route, RoutingError>;
}

/// One outstanding recalculation request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecalculationTicket {
    /// Identifier to pass back to `complete_recalculation`.
    pub id: u64,
    /// Where the new route should start (usually the latest fix).
    pub origin: Coordinate,
    /// The session's destination.
    pub destination: Coordinate,
    /// Routing preferences of the session.
    pub options: RouteOptions,
}

/// Routing service that answers from a queue of prepared responses.
///
/// Each call pops the next response; an exhausted queue answers
/// [`RoutingError::Unavailable`].
#[derive(Debug, Default)]
pub struct QueuedRoutingService {
    responses: Mutex<VecDeque<Result<Route, RoutingError>>>,
}

impl QueuedRoutingService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a service that returns these routes in order.
    pub fn with_routes(routes: impl IntoIterator<Item = Route>) -> Self {
        Self {
            responses: Mutex::new(routes.into_iter().map(Ok).collect()),
        }
    }

    /// Queue another response.
    pub fn push(&self, response: Result<Route, RoutingError>) {
        self.lock().push_back(response);
    }

    /// Number of responses left.
    pub fn remaining(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<Result<Route, RoutingError>>> {
        // A poisoned queue still holds valid data
        self.responses.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl RoutingService for QueuedRoutingService {
    fn get_route(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        _options: &RouteOptions,
    ) -> Result<Route, RoutingError> {
        let response = self.lock().pop_front();
        tracing::debug!(
            %origin,
            %destination,
            answered = response.is_some(),
            "Queued routing request"
        );
        response.unwrap_or_else(|| Err(RoutingError::Unavailable("no route queued".to_string())))
    }
}
