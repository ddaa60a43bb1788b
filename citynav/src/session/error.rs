//! Session errors.

use thiserror::Error;

use super::state::SessionPhase;
use crate::route::RouteError;

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Errors returned by [`super::NavigationSession`] operations.
///
/// Fixes never produce errors: fixes the session cannot use are reported as
/// [`super::FixOutcome::Ignored`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    /// Route, origin or destination unusable. Fatal to `start`.
    #[error("Invalid route: {0}")]
    InvalidRoute(#[from] RouteError),

    /// Replacement route could not be obtained. The previous route stays
    /// active and the caller may retry.
    #[error("Route recalculation failed: {0}")]
    RecalculationFailed(String),

    /// A recalculation is already outstanding.
    #[error("A route recalculation is already pending (ticket {ticket_id})")]
    RecalculationPending { ticket_id: u64 },

    /// Completion for a ticket that is not the outstanding one.
    #[error("No pending recalculation with ticket {ticket_id}")]
    UnknownTicket { ticket_id: u64 },

    /// Operation not valid in the current phase.
    #[error("Cannot {operation} while {phase}")]
    InvalidTransition {
        operation: &'static str,
        phase: SessionPhase,
    },
}
