//! CityNav - Turn-by-turn route tracking for city traffic
//!
//! This library turns a precomputed route and a stream of position fixes into
//! navigation progress: where the driver is on the route, what the next
//! maneuver is, when to speak it, when the driver has left the route and when
//! the trip is over.
//!
//! # Modules
//!
//! - [`geo`] - Haversine distance, bearings, nearest route vertex
//! - [`route`] - Route model, validation, coarse step synthesis
//! - [`tracker`] - Pure per-fix progress computation
//! - [`announce`] - Distance tiers and spoken instructions
//! - [`session`] - The navigation state machine and its events
//! - [`routing`] - Routing service boundary and recalculation tickets
//! - [`config`] - Thresholds and INI configuration
//!
//! The engine does no I/O of its own: fixes, compass headings and routes are
//! pushed in by the caller, and everything it has to say goes out through an
//! [`session::EventSink`].

pub mod announce;
pub mod config;
pub mod fix;
pub mod geo;
pub mod route;
pub mod routing;
pub mod session;
pub mod tracker;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
