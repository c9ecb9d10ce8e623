//! Data model for route-bound speed advisories
//!
//! Contains the wire-facing types exchanged with clients: planned routes
//! with their signal groups, position fixes and recommendations.

pub mod position;
pub mod recommendation;
pub mod route;

pub use position::Position;
pub use recommendation::Recommendation;
pub use route::{GeoPoint, Route, RouteRequest, SignalGroup, SignalGroupMap, Waypoint};
