// Re-export key components
pub use crate::advisory::{SignalAhead, SpeedRange, compute_recommendation, locate_signal_ahead};
pub use crate::error::Error;
pub use crate::model::{GeoPoint, Position, Recommendation, Route, RouteRequest, SignalGroup, Waypoint};
pub use crate::planner::{RoutingEngine, plan_route};
pub use crate::prediction::{PhasePrediction, PredictionFeed};
pub use crate::session::{NavigationSession, SessionState, StartOutcome, StopOutcome};

pub use crate::SignalGroupId;
