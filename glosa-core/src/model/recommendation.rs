use serde::{Deserialize, Serialize};

use crate::Error;

/// Speed advisory for the next signal ahead, pushed once per emission tick
/// while a session is navigating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    /// Human label of the signal group the advisory refers to.
    pub label: String,
    /// Whole seconds until the relevant phase boundary (truncated).
    pub countdown: u64,
    /// Remaining distance to the signal stop line in meters.
    pub distance: f64,
    /// Advised constant speed in m/s.
    pub speed_rec: f64,
    /// Advised minus actual speed in m/s.
    pub speed_diff: f64,
    /// Arrival at the advised speed falls inside a green window.
    pub is_green: bool,
    pub error: bool,
    pub error_message: String,
}

impl Recommendation {
    /// Error advisory: numeric fields zeroed, message taken from the failure.
    ///
    /// Emitted in place of a regular advisory when the route has ended or no
    /// prediction is available; the session stays active and the next tick
    /// retries.
    pub fn failure(reason: &Error) -> Self {
        Self {
            label: String::new(),
            countdown: 0,
            distance: 0.0,
            speed_rec: 0.0,
            speed_diff: 0.0,
            is_green: false,
            error: true,
            error_message: reason.to_string(),
        }
    }
}
