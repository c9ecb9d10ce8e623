//! Signal-phase predictions from the external timing feed

use async_trait::async_trait;

use crate::Error;

/// Predicted phase timing for one signal group, relative to "now" as seen
/// by the feed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhasePrediction {
    /// Seconds until the next green phase begins; zero when green now.
    pub time_to_green: f64,
    /// Length of that green phase in seconds.
    pub green_duration: f64,
}

impl PhasePrediction {
    pub fn is_green_now(&self) -> bool {
        self.time_to_green <= 0.0
    }

    /// Seconds until the relevant green phase ends.
    pub fn time_to_green_end(&self) -> f64 {
        self.time_to_green.max(0.0) + self.green_duration
    }

    /// Feeds are external; a prediction with non-finite or negative timing
    /// is treated as unavailable rather than entering the advisory math.
    pub fn is_plausible(&self) -> bool {
        self.time_to_green.is_finite()
            && self.green_duration.is_finite()
            && self.green_duration >= 0.0
    }
}

/// Seam to the external signal-timing feed.
///
/// Implementations may suspend (network fetch). Callers bound the wait and
/// treat a timeout as an unavailable prediction, never as a fatal error.
#[async_trait]
pub trait PredictionFeed: Send + Sync {
    async fn phase_prediction(&self, signal_group: &str) -> Result<PhasePrediction, Error>;
}
