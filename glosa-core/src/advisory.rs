//! Recommendation engine
//!
//! Pure computation from (route, fix, phase prediction) to a speed
//! advisory. Map-matching is distance-to-waypoint minimization along
//! route order; the advised speed targets arrival exactly at the next
//! green-phase start.

use geo::{Distance, Haversine};

use crate::model::{Position, Recommendation, Route, SignalGroup, Waypoint};
use crate::prediction::PhasePrediction;

/// Plausible advisory speed range in m/s; advisories are clamped into it.
#[derive(Debug, Clone, Copy)]
pub struct SpeedRange {
    pub min: f64,
    pub max: f64,
}

impl Default for SpeedRange {
    /// Walking pace up to 50 km/h.
    fn default() -> Self {
        Self {
            min: 1.5,
            max: 13.9,
        }
    }
}

impl SpeedRange {
    /// Clamp into the range; non-finite input clamps to the maximum.
    pub fn clamp(&self, speed: f64) -> f64 {
        if speed.is_finite() {
            speed.clamp(self.min, self.max)
        } else {
            self.max
        }
    }
}

/// What lies ahead of a map-matched fix.
#[derive(Debug)]
pub enum SignalAhead<'a> {
    /// Next signal group and the remaining distance to its stop line.
    Signal {
        group: &'a SignalGroup,
        distance: f64,
    },
    /// The matched waypoint carries no signal reference.
    EndOfRoute,
}

/// Map-match a fix onto the route and resolve the signal controlling the
/// segment ahead.
///
/// The nearest waypoint by haversine distance wins; the scan uses strict
/// `<`, so on equal distance the earliest waypoint in travel order is
/// kept. Remaining distance to the stop line is fix-to-waypoint plus the
/// waypoint's own distance to its signal.
pub fn locate_signal_ahead<'a>(route: &'a Route, position: &Position) -> SignalAhead<'a> {
    let fix = position.point();
    let mut nearest: Option<(f64, &Waypoint)> = None;
    for waypoint in &route.waypoints {
        let offset = Haversine.distance(fix, waypoint.point());
        if nearest.is_none_or(|(best, _)| offset < best) {
            nearest = Some((offset, waypoint));
        }
    }
    let Some((offset, waypoint)) = nearest else {
        return SignalAhead::EndOfRoute;
    };
    let (Some(id), Some(to_signal)) = (&waypoint.signal_group_id, waypoint.distance_to_next_signal)
    else {
        return SignalAhead::EndOfRoute;
    };
    match route.signal_group(id) {
        Some(group) => SignalAhead::Signal {
            group,
            distance: offset + to_signal,
        },
        None => SignalAhead::EndOfRoute,
    }
}

/// Derive the advisory for a resolved signal.
///
/// While the phase ahead is red, the advised speed arrives exactly at the
/// next green-phase start; while it is already green, the advised speed
/// still reaches the stop line before that green ends. Countdown counts
/// whole seconds to the relevant boundary, truncated (never rounded up).
pub fn compute_recommendation(
    group: &SignalGroup,
    distance: f64,
    position: &Position,
    prediction: &PhasePrediction,
    range: &SpeedRange,
) -> Recommendation {
    let time_to_green = prediction.time_to_green.max(0.0);
    let green_end = prediction.time_to_green_end();

    let target = if prediction.is_green_now() {
        distance / green_end
    } else {
        distance / time_to_green
    };
    let speed_rec = range.clamp(target);

    let arrival = distance / speed_rec;
    let is_green = arrival >= time_to_green && arrival <= green_end;
    let boundary = if prediction.is_green_now() {
        green_end
    } else {
        time_to_green
    };

    Recommendation {
        label: group.label.clone(),
        countdown: boundary as u64,
        distance,
        speed_rec,
        speed_diff: speed_rec - position.speed,
        is_green,
        error: false,
        error_message: String::new(),
    }
}
