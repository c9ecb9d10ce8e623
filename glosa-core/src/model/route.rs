//! Planned routes and the signal groups they reference

use geo::{Distance, Haversine, Point};
use hashbrown::HashMap;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::{Error, SignalGroupId};

/// Registry of the signal groups a route references, keyed by id.
pub type SignalGroupMap = HashMap<SignalGroupId, SignalGroup>;

/// Coordinates of a requested trip.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteRequest {
    pub from_lat: f64,
    pub from_lon: f64,
    pub to_lat: f64,
    pub to_lon: f64,
}

/// Geographic position of a signal group.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn point(&self) -> Point<f64> {
        Point::new(self.lon, self.lat)
    }
}

/// Single route vertex in travel order.
///
/// A waypoint on a signal-controlled segment references the controlling
/// group and the remaining distance from this vertex to its stop line.
/// The final waypoint of every route carries neither (end-of-route
/// sentinel).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Waypoint {
    pub lat: f64,
    pub lon: f64,
    pub altitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_to_next_signal: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signal_group_id: Option<SignalGroupId>,
}

impl Waypoint {
    pub fn point(&self) -> Point<f64> {
        Point::new(self.lon, self.lat)
    }
}

/// A traffic-light control unit, identified independently of the road
/// geometry. Waypoints refer to groups by id and never own them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalGroup {
    pub id: SignalGroupId,
    pub label: String,
    pub position: GeoPoint,
}

/// Planned route as produced by the routing engine.
///
/// Immutable once planned; owned by at most one navigation session for
/// the lifetime of that session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    /// Waypoints in travel order. Wire name is `route`.
    #[serde(rename = "route")]
    pub waypoints: Vec<Waypoint>,
    pub signal_groups: SignalGroupMap,
    /// Total route length in meters.
    pub distance: f64,
    pub ascend: f64,
    pub descend: f64,
    /// Estimated travel time in milliseconds.
    pub estimated_duration: u64,
}

impl Route {
    /// Look up a signal group referenced by a waypoint.
    pub fn signal_group(&self, id: &str) -> Option<&SignalGroup> {
        self.signal_groups.get(id)
    }

    /// Length of the waypoint polyline in meters.
    pub fn polyline_length(&self) -> f64 {
        self.waypoints
            .iter()
            .tuple_windows()
            .map(|(a, b)| Haversine.distance(a.point(), b.point()))
            .sum()
    }

    /// Structural invariants every planned route must satisfy before it can
    /// seed a session: at least one waypoint, the final waypoint is the
    /// end-of-route sentinel, signal fields come in pairs and every
    /// referenced group id resolves in the registry.
    pub fn check_integrity(&self) -> Result<(), Error> {
        let Some(last) = self.waypoints.last() else {
            return Err(Error::Engine("route has no waypoints".into()));
        };
        if last.signal_group_id.is_some() || last.distance_to_next_signal.is_some() {
            return Err(Error::Engine(
                "final waypoint must not reference a signal".into(),
            ));
        }
        for waypoint in &self.waypoints {
            match (&waypoint.signal_group_id, waypoint.distance_to_next_signal) {
                (None, None) => {}
                (Some(id), Some(_)) => {
                    if !self.signal_groups.contains_key(id) {
                        return Err(Error::Engine(format!("unknown signal group: {id}")));
                    }
                }
                _ => {
                    return Err(Error::Engine(
                        "waypoint signal reference without distance (or vice versa)".into(),
                    ));
                }
            }
        }
        Ok(())
    }
}
