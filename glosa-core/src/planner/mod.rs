//! Route-planning facade
//!
//! Geometry is delegated to an external routing engine; the facade only
//! validates the request coordinates and the structural invariants of
//! whatever the engine returns.

use log::debug;

use crate::Error;
use crate::model::{Route, RouteRequest};

/// Seam to the external routing engine.
pub trait RoutingEngine: Send + Sync {
    /// Produce a complete route for the requested trip.
    fn plan(&self, request: &RouteRequest) -> Result<Route, Error>;
}

/// Plan a route for a validated request.
///
/// # Errors
///
/// `InvalidRequest` for out-of-range coordinates, `Engine` when the engine
/// fails or returns a structurally broken route.
pub fn plan_route(engine: &dyn RoutingEngine, request: &RouteRequest) -> Result<Route, Error> {
    validate_request(request)?;
    let route = engine.plan(request)?;
    route.check_integrity()?;
    debug!(
        "planned route: {} waypoints, {:.0} m, {} signal groups",
        route.waypoints.len(),
        route.distance,
        route.signal_groups.len()
    );
    Ok(route)
}

fn validate_request(request: &RouteRequest) -> Result<(), Error> {
    let latitudes = [("fromLat", request.from_lat), ("toLat", request.to_lat)];
    let longitudes = [("fromLon", request.from_lon), ("toLon", request.to_lon)];

    for (name, value) in latitudes {
        if !value.is_finite() || !(-90.0..=90.0).contains(&value) {
            return Err(Error::InvalidRequest(format!(
                "{name} out of range: {value}"
            )));
        }
    }
    for (name, value) in longitudes {
        if !value.is_finite() || !(-180.0..=180.0).contains(&value) {
            return Err(Error::InvalidRequest(format!(
                "{name} out of range: {value}"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Waypoint;
    use hashbrown::HashMap;

    struct FixedEngine(Route);

    impl RoutingEngine for FixedEngine {
        fn plan(&self, _request: &RouteRequest) -> Result<Route, Error> {
            Ok(self.0.clone())
        }
    }

    struct FailingEngine;

    impl RoutingEngine for FailingEngine {
        fn plan(&self, _request: &RouteRequest) -> Result<Route, Error> {
            Err(Error::Engine("backend unreachable".into()))
        }
    }

    fn request() -> RouteRequest {
        RouteRequest {
            from_lat: 51.0308,
            from_lon: 13.7272,
            to_lat: 51.0306,
            to_lon: 13.7275,
        }
    }

    fn sentinel_route() -> Route {
        Route {
            waypoints: vec![Waypoint {
                lat: 51.0306,
                lon: 13.7275,
                altitude: 0.0,
                distance_to_next_signal: None,
                signal_group_id: None,
            }],
            signal_groups: HashMap::new(),
            distance: 31.0,
            ascend: 0.0,
            descend: 0.0,
            estimated_duration: 6_000,
        }
    }

    #[test]
    fn delegates_to_engine_for_valid_requests() {
        let engine = FixedEngine(sentinel_route());
        let route = plan_route(&engine, &request()).unwrap();
        assert_eq!(route.waypoints.len(), 1);
    }

    #[test]
    fn rejects_each_out_of_range_coordinate() {
        let engine = FixedEngine(sentinel_route());
        let cases = [
            RouteRequest {
                from_lat: 90.5,
                ..request()
            },
            RouteRequest {
                from_lon: -180.5,
                ..request()
            },
            RouteRequest {
                to_lat: -91.0,
                ..request()
            },
            RouteRequest {
                to_lon: 181.0,
                ..request()
            },
            RouteRequest {
                from_lat: f64::NAN,
                ..request()
            },
        ];
        for case in cases {
            assert!(matches!(
                plan_route(&engine, &case),
                Err(Error::InvalidRequest(_))
            ));
        }
    }

    #[test]
    fn surfaces_engine_failures() {
        assert!(matches!(
            plan_route(&FailingEngine, &request()),
            Err(Error::Engine(_))
        ));
    }

    #[test]
    fn rejects_structurally_broken_engine_output() {
        let mut broken = sentinel_route();
        broken.waypoints[0].signal_group_id = Some("missing".into());
        broken.waypoints[0].distance_to_next_signal = Some(10.0);
        let engine = FixedEngine(broken);
        assert!(matches!(
            plan_route(&engine, &request()),
            Err(Error::Engine(_))
        ));
    }
}
