//! Navigation-session state machine
//!
//! One session exists per client connection and never outlives it. The
//! machine is purely synchronous; the owning connection drives it and
//! schedules the emission loop on the `Idle -> Active` edge.

use std::sync::Arc;

use log::debug;

use crate::Error;
use crate::model::{Position, Route};

/// Lifecycle of a navigation session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Created or stopped; no recommendations are streaming.
    Idle,
    /// Recommendation emissions are streaming.
    Active,
    /// Terminal; any further message fails with [`Error::SessionClosed`].
    Closed,
}

/// Result of a `start` transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// `Idle -> Active`; the caller must begin the emission loop now.
    Started,
    /// Already active. The caller must not spawn a second emission loop.
    AlreadyActive,
}

/// Result of a `stop` transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// `Active -> Idle`; the caller must cancel the emission loop now.
    Stopped,
    /// Stop while already idle is a no-op, not an error.
    AlreadyIdle,
}

/// Per-client session: activation state, bound route and latest fix.
#[derive(Debug)]
pub struct NavigationSession {
    id: String,
    route: Option<Arc<Route>>,
    state: SessionState,
    current_position: Option<Position>,
}

impl NavigationSession {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            route: None,
            state: SessionState::Idle,
            current_position: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == SessionState::Active
    }

    pub fn route(&self) -> Option<&Arc<Route>> {
        self.route.as_ref()
    }

    pub fn current_position(&self) -> Option<Position> {
        self.current_position
    }

    /// Bind the planned route this session will navigate.
    ///
    /// Replacing a bound route is only legal while idle; a route swap under
    /// a live emission loop has no defined semantics.
    pub fn bind_route(&mut self, route: Arc<Route>) -> Result<(), Error> {
        match self.state {
            SessionState::Closed => Err(Error::SessionClosed),
            SessionState::Active => Err(Error::InvalidRequest(
                "cannot replace the route while navigating".into(),
            )),
            SessionState::Idle => {
                debug!(
                    "session {}: bound route with {} waypoints",
                    self.id,
                    route.waypoints.len()
                );
                self.route = Some(route);
                Ok(())
            }
        }
    }

    /// `Idle -> Active`. Requires a bound route. Idempotent while active:
    /// at most one live emission loop per session at any time.
    pub fn start(&mut self) -> Result<StartOutcome, Error> {
        match self.state {
            SessionState::Closed => Err(Error::SessionClosed),
            SessionState::Active => Ok(StartOutcome::AlreadyActive),
            SessionState::Idle => {
                if self.route.is_none() {
                    return Err(Error::NoRouteBound);
                }
                self.state = SessionState::Active;
                debug!("session {}: navigation started", self.id);
                Ok(StartOutcome::Started)
            }
        }
    }

    /// `Active -> Idle`. Idempotent while idle.
    pub fn stop(&mut self) -> Result<StopOutcome, Error> {
        match self.state {
            SessionState::Closed => Err(Error::SessionClosed),
            SessionState::Idle => Ok(StopOutcome::AlreadyIdle),
            SessionState::Active => {
                self.state = SessionState::Idle;
                debug!("session {}: navigation stopped", self.id);
                Ok(StopOutcome::Stopped)
            }
        }
    }

    /// Replace the latest fix. Legal while idle or active; never changes
    /// state. A fix stored while idle produces no emission until `start`.
    pub fn update_position(&mut self, position: Position) -> Result<(), Error> {
        if self.state == SessionState::Closed {
            return Err(Error::SessionClosed);
        }
        self.current_position = Some(position);
        Ok(())
    }

    /// Terminal transition, taken on goodbye or disconnect. Releases the
    /// bound route; there is no way out of `Closed`.
    pub fn close(&mut self) {
        if self.state != SessionState::Closed {
            debug!("session {}: closed", self.id);
        }
        self.state = SessionState::Closed;
        self.route = None;
        self.current_position = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Waypoint;
    use hashbrown::HashMap;

    fn route() -> Arc<Route> {
        Arc::new(Route {
            waypoints: vec![Waypoint {
                lat: 51.0306,
                lon: 13.7275,
                altitude: 0.0,
                distance_to_next_signal: None,
                signal_group_id: None,
            }],
            signal_groups: HashMap::new(),
            distance: 0.0,
            ascend: 0.0,
            descend: 0.0,
            estimated_duration: 0,
        })
    }

    fn fix() -> Position {
        Position {
            lat: 51.0306,
            lon: 13.7273,
            speed: 5.0,
        }
    }

    #[test]
    fn start_without_route_fails() {
        let mut session = NavigationSession::new("s1");
        assert!(matches!(session.start(), Err(Error::NoRouteBound)));
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn start_stop_cycle() {
        let mut session = NavigationSession::new("s1");
        session.bind_route(route()).unwrap();
        assert_eq!(session.start().unwrap(), StartOutcome::Started);
        assert!(session.is_active());
        assert_eq!(session.stop().unwrap(), StopOutcome::Stopped);
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn start_is_idempotent_while_active() {
        let mut session = NavigationSession::new("s1");
        session.bind_route(route()).unwrap();
        assert_eq!(session.start().unwrap(), StartOutcome::Started);
        // the second start must not report a fresh activation
        assert_eq!(session.start().unwrap(), StartOutcome::AlreadyActive);
    }

    #[test]
    fn stop_while_idle_is_a_noop() {
        let mut session = NavigationSession::new("s1");
        assert_eq!(session.stop().unwrap(), StopOutcome::AlreadyIdle);
    }

    #[test]
    fn position_while_idle_is_stored() {
        let mut session = NavigationSession::new("s1");
        session.update_position(fix()).unwrap();
        assert_eq!(session.current_position(), Some(fix()));
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn closed_session_rejects_everything() {
        let mut session = NavigationSession::new("s1");
        session.bind_route(route()).unwrap();
        session.start().unwrap();
        session.close();

        assert_eq!(session.state(), SessionState::Closed);
        assert!(session.route().is_none());
        assert!(matches!(session.start(), Err(Error::SessionClosed)));
        assert!(matches!(session.stop(), Err(Error::SessionClosed)));
        assert!(matches!(
            session.update_position(fix()),
            Err(Error::SessionClosed)
        ));
        assert!(matches!(
            session.bind_route(route()),
            Err(Error::SessionClosed)
        ));
    }

    #[test]
    fn rebind_while_active_is_rejected() {
        let mut session = NavigationSession::new("s1");
        session.bind_route(route()).unwrap();
        session.start().unwrap();
        assert!(matches!(
            session.bind_route(route()),
            Err(Error::InvalidRequest(_))
        ));
    }
}
