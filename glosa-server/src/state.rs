//! Shared server state and the session-token registry

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use glosa_core::model::Route;
use glosa_core::planner::RoutingEngine;
use glosa_core::prediction::PredictionFeed;
use tracing::debug;
use uuid::Uuid;

use crate::config::ServerConfig;

/// Everything a request handler or connection needs: configuration, the two
/// external-collaborator seams and the token registry.
pub struct AppState {
    pub config: ServerConfig,
    pub engine: Arc<dyn RoutingEngine>,
    pub feed: Arc<dyn PredictionFeed>,
    pub registry: SessionRegistry,
}

impl AppState {
    pub fn new(
        config: ServerConfig,
        engine: Arc<dyn RoutingEngine>,
        feed: Arc<dyn PredictionFeed>,
    ) -> Self {
        Self {
            config,
            engine,
            feed,
            registry: SessionRegistry::default(),
        }
    }
}

struct RegistryEntry {
    route: Option<Arc<Route>>,
    issued_at: Instant,
    connected: bool,
}

/// Outcome of claiming a token for a fresh WebSocket connection.
pub enum Claim {
    /// Token was never issued (or already released).
    Unknown,
    /// Another live connection already claimed the token.
    InUse,
    /// Claimed; carries the route parked by `/getroute`, if any.
    Claimed(Option<Arc<Route>>),
}

/// Tokens issued by `/authentication`, each parking at most one planned
/// route until the WebSocket hello claims it.
///
/// An entry lives until its connection closes, or until the reaper sweeps
/// it because no connection ever arrived.
#[derive(Default)]
pub struct SessionRegistry {
    entries: Mutex<HashMap<String, RegistryEntry>>,
}

impl SessionRegistry {
    /// Issue a fresh opaque session token.
    pub fn issue(&self) -> String {
        let token = Uuid::new_v4().to_string();
        self.lock().insert(
            token.clone(),
            RegistryEntry {
                route: None,
                issued_at: Instant::now(),
                connected: false,
            },
        );
        token
    }

    pub fn is_known(&self, token: &str) -> bool {
        self.lock().contains_key(token)
    }

    /// Park a planned route under a token. Returns false for unknown tokens.
    pub fn park_route(&self, token: &str, route: Arc<Route>) -> bool {
        match self.lock().get_mut(token) {
            Some(entry) => {
                entry.route = Some(route);
                true
            }
            None => false,
        }
    }

    /// Claim a token for a connection, taking the parked route with it.
    /// Route ownership moves into the navigation session from here on.
    pub fn claim(&self, token: &str) -> Claim {
        match self.lock().get_mut(token) {
            None => Claim::Unknown,
            Some(entry) if entry.connected => Claim::InUse,
            Some(entry) => {
                entry.connected = true;
                Claim::Claimed(entry.route.take())
            }
        }
    }

    /// Drop a token entirely. Called when its connection closes; the client
    /// must re-authenticate and replan to navigate again.
    pub fn release(&self, token: &str) {
        if self.lock().remove(token).is_some() {
            debug!(%token, "released session token");
        }
    }

    /// Sweep tokens that were issued but never claimed within `max_age`.
    /// Returns how many were removed.
    pub fn sweep_stale(&self, max_age: Duration) -> usize {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, entry| entry.connected || entry.issued_at.elapsed() < max_age);
        before - entries.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, RegistryEntry>> {
        self.entries.lock().expect("session registry mutex poisoned")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glosa_core::model::Waypoint;

    fn route() -> Arc<Route> {
        Arc::new(Route {
            waypoints: vec![Waypoint {
                lat: 51.0306,
                lon: 13.7275,
                altitude: 0.0,
                distance_to_next_signal: None,
                signal_group_id: None,
            }],
            signal_groups: Default::default(),
            distance: 0.0,
            ascend: 0.0,
            descend: 0.0,
            estimated_duration: 0,
        })
    }

    #[test]
    fn issue_claim_release_cycle() {
        let registry = SessionRegistry::default();
        let token = registry.issue();
        assert!(registry.is_known(&token));
        assert!(registry.park_route(&token, route()));

        match registry.claim(&token) {
            Claim::Claimed(Some(_)) => {}
            _ => panic!("expected claimed with parked route"),
        }
        // route moved out on the first claim, token now in use
        assert!(matches!(registry.claim(&token), Claim::InUse));

        registry.release(&token);
        assert!(!registry.is_known(&token));
        assert!(matches!(registry.claim(&token), Claim::Unknown));
    }

    #[test]
    fn park_on_unknown_token_fails() {
        let registry = SessionRegistry::default();
        assert!(!registry.park_route("nope", route()));
    }

    #[test]
    fn sweep_removes_only_unclaimed_entries() {
        let registry = SessionRegistry::default();
        let stale = registry.issue();
        let live = registry.issue();
        assert!(matches!(registry.claim(&live), Claim::Claimed(None)));

        let swept = registry.sweep_stale(Duration::ZERO);
        assert_eq!(swept, 1);
        assert!(!registry.is_known(&stale));
        assert!(registry.is_known(&live));
    }
}
