//! WebSocket session gateway
//!
//! Multiplexes client connections; each connection owns exactly one
//! navigation session for its lifetime. Sessions are connection-scoped:
//! inbound messages are routed by connection identity, never by a
//! client-supplied session id, so no message can reach another session.

mod connection;
mod emission;

use std::sync::Arc;

use axum::Router;
use axum::extract::{State, WebSocketUpgrade};
use axum::response::Response;
use axum::routing::get;

use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/navigation", get(upgrade))
        .with_state(state)
}

async fn upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(move |socket| connection::handle(socket, state))
}
