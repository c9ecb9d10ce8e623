//! GLOSA advisory daemon
//!
//! HTTP endpoints for authentication and route planning plus the
//! WebSocket gateway that streams per-session speed recommendations.

pub mod config;
pub mod gateway;
pub mod http;
pub mod protocol;
pub mod providers;
pub mod state;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::error_handling::HandleErrorLayer;
use axum::http::StatusCode;
use tower::limit::ConcurrencyLimitLayer;
use tower::{BoxError, ServiceBuilder};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Assemble the full router. Request/response endpoints get a timeout and
/// a concurrency cap; the WebSocket route must not be timeout-limited or
/// long-lived sessions would be cut off.
pub fn app(state: Arc<AppState>) -> Router {
    let api = http::router(state.clone()).layer(
        ServiceBuilder::new()
            .layer(HandleErrorLayer::new(middleware_error))
            .layer(ConcurrencyLimitLayer::new(256))
            .timeout(Duration::from_secs(10)),
    );
    api.merge(gateway::router(state))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

async fn middleware_error(error: BoxError) -> (StatusCode, String) {
    if error.is::<tower::timeout::error::Elapsed>() {
        (StatusCode::REQUEST_TIMEOUT, "request timed out".to_string())
    } else {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("middleware failure: {error}"),
        )
    }
}
