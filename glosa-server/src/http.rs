//! HTTP endpoints: authentication and route planning
//!
//! Both run over the session-setup channel, outside the persistent
//! protocol. `/getroute` parks its result under the caller's session
//! token; the WebSocket hello later claims it.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use glosa_core::model::RouteRequest;
use glosa_core::{Error, planner};
use serde::Serialize;
use serde_json::json;
use tracing::info;

use crate::state::AppState;

/// Header carrying the session token issued by `/authentication`.
pub const SESSION_HEADER: &str = "x-session-id";

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/authentication", post(authenticate))
        .route("/getroute", post(get_route))
        .with_state(state)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AuthResponse {
    session_id: String,
}

/// Trade credentials for a session token. The credential schema is opaque;
/// any non-empty body is accepted, a missing one is not.
async fn authenticate(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<AuthResponse>, ApiError> {
    if body.is_empty() {
        return Err(ApiError::Core(Error::InvalidRequest(
            "missing credentials".into(),
        )));
    }
    let session_id = state.registry.issue();
    info!(session = %session_id, "issued session token");
    Ok(Json(AuthResponse { session_id }))
}

async fn get_route(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<RouteRequest>,
) -> Result<Response, ApiError> {
    let token = headers
        .get(SESSION_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or(ApiError::Unauthenticated)?;
    if !state.registry.is_known(token) {
        return Err(ApiError::Unauthenticated);
    }

    let route = planner::plan_route(state.engine.as_ref(), &request)?;
    state.registry.park_route(token, Arc::new(route.clone()));
    Ok(Json(route).into_response())
}

/// Boundary mapping from core errors onto HTTP statuses.
enum ApiError {
    Unauthenticated,
    Core(Error),
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        ApiError::Core(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Unauthenticated => {
                (StatusCode::UNAUTHORIZED, "unknown session".to_string())
            }
            ApiError::Core(error) => {
                let status = match &error {
                    Error::InvalidRequest(_) => StatusCode::BAD_REQUEST,
                    // the routing engine is an external collaborator
                    Error::Engine(_) => StatusCode::BAD_GATEWAY,
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, error.to_string())
            }
        };
        (status, Json(json!({"error": message}))).into_response()
    }
}
