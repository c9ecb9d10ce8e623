//! End-to-end tests for the request/response endpoints, driven through the
//! router without binding a socket.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use glosa_server::app;
use glosa_server::config::ServerConfig;
use glosa_server::providers::{FixedCycleFeed, GreatCircleRouter};
use glosa_server::state::AppState;
use serde_json::Value;
use tower::ServiceExt;

fn test_state() -> Arc<AppState> {
    Arc::new(AppState::new(
        ServerConfig::default(),
        Arc::new(GreatCircleRouter::default()),
        Arc::new(FixedCycleFeed::default()),
    ))
}

fn test_app(state: Arc<AppState>) -> Router {
    app(state)
}

fn json_post(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

const ROUTE_REQUEST: &str =
    r#"{"fromLat":51.0308,"fromLon":13.7272,"toLat":51.0306,"toLon":13.7275}"#;

#[tokio::test]
async fn authentication_issues_a_session_token() {
    let response = test_app(test_state())
        .oneshot(json_post("/authentication", r#"{"user":"dev"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let token = body["sessionId"].as_str().unwrap();
    assert!(!token.is_empty());
}

#[tokio::test]
async fn getroute_without_a_session_is_unauthorized() {
    let response = test_app(test_state())
        .oneshot(json_post("/getroute", ROUTE_REQUEST))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn getroute_plans_and_parks_a_route() {
    let state = test_state();
    let token = state.registry.issue();

    let request = Request::builder()
        .method("POST")
        .uri("/getroute")
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-session-id", &token)
        .body(Body::from(ROUTE_REQUEST))
        .unwrap();
    let response = test_app(state.clone()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert!(body["route"].as_array().unwrap().len() >= 1);
    assert!(body["distance"].as_f64().unwrap() > 0.0);
    assert!(body["signalGroups"].as_object().is_some());
    assert!(body["estimatedDuration"].as_u64().unwrap() > 0);

    // the same route is parked for the WebSocket hello to claim
    match state.registry.claim(&token) {
        glosa_server::state::Claim::Claimed(Some(route)) => {
            assert!(route.distance > 0.0);
        }
        _ => panic!("expected a parked route"),
    }
}

#[tokio::test]
async fn getroute_rejects_out_of_range_coordinates() {
    let state = test_state();
    let token = state.registry.issue();

    let request = Request::builder()
        .method("POST")
        .uri("/getroute")
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-session-id", &token)
        .body(Body::from(
            r#"{"fromLat":123.0,"fromLon":13.7272,"toLat":51.0306,"toLon":13.7275}"#,
        ))
        .unwrap();
    let response = test_app(state).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("fromLat"));
}
