//! JSON-RPC 2.0 translation shim
//!
//! The second client generation frames the same protocol as JSON-RPC:
//! `Navigation {active}` for start/stop, `PositionUpdate` for fixes, and a
//! `RecommendationUpdate` push from the server. This module converts those
//! frames to and from the canonical envelope at the connection boundary.

use glosa_core::Error;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use super::{Body, Envelope, Hello};

pub const VERSION: &str = "2.0";

/// Application-level protocol failure (distinct from the reserved JSON-RPC
/// parse/request error codes).
const APP_ERROR_CODE: i64 = 4000;

#[derive(Debug, Deserialize)]
struct RpcRequest {
    jsonrpc: String,
    #[serde(default)]
    id: Option<String>,
    method: String,
    #[serde(default)]
    params: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NavigationParams {
    active: bool,
}

/// Dialect sniff for the first inbound frame of a connection.
pub fn looks_like_rpc(raw: &str) -> bool {
    serde_json::from_str::<Value>(raw)
        .map(|value| value.get("jsonrpc").is_some())
        .unwrap_or(false)
}

/// Decode an inbound JSON-RPC frame into a canonical envelope.
pub fn decode(raw: &str) -> Result<Envelope, Error> {
    let request: RpcRequest = serde_json::from_str(raw)
        .map_err(|e| Error::InvalidRequest(format!("malformed json-rpc frame: {e}")))?;
    if request.jsonrpc != VERSION {
        return Err(Error::InvalidRequest(format!(
            "unsupported json-rpc version: {}",
            request.jsonrpc
        )));
    }

    let body = match request.method.as_str() {
        "Hello" => Body::Hello(params(request.params)?),
        "Navigation" => {
            let nav: NavigationParams = params(request.params)?;
            if nav.active { Body::Start } else { Body::Stop }
        }
        "PositionUpdate" => Body::Position(params(request.params)?),
        "Goodbye" => Body::Goodbye,
        other => {
            return Err(Error::InvalidRequest(format!("unknown method: {other}")));
        }
    };

    Ok(Envelope {
        id: request.id.unwrap_or_default(),
        body,
    })
}

fn params<T: DeserializeOwned>(params: Option<Value>) -> Result<T, Error> {
    let value = params.unwrap_or(Value::Null);
    serde_json::from_value(value).map_err(|e| Error::InvalidRequest(format!("bad params: {e}")))
}

/// Encode a canonical outbound envelope as a JSON-RPC frame.
///
/// Acks to `start`/`stop` become the `Navigation` result with the resulting
/// activation state; recommendations become `RecommendationUpdate` pushes
/// without an id.
pub fn encode(envelope: &Envelope) -> String {
    let frame = match &envelope.body {
        Body::Start => result(&envelope.id, json!({"active": true})),
        Body::Stop => result(&envelope.id, json!({"active": false})),
        Body::Hello(Hello { session_id }) => {
            result(&envelope.id, json!({"sessionId": session_id}))
        }
        Body::Goodbye => result(&envelope.id, Value::Null),
        Body::Error(error) => json!({
            "jsonrpc": VERSION,
            "id": envelope.id,
            "error": {"code": APP_ERROR_CODE, "message": error.message},
        }),
        Body::Recommendation(rec) => push("RecommendationUpdate", json!(rec)),
        Body::RouteResponse(route) => push("RouteResponse", json!(route)),
        // client-to-server shapes; encoded only for completeness
        Body::RouteRequest(request) => push("RouteRequest", json!(request)),
        Body::Position(position) => push("PositionUpdate", json!(position)),
    };
    frame.to_string()
}

fn result(id: &str, result: Value) -> Value {
    json!({"jsonrpc": VERSION, "id": id, "result": result})
}

fn push(method: &str, params: Value) -> Value {
    json!({"jsonrpc": VERSION, "method": method, "params": params})
}
