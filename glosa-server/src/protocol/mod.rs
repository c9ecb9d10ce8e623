//! Wire protocol
//!
//! The canonical envelope is the flat `{id, type, payload}` message the
//! mobile client speaks. The JSON-RPC client generation is translated to
//! and from this form at the connection boundary by [`jsonrpc`]; the
//! session state machine only ever sees canonical messages.

pub mod jsonrpc;

use glosa_core::model::{Position, Recommendation, Route, RouteRequest};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Message envelope. Request/ack pairs echo `id`; server pushes carry
/// fresh ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub id: String,
    #[serde(flatten)]
    pub body: Body,
}

impl Envelope {
    /// Ack or response paired with an inbound message id.
    pub fn reply(id: impl Into<String>, body: Body) -> Self {
        Self {
            id: id.into(),
            body,
        }
    }

    /// Server-initiated push with a fresh id.
    pub fn push(body: Body) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            body,
        }
    }

    pub fn error(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::reply(
            id,
            Body::Error(ProtocolError {
                message: message.into(),
            }),
        )
    }
}

/// Tagged message body, validated here at the boundary. Payloads carry
/// concrete types; nothing dynamic reaches the state machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "lowercase")]
pub enum Body {
    Hello(Hello),
    Start,
    Stop,
    RouteRequest(RouteRequest),
    RouteResponse(Box<Route>),
    Position(Position),
    Recommendation(Box<Recommendation>),
    Goodbye,
    Error(ProtocolError),
}

/// Handshake payload: the token issued by `POST /authentication`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hello {
    pub session_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolError {
    pub message: String,
}

/// Parse a canonical frame.
pub fn decode(raw: &str) -> Result<Envelope, glosa_core::Error> {
    serde_json::from_str(raw)
        .map_err(|e| glosa_core::Error::InvalidRequest(format!("malformed message: {e}")))
}

/// Serialize a canonical frame.
pub fn encode(envelope: &Envelope) -> String {
    // all payload types serialize infallibly (string keys, no custom ser)
    serde_json::to_string(envelope).expect("envelope serialization cannot fail")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_messages_round_trip() {
        for (raw, body) in [
            (r#"{"id":"1","type":"start","payload":null}"#, Body::Start),
            (r#"{"id":"2","type":"stop","payload":null}"#, Body::Stop),
            (r#"{"id":"3","type":"goodbye","payload":null}"#, Body::Goodbye),
        ] {
            let envelope = decode(raw).unwrap();
            assert_eq!(envelope.body, body);
            let echoed = decode(&encode(&envelope)).unwrap();
            assert_eq!(echoed, envelope);
        }
    }

    #[test]
    fn hello_carries_the_session_token() {
        let envelope =
            decode(r#"{"id":"1","type":"hello","payload":{"sessionId":"abc"}}"#).unwrap();
        assert_eq!(
            envelope.body,
            Body::Hello(Hello {
                session_id: "abc".into()
            })
        );
    }

    #[test]
    fn position_payload_is_typed() {
        let envelope = decode(
            r#"{"id":"9","type":"position","payload":{"lat":51.0306,"lon":13.7273,"speed":5.0}}"#,
        )
        .unwrap();
        match envelope.body {
            Body::Position(p) => {
                assert_eq!(p.lat, 51.0306);
                assert_eq!(p.speed, 5.0);
            }
            other => panic!("unexpected body: {other:?}"),
        }
    }

    #[test]
    fn route_request_uses_flat_wire_name() {
        let envelope = decode(
            r#"{"id":"4","type":"routerequest","payload":{"fromLat":51.0308,"fromLon":13.7272,"toLat":51.0306,"toLon":13.7275}}"#,
        )
        .unwrap();
        assert!(matches!(envelope.body, Body::RouteRequest(_)));
    }

    #[test]
    fn unknown_type_is_rejected() {
        assert!(decode(r#"{"id":"1","type":"teleport","payload":null}"#).is_err());
        assert!(decode("not json").is_err());
    }

    #[test]
    fn recommendation_push_serializes_payload_inline() {
        let envelope = Envelope::push(Body::Recommendation(Box::new(
            Recommendation::failure(&glosa_core::Error::EndOfRoute),
        )));
        let value: serde_json::Value = serde_json::from_str(&encode(&envelope)).unwrap();
        assert_eq!(value["type"], "recommendation");
        assert_eq!(value["payload"]["error"], true);
        assert_eq!(value["payload"]["errorMessage"], "end of route");
        assert!(value["id"].as_str().is_some());
    }
}
