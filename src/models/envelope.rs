//! Wire envelopes exchanged over the transport.
//!
//! Outbound traffic is always a [`RequestEnvelope`]. Inbound text is
//! classified by [`parse_inbound`]:
//!
//! | Shape                                  | Classified as            |
//! |----------------------------------------|--------------------------|
//! | object with an integer `id`            | [`Inbound::Response`]    |
//! | object with a string `method`, no `id` | [`Inbound::Event`]       |
//! | any other object                       | [`Inbound::Unroutable`]  |
//! | not JSON, or not an object             | parse error              |

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::{Outcome, RequestError};
use crate::{AppError, Result};

/// Message used when an error object carries no usable `message`.
pub const FALLBACK_ERROR_MESSAGE: &str = "protocol error";

/// Outbound request (client → peer).
#[derive(Debug, Serialize)]
pub struct RequestEnvelope<'a> {
    /// Correlation id.
    pub id: u64,
    /// Remote method name, e.g. `Runtime.evaluate`.
    pub method: &'a str,
    /// Method parameters; always an object on the wire.
    pub params: &'a Value,
}

impl RequestEnvelope<'_> {
    /// Serialize to a single-line JSON string.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Codec` if serialization fails (non-string map keys
    /// cannot occur in a `Value`, so this is not expected in practice).
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| AppError::Codec(format!("failed to serialise request: {e}")))
    }
}

/// Body of a correlated response.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponsePayload {
    /// `result` member, possibly `null`.
    Result(Value),
    /// `error` member.
    Error(ErrorObject),
    /// Neither `result` nor `error` was present.
    Empty,
}

impl ResponsePayload {
    /// Convert into the caller-facing outcome.
    #[must_use]
    pub fn into_outcome(self) -> Outcome {
        match self {
            Self::Result(value) => Ok(value),
            Self::Error(err) => Err(RequestError::Protocol {
                message: err.message,
                code: err.code,
                data: err.data,
            }),
            Self::Empty => Err(RequestError::InvalidResponse),
        }
    }

    fn from_members(members: &mut Map<String, Value>) -> Self {
        // `error` wins when a peer sends both.
        if let Some(error) = members.remove("error") {
            return Self::Error(ErrorObject::from_value(error));
        }
        match members.remove("result") {
            Some(result) => Self::Result(result),
            None => Self::Empty,
        }
    }
}

/// Protocol-level error object carried by a failed response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ErrorObject {
    /// Human-readable message.
    #[serde(default = "fallback_message")]
    pub message: String,
    /// Numeric error code.
    #[serde(default)]
    pub code: Option<i64>,
    /// Extra detail supplied by the peer.
    #[serde(default)]
    pub data: Option<Value>,
}

fn fallback_message() -> String {
    FALLBACK_ERROR_MESSAGE.to_owned()
}

impl ErrorObject {
    /// Interpret an arbitrary `error` member.
    ///
    /// Objects are read field by field; a bare string is taken as the message;
    /// anything else falls back to [`FALLBACK_ERROR_MESSAGE`].
    #[must_use]
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::String(message) => Self {
                message,
                code: None,
                data: None,
            },
            Value::Object(_) => serde_json::from_value(value).unwrap_or_else(|_| Self {
                message: fallback_message(),
                code: None,
                data: None,
            }),
            _ => Self {
                message: fallback_message(),
                code: None,
                data: None,
            },
        }
    }
}

/// A classified inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// Correlated response.
    Response {
        /// Correlation id.
        id: u64,
        /// Result or error body.
        payload: ResponsePayload,
    },
    /// Unsolicited event.
    Event {
        /// Event name, e.g. `Page.loadEventFired`.
        method: String,
        /// Event parameters; `{}` when absent.
        params: Value,
    },
    /// Valid JSON object that is neither a response nor an event.
    Unroutable,
}

/// Parse and classify one inbound payload.
///
/// # Errors
///
/// Returns a parser diagnostic when `raw` is not a JSON object, or when its
/// `id` is an integer that does not fit a correlation id.
pub fn parse_inbound(raw: &str) -> std::result::Result<Inbound, String> {
    let mut members: Map<String, Value> =
        serde_json::from_str(raw).map_err(|e| format!("malformed json: {e}"))?;

    if let Some(id) = members.get("id") {
        if id.is_i64() || id.is_u64() {
            let id = id
                .as_u64()
                .ok_or_else(|| format!("response id out of range: {id}"))?;
            let payload = ResponsePayload::from_members(&mut members);
            return Ok(Inbound::Response { id, payload });
        }
    }

    match members.remove("method") {
        Some(Value::String(method)) => {
            let params = members
                .remove("params")
                .unwrap_or_else(|| Value::Object(Map::new()));
            Ok(Inbound::Event { method, params })
        }
        _ => Ok(Inbound::Unroutable),
    }
}
