//! JSON-RPC 2.0 request, response, notification and error types.
//!
//! Batching (JSON-RPC arrays) is rejected at the transport boundary per the
//! 2025-06-18 revision this crate targets; these types only ever describe a
//! single message.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::id::{RequestId, ResponseId};

/// The fixed `"jsonrpc": "2.0"` version marker.
///
/// Serializes to the literal string `"2.0"` and fails to deserialize any
/// other value, so a malformed `jsonrpc` field surfaces as a parse error
/// rather than silently being accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct V2;

impl Serialize for V2 {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str("2.0")
    }
}

impl<'de> Deserialize<'de> for V2 {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        if s == "2.0" {
            Ok(V2)
        } else {
            Err(serde::de::Error::custom(format!(
                "unsupported jsonrpc version: {s}"
            )))
        }
    }
}

/// A client- or server-initiated JSON-RPC request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub jsonrpc: V2,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    pub id: RequestId,
}

impl Request {
    pub fn new(method: impl Into<String>, params: Option<Value>, id: RequestId) -> Self {
        Self {
            jsonrpc: V2,
            method: method.into(),
            params,
            id,
        }
    }
}

/// A one-way JSON-RPC notification; no response is ever sent for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub jsonrpc: V2,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

/// The well-known `notifications/initialized` method name.
pub const INITIALIZED_NOTIFICATION: &str = "notifications/initialized";
/// The `initialize` request method name.
pub const INITIALIZE_METHOD: &str = "initialize";

/// A JSON-RPC error object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// Standard and MCP-transport-specific JSON-RPC error codes (spec §6.1).
pub mod error_codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;
    /// Generic transport / session error (unknown session, terminated session, ...).
    pub const TRANSPORT_ERROR: i32 = -32000;
    /// Request timed out before the handler produced a response.
    pub const REQUEST_TIMEOUT: i32 = -32001;
    /// Caller lacked a required auth scope.
    pub const FORBIDDEN_SCOPE: i32 = -32002;
}

/// Either a successful result or an error — never both, per JSON-RPC 2.0.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponsePayload {
    Success { result: Value },
    Error { error: JsonRpcError },
}

/// A JSON-RPC response to a single [`Request`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub jsonrpc: V2,
    #[serde(flatten)]
    pub payload: ResponsePayload,
    pub id: ResponseId,
}

impl Response {
    pub fn success(id: RequestId, result: Value) -> Self {
        Self {
            jsonrpc: V2,
            payload: ResponsePayload::Success { result },
            id: ResponseId::of(id),
        }
    }

    pub fn error(id: ResponseId, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: V2,
            payload: ResponsePayload::Error { error },
            id,
        }
    }

    /// Build the `{"error": {code, message}, "id": null}` shape used for
    /// transport-level failures that occur before a request id is known.
    pub fn transport_error(code: i32, message: impl Into<String>) -> Self {
        Self::error(ResponseId::null(), JsonRpcError::new(code, message))
    }

    pub fn is_error(&self) -> bool {
        matches!(self.payload, ResponsePayload::Error { .. })
    }
}

/// The three shapes a single (non-batch) inbound JSON-RPC payload may take.
///
/// Classification drives transport dispatch (spec §4.1.3): a `Request`
/// expects a correlated reply, a `Response` is a client reply to a
/// server-initiated request, and a `Notification` never gets a reply.
#[derive(Debug, Clone)]
pub enum Message {
    Request(Request),
    Response(Response),
    Notification(Notification),
}

/// Error produced when a raw JSON value is not a valid single JSON-RPC message.
#[derive(Debug, thiserror::Error)]
#[error("not a valid JSON-RPC message: {0}")]
pub struct InvalidMessage(pub String);

impl Message {
    /// Classify a parsed JSON value as a request, response, or notification.
    ///
    /// Batches (JSON arrays) must be rejected by the caller before this is
    /// invoked; this function only ever sees a single JSON object.
    pub fn from_value(value: Value) -> Result<Self, InvalidMessage> {
        let obj = value
            .as_object()
            .ok_or_else(|| InvalidMessage("expected a JSON object".to_string()))?;

        let has_method = obj.contains_key("method");
        let has_id = obj.contains_key("id");
        let has_result_or_error = obj.contains_key("result") || obj.contains_key("error");

        if has_method && has_id {
            let req: Request = serde_json::from_value(value)
                .map_err(|e| InvalidMessage(format!("invalid request: {e}")))?;
            Ok(Self::Request(req))
        } else if has_method {
            let notif: Notification = serde_json::from_value(value)
                .map_err(|e| InvalidMessage(format!("invalid notification: {e}")))?;
            Ok(Self::Notification(notif))
        } else if has_result_or_error {
            let resp: Response = serde_json::from_value(value)
                .map_err(|e| InvalidMessage(format!("invalid response: {e}")))?;
            Ok(Self::Response(resp))
        } else {
            Err(InvalidMessage(
                "message has neither method, result, nor error".to_string(),
            ))
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Self::Request(r) => serde_json::to_value(r),
            Self::Response(r) => serde_json::to_value(r),
            Self::Notification(n) => serde_json::to_value(n),
        }
        .expect("jsonrpc message types are always representable as JSON")
    }
}
