//! The JSON-RPC request identifier.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A JSON-RPC 2.0 request id: a string, a number, or absent (`null`).
///
/// `null` ids only ever show up on the response side (parse errors have no
/// request to correlate with), so they are modeled on [`ResponseId`] rather
/// than here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    /// A string id.
    String(String),
    /// A numeric id. JSON-RPC numbers are not required to be integers, but
    /// every MCP client in practice sends integers, so we store as `i64`.
    Number(i64),
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => write!(f, "{s}"),
            Self::Number(n) => write!(f, "{n}"),
        }
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for RequestId {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for RequestId {
    fn from(n: i64) -> Self {
        Self::Number(n)
    }
}

/// A response id: present on any normal response, `null` only for the
/// transport-level parse errors described in spec §7 class 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResponseId(pub Option<RequestId>);

impl ResponseId {
    /// A response id correlated to a known request.
    pub fn of(id: RequestId) -> Self {
        Self(Some(id))
    }

    /// The `null` id used for responses that precede request parsing.
    pub fn null() -> Self {
        Self(None)
    }

    /// The underlying request id, if any.
    pub fn as_request_id(&self) -> Option<&RequestId> {
        self.0.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_id_round_trips() {
        let id = RequestId::from("abc");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"abc\"");
        assert_eq!(serde_json::from_str::<RequestId>(&json).unwrap(), id);
    }

    #[test]
    fn number_id_round_trips() {
        let id = RequestId::from(42);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "42");
        assert_eq!(serde_json::from_str::<RequestId>(&json).unwrap(), id);
    }

    #[test]
    fn null_response_id_serializes_to_null() {
        let id = ResponseId::null();
        assert_eq!(serde_json::to_string(&id).unwrap(), "null");
    }
}
