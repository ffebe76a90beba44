//! Transport error taxonomy (spec §7).

use mcp_jsonrpc::{error_codes, JsonRpcError, ResponseId};

/// The three error classes spec.md §7 distinguishes, plus the I/O/serde
/// failures any real HTTP boundary has to account for.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("parse error: {0}")]
    Parse(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("batch requests are not supported")]
    BatchRejected,

    #[error("origin not allowed: {0}")]
    OriginRejected(String),

    #[error("unsupported protocol version: {0}")]
    UnsupportedProtocolVersion(String),

    #[error("not acceptable: {0}")]
    NotAcceptable(&'static str),

    #[error("unsupported media type")]
    UnsupportedMediaType,

    #[error("payload too large: {size} bytes exceeds limit of {limit}")]
    PayloadTooLarge { size: usize, limit: usize },

    #[error("session not found: {0}")]
    SessionNotFound(String),

    #[error("session terminated")]
    SessionTerminated,

    #[error("request timed out")]
    RequestTimeout,

    #[error("method not allowed")]
    MethodNotAllowed,

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("session store unavailable: {0}")]
    StoreUnavailable(String),
}

impl TransportError {
    /// Map to the JSON-RPC error code/message pair of spec.md §6.1, as a
    /// JSON-RPC error object with `id: null` (the id is filled in by the
    /// caller when one is known).
    pub fn into_jsonrpc_error(self) -> JsonRpcError {
        match self {
            Self::Parse(msg) => JsonRpcError::new(error_codes::PARSE_ERROR, msg),
            Self::BatchRejected => JsonRpcError::new(
                error_codes::INVALID_REQUEST,
                "Batch requests are not supported",
            ),
            Self::InvalidRequest(msg) => JsonRpcError::new(error_codes::INVALID_REQUEST, msg),
            Self::OriginRejected(_) => JsonRpcError::new(
                error_codes::TRANSPORT_ERROR,
                "Forbidden: Origin not allowed",
            ),
            Self::UnsupportedProtocolVersion(v) => JsonRpcError::new(
                error_codes::INVALID_REQUEST,
                format!("Unsupported protocol version: {v}"),
            ),
            Self::NotAcceptable(msg) => {
                JsonRpcError::new(error_codes::TRANSPORT_ERROR, "Not Acceptable".to_string())
                    .with_data(serde_json::json!({ "detail": msg }))
            }
            Self::UnsupportedMediaType => JsonRpcError::new(
                error_codes::TRANSPORT_ERROR,
                "Unsupported Media Type",
            ),
            Self::PayloadTooLarge { .. } => {
                JsonRpcError::new(error_codes::TRANSPORT_ERROR, "Payload Too Large")
            }
            Self::SessionNotFound(id) => JsonRpcError::new(
                error_codes::TRANSPORT_ERROR,
                format!("Session not found: {id}"),
            ),
            Self::SessionTerminated => {
                JsonRpcError::new(error_codes::TRANSPORT_ERROR, "Session terminated")
            }
            Self::RequestTimeout => {
                JsonRpcError::new(error_codes::REQUEST_TIMEOUT, "Request timed out")
            }
            Self::MethodNotAllowed => {
                JsonRpcError::new(error_codes::TRANSPORT_ERROR, "Method Not Allowed")
            }
            Self::Forbidden(msg) => JsonRpcError::new(error_codes::FORBIDDEN_SCOPE, msg),
            Self::Unauthorized(msg) => JsonRpcError::new(error_codes::TRANSPORT_ERROR, msg),
            Self::Serde(e) => JsonRpcError::new(error_codes::INTERNAL_ERROR, e.to_string()),
            Self::StoreUnavailable(msg) => JsonRpcError::new(error_codes::INTERNAL_ERROR, msg),
        }
    }

    /// The HTTP status this error maps to, per spec.md §6.1's status table.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Parse(_) => 400,
            Self::InvalidRequest(_) => 400,
            Self::BatchRejected => 400,
            Self::OriginRejected(_) => 403,
            Self::UnsupportedProtocolVersion(_) => 400,
            Self::NotAcceptable(_) => 406,
            Self::UnsupportedMediaType => 415,
            Self::PayloadTooLarge { .. } => 413,
            Self::SessionNotFound(_) => 404,
            Self::SessionTerminated => 404,
            Self::RequestTimeout => 408,
            Self::MethodNotAllowed => 405,
            Self::Forbidden(_) => 403,
            Self::Unauthorized(_) => 401,
            Self::Serde(_) => 500,
            Self::StoreUnavailable(_) => 500,
        }
    }

    /// Build the fixed-shape hard-failure body of spec.md §6.1:
    /// `{"jsonrpc":"2.0","error":{...},"id":<id>}`.
    pub fn into_response_body(self, id: ResponseId) -> serde_json::Value {
        let error = self.into_jsonrpc_error();
        serde_json::json!({
            "jsonrpc": "2.0",
            "error": { "code": error.code, "message": error.message },
            "id": id.as_request_id(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_rejected_maps_to_403_and_dash32000() {
        let err = TransportError::OriginRejected("https://evil.example".into());
        assert_eq!(err.status_code(), 403);
        let body = TransportError::OriginRejected("https://evil.example".into())
            .into_jsonrpc_error();
        assert_eq!(body.code, error_codes::TRANSPORT_ERROR);
    }

    #[test]
    fn request_timeout_maps_to_408_and_dash32001() {
        assert_eq!(TransportError::RequestTimeout.status_code(), 408);
        assert_eq!(
            TransportError::RequestTimeout.into_jsonrpc_error().code,
            error_codes::REQUEST_TIMEOUT
        );
    }

    #[test]
    fn batch_rejected_maps_to_400_and_dash32600() {
        assert_eq!(TransportError::BatchRejected.status_code(), 400);
        assert_eq!(
            TransportError::BatchRejected.into_jsonrpc_error().code,
            error_codes::INVALID_REQUEST
        );
    }
}
