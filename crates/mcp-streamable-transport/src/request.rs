//! Framework-agnostic request/response types for [`crate::Transport::handle_request`].
//!
//! Kept deliberately decoupled from any specific web framework, matching
//! the teacher's own separation ("the actual HTTP server implementation
//! lives in `turbomcp_server::runtime::http`" — `streamable_http.rs` module
//! doc). The `mcp-streamable-server` crate is the thin axum adapter that
//! translates to/from these types.

use std::collections::HashMap;
use std::net::IpAddr;

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// The three methods this transport recognizes (spec §4.1.1); anything else
/// is rejected with `405`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Delete,
    Other,
}

/// A normalized inbound HTTP request.
pub struct IncomingRequest {
    pub method: HttpMethod,
    /// Header names are lowercased by the caller before insertion.
    pub headers: HashMap<String, String>,
    pub body: Bytes,
    pub peer_addr: Option<IpAddr>,
    /// Cancelled when the client disconnects (spec §5 `AbortSignal`).
    pub cancelled: CancellationToken,
}

impl IncomingRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }
}

/// The body of an [`OutgoingResponse`].
pub enum ResponseBody {
    /// A single JSON document.
    Json(serde_json::Value),
    /// A live SSE stream; bytes are already SSE-wire-encoded.
    Sse(mpsc::UnboundedReceiver<Bytes>),
    /// No body (e.g. `204`, `202`).
    Empty,
}

/// A normalized outbound HTTP response.
pub struct OutgoingResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: ResponseBody,
}

impl OutgoingResponse {
    pub fn json(status: u16, body: serde_json::Value) -> Self {
        Self {
            status,
            headers: vec![],
            body: ResponseBody::Json(body),
        }
    }

    pub fn empty(status: u16) -> Self {
        Self {
            status,
            headers: vec![],
            body: ResponseBody::Empty,
        }
    }

    pub fn sse(status: u16, rx: mpsc::UnboundedReceiver<Bytes>) -> Self {
        Self {
            status,
            headers: vec![],
            body: ResponseBody::Sse(rx),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}
