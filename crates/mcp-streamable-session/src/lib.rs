//! Session identity, pluggable session persistence, and SSE wire encoding
//! for the MCP Streamable HTTP transport.
//!
//! This crate deliberately stays below the transport engine: it has no
//! notion of a live connection, a pending request, or an event-replay
//! buffer. Those belong to the in-process `Session` aggregate in
//! `mcp-streamable-transport`, which is built on top of the types here.

mod session_id;
mod sse;
mod store;

pub use session_id::{SessionId, MAX_SESSION_ID_LEN};
pub use sse::{SseEncoder, SseEvent, SseEventBuilder};
pub use store::{InMemorySessionStore, SessionData, SessionStore, StoreError};

/// MCP Streamable HTTP header and content-type constants (spec §4.1).
pub mod headers {
    /// Session ID header for tracking stateful connections.
    pub const MCP_SESSION_ID: &str = "Mcp-Session-Id";

    /// Header a resuming client sends with the last SSE event id it saw.
    pub const LAST_EVENT_ID: &str = "Last-Event-ID";

    /// Header naming the negotiated protocol revision (spec §4.1.7).
    pub const MCP_PROTOCOL_VERSION: &str = "MCP-Protocol-Version";

    /// Content-Type for single JSON-RPC responses.
    pub const CONTENT_TYPE_JSON: &str = "application/json";

    /// Content-Type for SSE streams.
    pub const CONTENT_TYPE_SSE: &str = "text/event-stream";

    /// Accept header value requesting an SSE stream.
    pub const ACCEPT_SSE: &str = "text/event-stream";
}
