//! The external collaborator contract (spec §6.2): an opaque MCP message
//! handler the transport drives, and the `send` hook it drives back.
//!
//! Tool definitions and schema conversion live behind this trait and are
//! out of scope here (spec §1) — this crate only needs to deliver inbound
//! messages and accept outbound ones.

use std::sync::Arc;

use mcp_jsonrpc::Message;
use mcp_streamable_session::SessionId;
use tokio_util::sync::CancellationToken;

use crate::auth::AuthInfo;

/// Per-request context passed explicitly down the call stack instead of
/// being carried as transport instance fields (spec §9 design note, taken
/// up in SPEC_FULL §5: "a clean re-implementation should pass these
/// explicitly through the call stack ... rather than as transport instance
/// state"). Valid only for the lifetime of one `handle_request` call.
#[derive(Clone)]
pub struct RequestContext {
    pub session_id: SessionId,
    pub auth: Option<AuthInfo>,
    pub cancelled: CancellationToken,
    pub protocol_version: String,
}

/// The per-request outbound handle given to a [`MessageHandler`] for the
/// duration of one `on_message` call (spec §4.1.5's `send(message)`).
///
/// Implemented by the transport itself; the handler never constructs one.
#[async_trait::async_trait]
pub trait Outbound: Send + Sync {
    /// Deliver one outbound JSON-RPC message (response, server-initiated
    /// request, or notification) produced while handling the inbound
    /// message this `Outbound` was scoped to.
    async fn send(&self, message: Message);
}

/// The opaque MCP message handler (spec §6.2).
///
/// `on_message` is fire-and-forget from the transport's perspective (spec
/// §5: "awaiting handler.onmessage side effects ... the handler does not
/// await"): the transport does not block request completion on this
/// future resolving, only on the correlated `send()` call the handler
/// eventually makes through `outbound`.
#[async_trait::async_trait]
pub trait MessageHandler: Send + Sync {
    /// Called once before the handler is first used.
    async fn start(&self) {}

    /// Called on transport shutdown.
    async fn close(&self) {}

    /// Deliver one inbound message (request, response-from-client, or
    /// notification) to the handler.
    async fn on_message(&self, message: Message, ctx: RequestContext, outbound: Arc<dyn Outbound>);
}
