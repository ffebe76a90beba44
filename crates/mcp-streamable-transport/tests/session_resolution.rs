//! Regression coverage for two session-resolution scoping bugs (spec.md
//! §4.1.3): the `MCP-Protocol-Version` check must be skipped entirely
//! outside stateful mode, and a `SessionStore` failure must surface as a
//! 5xx rather than being folded into "session not found".

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use mcp_jsonrpc::Message;
use mcp_streamable_session::{SessionData, SessionId, SessionStore, StoreError};
use mcp_streamable_transport::{
    HttpMethod, IncomingRequest, MessageHandler, Outbound, RequestContext, Transport,
    TransportConfigBuilder,
};
use tokio_util::sync::CancellationToken;

struct SilentHandler;

#[async_trait]
impl MessageHandler for SilentHandler {
    async fn on_message(&self, _message: Message, _ctx: RequestContext, _outbound: Arc<dyn Outbound>) {}
}

fn post_request(body: serde_json::Value, extra_headers: &[(&str, &str)]) -> IncomingRequest {
    let mut headers = HashMap::new();
    headers.insert("accept".to_string(), "application/json, text/event-stream".to_string());
    headers.insert("content-type".to_string(), "application/json".to_string());
    for (name, value) in extra_headers {
        headers.insert(name.to_ascii_lowercase(), value.to_string());
    }
    IncomingRequest {
        method: HttpMethod::Post,
        headers,
        body: Bytes::from(serde_json::to_vec(&body).unwrap()),
        peer_addr: None,
        cancelled: CancellationToken::new(),
    }
}

/// Stateless mode never checks `MCP-Protocol-Version` (spec.md §4.1.3: "non-
/// initialize, stateful only"); an unrecognized value must not be rejected.
#[tokio::test]
async fn stateless_post_ignores_unrecognized_protocol_version() {
    let transport = Transport::new(TransportConfigBuilder::new().build(), Arc::new(SilentHandler));

    let req = post_request(
        serde_json::json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
        &[("mcp-protocol-version", "not-a-real-version")],
    );

    let resp = transport.handle_request(req).await;
    assert_eq!(resp.status, 202);
}

/// A `SessionStore` that always fails, to distinguish an infra error from a
/// genuinely unknown session.
struct FailingStore;

#[async_trait]
impl SessionStore for FailingStore {
    async fn get(&self, _id: &SessionId) -> Result<Option<SessionData>, StoreError> {
        Err(StoreError("backend unreachable".to_string()))
    }

    async fn set(&self, _data: SessionData, _ttl: Duration) -> Result<(), StoreError> {
        Err(StoreError("backend unreachable".to_string()))
    }

    async fn delete(&self, _id: &SessionId) -> Result<(), StoreError> {
        Err(StoreError("backend unreachable".to_string()))
    }
}

/// A store error on lookup must surface as a 5xx, not be folded into the
/// 404 "session not found" path (spec.md §4.2: the store is a pluggable
/// abstraction; a backend hiccup is not the same as session expiry).
#[tokio::test]
async fn store_failure_on_lookup_is_not_reported_as_session_not_found() {
    let config = TransportConfigBuilder::new()
        .stateful(true)
        .with_session_store(Arc::new(FailingStore))
        .build();
    let transport = Transport::new(config, Arc::new(SilentHandler));

    let req = post_request(
        serde_json::json!({"jsonrpc": "2.0", "id": 1, "method": "tools/call"}),
        &[("mcp-session-id", "mcp-deadbeefdeadbeefdeadbeefdeadbeef")],
    );

    let resp = transport.handle_request(req).await;
    assert_eq!(resp.status, 500);
}

/// The ordinary case still 404s when the store genuinely has nothing for
/// that id (distinguishing this from the failure case above).
#[tokio::test]
async fn missing_session_in_working_store_is_404() {
    let transport = Transport::new(
        TransportConfigBuilder::new().stateful(true).build(),
        Arc::new(SilentHandler),
    );

    let req = post_request(
        serde_json::json!({"jsonrpc": "2.0", "id": 1, "method": "tools/call"}),
        &[("mcp-session-id", "mcp-deadbeefdeadbeefdeadbeefdeadbeef")],
    );

    let resp = transport.handle_request(req).await;
    assert_eq!(resp.status, 404);
}
