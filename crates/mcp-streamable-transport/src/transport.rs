//! The `Transport` engine: method dispatch and the POST/GET/DELETE
//! pipelines of spec §4.1.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use mcp_jsonrpc::{
    error_codes, JsonRpcError, Message, Notification, Request, RequestId, Response, ResponseId,
};
use mcp_streamable_session::{headers, SessionData, SessionId};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::auth::{AuthMiddleware, AuthOutcome};
use crate::config::TransportConfig;
use crate::error::TransportError;
use crate::handler::{MessageHandler, Outbound, RequestContext};
use crate::origin::validate_origin;
use crate::request::{HttpMethod, IncomingRequest, OutgoingResponse, ResponseBody};
use crate::session::{PendingRequest, Session, SseStream, Waiter};

/// Protocol versions this transport recognizes (spec §6.1 negotiation).
const SUPPORTED_PROTOCOL_VERSIONS: &[&str] = &["2024-11-05", "2025-03-26", "2025-06-18"];
const DEFAULT_PROTOCOL_VERSION: &str = "2025-03-26";

/// The streamable HTTP transport engine.
///
/// Owns no HTTP server of its own — [`Transport::handle_request`] is a plain
/// async function from [`IncomingRequest`] to [`OutgoingResponse`] that any
/// web framework adapter (`mcp-streamable-server`'s axum layer) can call.
pub struct Transport {
    config: TransportConfig,
    handler: Arc<dyn MessageHandler>,
    auth: Option<Arc<AuthMiddleware>>,
    /// Live in-process `Session` aggregates, keyed by id. In stateless mode
    /// this map is never populated; every request gets an ephemeral Session
    /// discarded once the response is sent (spec §3).
    live_sessions: Arc<DashMap<SessionId, Arc<Session>>>,
    /// Per-session TTL tasks mirroring `InMemorySessionStore`'s own timer,
    /// but driving eviction from `live_sessions` (the store's TTL governs
    /// `SessionData` persistence; this one governs the in-process aggregate).
    ttl_tasks: Arc<DashMap<SessionId, JoinHandle<()>>>,
    event_id_with_history: bool,
    /// Monotonic counter used only to mint ephemeral SSE stream ids.
    stream_id_counter: AtomicU64,
}

impl Transport {
    pub fn new(config: TransportConfig, handler: Arc<dyn MessageHandler>) -> Self {
        let event_id_with_history = config.enable_resumability;
        Self {
            config,
            handler,
            auth: None,
            live_sessions: Arc::new(DashMap::new()),
            ttl_tasks: Arc::new(DashMap::new()),
            event_id_with_history,
            stream_id_counter: AtomicU64::new(0),
        }
    }

    pub fn with_auth(mut self, auth: AuthMiddleware) -> Self {
        self.auth = Some(Arc::new(auth));
        self
    }

    pub async fn start(&self) {
        self.handler.start().await;
    }

    /// Terminate every live session and notify the handler (spec §3).
    pub async fn shutdown(&self) {
        for entry in self.live_sessions.iter() {
            entry.value().terminate();
        }
        self.live_sessions.clear();
        for entry in self.ttl_tasks.iter() {
            entry.value().abort();
        }
        self.ttl_tasks.clear();
        self.handler.close().await;
    }

    fn next_stream_id(&self) -> String {
        let n = self.stream_id_counter.fetch_add(1, Ordering::Relaxed);
        format!("stream-{n}")
    }

    /// (Re)arm the in-process session TTL (stateful only): aborts any prior
    /// timer for this id and schedules eviction from `live_sessions` after
    /// `session_timeout` of inactivity. Mirrors `InMemorySessionStore::set`'s
    /// own abort-then-respawn idiom.
    fn arm_session_ttl(&self, id: SessionId) {
        let live_sessions = self.live_sessions.clone();
        let ttl = self.config.session_timeout;
        let expiry_id = id.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            if let Some((_, session)) = live_sessions.remove(&expiry_id) {
                session.terminate();
                tracing::debug!(session = %expiry_id, "session idle timeout, terminated");
            }
        });
        if let Some((_, old)) = self.ttl_tasks.insert(id, task) {
            old.abort();
        }
    }

    /// Entry point: dispatch on HTTP method after origin and auth checks
    /// common to all three (spec §4.1.1, §4.1.2, §4.3).
    pub async fn handle_request(&self, req: IncomingRequest) -> OutgoingResponse {
        if !validate_origin(
            req.header("origin"),
            &self.config.allowed_origins,
            self.config.allow_any_origin,
        ) {
            let origin = req.header("origin").unwrap_or("").to_string();
            tracing::warn!(%origin, "rejected request: origin not allowed");
            return self.hard_error(TransportError::OriginRejected(origin), ResponseId::null());
        }

        let auth_info = match &self.auth {
            Some(auth) => match auth.authenticate(req.header("authorization")).await {
                AuthOutcome::Authenticated(info) => Some(info),
                AuthOutcome::Unauthorized(msg) => {
                    return self
                        .hard_error(TransportError::Unauthorized(msg), ResponseId::null())
                        .with_header("WWW-Authenticate", format!("Bearer realm=\"{}\"", auth.realm));
                }
                AuthOutcome::Forbidden(msg) => {
                    return self.hard_error(TransportError::Forbidden(msg), ResponseId::null());
                }
            },
            None => None,
        };

        match req.method {
            HttpMethod::Post => self.handle_post(req, auth_info).await,
            HttpMethod::Get => self.handle_get(req, auth_info).await,
            HttpMethod::Delete => self.handle_delete(req).await,
            HttpMethod::Other => OutgoingResponse::empty(405).with_header("Allow", "GET, POST, DELETE"),
        }
    }

    fn hard_error(&self, err: TransportError, id: ResponseId) -> OutgoingResponse {
        let status = err.status_code();
        OutgoingResponse::json(status, err.into_response_body(id))
    }

    /// Echo the session's negotiated protocol version back on the response
    /// (spec §4.1 — once a session has negotiated a version, every response
    /// scoped to it carries `Mcp-Protocol-Version`, not just requests that
    /// validate it on the way in).
    fn with_negotiated_version(&self, resp: OutgoingResponse, session: &Session) -> OutgoingResponse {
        resp.with_header(headers::MCP_PROTOCOL_VERSION, session.protocol_version())
    }

    // ---- POST (spec §4.1.3) ----------------------------------------------

    async fn handle_post(
        &self,
        req: IncomingRequest,
        auth: Option<crate::auth::AuthInfo>,
    ) -> OutgoingResponse {
        let accept = req.header("accept").unwrap_or("");
        if !(accept.contains("application/json") && accept.contains(headers::ACCEPT_SSE)) {
            return self.hard_error(
                TransportError::NotAcceptable(
                    "Accept header must include application/json and text/event-stream",
                ),
                ResponseId::null(),
            );
        }

        let content_type = req.header("content-type").unwrap_or("");
        if !content_type.contains(headers::CONTENT_TYPE_JSON) {
            return self.hard_error(TransportError::UnsupportedMediaType, ResponseId::null());
        }

        if req.body.len() > self.config.max_body_size {
            return self.hard_error(
                TransportError::PayloadTooLarge {
                    size: req.body.len(),
                    limit: self.config.max_body_size,
                },
                ResponseId::null(),
            );
        }

        let value: serde_json::Value = match serde_json::from_slice(&req.body) {
            Ok(v) => v,
            Err(e) => {
                return self.hard_error(TransportError::Parse(e.to_string()), ResponseId::null());
            }
        };

        if value.is_array() {
            return self.hard_error(TransportError::BatchRejected, ResponseId::null());
        }

        let message = match Message::from_value(value) {
            Ok(m) => m,
            Err(e) => {
                return self.hard_error(TransportError::InvalidRequest(e.0), ResponseId::null());
            }
        };

        let is_initialize = matches!(&message, Message::Request(r) if r.method == mcp_jsonrpc::INITIALIZE_METHOD);

        let session = match self.resolve_post_session(&req, is_initialize).await {
            Ok(session) => session,
            Err(resp) => return resp,
        };
        session.touch();
        if self.config.stateful {
            self.arm_session_ttl(session.id.clone());
        }

        if !is_initialize && self.config.stateful {
            if let Some(resp) = self.check_protocol_version(&req, &session) {
                return self.with_negotiated_version(resp, &session);
            }
        }

        let ctx = RequestContext {
            session_id: session.id.clone(),
            auth,
            cancelled: req.cancelled.clone(),
            protocol_version: session.protocol_version(),
        };

        let resp = match message {
            Message::Notification(n) => self.deliver_notification(n, session.clone(), ctx).await,
            Message::Response(r) => self.deliver_response_from_client(r, session.clone(), ctx).await,
            Message::Request(r) => self.deliver_request(r, session.clone(), ctx).await,
        };
        self.with_negotiated_version(resp, &session)
    }

    /// Resolve (and where needed, create or rehydrate) the session a POST
    /// body applies to (spec §4.1.3 "Session resolution" and §4.1.7).
    async fn resolve_post_session(
        &self,
        req: &IncomingRequest,
        is_initialize: bool,
    ) -> Result<Arc<Session>, OutgoingResponse> {
        let header_id = req
            .header(headers::MCP_SESSION_ID)
            .and_then(|s| SessionId::try_from_str(s.to_string()));

        if is_initialize {
            if self.config.stateful {
                if let Some(ref id) = header_id {
                    if let Some((_, old)) = self.live_sessions.remove(id) {
                        old.terminate();
                    }
                    let _ = self.config.session_store.delete(id).await;
                }
                let id = SessionId::new();
                let session = Session::new(id.clone(), DEFAULT_PROTOCOL_VERSION.to_string());
                session.mark_initializing();
                self.live_sessions.insert(id.clone(), session.clone());
                let _ = self
                    .config
                    .session_store
                    .set(
                        SessionData::new(id, DEFAULT_PROTOCOL_VERSION.to_string()),
                        self.config.session_timeout,
                    )
                    .await;
                return Ok(session);
            }

            let id = header_id.unwrap_or_else(SessionId::new);
            let session = Session::new(id, DEFAULT_PROTOCOL_VERSION.to_string());
            session.mark_initializing();
            return Ok(session);
        }

        if self.config.stateful {
            let Some(id) = header_id else {
                return Err(self.hard_error(
                    TransportError::InvalidRequest("missing Mcp-Session-Id header".to_string()),
                    ResponseId::null(),
                ));
            };

            if let Some(session) = self.live_sessions.get(&id) {
                return Ok(session.clone());
            }

            match self.config.session_store.get(&id).await {
                Ok(Some(data)) => {
                    let session = Session::new(data.id.clone(), data.protocol_version.clone());
                    if data.initialized {
                        session.mark_initialized();
                    }
                    self.live_sessions.insert(id.clone(), session.clone());
                    Ok(session)
                }
                Ok(None) => Err(self.hard_error(
                    TransportError::SessionNotFound(id.to_string()),
                    ResponseId::null(),
                )),
                Err(e) => Err(self.hard_error(
                    TransportError::StoreUnavailable(e.to_string()),
                    ResponseId::null(),
                )),
            }
        } else {
            let id = header_id.unwrap_or_else(SessionId::new);
            let session = Session::new(id, DEFAULT_PROTOCOL_VERSION.to_string());
            session.mark_initialized();
            Ok(session)
        }
    }

    /// Spec §4.1.3 protocol-version negotiation: header defaults to
    /// `2025-03-26` when absent, rejected with `400` when unrecognized.
    fn check_protocol_version(&self, req: &IncomingRequest, session: &Session) -> Option<OutgoingResponse> {
        let version = req
            .header(headers::MCP_PROTOCOL_VERSION)
            .unwrap_or(DEFAULT_PROTOCOL_VERSION);

        if !SUPPORTED_PROTOCOL_VERSIONS.contains(&version) {
            return Some(self.hard_error(
                TransportError::UnsupportedProtocolVersion(version.to_string()),
                ResponseId::null(),
            ));
        }
        session.set_protocol_version(version);
        None
    }

    async fn deliver_notification(
        &self,
        notif: Notification,
        session: Arc<Session>,
        ctx: RequestContext,
    ) -> OutgoingResponse {
        if notif.method == mcp_jsonrpc::INITIALIZED_NOTIFICATION {
            session.mark_initialized();
            if self.config.stateful {
                let _ = self
                    .config
                    .session_store
                    .set(
                        SessionData {
                            id: session.id.clone(),
                            initialized: true,
                            protocol_version: session.protocol_version(),
                            last_activity_ms: session.last_activity_ms(),
                        },
                        self.config.session_timeout,
                    )
                    .await;
            }
        }

        let outbound = Arc::new(NullOutbound);
        let handler = self.handler.clone();
        tokio::spawn(async move {
            handler
                .on_message(Message::Notification(notif), ctx, outbound)
                .await;
        });

        self.accepted_response(&session)
    }

    async fn deliver_response_from_client(
        &self,
        resp: Response,
        session: Arc<Session>,
        ctx: RequestContext,
    ) -> OutgoingResponse {
        let outbound = Arc::new(NullOutbound);
        let handler = self.handler.clone();
        tokio::spawn(async move {
            handler
                .on_message(Message::Response(resp), ctx, outbound)
                .await;
        });

        self.accepted_response(&session)
    }

    fn accepted_response(&self, session: &Session) -> OutgoingResponse {
        OutgoingResponse::empty(202).with_header(headers::MCP_SESSION_ID, session.id.to_string())
    }

    async fn deliver_request(
        &self,
        request: Request,
        session: Arc<Session>,
        ctx: RequestContext,
    ) -> OutgoingResponse {
        let request_id = request.id.clone();
        let cancelled = ctx.cancelled.clone();

        if self.config.enable_json_response {
            let (tx, rx) = tokio::sync::oneshot::channel();
            let pending = Arc::new(PendingRequest::new(
                request_id.clone(),
                session.id.clone(),
                Waiter::Json(tx),
            ));
            session.register_pending(pending);
            // No `arm_timeout` call here: the `select!` below owns the one
            // timeout mechanism for this branch (its own sleep arm), so the
            // 408 status stays deterministic instead of racing a second
            // timer that resolves the same pending request with 200+error.

            let outbound = Arc::new(TransportOutbound {
                session: session.clone(),
                pending_request_id: Some(request_id.clone()),
                current_stream: None,
                stateful: self.config.stateful,
                resumability: self.config.enable_resumability,
            });
            let handler = self.handler.clone();
            tokio::spawn(async move {
                handler
                    .on_message(Message::Request(request), ctx, outbound)
                    .await;
            });

            tokio::select! {
                res = rx => match res {
                    Ok(response) => {
                        OutgoingResponse::json(200, serde_json::to_value(&response).unwrap_or_default())
                            .with_header(headers::MCP_SESSION_ID, session.id.to_string())
                    }
                    Err(_) => self.hard_error(TransportError::SessionTerminated, ResponseId::of(request_id)),
                },
                () = cancelled.cancelled() => {
                    // Client disconnected (spec §5 AbortSignal): drop the
                    // pending entry and abort its timer; there is no one
                    // left to deliver a response to.
                    if let Some(p) = session.take_pending(&request_id) {
                        p.take_waiter();
                    }
                    OutgoingResponse::empty(499)
                }
                () = tokio::time::sleep(self.config.request_timeout) => {
                    // Either way the pending entry may already be gone
                    // (resolved through another path) — only emit -32001 if
                    // we're still the one holding it.
                    if let Some(p) = session.take_pending(&request_id) {
                        let err_resp = Response::error(
                            ResponseId::of(request_id),
                            JsonRpcError::new(error_codes::REQUEST_TIMEOUT, "Request timed out"),
                        );
                        session.resolve_pending(&p, err_resp.clone(), false);
                        OutgoingResponse::json(408, serde_json::to_value(&err_resp).unwrap_or_default())
                            .with_header(headers::MCP_SESSION_ID, session.id.to_string())
                    } else {
                        self.hard_error(TransportError::RequestTimeout, ResponseId::of(request_id))
                    }
                }
            }
        } else {
            let (tx, rx) = mpsc::unbounded_channel();
            let stream = Arc::new(SseStream::new(self.next_stream_id(), tx, false));
            let pending = Arc::new(PendingRequest::new(
                request_id.clone(),
                session.id.clone(),
                Waiter::Stream(stream.clone()),
            ));
            session.register_pending(pending.clone());
            self.arm_timeout(&session, pending);

            // Spec §5: honor client disconnect by dropping the pending entry
            // and closing the ephemeral POST stream; this runs independently
            // of the handler task so it fires even if the handler never
            // calls `send()`. Holds only a `Weak` reference to the stream:
            // a strong one here would keep it alive forever on the happy
            // path, since the cancellation this task waits on is itself
            // only signaled once the stream's last strong reference drops
            // and its body finishes (see `mcp-streamable-server`'s
            // `CancelOnDrop`).
            let watch_session = session.clone();
            let watch_stream = Arc::downgrade(&stream);
            let watch_request_id = request_id.clone();
            let watch_cancelled = cancelled.clone();
            tokio::spawn(async move {
                watch_cancelled.cancelled().await;
                if let Some(p) = watch_session.take_pending(&watch_request_id) {
                    p.take_waiter();
                }
                if let Some(stream) = watch_stream.upgrade() {
                    stream.close();
                }
            });

            let outbound = Arc::new(TransportOutbound {
                session: session.clone(),
                pending_request_id: Some(request_id),
                current_stream: Some(stream),
                stateful: self.config.stateful,
                resumability: self.config.enable_resumability,
            });
            let handler = self.handler.clone();
            tokio::spawn(async move {
                handler
                    .on_message(Message::Request(request), ctx, outbound)
                    .await;
            });

            OutgoingResponse::sse(200, rx)
                .with_header("Content-Type", headers::CONTENT_TYPE_SSE)
                .with_header("Cache-Control", "no-cache, no-transform")
                .with_header(headers::MCP_SESSION_ID, session.id.to_string())
        }
    }

    /// Arm the `requestTimeout` timer for one pending request (spec §4.1.3,
    /// §9 "requestTimeout" design note). On expiry, resolves the request
    /// with a `-32001` error through whichever waiter it still holds.
    fn arm_timeout(&self, session: &Arc<Session>, pending: Arc<PendingRequest>) {
        let timeout = self.config.request_timeout;
        let session = session.clone();
        let request_id = pending.request_id.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            if let Some(p) = session.take_pending(&request_id) {
                let response = Response::error(
                    ResponseId::of(request_id),
                    JsonRpcError::new(error_codes::REQUEST_TIMEOUT, "Request timed out"),
                );
                session.resolve_pending(&p, response, false);
            }
        });
        pending.arm_timeout(task);
    }

    // ---- GET (spec §4.1.4) ------------------------------------------------

    async fn handle_get(
        &self,
        req: IncomingRequest,
        _auth: Option<crate::auth::AuthInfo>,
    ) -> OutgoingResponse {
        let accept = req.header("accept").unwrap_or("");
        if !accept.contains(headers::ACCEPT_SSE) {
            return self.hard_error(
                TransportError::NotAcceptable("Accept header must include text/event-stream"),
                ResponseId::null(),
            );
        }

        let header_id = req
            .header(headers::MCP_SESSION_ID)
            .and_then(|s| SessionId::try_from_str(s.to_string()));

        let session = if self.config.stateful {
            let Some(id) = header_id else {
                return self.hard_error(
                    TransportError::InvalidRequest("missing Mcp-Session-Id header".to_string()),
                    ResponseId::null(),
                );
            };
            match self.live_sessions.get(&id) {
                Some(s) => s.clone(),
                None => match self.config.session_store.get(&id).await {
                    Ok(Some(data)) => {
                        let session = Session::new(data.id.clone(), data.protocol_version.clone());
                        if data.initialized {
                            session.mark_initialized();
                        }
                        self.live_sessions.insert(id.clone(), session.clone());
                        session
                    }
                    Ok(None) => {
                        return self
                            .hard_error(TransportError::SessionNotFound(id.to_string()), ResponseId::null())
                    }
                    Err(e) => {
                        return self.hard_error(
                            TransportError::StoreUnavailable(e.to_string()),
                            ResponseId::null(),
                        )
                    }
                },
            }
        } else {
            let Some(id) = header_id else {
                return self.hard_error(
                    TransportError::InvalidRequest("missing Mcp-Session-Id header".to_string()),
                    ResponseId::null(),
                );
            };
            let session = Session::new(id, DEFAULT_PROTOCOL_VERSION.to_string());
            session.mark_initialized();
            session
        };
        session.touch();
        if self.config.stateful {
            self.arm_session_ttl(session.id.clone());
            let _ = self
                .config
                .session_store
                .set(
                    SessionData {
                        id: session.id.clone(),
                        initialized: session.is_initialized(),
                        protocol_version: session.protocol_version(),
                        last_activity_ms: session.last_activity_ms(),
                    },
                    self.config.session_timeout,
                )
                .await;
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let with_history = self.config.stateful && self.event_id_with_history;
        let stream = Arc::new(SseStream::new(self.next_stream_id(), tx, with_history));

        if self.config.stateful && self.config.enable_resumability {
            if let Some(last_id) = req
                .header(headers::LAST_EVENT_ID)
                .and_then(|s| s.parse::<u64>().ok())
            {
                for (event_id, message_json) in session.replay_after(last_id) {
                    stream.push_and_send(event_id, message_json, true);
                }
            }
        }

        session.register_stream(stream.clone());

        // Close and deregister this GET stream on client disconnect (spec
        // §4.1.4 "Close the stream on abort or session termination").
        let watch_session = session.clone();
        let watch_stream_id = stream.id.clone();
        let watch_cancelled = req.cancelled.clone();
        tokio::spawn(async move {
            watch_cancelled.cancelled().await;
            if let Some(s) = watch_session.remove_stream(&watch_stream_id) {
                s.close();
            }
        });

        let resp = OutgoingResponse::sse(200, rx)
            .with_header("Content-Type", headers::CONTENT_TYPE_SSE)
            .with_header("Cache-Control", "no-cache, no-transform")
            .with_header(headers::MCP_SESSION_ID, session.id.to_string());
        self.with_negotiated_version(resp, &session)
    }

    // ---- DELETE -------------------------------------------------------------

    async fn handle_delete(&self, req: IncomingRequest) -> OutgoingResponse {
        let header_id = req
            .header(headers::MCP_SESSION_ID)
            .and_then(|s| SessionId::try_from_str(s.to_string()));

        let Some(id) = header_id else {
            return self.hard_error(
                TransportError::InvalidRequest("missing Mcp-Session-Id header".to_string()),
                ResponseId::null(),
            );
        };

        if !self.config.stateful {
            return self.hard_error(TransportError::MethodNotAllowed, ResponseId::null());
        }

        match self.live_sessions.remove(&id) {
            Some((_, session)) => {
                let version = session.protocol_version();
                session.terminate();
                if let Some((_, task)) = self.ttl_tasks.remove(&id) {
                    task.abort();
                }
                let _ = self.config.session_store.delete(&id).await;
                OutgoingResponse::empty(204).with_header(headers::MCP_PROTOCOL_VERSION, version)
            }
            None => match self.config.session_store.get(&id).await {
                Ok(Some(data)) => {
                    let _ = self.config.session_store.delete(&id).await;
                    OutgoingResponse::empty(204)
                        .with_header(headers::MCP_PROTOCOL_VERSION, data.protocol_version)
                }
                _ => self.hard_error(TransportError::SessionNotFound(id.to_string()), ResponseId::null()),
            },
        }
    }
}

/// No-op [`Outbound`] handed to notification/client-response deliveries:
/// neither message kind expects a reply, so any `send()` call the handler
/// makes here has nowhere defined to go and is dropped (spec §4.1.5's
/// fan-out only applies when processing a `Request`).
struct NullOutbound;

#[async_trait::async_trait]
impl Outbound for NullOutbound {
    async fn send(&self, _message: Message) {}
}

/// The real [`Outbound`] implementation handed to a handler while it
/// processes one client [`Request`] (spec §4.1.5).
struct TransportOutbound {
    session: Arc<Session>,
    /// The id this Outbound's correlated reply must carry to resolve the
    /// pending request it was scoped to.
    pending_request_id: Option<RequestId>,
    /// The ephemeral stream backing this one POST, in SSE response mode.
    /// `None` in JSON response mode, where there is no live channel to push
    /// unsolicited server-initiated messages through mid-flight.
    current_stream: Option<Arc<SseStream>>,
    stateful: bool,
    resumability: bool,
}

#[async_trait::async_trait]
impl Outbound for TransportOutbound {
    async fn send(&self, message: Message) {
        if let Message::Response(ref resp) = message {
            if resp.id.as_request_id() == self.pending_request_id.as_ref() {
                if let Some(pending) = self.session.take_pending(resp.id.as_request_id().unwrap()) {
                    self.session
                        .resolve_pending(&pending, resp.clone(), self.with_event_id());
                }
                return;
            }
        }

        // Anything else is a server-initiated request or notification
        // emitted while handling the original request (spec §4.1.5).
        let Ok(json) = serde_json::to_string(&message.to_value()) else {
            return;
        };

        if let Some(stream) = &self.current_stream {
            let event_id = self.session.next_event_id();
            stream.push_and_send(event_id, json, self.with_event_id());
            return;
        }

        if self.stateful {
            for stream in self.session.live_streams() {
                let event_id = self.session.next_event_id();
                stream.push_and_send(event_id, json.clone(), self.with_event_id());
            }
        }
        // Stateless with no current POST stream: nothing to deliver through,
        // dropped per spec §4.1.5.
    }
}

impl TransportOutbound {
    fn with_event_id(&self) -> bool {
        self.stateful && self.resumability
    }
}
