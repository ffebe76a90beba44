//! The live `Session` aggregate (spec §3, §5): SSE streams, pending
//! requests, and the monotonic event-id counter for one logical client.
//!
//! This is distinct from [`mcp_streamable_session::SessionData`], which is
//! only the persistable projection used by a [`mcp_streamable_session::SessionStore`].
//! This aggregate exists only in the process that is currently serving the
//! session and is rebuilt from `SessionData` (or created fresh) whenever a
//! request needs it.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use dashmap::DashMap;
use mcp_jsonrpc::{error_codes, JsonRpcError, RequestId, Response, ResponseId};
use mcp_streamable_session::{SessionId, SseEncoder, SseEvent};
use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// Ring buffer cap for per-stream resumability history (spec §3, §9).
const MAX_HISTORY: usize = 100;

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// One active outbound SSE connection: a GET-originated long-lived stream,
/// or the ephemeral stream backing one SSE-mode POST request.
///
/// Only GET streams in stateful mode with resumability enabled actually
/// populate `history` (§4.1.4); POST streams never need to be resumed and
/// pass `track_history = false`.
#[derive(Debug)]
pub struct SseStream {
    pub id: String,
    sender: mpsc::UnboundedSender<Bytes>,
    active: AtomicBool,
    track_history: bool,
    history: Mutex<VecDeque<(u64, String)>>,
}

impl SseStream {
    pub fn new(id: String, sender: mpsc::UnboundedSender<Bytes>, track_history: bool) -> Self {
        Self {
            id,
            sender,
            active: AtomicBool::new(true),
            track_history,
            history: Mutex::new(VecDeque::with_capacity(MAX_HISTORY)),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Encode and push one message. `with_id` controls whether the SSE `id:`
    /// field is emitted — only when resumability is enabled in stateful mode
    /// (spec §4.1.6). Returns `false` if the receiver has gone away.
    pub fn push_and_send(&self, event_id: u64, message_json: String, with_id: bool) -> bool {
        let event = if with_id {
            SseEvent::with_id(event_id.to_string(), message_json.clone())
        } else {
            SseEvent::message(message_json.clone())
        };
        let bytes = Bytes::from(SseEncoder::encode(&event));
        let delivered = self.sender.send(bytes).is_ok();
        if !delivered {
            self.active.store(false, Ordering::Release);
        }

        if self.track_history {
            let mut history = self.history.lock();
            if history.len() >= MAX_HISTORY {
                history.pop_front();
            }
            history.push_back((event_id, message_json));
        }
        delivered
    }

    /// Entries with `id > last_event_id`, in ascending order (spec §4.1.4, P7).
    pub fn replay_from(&self, last_event_id: u64) -> Vec<(u64, String)> {
        self.history
            .lock()
            .iter()
            .filter(|(id, _)| *id > last_event_id)
            .cloned()
            .collect()
    }

    /// Drop the sender so the receiving stream ends; idempotent.
    pub fn close(&self) {
        self.active.store(false, Ordering::Release);
    }
}

/// Either continuation a [`PendingRequest`] may carry (spec §9 design note:
/// "unify under an internal PendingRequest variant {JsonWaiter | StreamWriter}").
pub enum Waiter {
    /// JSON response mode: resolved by sending on this oneshot.
    Json(oneshot::Sender<Response>),
    /// SSE response mode: resolved by pushing the final event and closing.
    Stream(Arc<SseStream>),
}

/// One outstanding client-initiated request awaiting a handler response.
///
/// The `resolved-once` guard (invariant I4) is the `Mutex<Option<Waiter>>`
/// itself: `take_waiter` can only ever hand out the waiter a single time,
/// after which every subsequent caller (timeout race, late `send`,
/// termination) observes `None` and does nothing.
pub struct PendingRequest {
    pub request_id: RequestId,
    pub session_id: SessionId,
    waiter: Mutex<Option<Waiter>>,
    timeout_task: Mutex<Option<JoinHandle<()>>>,
}

impl PendingRequest {
    pub fn new(request_id: RequestId, session_id: SessionId, waiter: Waiter) -> Self {
        Self {
            request_id,
            session_id,
            waiter: Mutex::new(Some(waiter)),
            timeout_task: Mutex::new(None),
        }
    }

    /// Record the timeout task so it is aborted if the request resolves
    /// through another path first.
    pub fn arm_timeout(&self, task: JoinHandle<()>) {
        *self.timeout_task.lock() = Some(task);
    }

    /// Take the waiter exactly once, aborting any still-pending timeout task.
    pub fn take_waiter(&self) -> Option<Waiter> {
        if let Some(task) = self.timeout_task.lock().take() {
            task.abort();
        }
        self.waiter.lock().take()
    }

    pub fn is_resolved(&self) -> bool {
        self.waiter.lock().is_none()
    }
}

/// The live, in-process aggregate for one MCP session (spec §3).
pub struct Session {
    pub id: SessionId,
    initialized: AtomicBool,
    initializing: AtomicBool,
    protocol_version: Mutex<String>,
    last_activity_ms: AtomicU64,
    event_id_counter: AtomicU64,
    sse_streams: DashMap<String, Arc<SseStream>>,
    pending_requests: DashMap<RequestId, Arc<PendingRequest>>,
}

impl Session {
    pub fn new(id: SessionId, protocol_version: String) -> Arc<Self> {
        Arc::new(Self {
            id,
            initialized: AtomicBool::new(false),
            initializing: AtomicBool::new(false),
            protocol_version: Mutex::new(protocol_version),
            last_activity_ms: AtomicU64::new(now_ms()),
            event_id_counter: AtomicU64::new(0),
            sse_streams: DashMap::new(),
            pending_requests: DashMap::new(),
        })
    }

    pub fn touch(&self) {
        self.last_activity_ms.store(now_ms(), Ordering::Relaxed);
    }

    pub fn last_activity_ms(&self) -> u64 {
        self.last_activity_ms.load(Ordering::Relaxed)
    }

    /// Next value from the monotonic per-session event-id counter (I3, P1).
    /// Starts at 1 so `Last-Event-ID: 0` always replays everything.
    pub fn next_event_id(&self) -> u64 {
        self.event_id_counter.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn mark_initializing(&self) {
        self.initializing.store(true, Ordering::Release);
        self.initialized.store(false, Ordering::Release);
    }

    /// `Initializing -[notifications/initialized]-> Initialized` (spec §4.1.7).
    pub fn mark_initialized(&self) {
        self.initialized.store(true, Ordering::Release);
        self.initializing.store(false, Ordering::Release);
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    pub fn is_initializing(&self) -> bool {
        self.initializing.load(Ordering::Acquire)
    }

    pub fn protocol_version(&self) -> String {
        self.protocol_version.lock().clone()
    }

    pub fn set_protocol_version(&self, version: impl Into<String>) {
        *self.protocol_version.lock() = version.into();
    }

    pub fn register_pending(&self, pending: Arc<PendingRequest>) {
        self.pending_requests
            .insert(pending.request_id.clone(), pending);
    }

    /// Remove and return a pending entry, if still present (I2: deleted on
    /// resolution, timeout, or termination).
    pub fn take_pending(&self, id: &RequestId) -> Option<Arc<PendingRequest>> {
        self.pending_requests.remove(id).map(|(_, v)| v)
    }

    pub fn pending_count(&self) -> usize {
        self.pending_requests.len()
    }

    pub fn register_stream(&self, stream: Arc<SseStream>) {
        self.sse_streams.insert(stream.id.clone(), stream);
    }

    pub fn remove_stream(&self, id: &str) -> Option<Arc<SseStream>> {
        self.sse_streams.remove(id).map(|(_, v)| v)
    }

    /// Streams currently able to receive a push (spec §4.1.5 fan-out target).
    /// Disconnected streams stay registered (see [`Session::replay_after`])
    /// but are filtered out here.
    pub fn live_streams(&self) -> Vec<Arc<SseStream>> {
        self.sse_streams
            .iter()
            .filter(|e| e.value().is_active())
            .map(|e| e.value().clone())
            .collect()
    }

    /// Merge `id > last_event_id` entries across every stream this session
    /// has ever registered — including ones that have since disconnected —
    /// in ascending order (spec §4.1.4, P7). Event ids are unique and
    /// monotonic per session, not per stream, so a reconnecting client can
    /// recover history recorded by a stream it never itself opened.
    pub fn replay_after(&self, last_event_id: u64) -> Vec<(u64, String)> {
        let mut merged: Vec<(u64, String)> = self
            .sse_streams
            .iter()
            .flat_map(|e| e.value().replay_from(last_event_id))
            .collect();
        merged.sort_by_key(|(id, _)| *id);
        merged
    }

    /// Resolve a pending request via its waiter, assigning a fresh event id
    /// when delivery is via SSE. Returns `false` if the request had already
    /// resolved through another path (timeout, termination, a second
    /// `send()`) — the race is resolved in favor of whichever path got
    /// there first, per I4.
    pub fn resolve_pending(&self, pending: &PendingRequest, response: Response, with_event_id: bool) -> bool {
        match pending.take_waiter() {
            Some(Waiter::Json(tx)) => {
                let _ = tx.send(response);
                true
            }
            Some(Waiter::Stream(stream)) => {
                let event_id = self.next_event_id();
                if let Ok(json) = serde_json::to_string(&response) {
                    stream.push_and_send(event_id, json, with_event_id);
                }
                stream.close();
                true
            }
            None => false,
        }
    }

    /// Terminate the session (spec §3 Lifecycle): close every SSE stream and
    /// fail every pending request with `-32000 "Session terminated"` (P6).
    pub fn terminate(&self) {
        for entry in self.sse_streams.iter() {
            entry.value().close();
        }
        self.sse_streams.clear();

        for entry in self.pending_requests.iter() {
            let response = Response::error(
                ResponseId::of(entry.key().clone()),
                JsonRpcError::new(error_codes::TRANSPORT_ERROR, "Session terminated"),
            );
            self.resolve_pending(entry.value(), response, false);
        }
        self.pending_requests.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_session() -> Arc<Session> {
        Session::new(SessionId::new(), "2025-06-18".to_string())
    }

    #[test]
    fn event_ids_are_strictly_increasing() {
        let session = new_session();
        let ids: Vec<u64> = (0..5).map(|_| session.next_event_id()).collect();
        for pair in ids.windows(2) {
            assert!(pair[1] > pair[0]);
        }
    }

    #[test]
    fn initialize_state_machine_transitions() {
        let session = new_session();
        assert!(!session.is_initializing());
        assert!(!session.is_initialized());

        session.mark_initializing();
        assert!(session.is_initializing());
        assert!(!session.is_initialized());

        session.mark_initialized();
        assert!(!session.is_initializing());
        assert!(session.is_initialized());
    }

    #[tokio::test]
    async fn json_waiter_resolves_exactly_once() {
        let session = new_session();
        let (tx, rx) = oneshot::channel();
        let pending = Arc::new(PendingRequest::new(
            RequestId::from(1_i64),
            session.id.clone(),
            Waiter::Json(tx),
        ));
        session.register_pending(pending.clone());

        let response = Response::success(RequestId::from(1_i64), serde_json::json!({"ok": true}));
        assert!(session.resolve_pending(&pending, response, false));

        // Second resolution attempt is a no-op (I4).
        let again = Response::success(RequestId::from(1_i64), serde_json::json!({"ok": false}));
        assert!(!session.resolve_pending(&pending, again, false));

        let received = rx.await.unwrap();
        assert!(!received.is_error());
    }

    #[test]
    fn stream_history_replays_only_newer_events() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let stream = SseStream::new("s1".to_string(), tx, true);
        for i in 1..=4u64 {
            stream.push_and_send(i, format!("msg-{i}"), true);
        }

        let replayed = stream.replay_from(2);
        assert_eq!(replayed.len(), 2);
        assert_eq!(replayed[0].0, 3);
        assert_eq!(replayed[1].0, 4);
    }

    #[test]
    fn stream_history_is_bounded_at_max() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let stream = SseStream::new("s1".to_string(), tx, true);
        for i in 1..=(MAX_HISTORY as u64 + 10) {
            stream.push_and_send(i, format!("msg-{i}"), true);
        }
        assert_eq!(stream.replay_from(0).len(), MAX_HISTORY);
    }

    #[tokio::test]
    async fn terminate_closes_streams_and_rejects_pending() {
        let session = new_session();
        let (tx, rx) = mpsc::unbounded_channel();
        let stream = Arc::new(SseStream::new("s1".to_string(), tx, false));
        session.register_stream(stream.clone());

        let (resp_tx, resp_rx) = oneshot::channel();
        let pending = Arc::new(PendingRequest::new(
            RequestId::from(7_i64),
            session.id.clone(),
            Waiter::Json(resp_tx),
        ));
        session.register_pending(pending);

        session.terminate();

        assert!(!stream.is_active());
        drop(rx);
        let response = resp_rx.await.unwrap();
        assert!(response.is_error());
        assert_eq!(session.pending_count(), 0);
    }
}
