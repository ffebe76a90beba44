//! Pluggable session persistence (spec §4.2).
//!
//! `SessionData` is deliberately thin: it is the *persistable projection* of
//! a live session (no SSE streams, no pending requests, no timers — those
//! only make sense for the in-process `Session` aggregate in
//! `mcp-streamable-transport`). External implementations (Redis, DynamoDB,
//! ...) only ever need to round-trip this struct.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use dashmap::DashMap;
use tokio::task::JoinHandle;

use crate::session_id::SessionId;

/// The persistable state of a session.
#[derive(Clone, Debug)]
pub struct SessionData {
    pub id: SessionId,
    pub initialized: bool,
    pub protocol_version: String,
    pub last_activity_ms: u64,
}

impl SessionData {
    pub fn new(id: SessionId, protocol_version: impl Into<String>) -> Self {
        Self {
            id,
            initialized: false,
            protocol_version: protocol_version.into(),
            last_activity_ms: now_ms(),
        }
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Error type for store operations. Kept intentionally opaque: a concrete
/// backend (Redis, DynamoDB, ...) will have its own error type and should
/// map it to this one at the trait boundary.
#[derive(Debug, thiserror::Error)]
#[error("session store error: {0}")]
pub struct StoreError(pub String);

/// Pluggable session storage backend (spec §4.2).
///
/// Implementations may be backed by memory (this crate's
/// [`InMemorySessionStore`]) or an external key-value store. Whichever it
/// is, `set` must (re)arm the TTL so that `get` eventually stops returning
/// an entry that has not been refreshed.
#[async_trait::async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, id: &SessionId) -> Result<Option<SessionData>, StoreError>;
    async fn set(&self, data: SessionData, ttl: Duration) -> Result<(), StoreError>;
    async fn delete(&self, id: &SessionId) -> Result<(), StoreError>;
}

/// In-memory [`SessionStore`] with a per-entry TTL timer.
///
/// Calling `set` again for the same id cancels the previous expiry task and
/// starts a fresh one, matching spec §4.2's "calling `set` resets it".
pub struct InMemorySessionStore {
    entries: Arc<DashMap<SessionId, (SessionData, JoinHandle<()>)>>,
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
        }
    }
}

#[async_trait::async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, id: &SessionId) -> Result<Option<SessionData>, StoreError> {
        Ok(self.entries.get(id).map(|entry| entry.value().0.clone()))
    }

    async fn set(&self, data: SessionData, ttl: Duration) -> Result<(), StoreError> {
        let id = data.id.clone();
        let expiry_id = id.clone();
        let entries = self.entries.clone();
        let expiry_task = tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            entries.remove(&expiry_id);
            tracing::debug!(session = %expiry_id, "session TTL expired, evicted from store");
        });

        // Aborting the previous task before overwriting is what makes a
        // repeated `set` reset the timer instead of leaving two races.
        if let Some((_, old_task)) = self.entries.insert(id, (data, expiry_task)) {
            old_task.abort();
        }
        Ok(())
    }

    async fn delete(&self, id: &SessionId) -> Result<(), StoreError> {
        if let Some((_, (_, task))) = self.entries.remove(id) {
            task.abort();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let store = InMemorySessionStore::new();
        let id = SessionId::new();
        let data = SessionData::new(id.clone(), "2025-06-18");
        store.set(data, Duration::from_secs(60)).await.unwrap();

        let fetched = store.get(&id).await.unwrap().unwrap();
        assert_eq!(fetched.id, id);
        assert!(!fetched.initialized);
    }

    #[tokio::test]
    async fn delete_removes_entry() {
        let store = InMemorySessionStore::new();
        let id = SessionId::new();
        store
            .set(SessionData::new(id.clone(), "2025-06-18"), Duration::from_secs(60))
            .await
            .unwrap();
        store.delete(&id).await.unwrap();
        assert!(store.get(&id).await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_set_resets_ttl_timer() {
        let store = InMemorySessionStore::new();
        let id = SessionId::new();

        store
            .set(SessionData::new(id.clone(), "2025-06-18"), Duration::from_millis(100))
            .await
            .unwrap();
        tokio::time::advance(Duration::from_millis(80)).await;

        // Refresh before the first timer would have fired.
        store
            .set(SessionData::new(id.clone(), "2025-06-18"), Duration::from_millis(100))
            .await
            .unwrap();
        tokio::time::advance(Duration::from_millis(80)).await;

        // Still present: the first timer was aborted, the second hasn't hit 100ms yet.
        assert!(store.get(&id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn missing_session_returns_none() {
        let store = InMemorySessionStore::new();
        assert!(store.get(&SessionId::new()).await.unwrap().is_none());
    }
}
