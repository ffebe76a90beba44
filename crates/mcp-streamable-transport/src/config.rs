//! Transport configuration surface (spec §6.3).

use std::sync::Arc;
use std::time::Duration;

use mcp_streamable_session::{InMemorySessionStore, SessionStore};

/// Default body size limit: 1 MiB.
pub const DEFAULT_MAX_BODY_SIZE: usize = 1_048_576;
/// Default request timeout: 30s.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// Default session TTL (stateful only): 1 hour.
pub const DEFAULT_SESSION_TIMEOUT: Duration = Duration::from_secs(3_600);

/// Runtime configuration for a [`crate::Transport`] (spec §6.3).
#[derive(Clone)]
pub struct TransportConfig {
    pub stateful: bool,
    pub session_store: Arc<dyn SessionStore>,
    pub enable_json_response: bool,
    pub max_body_size: usize,
    pub request_timeout: Duration,
    pub session_timeout: Duration,
    pub allowed_origins: Vec<String>,
    pub allow_any_origin: bool,
    pub enable_resumability: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        TransportConfigBuilder::new().build()
    }
}

/// Builder for [`TransportConfig`], following the teacher's
/// `with_x`/`allow_x`-chained, `build()`-terminal convention.
///
/// # Examples
///
/// ```
/// use mcp_streamable_transport::TransportConfigBuilder;
/// use std::time::Duration;
///
/// let config = TransportConfigBuilder::new()
///     .stateful(true)
///     .with_request_timeout(Duration::from_secs(10))
///     .allow_any_origin(false)
///     .build();
/// assert!(config.stateful);
/// ```
pub struct TransportConfigBuilder {
    stateful: bool,
    session_store: Option<Arc<dyn SessionStore>>,
    enable_json_response: bool,
    max_body_size: usize,
    request_timeout: Duration,
    session_timeout: Duration,
    allowed_origins: Vec<String>,
    allow_any_origin: bool,
    enable_resumability: bool,
}

impl Default for TransportConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TransportConfigBuilder {
    pub fn new() -> Self {
        Self {
            stateful: false,
            session_store: None,
            enable_json_response: false,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            session_timeout: DEFAULT_SESSION_TIMEOUT,
            allowed_origins: vec![
                "http://localhost".to_string(),
                "https://localhost".to_string(),
                "http://127.0.0.1".to_string(),
                "https://127.0.0.1".to_string(),
            ],
            allow_any_origin: false,
            enable_resumability: true,
        }
    }

    /// Enable persistent, stateful sessions (default: `false`).
    pub fn stateful(mut self, stateful: bool) -> Self {
        self.stateful = stateful;
        self
    }

    /// Replace the in-memory session store (stateful mode only).
    pub fn with_session_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.session_store = Some(store);
        self
    }

    /// Reply with a single JSON body instead of an SSE stream for request
    /// responses (default: `false`).
    pub fn enable_json_response(mut self, enable: bool) -> Self {
        self.enable_json_response = enable;
        self
    }

    /// Maximum accepted request body size, in bytes (default: 1 MiB).
    pub fn with_max_body_size(mut self, bytes: usize) -> Self {
        self.max_body_size = bytes;
        self
    }

    /// Per-request timeout before a synthetic `-32001` error is emitted.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Session TTL in stateful mode (default: 1 hour).
    pub fn with_session_timeout(mut self, timeout: Duration) -> Self {
        self.session_timeout = timeout;
        self
    }

    /// Replace the allowed-origins list (default: the localhost set).
    pub fn with_allowed_origins(mut self, origins: Vec<String>) -> Self {
        self.allowed_origins = origins;
        self
    }

    pub fn add_allowed_origin(mut self, origin: impl Into<String>) -> Self {
        self.allowed_origins.push(origin.into());
        self
    }

    /// Disable origin checking entirely (`allowedOrigins: ["*"]` in spec terms).
    ///
    /// # Security Warning
    /// Only enable in development; production should specify exact origins.
    pub fn allow_any_origin(mut self, allow: bool) -> Self {
        self.allow_any_origin = allow;
        self
    }

    /// Enable `Last-Event-ID` replay on GET reconnects (stateful only;
    /// default: `true`).
    pub fn enable_resumability(mut self, enable: bool) -> Self {
        self.enable_resumability = enable;
        self
    }

    pub fn build(self) -> TransportConfig {
        let session_store = self
            .session_store
            .unwrap_or_else(|| Arc::new(InMemorySessionStore::new()));

        TransportConfig {
            stateful: self.stateful,
            session_store,
            enable_json_response: self.enable_json_response,
            max_body_size: self.max_body_size,
            request_timeout: self.request_timeout,
            session_timeout: self.session_timeout,
            allowed_origins: self.allowed_origins,
            allow_any_origin: self.allow_any_origin,
            enable_resumability: self.enable_resumability,
        }
    }
}
