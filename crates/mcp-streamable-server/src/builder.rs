//! The server facade (spec §2 "Server facade"): wires a [`MessageHandler`]
//! to a [`Transport`] and owns the axum [`Router`] that serves it.
//!
//! Mirrors the teacher's `ServerBuilder` shape (`turbomcp-server::ServerBuilder`:
//! `.name()`/`.version()` metadata, a terminal `build()`, `run_*` methods) —
//! narrowed here to the one transport this crate implements.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use mcp_streamable_transport::{AuthMiddleware, MessageHandler, Transport, TransportConfig};
use tower_http::trace::TraceLayer;

use crate::axum_adapter;

/// Builder for a [`Server`], following the teacher's chained-setter,
/// terminal-`build()` convention.
pub struct ServerBuilder {
    name: String,
    version: String,
    path: String,
    config: TransportConfig,
    auth: Option<AuthMiddleware>,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerBuilder {
    pub fn new() -> Self {
        Self {
            name: "mcp-server".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            path: "/mcp".to_string(),
            config: TransportConfig::default(),
            auth: None,
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// HTTP path the Streamable transport is mounted at (default `/mcp`).
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_config(mut self, config: TransportConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_auth(mut self, auth: AuthMiddleware) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Wire `handler` to a fresh [`Transport`] and produce the runnable [`Server`].
    pub fn build(self, handler: Arc<dyn MessageHandler>) -> Server {
        let mut transport = Transport::new(self.config, handler);
        if let Some(auth) = self.auth {
            transport = transport.with_auth(auth);
        }

        Server {
            name: self.name,
            version: self.version,
            path: self.path,
            transport: Arc::new(transport),
        }
    }
}

/// A runnable MCP Streamable HTTP server: a [`Transport`] plus the axum
/// [`Router`] adapter in front of it.
pub struct Server {
    name: String,
    version: String,
    path: String,
    transport: Arc<Transport>,
}

impl Server {
    /// Build the axum [`Router`] for this server, with request tracing
    /// (`tower_http::trace::TraceLayer`) in the style of the teacher's own
    /// HTTP middleware stack.
    pub fn router(&self) -> Router {
        axum_adapter::router(&self.path, self.transport.clone()).layer(TraceLayer::new_for_http())
    }

    /// Run the `MessageHandler`'s `start()` hook, bind `addr`, and serve
    /// until the process is interrupted. Calls `close()` on the handler once
    /// serving stops.
    pub async fn run(&self, addr: SocketAddr) -> std::io::Result<()> {
        self.transport.start().await;
        tracing::info!(
            name = %self.name,
            version = %self.version,
            %addr,
            path = %self.path,
            "starting MCP Streamable HTTP server"
        );

        let listener = tokio::net::TcpListener::bind(addr).await?;
        let app = self
            .router()
            .into_make_service_with_connect_info::<SocketAddr>();
        let result = axum::serve(listener, app).await;

        self.transport.shutdown().await;
        result
    }

    /// Terminate every live session and close the handler without serving.
    pub async fn shutdown(&self) {
        self.transport.shutdown().await;
    }
}
