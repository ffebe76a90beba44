//! The Streamable HTTP transport engine: HTTP method dispatch, session
//! lifecycle, SSE delivery, origin validation, and bearer-token auth.
//!
//! Framework-agnostic by design — [`Transport::handle_request`] consumes and
//! produces the plain [`request::IncomingRequest`]/[`request::OutgoingResponse`]
//! types in this crate rather than any specific web framework's request type.
//! The axum adapter lives in the sibling `mcp-streamable-server` crate.

mod auth;
mod config;
mod error;
mod handler;
mod origin;
mod request;
mod session;
mod transport;

pub use auth::{AuthInfo, AuthMiddleware, AuthOutcome, TokenVerifier, VerifyError};
pub use config::{TransportConfig, TransportConfigBuilder};
pub use error::TransportError;
pub use handler::{MessageHandler, Outbound, RequestContext};
pub use origin::validate_origin;
pub use request::{HttpMethod, IncomingRequest, OutgoingResponse, ResponseBody};
pub use session::{PendingRequest, Session, SseStream, Waiter};
pub use transport::Transport;
