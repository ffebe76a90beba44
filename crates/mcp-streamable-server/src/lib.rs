//! axum adapter and server facade for the MCP Streamable HTTP transport.
//!
//! This crate is the thin, framework-specific layer that sits in front of
//! `mcp-streamable-transport`'s [`mcp_streamable_transport::Transport`]:
//! [`axum_adapter::router`] translates axum's `Request`/`Response` to and
//! from the transport's own [`mcp_streamable_transport::IncomingRequest`]/
//! [`mcp_streamable_transport::OutgoingResponse`] pair, and [`ServerBuilder`]
//! wires a [`mcp_streamable_transport::MessageHandler`] through it end to end.

mod axum_adapter;
mod builder;

pub use axum_adapter::router;
pub use builder::{Server, ServerBuilder};

pub use mcp_streamable_transport as transport;
