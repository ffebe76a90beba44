//! Minimal JSON-RPC 2.0 message types for the MCP Streamable HTTP transport.
//!
//! This crate deliberately does not model the MCP method/params/result
//! catalogue (tools, resources, prompts, sampling, ...) — that is the
//! application handler's contract, out of scope here. It only models the
//! JSON-RPC envelope the transport needs to parse, classify, and correlate.

mod id;
mod message;

pub use id::{RequestId, ResponseId};
pub use message::{
    error_codes, InvalidMessage, JsonRpcError, Message, Notification, Request, Response,
    ResponsePayload, V2, INITIALIZED_NOTIFICATION, INITIALIZE_METHOD,
};
