//! Minimal MCP Streamable HTTP server exposing a single `echo` tool.
//!
//! Demonstrates wiring a [`MessageHandler`] through [`ServerBuilder`]; tool
//! definition and schema conversion are this crate's responsibility alone —
//! the transport and server crates never see the word "echo".

use std::sync::Arc;

use async_trait::async_trait;
use mcp_jsonrpc::{error_codes, JsonRpcError, Message, Response};
use mcp_streamable_server::ServerBuilder;
use mcp_streamable_transport::{MessageHandler, Outbound, RequestContext};

struct EchoHandler;

#[async_trait]
impl MessageHandler for EchoHandler {
    async fn on_message(&self, message: Message, _ctx: RequestContext, outbound: Arc<dyn Outbound>) {
        let Message::Request(request) = message else {
            return;
        };

        let response = match request.method.as_str() {
            "initialize" => Response::success(
                request.id,
                serde_json::json!({
                    "protocolVersion": "2025-06-18",
                    "serverInfo": { "name": "echo-demo", "version": env!("CARGO_PKG_VERSION") },
                    "capabilities": { "tools": {} },
                }),
            ),
            "tools/list" => Response::success(
                request.id,
                serde_json::json!({
                    "tools": [{
                        "name": "echo",
                        "description": "Echo back the provided message",
                        "inputSchema": {
                            "type": "object",
                            "properties": { "message": { "type": "string" } },
                            "required": ["message"],
                        },
                    }]
                }),
            ),
            "tools/call" => {
                let name = request
                    .params
                    .as_ref()
                    .and_then(|p| p.get("name"))
                    .and_then(|v| v.as_str());

                if name == Some("echo") {
                    let message = request
                        .params
                        .as_ref()
                        .and_then(|p| p.get("arguments"))
                        .and_then(|a| a.get("message"))
                        .and_then(|m| m.as_str())
                        .unwrap_or("");

                    Response::success(
                        request.id,
                        serde_json::json!({
                            "content": [{ "type": "text", "text": message }]
                        }),
                    )
                } else {
                    Response::error(
                        mcp_jsonrpc::ResponseId::of(request.id),
                        JsonRpcError::new(error_codes::METHOD_NOT_FOUND, "Unknown tool"),
                    )
                }
            }
            other => Response::error(
                mcp_jsonrpc::ResponseId::of(request.id),
                JsonRpcError::new(error_codes::METHOD_NOT_FOUND, format!("Unknown method: {other}")),
            ),
        };

        outbound.send(Message::Response(response)).await;
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let server = ServerBuilder::new()
        .name("echo-demo")
        .version(env!("CARGO_PKG_VERSION"))
        .build(Arc::new(EchoHandler));

    let addr = "127.0.0.1:8080".parse()?;
    server.run(addr).await?;
    Ok(())
}
