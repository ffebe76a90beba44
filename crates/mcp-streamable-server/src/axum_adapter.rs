//! Translation layer between axum's `Request`/`Response` and the
//! framework-agnostic [`IncomingRequest`]/[`OutgoingResponse`] pair
//! [`Transport::handle_request`] actually speaks.
//!
//! Kept as a thin adapter on purpose, matching the teacher's own separation
//! of transport logic from the HTTP server crate (`streamable_http.rs`'s
//! module doc: "actual HTTP server implementation lives in
//! `turbomcp_server::runtime::http`").

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use axum::Router;
use mcp_streamable_transport::{HttpMethod, IncomingRequest, OutgoingResponse, ResponseBody, Transport};
use tokio_util::sync::CancellationToken;

/// Upper bound on how much of a request body this adapter will buffer
/// before giving up, independent of [`mcp_streamable_transport::TransportConfig::max_body_size`].
/// The configured limit still produces the spec-shaped `413` JSON-RPC error;
/// this is a coarser backstop against a client that ignores it entirely.
const ADAPTER_BODY_CAP: usize = 16 * 1024 * 1024;

#[derive(Clone)]
struct AppState {
    transport: Arc<Transport>,
}

/// Build an axum [`Router`] exposing `transport` at `path` for `GET`,
/// `POST`, and `DELETE` (spec §4.1.1). Method dispatch, including the `405`
/// fallback for any other method, is left entirely to [`Transport::handle_request`]
/// — this function only ever forwards.
pub fn router(path: &str, transport: Arc<Transport>) -> Router {
    Router::new()
        .route(path, any(handle))
        .with_state(AppState { transport })
}

async fn handle(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    method: axum::http::Method,
    body: Body,
) -> Response {
    let cancelled = CancellationToken::new();

    let body_bytes = match axum::body::to_bytes(body, ADAPTER_BODY_CAP).await {
        Ok(bytes) => bytes,
        Err(_) => {
            return (
                StatusCode::PAYLOAD_TOO_LARGE,
                "request body exceeds the adapter's absolute cap",
            )
                .into_response()
        }
    };

    let incoming = IncomingRequest {
        method: map_method(&method),
        headers: lowercase_headers(&headers),
        body: body_bytes,
        peer_addr: connect_info.map(|ConnectInfo(addr)| addr.ip()),
        cancelled: cancelled.clone(),
    };

    let outgoing = state.transport.handle_request(incoming).await;
    into_axum_response(outgoing, cancelled)
}

fn map_method(method: &axum::http::Method) -> HttpMethod {
    match *method {
        axum::http::Method::GET => HttpMethod::Get,
        axum::http::Method::POST => HttpMethod::Post,
        axum::http::Method::DELETE => HttpMethod::Delete,
        _ => HttpMethod::Other,
    }
}

fn lowercase_headers(headers: &HeaderMap) -> HashMap<String, String> {
    let mut map = HashMap::with_capacity(headers.len());
    for (name, value) in headers {
        if let Ok(v) = value.to_str() {
            map.insert(name.as_str().to_ascii_lowercase(), v.to_string());
        }
    }
    map
}

/// Drop-guard cancelling `token` when the response body it is embedded in
/// stops being polled before completion — the standard signal axum/hyper
/// give an in-flight streaming response when the client disconnects.
/// Bounded-lifetime (non-streaming) responses rely instead on the
/// transport's own `requestTimeout`/`sessionTimeout` to bound any leak, per
/// DESIGN.md's note on this adapter's cancellation scope.
struct CancelOnDrop(CancellationToken);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

fn into_axum_response(outgoing: OutgoingResponse, cancelled: CancellationToken) -> Response {
    let status = StatusCode::from_u16(outgoing.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    let mut response = match outgoing.body {
        ResponseBody::Json(value) => {
            let bytes = serde_json::to_vec(&value).unwrap_or_default();
            let mut resp = Response::new(Body::from(bytes));
            resp.headers_mut().insert(
                axum::http::header::CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            );
            resp
        }
        ResponseBody::Empty => Response::new(Body::empty()),
        ResponseBody::Sse(mut rx) => {
            let guard = CancelOnDrop(cancelled);
            let stream = async_stream::stream! {
                let _guard = guard;
                while let Some(bytes) = rx.recv().await {
                    yield Ok::<Bytes, std::io::Error>(bytes);
                }
            };
            Response::new(Body::from_stream(stream))
        }
    };

    *response.status_mut() = status;
    for (name, value) in outgoing.headers {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(&value),
        ) {
            response.headers_mut().insert(name, value);
        }
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcp_streamable_transport::{Message, MessageHandler, Outbound, RequestContext, TransportConfigBuilder};
    use tower::ServiceExt;

    struct EchoHandler;

    #[async_trait::async_trait]
    impl MessageHandler for EchoHandler {
        async fn on_message(&self, message: Message, _ctx: RequestContext, outbound: Arc<dyn Outbound>) {
            if let Message::Request(req) = message {
                let response = mcp_jsonrpc::Response::success(
                    req.id,
                    serde_json::json!({"echo": req.params}),
                );
                outbound.send(Message::Response(response)).await;
            }
        }
    }

    fn test_router() -> Router {
        let transport = Arc::new(Transport::new(
            TransportConfigBuilder::new().build(),
            Arc::new(EchoHandler),
        ));
        router("/mcp", transport)
    }

    #[tokio::test]
    async fn initialize_over_axum_returns_sse_event() {
        let app = test_router();
        let body = serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "initialize",
            "params": {}
        });

        let request = axum::http::Request::builder()
            .method("POST")
            .uri("/mcp")
            .header("accept", "application/json, text/event-stream")
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response
            .headers()
            .get("mcp-session-id")
            .is_some());
    }

    #[tokio::test]
    async fn unacceptable_accept_header_is_rejected() {
        let app = test_router();
        let body = serde_json::json!({"jsonrpc": "2.0", "id": 1, "method": "initialize"});

        let request = axum::http::Request::builder()
            .method("POST")
            .uri("/mcp")
            .header("accept", "text/plain")
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_ACCEPTABLE);
    }

    #[tokio::test]
    async fn unsupported_method_returns_405_with_allow_header() {
        let app = test_router();
        let request = axum::http::Request::builder()
            .method("PUT")
            .uri("/mcp")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers().get("allow").unwrap(), "GET, POST, DELETE");
    }
}
