//! Server-Sent Events (SSE) wire encoding (spec §4.1.6).
//!
//! Pure, no-I/O encoding only: this server never consumes SSE itself, it
//! only ever emits it over the GET stream, so there is no parser here.
//!
//! ## Wire format
//!
//! ```text
//! id: event-123
//! event: message
//! data: {"jsonrpc": "2.0", ...}
//!
//! ```
//!
//! A blank line terminates each event.

/// A Server-Sent Event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SseEvent {
    /// Event ID, used by clients for resumption via `Last-Event-ID`.
    pub id: Option<String>,
    /// Event type (defaults to "message" on the client when absent).
    pub event: Option<String>,
    /// Event data (may be multiline; split across repeated `data:` fields).
    pub data: String,
    /// Client reconnection retry interval in milliseconds.
    pub retry: Option<u32>,
}

impl SseEvent {
    /// Create a `message`-typed event carrying only data (spec §4.1.6: every
    /// JSON-RPC event on the wire carries a literal `event: message` line).
    pub fn message(data: impl Into<String>) -> Self {
        Self {
            id: None,
            event: Some("message".to_string()),
            data: data.into(),
            retry: None,
        }
    }

    /// Create a `message`-typed event with an id and data, the shape used
    /// for every JSON-RPC response/notification pushed down the SSE stream
    /// once resumability assigns it an event id.
    pub fn with_id(id: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            event: Some("message".to_string()),
            data: data.into(),
            retry: None,
        }
    }

    pub fn builder() -> SseEventBuilder {
        SseEventBuilder::new()
    }
}

/// Builder for constructing SSE events field by field.
#[derive(Default)]
pub struct SseEventBuilder {
    id: Option<String>,
    event: Option<String>,
    data: Option<String>,
    retry: Option<u32>,
}

impl SseEventBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn event(mut self, event: impl Into<String>) -> Self {
        self.event = Some(event.into());
        self
    }

    pub fn data(mut self, data: impl Into<String>) -> Self {
        self.data = Some(data.into());
        self
    }

    pub fn retry(mut self, retry_ms: u32) -> Self {
        self.retry = Some(retry_ms);
        self
    }

    /// # Panics
    ///
    /// Panics if data was never set.
    pub fn build(self) -> SseEvent {
        SseEvent {
            id: self.id,
            event: self.event,
            data: self.data.expect("SseEvent requires data"),
            retry: self.retry,
        }
    }

    pub fn try_build(self) -> Option<SseEvent> {
        Some(SseEvent {
            id: self.id,
            event: self.event,
            data: self.data?,
            retry: self.retry,
        })
    }
}

/// Encodes [`SseEvent`]s to SSE wire format.
pub struct SseEncoder;

impl SseEncoder {
    /// Encode an event to bytes.
    pub fn encode(event: &SseEvent) -> Vec<u8> {
        Self::encode_string(event).into_bytes()
    }

    /// Encode an event to a `String`.
    pub fn encode_string(event: &SseEvent) -> String {
        let mut output = String::new();

        if let Some(ref id) = event.id {
            output.push_str("id: ");
            output.push_str(id);
            output.push('\n');
        }

        if let Some(ref event_type) = event.event {
            output.push_str("event: ");
            output.push_str(event_type);
            output.push('\n');
        }

        if let Some(retry) = event.retry {
            output.push_str("retry: ");
            output.push_str(&retry.to_string());
            output.push('\n');
        }

        for line in event.data.lines() {
            output.push_str("data: ");
            output.push_str(line);
            output.push('\n');
        }

        output.push('\n');
        output
    }

    /// Encode a comment line, used for keepalive pings. Clients ignore
    /// comments but the bytes keep intermediate proxies from closing the
    /// connection on an idle timeout.
    pub fn encode_comment(comment: &str) -> Vec<u8> {
        let mut output = String::new();
        for line in comment.lines() {
            output.push_str(": ");
            output.push_str(line);
            output.push('\n');
        }
        output.push('\n');
        output.into_bytes()
    }

    /// Encode an empty-comment keepalive ping.
    pub fn encode_keepalive() -> Vec<u8> {
        b":\n\n".to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_event_has_no_id_but_has_message_type() {
        let event = SseEvent::message("Hello, world!");
        assert_eq!(event.data, "Hello, world!");
        assert!(event.id.is_none());
        assert_eq!(event.event, Some("message".to_string()));
    }

    #[test]
    fn with_id_sets_id_type_and_data() {
        let event = SseEvent::with_id("123", "data");
        assert_eq!(event.id, Some("123".to_string()));
        assert_eq!(event.event, Some("message".to_string()));
        assert_eq!(event.data, "data");
    }

    #[test]
    fn builder_sets_all_fields() {
        let event = SseEvent::builder()
            .id("evt-1")
            .event("notification")
            .data(r#"{"type": "test"}"#)
            .retry(3000)
            .build();

        assert_eq!(event.id, Some("evt-1".to_string()));
        assert_eq!(event.event, Some("notification".to_string()));
        assert_eq!(event.data, r#"{"type": "test"}"#);
        assert_eq!(event.retry, Some(3000));
    }

    #[test]
    fn encode_simple_message() {
        let event = SseEvent::message("hello");
        assert_eq!(
            SseEncoder::encode_string(&event),
            "event: message\ndata: hello\n\n"
        );
    }

    #[test]
    fn encode_with_id() {
        let event = SseEvent::with_id("123", "data");
        assert_eq!(
            SseEncoder::encode_string(&event),
            "id: 123\nevent: message\ndata: data\n\n"
        );
    }

    #[test]
    fn encode_full_event() {
        let event = SseEvent::builder()
            .id("evt-1")
            .event("update")
            .data("line1\nline2")
            .retry(5000)
            .build();

        assert_eq!(
            SseEncoder::encode_string(&event),
            "id: evt-1\nevent: update\nretry: 5000\ndata: line1\ndata: line2\n\n"
        );
    }

    #[test]
    fn encode_comment() {
        assert_eq!(SseEncoder::encode_comment("keepalive"), b": keepalive\n\n");
    }

    #[test]
    fn encode_keepalive() {
        assert_eq!(SseEncoder::encode_keepalive(), b":\n\n");
    }
}
