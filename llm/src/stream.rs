//! SSE streaming proxy (spec.md §4.9). Grounded on the teacher's
//! chunked-read relay shape (`bytes_stream()` + a forwarding channel, the
//! same bridging idiom `rust/gateway`'s websocket loop and the pack's
//! `generate_stream` both use), generalized from "decode NDJSON tokens"
//! to "forward raw bytes verbatim" per spec.md §9's "Streaming without
//! reframing" note.

use axum::body::Body;
use bytes::Bytes;
use futures_util::StreamExt;
use serde::Serialize;
use std::time::Instant;
use tokio::sync::{mpsc, oneshot};
use tokio_stream::wrappers::ReceiverStream;

/// Stats recorded for the access log record (spec.md §3/§4.9 step 7),
/// resolved once the upstream stream has fully closed.
#[derive(Debug, Clone)]
pub struct StreamStats {
    pub status_code: u16,
    pub first_byte_ms: Option<u64>,
    pub total_latency_ms: u64,
}

/// Mirrors the field order spec.md §4.9 step 6 specifies on the wire
/// (`message`, `type`, `code`) — `serde_json::json!` would emit them
/// alphabetically, which doesn't match the documented byte contract.
#[derive(Serialize)]
struct SseErrorBody<'a> {
    error: SseErrorDetail<'a>,
}

#[derive(Serialize)]
struct SseErrorDetail<'a> {
    message: &'a str,
    #[serde(rename = "type")]
    kind: &'a str,
    code: &'a str,
}

fn error_event_line(message: &str, code: &str) -> String {
    let body = SseErrorBody {
        error: SseErrorDetail { message, kind: "server_error", code },
    };
    format!("data: {}\n\n", serde_json::to_string(&body).expect("SseErrorBody always serializes"))
}

/// Relays `upstream`'s bytes verbatim to the returned [`Body`] when the
/// upstream status is < 400. When the upstream status is >= 400, bytes are
/// buffered instead of forwarded, and exactly two SSE events (`error` then
/// `[DONE]`) are emitted to the client once the upstream body is fully
/// read (spec.md §4.9 steps 5-6).
pub fn proxy(upstream: reqwest::Response, request_start: Instant) -> (Body, oneshot::Receiver<StreamStats>) {
    let status = upstream.status().as_u16();
    let (tx, rx) = mpsc::channel::<Result<Bytes, std::io::Error>>(16);
    let (stats_tx, stats_rx) = oneshot::channel();

    tokio::spawn(async move {
        let mut upstream_stream = upstream.bytes_stream();
        let mut first_byte_ms: Option<u64> = None;
        let mut error_buffer: Vec<u8> = Vec::new();

        while let Some(chunk) = upstream_stream.next().await {
            let bytes = match chunk {
                Ok(b) => b,
                Err(_) => break,
            };
            if first_byte_ms.is_none() {
                first_byte_ms = Some(request_start.elapsed().as_millis() as u64);
            }
            if status < 400 {
                if tx.send(Ok(bytes)).await.is_err() {
                    break;
                }
            } else {
                error_buffer.extend_from_slice(&bytes);
            }
        }

        if status >= 400 {
            let message = extract_error_message(&error_buffer)
                .unwrap_or_else(|| "Upstream error".to_string());
            let error_event = error_event_line(&message, "upstream_error");
            let _ = tx.send(Ok(Bytes::from(error_event))).await;
            let _ = tx.send(Ok(Bytes::from("data: [DONE]\n\n"))).await;
        }

        let _ = stats_tx.send(StreamStats {
            status_code: status,
            first_byte_ms,
            total_latency_ms: request_start.elapsed().as_millis() as u64,
        });
    });

    let body = Body::from_stream(ReceiverStream::new(rx));
    (body, stats_rx)
}

fn extract_error_message(buffer: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(buffer).ok()?;
    value
        .get("error")
        .and_then(|e| e.get("message"))
        .and_then(|m| m.as_str())
        .map(|s| s.to_string())
}

/// Builds the two SSE error events directly, for the case where routing
/// fails before any upstream connection is opened (spec.md §4.11: neither
/// provider ready → 503, delivered as SSE error+DONE when streaming).
pub fn error_events(message: &str, code: &str) -> Body {
    let error_event = error_event_line(message, code);
    let done_event = "data: [DONE]\n\n".to_string();
    Body::from(format!("{error_event}{done_event}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_error_message_from_buffered_body() {
        let buf = br#"{"error":{"message":"boom"}}"#;
        assert_eq!(extract_error_message(buf), Some("boom".to_string()));
    }

    #[test]
    fn missing_message_falls_back_to_none() {
        assert_eq!(extract_error_message(b"not json"), None);
    }

    #[test]
    fn error_event_line_preserves_message_type_code_order() {
        let line = error_event_line("boom", "upstream_error");
        assert_eq!(
            line,
            "data: {\"error\":{\"message\":\"boom\",\"type\":\"server_error\",\"code\":\"upstream_error\"}}\n\n"
        );
    }
}
