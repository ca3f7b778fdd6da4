//! Server-sent-event transport: bytes → JSON payloads (§4.3 "Transport").
//!
//! Framing itself (accumulate until a blank line, treat the accumulated
//! `data:` field as one event) is delegated to `eventsource-stream`'s
//! [`eventsource_stream::Eventsource`] extension trait rather than
//! hand-rolled, matching how the rest of this codebase consumes SSE bodies.

use std::pin::Pin;

use eventsource_stream::Eventsource;
use futures::{Stream, StreamExt};

use crate::error::LlmError;

/// The sentinel payload that terminates an OpenAI-compatible SSE stream.
pub const DONE_SENTINEL: &str = "[DONE]";

/// Convert a stream of response body bytes into a stream of parsed JSON event
/// payloads. Blank `data:` fields are skipped; `[DONE]` ends the stream
/// cleanly; anything else that fails to parse as JSON is a [`LlmError::ProtocolError`].
pub fn json_event_stream<S, E>(
    byte_stream: S,
) -> Pin<Box<dyn Stream<Item = Result<serde_json::Value, LlmError>> + Send>>
where
    S: Stream<Item = Result<bytes::Bytes, E>> + Send + 'static,
    E: std::error::Error + Send + Sync + 'static,
{
    let mut sse = byte_stream.eventsource();
    let out = async_stream::stream! {
        while let Some(event) = sse.next().await {
            let event = match event {
                Ok(event) => event,
                Err(e) => {
                    yield Err(LlmError::ProtocolError(format!("malformed SSE framing: {e}")));
                    return;
                }
            };

            let data = event.data.trim();
            if data.is_empty() {
                continue;
            }
            if data == DONE_SENTINEL {
                return;
            }

            match serde_json::from_str::<serde_json::Value>(data) {
                Ok(value) => yield Ok(value),
                Err(e) => {
                    yield Err(LlmError::ProtocolError(format!(
                        "non-JSON SSE payload: {e} (payload: {data})"
                    )));
                    return;
                }
            }
        }
    };
    Box::pin(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn byte_chunks(lines: &[&str]) -> impl Stream<Item = Result<bytes::Bytes, std::io::Error>> {
        let payload = lines.join("\n");
        futures::stream::iter(vec![Ok(bytes::Bytes::from(payload))])
    }

    #[tokio::test]
    async fn parses_json_events_and_stops_at_done() {
        let lines = [
            "data: {\"choices\":[{\"delta\":{\"content\":\"hi\"}}]}",
            "",
            "data: [DONE]",
            "",
        ];
        let mut stream = json_event_stream(byte_chunks(&lines));
        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(first["choices"][0]["delta"]["content"], "hi");
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn blank_data_is_skipped_not_erred() {
        let lines = ["data: {\"a\":1}", "", "data:", "", "data: [DONE]", ""];
        let mut stream = json_event_stream(byte_chunks(&lines));
        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(first["a"], 1);
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn non_json_payload_is_a_protocol_error() {
        let lines = ["data: not json at all", ""];
        let mut stream = json_event_stream(byte_chunks(&lines));
        let err = stream.next().await.unwrap().unwrap_err();
        assert!(matches!(err, LlmError::ProtocolError(_)));
    }
}
