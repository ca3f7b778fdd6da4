//! Element-wise streaming of arrays extracted from model output (§4.4).

use futures::{Stream, StreamExt};

use crate::error::LlmError;
use crate::types::OutputSchema;

use super::types::{ChatStream, StreamChunk};

/// One emitted array element: its index, the parsed value, and the raw
/// source substring it was extracted from.
#[derive(Debug, Clone)]
pub struct Element {
    pub index: usize,
    pub value: serde_json::Value,
    pub raw_fragment: String,
}

/// Tracks bracket/brace depth and string/escape state over an accumulating
/// text buffer to find the boundaries of array elements as they complete.
///
/// The target array is whichever `[` appears first in the stream (whether
/// that's the top-level value itself, or nested one or more levels inside a
/// wrapper object such as `{"elements": [...]}`). Elements are the `{...}`
/// values that open and close at exactly that array's immediate-child depth.
struct BoundaryTracker {
    buffer: String,
    depth: i32,
    /// The depth (after entering the bracket) at which the target array's
    /// elements live, once the first `[` has been seen.
    array_child_depth: Option<i32>,
    in_string: bool,
    escaped: bool,
    /// Start offset (in `buffer`) of the element currently being scanned.
    element_start: Option<usize>,
    /// Byte offset up to which `buffer` has already been scanned.
    scanned_up_to: usize,
}

impl BoundaryTracker {
    fn new() -> Self {
        Self {
            buffer: String::new(),
            depth: 0,
            array_child_depth: None,
            in_string: false,
            escaped: false,
            element_start: None,
            scanned_up_to: 0,
        }
    }

    /// Append text and return every element substring that completed as a
    /// result (there may be more than one per delta).
    fn feed(&mut self, text: &str) -> Vec<String> {
        self.buffer.push_str(text);
        let mut completed = Vec::new();

        let bytes = self.buffer.as_bytes();
        let mut i = self.scanned_up_to;
        while i < bytes.len() {
            let c = bytes[i] as char;
            if self.in_string {
                if self.escaped {
                    self.escaped = false;
                } else if c == '\\' {
                    self.escaped = true;
                } else if c == '"' {
                    self.in_string = false;
                }
                i += 1;
                continue;
            }
            match c {
                '"' => self.in_string = true,
                '[' => {
                    self.depth += 1;
                    if self.array_child_depth.is_none() {
                        self.array_child_depth = Some(self.depth);
                    }
                }
                '{' => {
                    if self.array_child_depth == Some(self.depth) && self.element_start.is_none() {
                        self.element_start = Some(i);
                    }
                    self.depth += 1;
                }
                '}' => {
                    self.depth -= 1;
                    if self.array_child_depth == Some(self.depth) {
                        if let Some(start) = self.element_start.take() {
                            completed.push(self.buffer[start..=i].to_string());
                        }
                    }
                }
                ']' => {
                    self.depth -= 1;
                }
                _ => {}
            }
            i += 1;
        }
        self.scanned_up_to = i;
        completed
    }
}

/// Given a running generation stream and an element schema, produce a lazy
/// sequence of successfully-parsed-and-validated elements.
///
/// `on_error` is invoked (synchronously, before the corresponding index would
/// have been emitted) for any fragment that fails to parse or validate; the
/// element is then skipped rather than surfaced on the output stream.
/// `on_complete` fires exactly once, after the underlying stream finishes and
/// any trailing element has been flushed.
pub fn element_stream<FErr, FDone>(
    mut source: ChatStream,
    schema: OutputSchema,
    mut on_error: FErr,
    mut on_complete: FDone,
) -> impl Stream<Item = Element>
where
    FErr: FnMut(LlmError) + Send + 'static,
    FDone: FnMut() + Send + 'static,
{
    async_stream::stream! {
        let mut tracker = BoundaryTracker::new();
        let mut index = 0usize;

        while let Some(item) = source.next().await {
            let chunk = match item {
                Ok(chunk) => chunk,
                Err(e) => {
                    on_error(e);
                    continue;
                }
            };
            let StreamChunk::TextDelta { text } = chunk else { continue };
            for raw_fragment in tracker.feed(&text) {
                match serde_json::from_str::<serde_json::Value>(&raw_fragment) {
                    Ok(value) => match schema.compile() {
                        Ok(validator) => {
                            if validator.validate(&value).is_err() {
                                let message = validator
                                    .iter_errors(&value)
                                    .map(|e| e.to_string())
                                    .collect::<Vec<_>>()
                                    .join("; ");
                                on_error(LlmError::ProtocolError(format!(
                                    "element {index} failed schema validation: {message}"
                                )));
                            } else {
                                yield Element { index, value, raw_fragment };
                                index += 1;
                            }
                        }
                        Err(e) => on_error(e),
                    },
                    Err(e) => on_error(LlmError::ProtocolError(format!(
                        "element fragment was not valid JSON: {e}"
                    ))),
                }
            }
        }
        on_complete();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FinishReason;

    fn schema() -> OutputSchema {
        OutputSchema::new(serde_json::json!({
            "type": "object",
            "properties": { "name": { "type": "string" }, "qty": { "type": "integer" } },
            "required": ["name", "qty"],
        }))
    }

    fn chunked_text(full: &str, chunk_size: usize) -> ChatStream {
        let chunks: Vec<Result<StreamChunk, LlmError>> = full
            .as_bytes()
            .chunks(chunk_size)
            .map(|c| Ok(StreamChunk::TextDelta { text: String::from_utf8_lossy(c).into_owned() }))
            .chain(std::iter::once(Ok(StreamChunk::Finish {
                finish_reason: FinishReason::Stop,
                usage: None,
            })))
            .collect();
        Box::pin(futures::stream::iter(chunks))
    }

    #[tokio::test]
    async fn emits_elements_in_order_as_they_close() {
        let full = r#"{"items":[{"name":"a","qty":1},{"name":"b","qty":2},{"name":"c","qty":3}]}"#;
        let stream = chunked_text(full, 20);
        let errors = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let completes = std::sync::Arc::new(std::sync::Mutex::new(0));
        let errors_clone = errors.clone();
        let completes_clone = completes.clone();

        let elements: Vec<Element> = element_stream(
            stream,
            schema(),
            move |e| errors_clone.lock().unwrap().push(e),
            move || *completes_clone.lock().unwrap() += 1,
        )
        .collect()
        .await;

        assert_eq!(elements.len(), 3);
        assert_eq!(elements[0].index, 0);
        assert_eq!(elements[0].value["name"], "a");
        assert_eq!(elements[1].value["name"], "b");
        assert_eq!(elements[2].value["name"], "c");
        assert!(errors.lock().unwrap().is_empty());
        assert_eq!(*completes.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn schema_violation_is_reported_and_skipped() {
        let full = r#"{"items":[{"name":"a","qty":"not-a-number"},{"name":"b","qty":2}]}"#;
        let stream = chunked_text(full, 1024);
        let errors = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let errors_clone = errors.clone();

        let elements: Vec<Element> =
            element_stream(stream, schema(), move |e| errors_clone.lock().unwrap().push(e), || {})
                .collect()
                .await;

        assert_eq!(elements.len(), 1);
        assert_eq!(elements[0].value["name"], "b");
        assert_eq!(errors.lock().unwrap().len(), 1);
    }
}
