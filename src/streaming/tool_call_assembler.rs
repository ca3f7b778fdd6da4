//! Reassembly of partial tool-call chunks into complete calls (§4.3 "Tool calls in streams").

use std::collections::BTreeMap;

use crate::types::ToolCall;

#[derive(Default)]
struct Accumulator {
    id: Option<String>,
    name: Option<String>,
    arguments: String,
}

/// Accumulates [`super::types::StreamChunk::ToolCallDelta`] fragments keyed by
/// index and promotes a call to fully-formed once its `arguments` fragment
/// parses as valid JSON (or the caller forces a best-effort finalization at
/// stream end).
#[derive(Default)]
pub struct ToolCallAssembler {
    by_index: BTreeMap<usize, Accumulator>,
}

impl ToolCallAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one delta. Returns `Some(ToolCall)` the moment this index's
    /// accumulated arguments first become valid JSON; further deltas for an
    /// already-promoted index are ignored (a provider that then sends more
    /// data for the same index is violating the framing contract).
    pub fn push_delta(
        &mut self,
        index: usize,
        id: Option<String>,
        name: Option<String>,
        arguments_fragment: &str,
    ) -> Option<ToolCall> {
        let acc = self.by_index.entry(index).or_default();
        if let Some(id) = id {
            acc.id = Some(id);
        }
        if let Some(name) = name {
            acc.name = Some(name);
        }
        acc.arguments.push_str(arguments_fragment);

        let parsed: serde_json::Value = serde_json::from_str(&acc.arguments).ok()?;
        let id = acc.id.clone()?;
        let name = acc.name.clone()?;
        self.by_index.remove(&index);
        Some(ToolCall { id, tool_name: name, arguments: parsed })
    }

    /// At stream end, attempt a best-effort parse of every call still
    /// accumulating (the finish chunk implies no more fragments are coming).
    pub fn finalize(mut self) -> Vec<ToolCall> {
        let mut out = Vec::new();
        for (_, acc) in std::mem::take(&mut self.by_index) {
            let (Some(id), Some(name)) = (acc.id, acc.name) else { continue };
            if let Ok(parsed) = serde_json::from_str(&acc.arguments) {
                out.push(ToolCall { id, tool_name: name, arguments: parsed });
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_complete_chunk_promotes_immediately() {
        let mut assembler = ToolCallAssembler::new();
        let call = assembler.push_delta(
            0,
            Some("call_1".into()),
            Some("search".into()),
            "{\"query\":\"Go\"}",
        );
        assert!(call.is_some());
        let call = call.unwrap();
        assert_eq!(call.id, "call_1");
        assert_eq!(call.arguments["query"], "Go");
    }

    #[test]
    fn fragmented_arguments_accrete_until_valid_json() {
        let mut assembler = ToolCallAssembler::new();
        assert!(assembler.push_delta(0, Some("call_1".into()), Some("search".into()), "{\"que").is_none());
        assert!(assembler.push_delta(0, None, None, "ry\":\"Go").is_none());
        let call = assembler.push_delta(0, None, None, "\"}").unwrap();
        assert_eq!(call.arguments["query"], "Go");
    }

    #[test]
    fn distinct_indices_accumulate_independently() {
        let mut assembler = ToolCallAssembler::new();
        assembler.push_delta(0, Some("a".into()), Some("f1".into()), "{\"x\":1");
        assembler.push_delta(1, Some("b".into()), Some("f2".into()), "{\"y\":2}");
        // index 1 completed, index 0 still partial.
        let finalized = assembler.finalize();
        // index 0 never became valid JSON ("{\"x\":1" missing closing brace).
        assert!(finalized.is_empty());
    }

    #[test]
    fn finalize_best_effort_parses_remaining_fragments() {
        let mut assembler = ToolCallAssembler::new();
        assembler.push_delta(0, Some("a".into()), Some("f1".into()), "{\"x\":1}");
        // Already promoted by push_delta, so finalize should have nothing left.
        assert!(assembler.finalize().is_empty());
    }
}
