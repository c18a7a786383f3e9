//! The emitted stream chunk and the transient per-stream reassembly buffer.
//!
//! Grounded on `original_source/whai/llm.py::_handle_streaming_response`,
//! with one deliberate divergence recorded in SPEC_FULL §9 / DESIGN.md:
//! emission is gated only on `name` being known and the accumulated
//! arguments parsing as a JSON object — never on the presence of any
//! specific field such as `command`. That legacy gate silently dropped MCP
//! tool calls whose schema has no `command` key.

use std::collections::HashMap;

use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum Chunk {
    Text(String),
    ToolCall {
        id: String,
        name: String,
        arguments: Value,
    },
}

/// One raw delta fragment from the provider's stream, already normalized
/// to the shape every backend's SSE payload reduces to.
#[derive(Debug, Clone, Default)]
pub struct RawDelta {
    pub text: Option<String>,
    pub tool_call: Option<RawToolCallDelta>,
}

#[derive(Debug, Clone, Default)]
pub struct RawToolCallDelta {
    pub id: Option<String>,
    pub name: Option<String>,
    pub arguments_fragment: String,
}

#[derive(Debug, Clone, Default)]
struct PartialToolCall {
    name: Option<String>,
    args_acc: String,
}

/// Buffers tool-call fragments across a single stream and emits each
/// complete call exactly once.
#[derive(Debug, Default)]
pub struct StreamReassembler {
    partial: HashMap<String, PartialToolCall>,
    last_seen_id: Option<String>,
}

impl StreamReassembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one raw delta; returns the chunks it yields (zero, one, or —
    /// for a delta carrying both text and a tool-call fragment — two).
    /// Text chunks are filtered if empty, matching the spec's requirement
    /// that empty-content text chunks never reach the caller.
    pub fn feed(&mut self, delta: RawDelta) -> Vec<Chunk> {
        let mut out = Vec::new();

        if let Some(text) = delta.text {
            if !text.is_empty() {
                out.push(Chunk::Text(text));
            }
        }

        if let Some(tc) = delta.tool_call {
            if let Some(chunk) = self.feed_tool_call_delta(tc) {
                out.push(chunk);
            }
        }

        out
    }

    fn feed_tool_call_delta(&mut self, delta: RawToolCallDelta) -> Option<Chunk> {
        let call_id = match delta.id {
            Some(id) => {
                self.last_seen_id = Some(id.clone());
                id
            }
            None => match &self.last_seen_id {
                Some(id) => id.clone(),
                None => {
                    tracing::warn!("tool-call delta with no id and no previous id; skipping");
                    return None;
                }
            },
        };

        let entry = self.partial.entry(call_id.clone()).or_default();
        if let Some(name) = delta.name {
            if entry.name.is_none() {
                entry.name = Some(name);
            }
        }
        entry.args_acc.push_str(&delta.arguments_fragment);

        if entry.args_acc.is_empty() {
            return None;
        }

        let Ok(parsed) = serde_json::from_str::<Value>(&entry.args_acc) else {
            return None;
        };
        if !parsed.is_object() {
            return None;
        }
        let Some(name) = entry.name.clone() else {
            return None;
        };

        self.partial.remove(&call_id);
        Some(Chunk::ToolCall {
            id: call_id,
            name,
            arguments: parsed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> RawDelta {
        RawDelta { text: Some(s.to_string()), tool_call: None }
    }

    fn tc(id: Option<&str>, name: Option<&str>, args: &str) -> RawDelta {
        RawDelta {
            text: None,
            tool_call: Some(RawToolCallDelta {
                id: id.map(str::to_string),
                name: name.map(str::to_string),
                arguments_fragment: args.to_string(),
            }),
        }
    }

    #[test]
    fn text_chunks_emit_immediately_and_empty_ones_are_filtered() {
        let mut r = StreamReassembler::new();
        assert_eq!(r.feed(text("hello")), vec![Chunk::Text("hello".to_string())]);
        assert_eq!(r.feed(text("")), vec![]);
    }

    #[test]
    fn tool_call_split_across_chunks_emits_once_with_concatenated_args() {
        let mut r = StreamReassembler::new();
        assert_eq!(r.feed(tc(Some("call_1"), Some("execute_shell"), "{\"comm")), vec![]);
        assert_eq!(r.feed(tc(None, None, "and\": \"ls\"}")), vec![Chunk::ToolCall {
            id: "call_1".to_string(),
            name: "execute_shell".to_string(),
            arguments: serde_json::json!({"command": "ls"}),
        }]);
    }

    #[test]
    fn emits_once_even_with_empty_object_arguments() {
        let mut r = StreamReassembler::new();
        let out = r.feed(tc(Some("call_2"), Some("mcp_time-server_get_current_time"), "{}"));
        assert_eq!(out, vec![Chunk::ToolCall {
            id: "call_2".to_string(),
            name: "mcp_time-server_get_current_time".to_string(),
            arguments: serde_json::json!({}),
        }]);
    }

    #[test]
    fn does_not_gate_on_a_command_field() {
        // Redesigned behavior: no gate on any specific field inside arguments.
        let mut r = StreamReassembler::new();
        let out = r.feed(tc(Some("call_3"), Some("mcp_weather_get_forecast"), "{\"city\": \"Paris\"}"));
        assert_eq!(out.len(), 1);
        match &out[0] {
            Chunk::ToolCall { arguments, .. } => assert!(arguments.get("command").is_none()),
            _ => panic!("expected tool call"),
        }
    }

    #[test]
    fn two_interleaved_calls_buffer_independently() {
        let mut r = StreamReassembler::new();
        assert_eq!(r.feed(tc(Some("a"), Some("fn_a"), "{\"x\":")), vec![]);
        assert_eq!(r.feed(tc(Some("b"), Some("fn_b"), "{\"y\":2}")), vec![Chunk::ToolCall {
            id: "b".to_string(),
            name: "fn_b".to_string(),
            arguments: serde_json::json!({"y": 2}),
        }]);
        assert_eq!(r.feed(tc(None, None, "1}")), vec![Chunk::ToolCall {
            id: "a".to_string(),
            name: "fn_a".to_string(),
            arguments: serde_json::json!({"x": 1}),
        }]);
    }

    #[test]
    fn malformed_json_never_emits() {
        let mut r = StreamReassembler::new();
        assert_eq!(r.feed(tc(Some("c"), Some("fn_c"), "not json")), vec![]);
        assert!(r.partial.contains_key("c"));
    }

    #[test]
    fn fragment_with_no_id_and_no_prior_id_is_skipped() {
        let mut r = StreamReassembler::new();
        assert_eq!(r.feed(tc(None, Some("fn_d"), "{}")), vec![]);
    }
}
