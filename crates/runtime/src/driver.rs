//! Conversation Driver: the per-turn state machine (spec §4.7).
//!
//! `Sending → Streaming → Reaped → (Done | Approve each → Execute each
//! serially → Append → Sending)`. Serial execution is spec-mandated (§5):
//! approval is interactive, so parallel tool execution is forbidden.

use serde_json::Value;

use whai_exec::approval::PromptReader;
use whai_llm::{ChatMessage, LlmProvider, ToolCall, ToolCallFunction};
use whai_mcp::McpManager;

use crate::dispatch::dispatch_tool_call;
use crate::error::WhaiError;

/// Token budget a single tool-result is truncated to before it is appended
/// to the message list (spec §4.3: truncation "is applied ... to every
/// tool-result before it is appended to the message list", grounded on
/// `original_source/whai/core/executor.py`'s `TOOL_OUTPUT_MAX_TOKENS`).
pub const TOOL_OUTPUT_MAX_TOKENS: usize = 2000;

/// Why the driver stopped requesting further model turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    NoToolCalls,
    AllRejected,
    EmptyPrimaryArgument,
}

/// Callbacks the CLI supplies so the driver stays decoupled from terminal
/// rendering (`colored`/`indicatif` live in the binary, not here).
pub trait TurnSink {
    fn on_text_chunk(&mut self, text: &str);
    fn on_tool_call_requested(&mut self, call: &ToolCall);
}

pub struct ConversationDriver<'a> {
    provider: &'a LlmProvider,
    mcp: &'a McpManager,
    tools: Vec<Value>,
    timeout_secs: u64,
}

impl<'a> ConversationDriver<'a> {
    pub fn new(provider: &'a LlmProvider, mcp: &'a McpManager, tools: Vec<Value>, timeout_secs: u64) -> Self {
        Self { provider, mcp, tools, timeout_secs }
    }

    /// Drive turns until one of the termination conditions in spec §4.7
    /// fires. `messages` is mutated in place (the ordered sequence the
    /// driver appends to across turns).
    pub async fn run(
        &self,
        messages: &mut Vec<ChatMessage>,
        sink: &mut dyn TurnSink,
        reader: &mut dyn PromptReader,
    ) -> Result<EndReason, WhaiError> {
        loop {
            let (text, tool_calls) = self.stream_one_turn(messages, sink).await?;

            if tool_calls.is_empty() {
                messages.push(ChatMessage::assistant(text));
                return Ok(EndReason::NoToolCalls);
            }

            for call in &tool_calls {
                sink.on_tool_call_requested(call);
            }
            messages.push(ChatMessage::assistant_with_tool_calls(text, tool_calls.clone()));

            let mut any_executed = false;
            let mut any_empty_primary = false;
            let mut any_rejected = false;

            for call in &tool_calls {
                let outcome = dispatch_tool_call(call, self.timeout_secs, self.mcp, reader).await;
                let (truncated_result, _) =
                    whai_context::truncate(&outcome.tool_result, TOOL_OUTPUT_MAX_TOKENS);
                messages.push(ChatMessage::tool_result(call.id.clone(), truncated_result));
                if outcome.executed {
                    any_executed = true;
                } else {
                    any_rejected = true;
                }
            }

            if !any_executed {
                // Distinguish "every call was a no-op because its primary
                // argument was empty" from "every call was rejected by the
                // user" — both end the turn loop, but spec §4.7 lists them
                // as distinct termination conditions.
                any_empty_primary = any_rejected
                    && tool_calls.iter().all(|c| {
                        c.function.name == "execute_shell"
                            && c.function
                                .arguments
                                .get("command")
                                .and_then(|v| v.as_str())
                                .unwrap_or("")
                                .trim()
                                .is_empty()
                    });
                return Ok(if any_empty_primary {
                    EndReason::EmptyPrimaryArgument
                } else {
                    EndReason::AllRejected
                });
            }
        }
    }

    async fn stream_one_turn(
        &self,
        messages: &[ChatMessage],
        sink: &mut dyn TurnSink,
    ) -> Result<(String, Vec<ToolCall>), WhaiError> {
        let mut rx = self
            .provider
            .send_message_stream(messages.to_vec(), Some(self.tools.clone()))
            .await;

        let mut text = String::new();
        let mut tool_calls = Vec::new();

        while let Some(item) = rx.recv().await {
            match item? {
                whai_llm::Chunk::Text(t) => {
                    sink.on_text_chunk(&t);
                    text.push_str(&t);
                }
                whai_llm::Chunk::ToolCall { id, name, arguments } => {
                    tool_calls.push(ToolCall {
                        id,
                        r#type: "function".to_string(),
                        function: ToolCallFunction { name, arguments },
                    });
                }
            }
        }

        Ok((text, tool_calls))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullSink;
    impl TurnSink for NullSink {
        fn on_text_chunk(&mut self, _text: &str) {}
        fn on_tool_call_requested(&mut self, _call: &ToolCall) {}
    }

    #[test]
    fn end_reason_variants_are_distinguishable() {
        assert_ne!(EndReason::NoToolCalls, EndReason::AllRejected);
        assert_ne!(EndReason::AllRejected, EndReason::EmptyPrimaryArgument);
    }

    #[test]
    fn tool_output_budget_truncates_oversized_results() {
        let huge = "x".repeat(TOOL_OUTPUT_MAX_TOKENS * 8);
        let (truncated, was_truncated) = whai_context::truncate(&huge, TOOL_OUTPUT_MAX_TOKENS);
        assert!(was_truncated);
        assert!(truncated.len() < huge.len());
    }

    #[test]
    fn null_sink_compiles_against_the_trait() {
        let mut sink = NullSink;
        sink.on_text_chunk("x");
    }
}
