//! Provider-agnostic streaming LLM client.
//!
//! Credentials are propagated into the process environment once, at
//! construction (Design Note: "no global mutable state for configuration" —
//! this is the one write-once exception the spec calls out explicitly).
//! Every backend is driven over the OpenAI-compatible `/chat/completions`
//! wire shape, which OpenAI, Azure OpenAI, Ollama, LM Studio, and
//! OpenRouter-style gateways for Anthropic/Gemini all accept — this mirrors
//! `original_source/whai/llm.py`'s reliance on LiteLLM to normalize every
//! backend onto one request/response shape; see DESIGN.md for the explicit
//! Open Question resolution.

use std::env;

use reqwest::Client;
use serde_json::{json, Value};
use tokio::sync::mpsc;

use whai_config::AppConfig;

use crate::chunk::{Chunk, RawDelta, RawToolCallDelta, StreamReassembler};
use crate::error::{LlmError, LlmErrorKind};
use crate::message::{ChatMessage, ChatRole, ToolCall, ToolCallFunction};

/// The built-in shell tool, always offered unless the caller passes an
/// explicit (possibly empty) tool list.
pub fn execute_shell_tool() -> Value {
    json!({
        "type": "function",
        "function": {
            "name": "execute_shell",
            "description": "Execute a shell command in the terminal. Use this when you need to run commands to help the user.",
            "parameters": {
                "type": "object",
                "properties": {
                    "command": {
                        "type": "string",
                        "description": "The shell command to execute (e.g., 'ls -la', 'grep error log.txt')"
                    }
                },
                "required": ["command"]
            }
        }
    })
}

pub struct LlmProvider {
    client: Client,
    provider_id: String,
    model: String,
    temperature: Option<f32>,
    api_base: Option<String>,
    api_key: Option<String>,
    api_version: Option<String>,
}

impl LlmProvider {
    /// Reads `config.llm.providers[config.llm.default_provider]` and writes
    /// its credentials into the environment the way the backend SDK would
    /// expect (`OPENAI_API_KEY`, `ANTHROPIC_API_KEY`, `AZURE_API_KEY` /
    /// `AZURE_API_BASE` / `AZURE_API_VERSION`, `OLLAMA_API_BASE`).
    pub fn new(config: &AppConfig, model: String, temperature: Option<f32>) -> Self {
        let provider_id = config.llm.default_provider.clone();
        let provider_cfg = config.llm.providers.get(&provider_id).cloned().unwrap_or_default();

        match provider_id.as_str() {
            "openai" => {
                if let Some(key) = &provider_cfg.api_key {
                    // SAFETY: single-threaded, set-once at startup before any
                    // other component reads the environment.
                    unsafe { env::set_var("OPENAI_API_KEY", key) };
                }
            }
            "anthropic" => {
                if let Some(key) = &provider_cfg.api_key {
                    unsafe { env::set_var("ANTHROPIC_API_KEY", key) };
                }
            }
            "azure_openai" => {
                if let Some(key) = &provider_cfg.api_key {
                    unsafe { env::set_var("AZURE_API_KEY", key) };
                }
                if let Some(base) = &provider_cfg.api_base {
                    unsafe { env::set_var("AZURE_API_BASE", base) };
                }
                if let Some(version) = &provider_cfg.api_version {
                    unsafe { env::set_var("AZURE_API_VERSION", version) };
                }
            }
            "ollama" => {
                if let Some(base) = &provider_cfg.api_base {
                    unsafe { env::set_var("OLLAMA_API_BASE", base) };
                }
            }
            _ => {}
        }

        Self {
            client: Client::new(),
            provider_id,
            model,
            temperature,
            api_base: provider_cfg.api_base.clone(),
            api_key: provider_cfg.api_key.clone(),
            api_version: provider_cfg.api_version.clone(),
        }
    }

    fn endpoint(&self) -> String {
        if let Some(base) = &self.api_base {
            let base = base.trim_end_matches('/');
            return if self.provider_id == "azure_openai" {
                let version = self.api_version.as_deref().unwrap_or("2024-02-01");
                format!("{base}/chat/completions?api-version={version}")
            } else {
                format!("{base}/chat/completions")
            };
        }
        match self.provider_id.as_str() {
            "anthropic" => "https://api.anthropic.com/v1/chat/completions".to_string(),
            "gemini" => {
                "https://generativelanguage.googleapis.com/v1beta/openai/chat/completions"
                    .to_string()
            }
            _ => "https://api.openai.com/v1/chat/completions".to_string(),
        }
    }

    fn build_payload(&self, messages: &[ChatMessage], tools: Option<&[Value]>, tool_choice: Option<&Value>, stream: bool) -> Value {
        let mut payload = json!({
            "model": self.model,
            "messages": messages_to_wire(messages),
            "stream": stream,
            "drop_params": true,
        });

        if let Some(t) = self.temperature {
            if whai_config::model_supports_temperature(&self.model) {
                payload["temperature"] = json!(t);
            }
        }

        // An explicit empty tool list must not be sent — some backends
        // misbehave when given `"tools": []`.
        if let Some(tools) = tools {
            if !tools.is_empty() {
                payload["tools"] = json!(tools);
            }
        }

        if let Some(choice) = tool_choice {
            payload["tool_choice"] = choice.clone();
        }

        payload
    }

    fn authed_request(&self, url: &str) -> reqwest::RequestBuilder {
        let mut req = self.client.post(url);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }
        req
    }

    /// Stream a response. Spawns the HTTP request on a background task and
    /// returns a channel the driver reads chunks from in arrival order —
    /// the same shape as the original's generator-based
    /// `_handle_streaming_response`, adapted to Rust's lack of a
    /// synchronous-looking generator.
    pub async fn send_message_stream(
        &self,
        messages: Vec<ChatMessage>,
        tools: Option<Vec<Value>>,
    ) -> mpsc::Receiver<Result<Chunk, LlmError>> {
        let (tx, rx) = mpsc::channel(32);
        let payload = self.build_payload(&messages, tools.as_deref(), None, true);
        let url = self.endpoint();
        let request = self.authed_request(&url).json(&payload);
        let provider_id = self.provider_id.clone();
        let model = self.model.clone();

        tokio::spawn(async move {
            let response = match request.send().await {
                Ok(r) => r,
                Err(e) => {
                    let _ = tx.send(Err(LlmError::network(&provider_id, &model, &e.to_string()))).await;
                    return;
                }
            };

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let _ = tx
                    .send(Err(LlmError::from_http(&provider_id, &model, status.as_u16(), &body)))
                    .await;
                return;
            }

            let mut reassembler = StreamReassembler::new();
            let mut response = response;
            let mut pending_line = String::new();

            loop {
                let next = response.chunk().await;
                let bytes = match next {
                    Ok(Some(b)) => b,
                    Ok(None) => break,
                    Err(e) => {
                        let _ = tx.send(Err(LlmError::network(&provider_id, &model, &e.to_string()))).await;
                        return;
                    }
                };
                pending_line.push_str(&String::from_utf8_lossy(&bytes));

                while let Some(pos) = pending_line.find('\n') {
                    let line = pending_line[..pos].trim().to_string();
                    pending_line.drain(..=pos);

                    if line.is_empty() || line == "data: [DONE]" {
                        continue;
                    }
                    let Some(data) = line.strip_prefix("data: ") else { continue };
                    let Ok(parsed) = serde_json::from_str::<Value>(data) else { continue };

                    for delta in extract_deltas(&parsed) {
                        for chunk in reassembler.feed(delta) {
                            if tx.send(Ok(chunk)).await.is_err() {
                                return;
                            }
                        }
                    }
                }
            }
        });

        rx
    }

    /// Non-streaming fallback path. A malformed individual tool call is
    /// logged and skipped, never fatal to the whole response.
    pub async fn send_message(
        &self,
        messages: Vec<ChatMessage>,
        tools: Option<Vec<Value>>,
    ) -> Result<(String, Vec<ToolCall>), LlmError> {
        let payload = self.build_payload(&messages, tools.as_deref(), None, false);
        let url = self.endpoint();

        let response = self
            .authed_request(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| LlmError::network(&self.provider_id, &self.model, &e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::from_http(&self.provider_id, &self.model, status.as_u16(), &body));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| LlmError::network(&self.provider_id, &self.model, &e.to_string()))?;

        let choice = body.get("choices").and_then(|c| c.get(0));
        let message = choice.and_then(|c| c.get("message"));
        let content = message
            .and_then(|m| m.get("content"))
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string();

        let mut tool_calls = Vec::new();
        if let Some(raw_calls) = message.and_then(|m| m.get("tool_calls")).and_then(|v| v.as_array()) {
            for raw in raw_calls {
                let Some(id) = raw.get("id").and_then(|v| v.as_str()) else { continue };
                let Some(name) = raw.get("function").and_then(|f| f.get("name")).and_then(|v| v.as_str()) else {
                    continue;
                };
                let raw_args = raw
                    .get("function")
                    .and_then(|f| f.get("arguments"))
                    .and_then(|v| v.as_str())
                    .unwrap_or("{}");
                let arguments = match serde_json::from_str::<Value>(raw_args) {
                    Ok(v) => v,
                    Err(e) => {
                        tracing::warn!(tool = name, error = %e, raw = raw_args, "failed to parse tool arguments; skipping call");
                        continue;
                    }
                };
                tool_calls.push(ToolCall {
                    id: id.to_string(),
                    r#type: "function".to_string(),
                    function: ToolCallFunction { name: name.to_string(), arguments },
                });
            }
        }

        Ok((content, tool_calls))
    }
}

/// Pull text/tool-call deltas out of one SSE JSON event, normalized to
/// [`RawDelta`]s the reassembler understands.
fn extract_deltas(event: &Value) -> Vec<RawDelta> {
    let mut out = Vec::new();
    let Some(delta) = event.get("choices").and_then(|c| c.get(0)).and_then(|c| c.get("delta")) else {
        return out;
    };

    if let Some(content) = delta.get("content").and_then(|v| v.as_str()) {
        if !content.is_empty() {
            out.push(RawDelta { text: Some(content.to_string()), tool_call: None });
        }
    }

    if let Some(tool_calls) = delta.get("tool_calls").and_then(|v| v.as_array()) {
        for tc in tool_calls {
            let id = tc.get("id").and_then(|v| v.as_str()).map(str::to_string);
            let func = tc.get("function");
            let name = func.and_then(|f| f.get("name")).and_then(|v| v.as_str()).map(str::to_string);
            let args = func
                .and_then(|f| f.get("arguments"))
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string();
            out.push(RawDelta {
                text: None,
                tool_call: Some(RawToolCallDelta { id, name, arguments_fragment: args }),
            });
        }
    }

    out
}

fn messages_to_wire(messages: &[ChatMessage]) -> Vec<Value> {
    messages
        .iter()
        .map(|m| {
            let role = match m.role {
                ChatRole::System => "system",
                ChatRole::User => "user",
                ChatRole::Assistant => "assistant",
                ChatRole::Tool => "tool",
            };
            let mut wire = json!({ "role": role, "content": m.content });
            if !m.tool_calls.is_empty() {
                let calls: Vec<Value> = m
                    .tool_calls
                    .iter()
                    .map(|tc| {
                        json!({
                            "id": tc.id,
                            "type": "function",
                            "function": {
                                "name": tc.function.name,
                                "arguments": tc.function.arguments.to_string(),
                            }
                        })
                    })
                    .collect();
                wire["tool_calls"] = json!(calls);
            }
            if let Some(id) = &m.tool_call_id {
                wire["tool_call_id"] = json!(id);
            }
            wire
        })
        .collect()
}

impl std::fmt::Debug for LlmProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmProvider")
            .field("provider_id", &self.provider_id)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_payload_omits_temperature_for_gpt5_family() {
        let provider = LlmProvider {
            client: Client::new(),
            provider_id: "openai".to_string(),
            model: "gpt-5-mini".to_string(),
            temperature: Some(0.7),
            api_base: None,
            api_key: None,
            api_version: None,
        };
        let payload = provider.build_payload(&[], None, None, false);
        assert!(payload.get("temperature").is_none());
    }

    #[test]
    fn build_payload_includes_temperature_when_supported() {
        let provider = LlmProvider {
            client: Client::new(),
            provider_id: "openai".to_string(),
            model: "gpt-4o".to_string(),
            temperature: Some(0.2),
            api_base: None,
            api_key: None,
            api_version: None,
        };
        let payload = provider.build_payload(&[], None, None, false);
        assert_eq!(payload.get("temperature").and_then(|v| v.as_f64()), Some(0.2));
    }

    #[test]
    fn build_payload_omits_empty_tool_list() {
        let provider = LlmProvider {
            client: Client::new(),
            provider_id: "openai".to_string(),
            model: "gpt-4o".to_string(),
            temperature: None,
            api_base: None,
            api_key: None,
            api_version: None,
        };
        let payload = provider.build_payload(&[], Some(&[]), None, false);
        assert!(payload.get("tools").is_none());
    }

    #[test]
    fn azure_endpoint_includes_api_version() {
        let provider = LlmProvider {
            client: Client::new(),
            provider_id: "azure_openai".to_string(),
            model: "gpt-4o".to_string(),
            temperature: None,
            api_base: Some("https://my-resource.openai.azure.com".to_string()),
            api_key: None,
            api_version: Some("2024-06-01".to_string()),
        };
        assert!(provider.endpoint().contains("api-version=2024-06-01"));
    }

    #[test]
    fn extract_deltas_handles_text_and_tool_call_in_one_event() {
        let event = json!({
            "choices": [{
                "delta": {
                    "content": "hi",
                    "tool_calls": [{"id": "c1", "function": {"name": "execute_shell", "arguments": "{}"}}]
                }
            }]
        });
        let deltas = extract_deltas(&event);
        assert_eq!(deltas.len(), 2);
    }
}
