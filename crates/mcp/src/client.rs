//! One stdio connection to an MCP server: connect, list tools, call a tool.
//!
//! Grounded on `querymt-querymt/crates/querymt/src/mcp/config.rs` (child
//! process transport + `ClientInfo::serve`) and
//! `other_examples/.../mcpmux-mcp-mux__crates-mcpmux-mcp-src-transports.rs`
//! (`.peer().list_tools()` / `.peer().call_tool()` shape).

use std::collections::HashMap;
use std::process::Stdio;

use anyhow::{bail, Context, Result};
use rmcp::model::{
    CallToolRequestParam, CallToolResult, ClientCapabilities, ClientInfo, Implementation, Tool,
};
use rmcp::service::RunningService;
use rmcp::transport::TokioChildProcess;
use rmcp::{RoleClient, ServiceExt};
use tokio::process::Command;

/// `{ server_name, command, args, env, requires_approval }` — the subset
/// of `McpServerConfig` a client needs to connect.
pub struct ServerDescriptor {
    pub server_name: String,
    pub command: String,
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
    pub requires_approval: bool,
}

pub struct McpClient {
    pub server_name: String,
    pub requires_approval: bool,
    service: RunningService<RoleClient, ClientInfo>,
}

impl McpClient {
    pub async fn connect(descriptor: ServerDescriptor) -> Result<Self> {
        let mut cmd = Command::new(&descriptor.command);
        cmd.args(&descriptor.args)
            .envs(&descriptor.env)
            .stdout(Stdio::piped())
            .stdin(Stdio::piped())
            .stderr(Stdio::null());

        let transport = TokioChildProcess::new(cmd).with_context(|| {
            format!(
                "failed to spawn MCP server process for '{}'",
                descriptor.server_name
            )
        })?;

        let client_info = ClientInfo {
            protocol_version: Default::default(),
            capabilities: ClientCapabilities::default(),
            client_info: Implementation {
                name: "whai".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        };

        let service = client_info
            .serve(transport)
            .await
            .with_context(|| format!("MCP handshake with '{}' failed", descriptor.server_name))?;

        tracing::info!(server = %descriptor.server_name, "connected to MCP server");

        Ok(Self {
            server_name: descriptor.server_name,
            requires_approval: descriptor.requires_approval,
            service,
        })
    }

    /// Raw tool list from the server, not yet prefixed.
    pub async fn list_tools(&self) -> Result<Vec<Tool>> {
        let result = self
            .service
            .peer()
            .list_tools(Default::default())
            .await
            .with_context(|| format!("list_tools failed for '{}'", self.server_name))?;
        Ok(result.tools)
    }

    /// `tool_name` here is the *unprefixed* name already routed by the
    /// manager — e.g. `get_current_time`, not `mcp_time-server_get_current_time`.
    pub async fn call_tool(
        &self,
        tool_name: &str,
        arguments: serde_json::Map<String, serde_json::Value>,
    ) -> Result<CallToolResult> {
        self.service
            .peer()
            .call_tool(CallToolRequestParam {
                name: tool_name.to_string().into(),
                arguments: Some(arguments),
            })
            .await
            .with_context(|| {
                format!("tool call '{tool_name}' failed on server '{}'", self.server_name)
            })
    }

    pub async fn close(self) -> Result<()> {
        self.service
            .cancel()
            .await
            .with_context(|| format!("failed to close MCP client '{}'", self.server_name))?;
        Ok(())
    }
}

/// Render a tool-call result's content blocks into plain text for the
/// conversation's tool message.
pub fn render_call_result(result: &CallToolResult) -> String {
    let mut out = String::new();
    for item in &result.content {
        if let Some(text) = item.as_text() {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(&text.text);
        }
    }
    if out.is_empty() {
        out = "(tool produced no text output)".to_string();
    }
    out
}

/// Convert an MCP JSON-schema tool input into the provider's function
/// parameter schema shape: `{type: object, properties, required}`.
pub fn convert_schema(schema: &serde_json::Map<String, serde_json::Value>) -> serde_json::Value {
    if schema.get("properties").is_some() {
        return serde_json::json!({
            "type": "object",
            "properties": schema.get("properties").cloned().unwrap_or_else(|| serde_json::json!({})),
            "required": schema.get("required").cloned().unwrap_or_else(|| serde_json::json!([])),
        });
    }
    serde_json::json!({
        "type": "object",
        "properties": schema,
        "required": [],
    })
}

pub fn validate_server_command_exists(command: &str) -> bool {
    which::which(command).is_ok() || std::path::Path::new(command).is_file()
}

/// Only checks the *last* arg that looks like a script path (matching the
/// original's `reversed(args)` scan), and only when it's absolute.
pub fn validate_script_arg(args: &[String]) -> Result<()> {
    for arg in args.iter().rev() {
        let looks_like_script = arg.ends_with(".py") || arg.ends_with(".js") || arg.ends_with(".sh");
        if looks_like_script || arg.contains('/') || arg.contains('\\') {
            let path = std::path::Path::new(arg);
            if path.is_absolute() {
                if !path.exists() {
                    bail!("Server script not found: {}", path.display());
                }
                if !path.is_file() {
                    bail!("Server script path is not a file: {}", path.display());
                }
            }
            break;
        }
    }
    Ok(())
}
