//! Owns a set of [`McpClient`]s, aggregates tools, routes `mcp_<server>_<tool>`
//! calls.
//!
//! Lifecycle grounded on `original_source/whai/mcp/manager.py`: validate-then-
//! connect per server during `initialize()` (collect, don't abort, on a bad
//! server); `get_all_tools()` aborts loudly on a discovery failure because
//! that indicates a broken contract rather than a missing opt-in feature.

use std::collections::HashMap;

use serde_json::Value;

use whai_config::{McpConfig, McpServerConfig};

use crate::client::{
    convert_schema, render_call_result, validate_script_arg, validate_server_command_exists,
    McpClient, ServerDescriptor,
};
use crate::error::{format_mcp_error, McpError};

/// A tool definition in the provider's function-calling shape, already
/// prefixed for the model: `mcp_<server_name>_<tool_name>`.
#[derive(Debug, Clone)]
pub struct McpToolDef {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

pub struct McpManager {
    clients: HashMap<String, McpClient>,
    tools_cache: Option<Vec<McpToolDef>>,
    initialized: bool,
}

impl Default for McpManager {
    fn default() -> Self {
        Self::new()
    }
}

impl McpManager {
    pub fn new() -> Self {
        Self {
            clients: HashMap::new(),
            tools_cache: None,
            initialized: false,
        }
    }

    /// Loads `mcp.json`; absent file means MCP is disabled, which is not an
    /// error. Returns `(server_name, message)` for every server that failed
    /// validation or connection — initialization itself never aborts.
    pub async fn initialize(&mut self) -> anyhow::Result<Vec<(String, String)>> {
        if self.initialized {
            return Ok(vec![]);
        }

        let config: Option<McpConfig> = whai_config::load_mcp_config()?;
        let Some(config) = config else {
            tracing::debug!("no mcp.json found; MCP support disabled");
            self.initialized = true;
            return Ok(vec![]);
        };

        let mut errors = Vec::new();
        for (server_name, server_config) in config.mcp_servers {
            if let Err(msg) = validate(&server_name, &server_config) {
                errors.push((server_name, msg));
                continue;
            }

            let descriptor = ServerDescriptor {
                server_name: server_name.clone(),
                command: server_config.command.clone(),
                args: server_config.args.clone(),
                env: server_config.env.clone(),
                requires_approval: server_config.requires_approval,
            };

            match McpClient::connect(descriptor).await {
                Ok(client) => {
                    tracing::info!(server = %server_name, "initialized MCP server");
                    self.clients.insert(server_name, client);
                }
                Err(err) => {
                    let msg = format_mcp_error(&server_name, &err, "connection");
                    errors.push((server_name, msg));
                }
            }
        }

        self.initialized = true;
        Ok(errors)
    }

    /// Aggregate tools across every connected client, prefixed for the
    /// model. A client that fails here is dropped and its error is loud —
    /// see module docs.
    pub async fn get_all_tools(&mut self) -> anyhow::Result<Vec<McpToolDef>> {
        if !self.initialized {
            let init_errors = self.initialize().await?;
            if !init_errors.is_empty() {
                let joined = init_errors
                    .iter()
                    .map(|(_, msg)| msg.clone())
                    .collect::<Vec<_>>()
                    .join("\n\n");
                return Err(McpError::StartupFailure(joined).into());
            }
        }

        if let Some(cached) = &self.tools_cache {
            return Ok(cached.clone());
        }

        let mut all_tools = Vec::new();
        let mut errors = Vec::new();
        let mut failed_servers = Vec::new();

        for (server_name, client) in self.clients.iter() {
            match client.list_tools().await {
                Ok(tools) => {
                    for tool in tools {
                        let schema = tool.input_schema.as_ref().clone();
                        let description = tool.description.as_ref().to_string();
                        let description = if description.is_empty() {
                            format!("Tool from MCP server {server_name}")
                        } else {
                            description
                        };
                        all_tools.push(McpToolDef {
                            name: format!("mcp_{server_name}_{}", tool.name),
                            description,
                            parameters: convert_schema(&schema),
                        });
                    }
                }
                Err(err) => {
                    errors.push(format_mcp_error(server_name, &err, "list_tools"));
                    failed_servers.push(server_name.clone());
                }
            }
        }

        for name in failed_servers {
            self.clients.remove(&name);
        }

        if !errors.is_empty() {
            return Err(McpError::DiscoveryFailure(errors.join("\n\n")).into());
        }

        self.tools_cache = Some(all_tools.clone());
        Ok(all_tools)
    }

    /// Route `mcp_<server>_<tool>` to the right client, stripping the
    /// prefix back to `<tool>` before dispatch. `<server_name>` itself must
    /// not contain underscores, but tool names may — hence the 3-part
    /// `splitn`.
    pub async fn call_tool(&self, prefixed_name: &str, arguments: Value) -> anyhow::Result<String> {
        let rest = prefixed_name
            .strip_prefix("mcp_")
            .ok_or_else(|| McpError::InvalidToolName(prefixed_name.to_string()))?;

        let mut parts = rest.splitn(2, '_');
        let server_name = parts
            .next()
            .ok_or_else(|| McpError::InvalidToolName(prefixed_name.to_string()))?;
        let tool_name = parts
            .next()
            .ok_or_else(|| McpError::InvalidToolName(prefixed_name.to_string()))?;

        let client = self.clients.get(server_name).ok_or_else(|| {
            McpError::UnknownServer(server_name.to_string(), self.clients.keys().cloned().collect())
        })?;

        let args_map = match arguments {
            Value::Object(map) => map,
            Value::Null => serde_json::Map::new(),
            other => {
                let mut map = serde_json::Map::new();
                map.insert("value".to_string(), other);
                map
            }
        };

        let result = client
            .call_tool(tool_name, args_map)
            .await
            .map_err(|e| McpError::CallFailed(e.to_string()))?;
        Ok(render_call_result(&result))
    }

    /// `server/tool` display name and `requires_approval` for the
    /// approval gate, parsed from a prefixed tool name.
    pub fn display_parts<'a>(&self, prefixed_name: &'a str) -> Option<(String, bool)> {
        let rest = prefixed_name.strip_prefix("mcp_")?;
        let mut parts = rest.splitn(2, '_');
        let server_name = parts.next()?;
        let tool_name = parts.next()?;
        let requires_approval = self
            .clients
            .get(server_name)
            .map(|c| c.requires_approval)
            .unwrap_or(true);
        Some((format!("{server_name}/{tool_name}"), requires_approval))
    }

    /// Idempotent: closing twice is a no-op.
    pub async fn close_all(&mut self) {
        for (server_name, client) in self.clients.drain() {
            if let Err(err) = client.close().await {
                tracing::warn!(server = %server_name, error = %err, "error closing MCP client");
            }
        }
        self.tools_cache = None;
        self.initialized = false;
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

fn validate(server_name: &str, config: &McpServerConfig) -> Result<(), String> {
    if !validate_server_command_exists(&config.command) {
        return Err(format!(
            "MCP server '{server_name}' failed to start:\n  Command not found: {}\n  Please check the 'command' in your mcp.json configuration.",
            config.command
        ));
    }
    if let Err(e) = validate_script_arg(&config.args) {
        return Err(format!(
            "MCP server '{server_name}' failed to start:\n  {e}\n  Please check the 'command' and 'args' in your mcp.json configuration."
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unprefix_round_trips_for_valid_names() {
        let manager = McpManager::new();
        let prefixed = "mcp_time-server_get_current_time";
        let rest = prefixed.strip_prefix("mcp_").unwrap();
        let mut parts = rest.splitn(2, '_');
        let server = parts.next().unwrap();
        let tool = parts.next().unwrap();
        assert_eq!(server, "time-server");
        assert_eq!(tool, "get_current_time");
        assert!(manager.display_parts("not-an-mcp-call").is_none());
    }

    #[test]
    fn call_tool_rejects_non_mcp_prefixed_names() {
        let manager = McpManager::new();
        let result = futures_lite_block_on(manager.call_tool("execute_shell", Value::Null));
        assert!(result.is_err());
    }

    fn futures_lite_block_on<F: std::future::Future>(f: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap()
            .block_on(f)
    }
}
