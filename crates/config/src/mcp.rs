//! `mcp.json`: `{"mcpServers": {"<name>": {"command", "args"?, "env"?,
//! "requires_approval"?}}}`. Absent file means MCP is disabled silently.

use std::collections::HashMap;
use std::fs;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::paths;

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpServerConfig {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
    #[serde(default = "default_true")]
    pub requires_approval: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct McpConfig {
    #[serde(rename = "mcpServers", default)]
    pub mcp_servers: HashMap<String, McpServerConfig>,
}

/// Returns `None` when `mcp.json` does not exist — this is the normal,
/// silent "MCP disabled" state, not an error.
pub fn load_mcp_config() -> Result<Option<McpConfig>> {
    let path = paths::mcp_config_path();
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
    let config: McpConfig =
        serde_json::from_str(&raw).with_context(|| format!("parse {}", path.display()))?;
    Ok(Some(config))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_mcp_json() {
        let raw = r#"{"mcpServers": {"time-server": {"command": "uvx", "args": ["mcp-time"]}}}"#;
        let config: McpConfig = serde_json::from_str(raw).unwrap();
        let server = config.mcp_servers.get("time-server").unwrap();
        assert_eq!(server.command, "uvx");
        assert_eq!(server.args, vec!["mcp-time".to_string()]);
        assert!(server.requires_approval);
    }
}
