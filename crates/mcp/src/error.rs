//! MCP-specific error taxonomy with user-facing formatting.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum McpError {
    /// A server failed validation or connection during `initialize()`.
    /// Collected, not fatal — the manager keeps running without that server.
    #[error("{0}")]
    StartupFailure(String),

    /// `list_tools` failed on a connected server. Loud: it indicates a
    /// broken contract, so the manager aborts the current invocation.
    #[error("{0}")]
    DiscoveryFailure(String),

    #[error("invalid MCP tool name format: {0} (expected mcp_<server>_<tool>)")]
    InvalidToolName(String),

    #[error("MCP server '{0}' not found. Available servers: {1:?}")]
    UnknownServer(String, Vec<String>),

    #[error("MCP tool call failed: {0}")]
    CallFailed(String),
}

/// Translate a raw connection/discovery failure into a message naming the
/// offending server and the `mcp.json` fix, mirroring the original
/// implementation's `_format_mcp_error`.
pub fn format_mcp_error(server_name: &str, error: &anyhow::Error, context: &str) -> String {
    let text = error.to_string();

    if text.contains("No such file or directory") || text.contains("can't open file") {
        return format!(
            "MCP server '{server_name}' failed to start:\n  Server script not found: {text}\n  Please check the 'command' and 'args' in your mcp.json configuration."
        );
    }
    if text.contains("Permission denied") {
        return format!(
            "MCP server '{server_name}' failed to start:\n  Permission denied when trying to execute the server.\n  Please check that the server script is executable."
        );
    }
    if text.contains("Cancelled") || text.contains("cancelled") {
        return if context == "list_tools" {
            format!(
                "MCP server '{server_name}' connection failed:\n  Could not communicate with the server.\n  The server may have failed to start or the connection was lost.\n  Please verify that the server script exists and can run successfully."
            )
        } else {
            format!(
                "MCP server '{server_name}' failed to start:\n  Could not start the server process.\n  Please verify that the server script is executable and can run successfully."
            )
        };
    }

    let short: String = text.chars().take(200).collect();
    let action = if context == "list_tools" { "communicate with" } else { "start" };
    format!(
        "MCP server '{server_name}' failed to {action}:\n  {short}\n  Please check your mcp.json configuration for server '{server_name}'."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_file_not_found() {
        let err = anyhow::anyhow!("No such file or directory: 'server.py'");
        let msg = format_mcp_error("time-server", &err, "connection");
        assert!(msg.contains("time-server"));
        assert!(msg.contains("Server script not found"));
    }

    #[test]
    fn formats_generic_error_with_truncation() {
        let long = "x".repeat(400);
        let err = anyhow::anyhow!(long.clone());
        let msg = format_mcp_error("s", &err, "list_tools");
        assert!(msg.contains("communicate with"));
        assert!(!msg.contains(&long));
    }
}
