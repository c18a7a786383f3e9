//! MCP (Model Context Protocol) client and manager: one stdio connection
//! per configured server, tool discovery, and `mcp_<server>_<tool>` routing.

pub mod client;
pub mod error;
pub mod manager;

pub use client::McpClient;
pub use error::McpError;
pub use manager::{McpManager, McpToolDef};
