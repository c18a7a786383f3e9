//! Per-tool-call dispatch: `execute_shell` vs `mcp_*` vs unknown.
//!
//! Grounded on spec §4.7 ("Tool dispatch") and
//! `original_source/whai/interaction/execution.py` for the shell path,
//! `original_source/whai/mcp/manager.py` for the MCP path.

use whai_exec::{approval, ExecError};
use whai_llm::ToolCall;
use whai_mcp::McpManager;

/// The outcome of attempting to run one tool call this turn.
pub struct DispatchOutcome {
    /// Text fed back to the model as the `tool` role message content.
    pub tool_result: String,
    /// Whether the call actually ran (approved + executed), as opposed to
    /// being rejected or having an empty/missing primary argument.
    pub executed: bool,
}

pub async fn dispatch_tool_call(
    call: &ToolCall,
    timeout_secs: u64,
    mcp: &McpManager,
    reader: &mut dyn approval::PromptReader,
) -> DispatchOutcome {
    if call.function.name == "execute_shell" {
        return dispatch_shell(call, timeout_secs, reader).await;
    }
    if call.function.name.starts_with("mcp_") {
        return dispatch_mcp(call, mcp, reader).await;
    }
    DispatchOutcome {
        tool_result: format!("Error: unrecognized tool '{}'", call.function.name),
        executed: false,
    }
}

async fn dispatch_shell(
    call: &ToolCall,
    timeout_secs: u64,
    reader: &mut dyn approval::PromptReader,
) -> DispatchOutcome {
    let command = call
        .function
        .arguments
        .get("command")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string();

    if command.trim().is_empty() {
        return DispatchOutcome {
            tool_result: "Error: command argument missing or empty".to_string(),
            executed: false,
        };
    }

    match approval::approve_shell(&command, reader) {
        approval::ShellDecision::Reject => DispatchOutcome {
            tool_result: "Command rejected by user.".to_string(),
            executed: false,
        },
        approval::ShellDecision::Approve(final_command) => {
            match whai_exec::execute(&final_command, timeout_secs).await {
                Ok(out) => {
                    let combined = if out.stderr.is_empty() {
                        out.stdout
                    } else {
                        format!("{}\n[stderr]\n{}", out.stdout, out.stderr)
                    };
                    let result = format!(
                        "Command: {final_command}\n\nOUTPUT (exit code {}):\n{}",
                        out.exit_code, combined
                    );
                    DispatchOutcome { tool_result: result, executed: true }
                }
                Err(ExecError::Timeout { limit_secs }) => DispatchOutcome {
                    tool_result: ExecError::timeout_tool_result(&final_command, limit_secs),
                    executed: true,
                },
                Err(ExecError::LaunchError(msg)) => DispatchOutcome {
                    tool_result: format!("Failed to execute command: {msg}"),
                    executed: true,
                },
            }
        }
    }
}

async fn dispatch_mcp(
    call: &ToolCall,
    mcp: &McpManager,
    reader: &mut dyn approval::PromptReader,
) -> DispatchOutcome {
    let (_display_name, requires_approval) = mcp
        .display_parts(&call.function.name)
        .unwrap_or((call.function.name.clone(), true));

    let approved = if requires_approval {
        matches!(
            approval::approve_tool(&call.function.name, &call.function.arguments, reader),
            approval::ToolDecision::Approve
        )
    } else {
        true
    };

    if !approved {
        return DispatchOutcome {
            tool_result: "Tool call rejected by user.".to_string(),
            executed: false,
        };
    }

    match mcp.call_tool(&call.function.name, call.function.arguments.clone()).await {
        Ok(result) => DispatchOutcome { tool_result: result, executed: true },
        Err(e) => DispatchOutcome {
            tool_result: format!("Failed to execute tool: {e}"),
            executed: true,
        },
    }
}
