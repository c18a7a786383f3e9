//! Interactive approval gate: a/r/m for shell commands, a/r for MCP tools.
//!
//! Grounded on `original_source/whai/interaction/approval.py`. Reads
//! directly from stdin rather than the teacher's channel-based
//! `ApprovalSender`/`ApprovalDecision` pair — that pattern exists in the
//! teacher to support a UI/Telegram front end running in a different
//! process; this CLI is its own front end and prompts synchronously.

use std::io::{self, BufRead, Write};

use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellDecision {
    Approve(String),
    Reject,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolDecision {
    Approve,
    Reject,
}

/// A source of prompt lines — production reads stdin; tests inject canned
/// responses.
pub trait PromptReader {
    fn read_line(&mut self, prompt: &str) -> Option<String>;
}

pub struct StdinPrompt;

impl PromptReader for StdinPrompt {
    fn read_line(&mut self, prompt: &str) -> Option<String> {
        print!("{prompt}");
        io::stdout().flush().ok();
        let mut line = String::new();
        match io::stdin().lock().read_line(&mut line) {
            Ok(0) => None, // EOF
            Ok(_) => Some(line.trim().to_string()),
            Err(_) => None,
        }
    }
}

/// Present a shell command for approval. Returns `Reject` on EOF or any
/// unrecoverable read error, matching the original's
/// `except (EOFError, KeyboardInterrupt)` fallback.
pub fn approve_shell(command: &str, reader: &mut dyn PromptReader) -> ShellDecision {
    loop {
        let Some(response) = reader.read_line("[a]pprove / [r]eject / [m]odify: ") else {
            return ShellDecision::Reject;
        };
        match response.to_lowercase().as_str() {
            "a" | "approve" => return ShellDecision::Approve(command.to_string()),
            "r" | "reject" => return ShellDecision::Reject,
            "m" | "modify" => {
                let Some(modified) = reader.read_line("Enter modified command: ") else {
                    return ShellDecision::Reject;
                };
                if !modified.is_empty() {
                    return ShellDecision::Approve(modified);
                }
                // "No command entered" — original loops back to the a/r/m prompt.
            }
            _ => {}
        }
    }
}

/// Present an MCP tool call for approval.
pub fn approve_tool(_tool_name: &str, _args: &Value, reader: &mut dyn PromptReader) -> ToolDecision {
    loop {
        let Some(response) = reader.read_line("[a]pprove / [r]eject: ") else {
            return ToolDecision::Reject;
        };
        match response.to_lowercase().as_str() {
            "a" | "approve" => return ToolDecision::Approve,
            "r" | "reject" => return ToolDecision::Reject,
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    struct ScriptedPrompt(VecDeque<Option<String>>);

    impl PromptReader for ScriptedPrompt {
        fn read_line(&mut self, _prompt: &str) -> Option<String> {
            self.0.pop_front().flatten()
        }
    }

    fn scripted(responses: &[&str]) -> ScriptedPrompt {
        ScriptedPrompt(responses.iter().map(|s| Some(s.to_string())).collect())
    }

    #[test]
    fn approve_returns_command_unmodified() {
        let mut r = scripted(&["a"]);
        assert_eq!(approve_shell("ls -la", &mut r), ShellDecision::Approve("ls -la".to_string()));
    }

    #[test]
    fn reject_returns_reject() {
        let mut r = scripted(&["r"]);
        assert_eq!(approve_shell("rm -rf /", &mut r), ShellDecision::Reject);
    }

    #[test]
    fn modify_returns_the_modified_command() {
        let mut r = scripted(&["m", "ls -la /tmp"]);
        assert_eq!(
            approve_shell("ls", &mut r),
            ShellDecision::Approve("ls -la /tmp".to_string())
        );
    }

    #[test]
    fn empty_modification_reprompts_then_approves() {
        let mut r = scripted(&["m", "", "a"]);
        assert_eq!(approve_shell("ls", &mut r), ShellDecision::Approve("ls".to_string()));
    }

    #[test]
    fn invalid_response_reprompts() {
        let mut r = scripted(&["xyz", "a"]);
        assert_eq!(approve_shell("ls", &mut r), ShellDecision::Approve("ls".to_string()));
    }

    #[test]
    fn eof_rejects() {
        let mut r = ScriptedPrompt(VecDeque::from([None]));
        assert_eq!(approve_shell("ls", &mut r), ShellDecision::Reject);
    }

    #[test]
    fn tool_approval_accepts_a_and_r_only() {
        let mut r = scripted(&["a"]);
        assert_eq!(approve_tool("mcp_time_get", &Value::Null, &mut r), ToolDecision::Approve);
        let mut r = scripted(&["r"]);
        assert_eq!(approve_tool("mcp_time_get", &Value::Null, &mut r), ToolDecision::Reject);
    }
}
