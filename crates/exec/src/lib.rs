//! Shell Executor and Approval Gate.

pub mod approval;
pub mod error;
pub mod shell;

pub use approval::{approve_shell, approve_tool, PromptReader, ShellDecision, StdinPrompt, ToolDecision};
pub use error::ExecError;
pub use shell::{detect_shell, execute, ExecOutput, ShellKind, DEFAULT_COMMAND_TIMEOUT};
