use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("Command timed out after {limit_secs} seconds. You can change timeout limits with the --timeout flag")]
    Timeout { limit_secs: u64 },
    #[error("Error executing command: {0}")]
    LaunchError(String),
}

impl ExecError {
    /// The synthetic tool-result string fed back to the model on timeout —
    /// the conversation must keep going even though the command never
    /// produced output.
    pub fn timeout_tool_result(command: &str, limit_secs: u64) -> String {
        format!("Command: {command}\n\nOUTPUT: NO OUTPUT, {limit_secs}s TIMEOUT EXCEEDED")
    }
}
