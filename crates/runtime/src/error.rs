//! Top-level error taxonomy and exit-code mapping (spec §7).

use thiserror::Error;

use whai_config::ConfigError;
use whai_llm::LlmError;

#[derive(Debug, Error)]
pub enum WhaiError {
    #[error("{0}")]
    Config(#[from] ConfigError),
    #[error("role '{name}' not found at {path}")]
    RoleNotFound { name: String, path: String },
    #[error("role '{name}' is invalid: {reason}")]
    RoleInvalid { name: String, reason: String },
    #[error(transparent)]
    Llm(#[from] LlmError),
    #[error("argument error: {0}")]
    ArgumentValidation(String),
    #[error("interrupted by user")]
    Interrupted,
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl WhaiError {
    /// Process exit code per spec §6: 0 success (not an error path), 1
    /// fatal error, 2 argument validation failure, 130 Ctrl-C.
    pub fn exit_code(&self) -> i32 {
        match self {
            WhaiError::ArgumentValidation(_) => 2,
            WhaiError::Interrupted => 130,
            _ => 1,
        }
    }
}
