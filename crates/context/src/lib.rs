//! Context Capture: deterministic extraction of the user's recent
//! terminal state, with exclusion of the invoking command and
//! token-bounded truncation of the result.
//!
//! Precedence (first non-empty wins): recorded session transcript, then
//! tmux scrollback, then shell history.

pub mod history;
pub mod matcher;
pub mod session;
pub mod shell;
pub mod tmux;
pub mod truncate;

use std::env;

pub use matcher::matches_command_pattern;
pub use truncate::truncate;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextResult {
    pub text: String,
    pub is_deep: bool,
}

impl ContextResult {
    fn shallow(text: String) -> Self {
        Self { text, is_deep: false }
    }

    fn deep(text: String) -> Self {
        Self { text, is_deep: true }
    }

    fn empty() -> Self {
        Self {
            text: String::new(),
            is_deep: false,
        }
    }
}

/// Produce `(text, is_deep)` from the highest-precedence source that
/// returns anything: recorded session (if `WHAI_SESSION_ACTIVE` is set),
/// then tmux (if `$TMUX` is set), then shell history, then empty.
pub async fn get_context(exclude_command: Option<&str>) -> ContextResult {
    if let Some(session_id) = session::active_session_id() {
        if let Some(text) = session::get_session_context(&session_id, exclude_command) {
            return ContextResult::deep(text);
        }
        tracing::debug!(session_id, "session transcript capture yielded nothing");
    }

    if env::var_os("TMUX").is_some() {
        if let Some(text) = tmux::get_tmux_context(exclude_command).await {
            return ContextResult::deep(text);
        }
        tracing::debug!("tmux capture yielded nothing");
    }

    let detected_shell = shell::detect_shell();
    if let Some(text) =
        history::get_history_context(history::DEFAULT_MAX_COMMANDS, detected_shell, exclude_command)
    {
        return ContextResult::shallow(text);
    }

    ContextResult::empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_result_is_shallow_and_blank() {
        let result = ContextResult::empty();
        assert!(!result.is_deep);
        assert!(result.text.is_empty());
    }
}
