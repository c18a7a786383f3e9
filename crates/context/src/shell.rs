//! Shell-name detection from the environment, shared by the history tier
//! (to pick which history file to parse) and by the session/tmux tiers'
//! WSL routing decision.

use std::env;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellKind {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Cmd,
    Unknown,
}

pub fn detect_shell() -> ShellKind {
    if cfg!(windows) {
        if env::var_os("PSModulePath").is_some() {
            return ShellKind::PowerShell;
        }
        return ShellKind::Cmd;
    }
    match env::var("SHELL") {
        Ok(path) => match path.rsplit('/').next().unwrap_or("") {
            "bash" => ShellKind::Bash,
            "zsh" => ShellKind::Zsh,
            "fish" => ShellKind::Fish,
            _ => ShellKind::Unknown,
        },
        Err(_) => ShellKind::Unknown,
    }
}
