//! Shell history fallback tier: zsh `~/.zsh_history`, bash
//! `~/.bash_history`, or Windows PSReadLine `ConsoleHost_history.txt`.

use std::env;
use std::path::{Path, PathBuf};

use crate::matcher::matches_command_pattern;
use crate::shell::ShellKind;

pub const DEFAULT_MAX_COMMANDS: usize = 50;

fn home_dir() -> PathBuf {
    env::var_os("HOME")
        .or_else(|| env::var_os("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Zsh history format: `: <timestamp>:<duration>;<command>`, or a bare
/// line for commands recorded without `EXTENDED_HISTORY`.
fn parse_zsh_history(path: &Path, max_commands: usize) -> Vec<String> {
    let Ok(content) = std::fs::read_to_string(path) else {
        return vec![];
    };
    let mut commands = Vec::new();
    for line in content.lines() {
        if let Some(rest) = line.strip_prefix(':') {
            if let Some((_, cmd)) = rest.split_once(';') {
                commands.push(cmd.to_string());
                continue;
            }
        }
        if !line.trim().is_empty() {
            commands.push(line.to_string());
        }
    }
    tail(commands, max_commands)
}

fn parse_bash_history(path: &Path, max_commands: usize) -> Vec<String> {
    let Ok(content) = std::fs::read_to_string(path) else {
        return vec![];
    };
    let commands: Vec<String> = content
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.to_string())
        .collect();
    tail(commands, max_commands)
}

fn parse_psreadline_history(path: &Path, max_commands: usize) -> Vec<String> {
    let Ok(content) = std::fs::read_to_string(path) else {
        return vec![];
    };
    let commands: Vec<String> = content
        .lines()
        .filter(|l| !l.trim().is_empty())
        // Collapse repeated backslashes. Done twice, matching the original
        // implementation's choice to handle longer runs without a loop.
        .map(|l| l.replace("\\\\", "\\").replace("\\\\", "\\"))
        .collect();
    tail(commands, max_commands)
}

fn tail(mut commands: Vec<String>, max_commands: usize) -> Vec<String> {
    if commands.len() > max_commands {
        let skip = commands.len() - max_commands;
        commands.drain(..skip);
    }
    commands
}

fn psreadline_candidates() -> Vec<PathBuf> {
    let Some(appdata) = env::var_os("APPDATA") else {
        return vec![];
    };
    let appdata = PathBuf::from(appdata);
    vec![
        appdata
            .join("Microsoft")
            .join("Windows")
            .join("PowerShell")
            .join("PSReadLine")
            .join("ConsoleHost_history.txt"),
        appdata
            .join("Microsoft")
            .join("PowerShell")
            .join("PSReadLine")
            .join("ConsoleHost_history.txt"),
    ]
}

/// Get context from shell history. Returns `None` if no history file is
/// available on this system.
pub fn get_history_context(
    max_commands: usize,
    shell: ShellKind,
    exclude_command: Option<&str>,
) -> Option<String> {
    let home = home_dir();

    let mut commands: Vec<String> = match shell {
        ShellKind::Zsh => parse_zsh_history(&home.join(".zsh_history"), max_commands),
        ShellKind::Bash => parse_bash_history(&home.join(".bash_history"), max_commands),
        _ => vec![],
    };

    if commands.is_empty() && cfg!(windows) && matches!(shell, ShellKind::PowerShell | ShellKind::Unknown) {
        for candidate in psreadline_candidates() {
            if candidate.exists() {
                commands = parse_psreadline_history(&candidate, max_commands);
                break;
            }
        }
    }

    if commands.is_empty() {
        let zsh_history = home.join(".zsh_history");
        let bash_history = home.join(".bash_history");
        if zsh_history.exists() {
            commands = parse_zsh_history(&zsh_history, max_commands);
        } else if bash_history.exists() {
            commands = parse_bash_history(&bash_history, max_commands);
        }
    }

    if commands.is_empty() {
        return None;
    }

    // History excludes only the *last* command if it matches — unlike
    // tmux/session, which drop the last match and everything after it.
    if let Some(exclude) = exclude_command {
        if let Some(last) = commands.last() {
            if matches_command_pattern(last, exclude) {
                commands.pop();
            }
        }
    }

    if commands.is_empty() {
        return None;
    }

    let mut formatted = String::from("Recent command history:\n");
    for (i, cmd) in commands.iter().enumerate() {
        formatted += &format!("{}. {}\n", i + 1, cmd);
    }
    Some(formatted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn parses_bash_history_lines() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, ".bash_history", "ls -la\npwd\n\n echo hi \n");
        let commands = parse_bash_history(&path, 50);
        assert_eq!(commands, vec!["ls -la", "pwd", " echo hi "]);
    }

    #[test]
    fn parses_zsh_history_with_timestamps() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, ".zsh_history", ": 1690000000:0;ls -la\n: 1690000001:0;pwd\n");
        let commands = parse_zsh_history(&path, 50);
        assert_eq!(commands, vec!["ls -la", "pwd"]);
    }

    #[test]
    fn tail_keeps_only_last_n() {
        let commands: Vec<String> = (0..10).map(|i| i.to_string()).collect();
        let kept = tail(commands, 3);
        assert_eq!(kept, vec!["7", "8", "9"]);
    }

    #[test]
    fn psreadline_backslash_collapse() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "ConsoleHost_history.txt", "cd C:\\\\\\\\Temp\\\\\\\\project\n");
        let commands = parse_psreadline_history(&path, 50);
        assert_eq!(commands, vec!["cd C:\\Temp\\project"]);
    }
}
