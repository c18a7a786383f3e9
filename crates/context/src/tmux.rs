//! tmux scrollback capture tier. Active whenever `$TMUX` is set; on
//! Windows the `tmux` binary itself normally lives inside WSL, so we detect
//! that and reroute the capture through `wsl tmux ...`.

use std::time::Duration;

use tokio::process::Command;
use tokio::time::timeout;

use crate::matcher::matches_command_pattern;

const CAPTURE_TIMEOUT: Duration = Duration::from_secs(5);

/// True when a WSL distribution is reachable from this (Windows) host.
async fn is_wsl_available() -> bool {
    if !cfg!(windows) {
        return false;
    }
    let result = timeout(CAPTURE_TIMEOUT, Command::new("wsl").arg("--status").output()).await;
    matches!(result, Ok(Ok(output)) if output.status.success())
}

async fn capture_pane(use_wsl: bool) -> Option<String> {
    let mut command = if use_wsl {
        let mut c = Command::new("wsl");
        c.args(["tmux", "capture-pane", "-p", "-S", "-"]);
        c
    } else {
        let mut c = Command::new("tmux");
        c.args(["capture-pane", "-p", "-S", "-"]);
        c
    };

    let result = timeout(CAPTURE_TIMEOUT, command.output()).await;
    match result {
        Ok(Ok(output)) if output.status.success() => {
            Some(String::from_utf8_lossy(&output.stdout).into_owned())
        }
        Ok(Ok(_)) => None,
        Ok(Err(e)) => {
            tracing::debug!(error = %e, "tmux capture-pane failed to spawn");
            None
        }
        Err(_) => {
            tracing::debug!("tmux capture-pane timed out");
            None
        }
    }
}

/// Drop the last line matching `exclude_command` and every line after it —
/// the invoking `whai` call and any output it already produced before this
/// capture ran. Unlike the history tier, this is not "last line only": the
/// whole tail after the match is noise belonging to the current invocation.
fn strip_after_last_match(scrollback: &str, exclude_command: &str) -> String {
    let lines: Vec<&str> = scrollback.lines().collect();
    let cutoff = lines
        .iter()
        .enumerate()
        .rev()
        .find(|(_, line)| matches_command_pattern(line, exclude_command))
        .map(|(idx, _)| idx);

    match cutoff {
        Some(idx) => lines[..idx].join("\n"),
        None => scrollback.to_string(),
    }
}

/// Capture tmux scrollback, excluding the current `whai` invocation and
/// everything after it. Returns `None` if no pane could be captured.
pub async fn get_tmux_context(exclude_command: Option<&str>) -> Option<String> {
    let use_wsl = is_wsl_available().await;
    let scrollback = capture_pane(use_wsl).await?;

    let trimmed = match exclude_command {
        Some(cmd) => strip_after_last_match(&scrollback, cmd),
        None => scrollback,
    };

    let trimmed = trimmed.trim_end().to_string();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_everything_from_last_match_onward() {
        let scrollback = "ls -la\nfoo.txt\n$ whai fix this\nThinking...\nDone.";
        let result = strip_after_last_match(scrollback, "whai fix this");
        assert_eq!(result, "ls -la\nfoo.txt");
    }

    #[test]
    fn keeps_earlier_occurrences_of_same_command() {
        let scrollback = "$ whai status\nok\n$ ls\n$ whai status\nrunning...";
        let result = strip_after_last_match(scrollback, "whai status");
        assert_eq!(result, "$ whai status\nok\n$ ls");
    }

    #[test]
    fn returns_whole_scrollback_when_no_match() {
        let scrollback = "ls -la\npwd\n";
        let result = strip_after_last_match(scrollback, "whai unrelated");
        assert_eq!(result, scrollback);
    }
}
