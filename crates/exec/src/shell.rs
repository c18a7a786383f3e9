//! Fresh-subprocess-per-call command execution.
//!
//! Grounded on `original_source/whai/interaction/execution.py::execute_command`:
//! never `shell=True` (an intermediate shell layer defeats process-group
//! kill on timeout, especially the PowerShell case on Windows), direct
//! invocation of the detected shell with `-c`/`-Command`/`/c` instead.

use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

use crate::error::ExecError;

pub const DEFAULT_COMMAND_TIMEOUT: u64 = 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellKind {
    /// Unix shell invoked as `<path> -c <command>`.
    Unix(String),
    Pwsh(String),
    Powershell(String),
    Cmd,
}

#[derive(Debug, Clone)]
pub struct ExecOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

/// Detect which shell to invoke directly, the way the original's
/// `detect_shell`/`SHELL` env lookup does.
pub fn detect_shell() -> ShellKind {
    if cfg!(windows) {
        if std::env::var("PSModulePath").is_ok() {
            if let Some(path) = which::which("pwsh").ok().map(|p| p.to_string_lossy().to_string()) {
                return ShellKind::Pwsh(path);
            }
            if let Some(path) = which::which("powershell")
                .ok()
                .map(|p| p.to_string_lossy().to_string())
            {
                return ShellKind::Powershell(path);
            }
            return ShellKind::Powershell("powershell.exe".to_string());
        }
        return ShellKind::Cmd;
    }

    let shell = std::env::var("SHELL").unwrap_or_else(|_| "/bin/sh".to_string());
    ShellKind::Unix(shell)
}

fn build_command(shell: &ShellKind, command: &str) -> Command {
    let mut cmd = match shell {
        ShellKind::Unix(path) => {
            let mut c = Command::new(path);
            c.arg("-c").arg(command);
            c
        }
        ShellKind::Pwsh(path) | ShellKind::Powershell(path) => {
            let mut c = Command::new(path);
            c.arg("-Command").arg(command);
            c
        }
        ShellKind::Cmd => {
            let mut c = Command::new("cmd.exe");
            c.arg("/c").arg(command);
            c
        }
    };
    cmd.stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped());
    configure_process_group(&mut cmd);
    cmd
}

#[cfg(unix)]
fn configure_process_group(cmd: &mut Command) {
    use std::os::unix::process::CommandExt;
    // New process group rooted at the child itself, so the whole tree it
    // spawns can be killed in one `killpg` on timeout.
    cmd.process_group(0);
}

#[cfg(not(unix))]
fn configure_process_group(_cmd: &mut Command) {}

#[cfg(unix)]
fn kill_tree(pid: u32) {
    unsafe {
        libc::kill(-(pid as i32), libc::SIGKILL);
    }
}

#[cfg(not(unix))]
fn kill_tree(_pid: u32) {}

/// Execute a command in a fresh subprocess. `timeout_secs == 0` means no
/// limit, matching the CLI-level contract that only a positive timeout is
/// ever accepted by the parser — the zero case exists for internal callers
/// that already know they want to wait forever.
pub async fn execute(command: &str, timeout_secs: u64) -> Result<ExecOutput, ExecError> {
    let shell = detect_shell();
    let mut cmd = build_command(&shell, command);

    let child = cmd
        .spawn()
        .map_err(|e| ExecError::LaunchError(e.to_string()))?;
    let pid = child.id();

    let wait = child.wait_with_output();

    let output = if timeout_secs == 0 {
        wait.await.map_err(|e| ExecError::LaunchError(e.to_string()))?
    } else {
        match tokio::time::timeout(Duration::from_secs(timeout_secs), wait).await {
            Ok(result) => result.map_err(|e| ExecError::LaunchError(e.to_string()))?,
            Err(_) => {
                // The `wait_with_output` future owned `child` and was just
                // dropped by the timeout — the process group survives that
                // drop, so it must be killed explicitly here.
                if let Some(pid) = pid {
                    kill_tree(pid);
                }
                return Err(ExecError::Timeout { limit_secs: timeout_secs });
            }
        }
    };

    Ok(ExecOutput {
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        exit_code: output.status.code().unwrap_or(-1),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[cfg(unix)]
    async fn echo_roundtrips_stdout() {
        let out = execute("echo hi", 5).await.unwrap();
        assert_eq!(out.stdout.trim(), "hi");
        assert_eq!(out.exit_code, 0);
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn nonzero_exit_is_not_an_error() {
        let out = execute("exit 3", 5).await.unwrap();
        assert_eq!(out.exit_code, 3);
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn expired_timeout_yields_timeout_error() {
        let err = execute("sleep 5", 1).await.unwrap_err();
        match err {
            ExecError::Timeout { limit_secs } => assert_eq!(limit_secs, 1),
            other => panic!("expected Timeout, got {other:?}"),
        }
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn stderr_is_captured_separately_from_stdout() {
        let out = execute("echo out; echo err 1>&2", 5).await.unwrap();
        assert_eq!(out.stdout.trim(), "out");
        assert_eq!(out.stderr.trim(), "err");
    }

    #[test]
    fn timeout_tool_result_matches_contract_shape() {
        let msg = ExecError::timeout_tool_result("sleep 99", 30);
        assert_eq!(msg, "Command: sleep 99\n\nOUTPUT: NO OUTPUT, 30s TIMEOUT EXCEEDED");
    }
}
