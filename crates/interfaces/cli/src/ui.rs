//! Terminal rendering sink.
//!
//! Grounded on `original_source/whai/ui.py`: plain-mode fallback when
//! `WHAI_PLAIN=1` or stdout is not a TTY, panels for commands/output,
//! colored styling otherwise. Uses `colored` for styling and `indicatif`
//! for the thinking spinner — the pack-wide crates for this job, in place
//! of the original's `rich`.

use std::io::{self, IsTerminal, Write};

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

pub fn is_plain_mode() -> bool {
    std::env::var("WHAI_PLAIN").as_deref() == Ok("1") || !io::stdout().is_terminal()
}

pub fn error(msg: &str) {
    if is_plain_mode() {
        eprintln!("Error: {msg}");
    } else {
        eprintln!("{}", format!("Error: {msg}").red());
    }
}

pub fn warn(msg: &str) {
    if is_plain_mode() {
        eprintln!("Warning: {msg}");
    } else {
        eprintln!("{}", format!("Warning: {msg}").yellow());
    }
}

pub fn info(msg: &str) {
    if is_plain_mode() {
        eprintln!("Info: {msg}");
    } else {
        eprintln!("{}", msg.blue());
    }
}

/// Stream one text chunk to stdout as it arrives (no trailing newline —
/// chunks are printed as they stream in).
pub fn print_text_chunk(text: &str) {
    print!("{text}");
    let _ = io::stdout().flush();
}

pub fn print_command(cmd: &str) {
    println!();
    if is_plain_mode() {
        println!("Proposed command:");
        println!("  > {cmd}");
    } else {
        println!("{}", "┌─ Proposed command ".cyan());
        for line in cmd.lines() {
            println!("{} {line}", "│".cyan());
        }
        println!("{}", "└─".cyan());
    }
}

pub fn print_tool_call(name: &str, args: &serde_json::Value) {
    println!();
    if is_plain_mode() {
        println!("Proposed tool call: {name}");
        println!("  args: {args}");
    } else {
        println!("{}", format!("┌─ Proposed tool call: {name}").magenta());
        println!("{} {args}", "│".magenta());
        println!("{}", "└─".magenta());
    }
}

pub fn print_output(stdout: &str, stderr: &str, exit_code: i32) {
    let has_output = !stdout.is_empty() || !stderr.is_empty();

    if !stdout.is_empty() {
        println!("\nOutput:");
        println!("{}", stdout.trim_end_matches('\n'));
    }
    if !stderr.is_empty() {
        println!("\nErrors:");
        if is_plain_mode() {
            println!("{}", stderr.trim_end_matches('\n'));
        } else {
            println!("{}", stderr.trim_end_matches('\n').red());
        }
    }
    if !has_output {
        println!("\nCommand completed with no output (exit code: {exit_code})");
    }
}

/// A spinner visible only until the first stream chunk arrives.
pub struct Spinner(Option<ProgressBar>);

pub fn spinner(message: &str) -> Spinner {
    if is_plain_mode() {
        return Spinner(None);
    }
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::with_template("{spinner} {msg}").expect("static template is valid"));
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(80));
    Spinner(Some(pb))
}

impl Spinner {
    pub fn stop(&self) {
        if let Some(pb) = &self.0 {
            pb.finish_and_clear();
        }
    }
}
