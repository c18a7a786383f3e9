//! Recorded-session transcript tier: the highest-precedence context
//! source, active only when `whai shell` (an external collaborator — no
//! code here spawns it) has set `WHAI_SESSION_ACTIVE`.
//!
//! `WHAI_SESSION_ACTIVE`'s value is the session id used to build both
//! file names: `session_<id>.log` (the raw shell transcript) and
//! `session_<id>_whai.log` (the driver's own self-log of what it printed).

use std::env;
use std::sync::OnceLock;

use regex::Regex;

use whai_config::paths::sessions_dir;

use crate::matcher::matches_command_pattern;

/// The session id `whai shell` is currently recording under, if any.
pub fn active_session_id() -> Option<String> {
    env::var("WHAI_SESSION_ACTIVE")
        .ok()
        .filter(|v| !v.is_empty())
}

fn transcript_path(session_id: &str) -> std::path::PathBuf {
    sessions_dir().join(format!("session_{session_id}.log"))
}

fn self_log_path(session_id: &str) -> std::path::PathBuf {
    sessions_dir().join(format!("session_{session_id}_whai.log"))
}

fn csi_or_osc_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\x1b(\[[0-9;?]*[ -/]*[@-~]|\][^\x07\x1b]*(\x07|\x1b\\)|[@-Z\\-_])").unwrap())
}

fn spinner_noise_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*[|/\\\-⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏]+\s*$").unwrap())
}

/// Apply backspace erasure (`x\x08` removes the preceding character),
/// strip ANSI CSI/OSC sequences and bare single-char ESC codes, and drop
/// lines that are pure spinner/control noise.
pub fn normalize_unix_log(raw: &str) -> String {
    let mut erased = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if ch == '\u{8}' {
            erased.pop();
        } else {
            erased.push(ch);
        }
    }

    let stripped = csi_or_osc_re().replace_all(&erased, "");

    stripped
        .lines()
        .filter(|line| !spinner_noise_re().is_match(line))
        .collect::<Vec<_>>()
        .join("\n")
}

const PS_METADATA_MARKERS: &[&str] = &[
    "PowerShell transcript start",
    "PowerShell transcript end",
    "Start time:",
    "End time:",
    "Username:",
    "RunAs User:",
    "Machine:",
    "Host Application:",
    "Process ID:",
    "PSVersion:",
    "PSEdition:",
    "BuildVersion:",
    "CLRVersion:",
    "WSManStackVersion:",
    "PSRemotingProtocolVersion:",
    "SerializationVersion:",
];

fn is_asterisk_separator(line: &str) -> bool {
    let trimmed = line.trim();
    !trimmed.is_empty() && trimmed.chars().all(|c| c == '*')
}

fn is_metadata_line(line: &str) -> bool {
    PS_METADATA_MARKERS.iter().any(|marker| line.contains(marker))
}

/// Detect the PowerShell transcript's leading metadata block by content
/// markers (not by counting `****` separators, which PS 5.1 and PS 7
/// use inconsistently), collapse it into a compact header, drop the
/// trailing metadata block and separators entirely, and keep all command
/// output verbatim.
pub fn normalize_powershell_transcript(raw: &str) -> String {
    let lines: Vec<&str> = raw.lines().collect();

    let mut i = 0;
    while i < lines.len() && is_asterisk_separator(lines[i]) {
        i += 1;
    }

    let mut header_fields = Vec::new();
    while i < lines.len() && is_metadata_line(lines[i]) {
        header_fields.push(lines[i].trim().to_string());
        i += 1;
    }
    while i < lines.len() && is_asterisk_separator(lines[i]) {
        i += 1;
    }

    let mut out = String::new();
    if !header_fields.is_empty() {
        out.push_str("--- PowerShell Session ---\n");
        for field in &header_fields {
            out.push_str(field);
            out.push('\n');
        }
        out.push_str("---\n");
    }

    let mut j = i;
    while j < lines.len() {
        if is_asterisk_separator(lines[j]) {
            j += 1;
            continue;
        }
        if is_metadata_line(lines[j]) {
            while j < lines.len() && (is_metadata_line(lines[j]) || is_asterisk_separator(lines[j])) {
                j += 1;
            }
            continue;
        }
        out.push_str(lines[j]);
        out.push('\n');
        j += 1;
    }

    out.trim_end().to_string()
}

fn normalize(raw: &str) -> String {
    if raw.contains("PowerShell transcript start") {
        normalize_powershell_transcript(raw)
    } else {
        normalize_unix_log(raw)
    }
}

/// Split the assistant self-log into contiguous segments, one per
/// recorded `whai …` invocation marker (`### whai <args>` lines, written
/// by the driver before each turn's output).
fn self_log_segments(self_log: &str) -> Vec<(String, String)> {
    let mut segments = Vec::new();
    let mut current_marker: Option<String> = None;
    let mut current_body = String::new();

    for line in self_log.lines() {
        if let Some(cmd) = line.strip_prefix("### ") {
            if let Some(marker) = current_marker.take() {
                segments.push((marker, std::mem::take(&mut current_body)));
            }
            current_marker = Some(cmd.trim().to_string());
        } else if current_marker.is_some() {
            current_body.push_str(line);
            current_body.push('\n');
        }
    }
    if let Some(marker) = current_marker {
        segments.push((marker, current_body));
    }
    segments
}

/// Merge the outer transcript with the assistant self-log: scan the
/// outer transcript forward, and whenever a line is identified as an
/// actual `whai …` invocation (same matcher used for exclusion, so a
/// path that merely contains the substring `whai` is ignored), splice
/// the corresponding self-log segment in immediately after it.
fn merge_transcript_with_self_log(outer: &str, self_log: &str) -> String {
    let segments = self_log_segments(self_log);
    if segments.is_empty() {
        return outer.to_string();
    }

    let mut used = vec![false; segments.len()];
    let mut out = String::new();
    for line in outer.lines() {
        out.push_str(line);
        out.push('\n');

        for (idx, (marker, body)) in segments.iter().enumerate() {
            if used[idx] {
                continue;
            }
            if matches_command_pattern(line, marker) {
                out.push_str(body);
                used[idx] = true;
                break;
            }
        }
    }
    out.trim_end().to_string()
}

/// Read and merge the recorded transcript pair for `session_id`,
/// excluding the invoking `whai` command and everything captured after
/// it. Returns `None` if the transcript file cannot be read.
pub fn get_session_context(session_id: &str, exclude_command: Option<&str>) -> Option<String> {
    let transcript_raw = std::fs::read_to_string(transcript_path(session_id)).ok()?;
    let self_log_raw = std::fs::read_to_string(self_log_path(session_id)).unwrap_or_default();

    let normalized_transcript = normalize(&transcript_raw);
    let merged = merge_transcript_with_self_log(&normalized_transcript, &self_log_raw);

    let trimmed = match exclude_command {
        Some(cmd) => {
            let lines: Vec<&str> = merged.lines().collect();
            let cutoff = lines
                .iter()
                .enumerate()
                .rev()
                .find(|(_, line)| matches_command_pattern(line, cmd))
                .map(|(idx, _)| idx);
            match cutoff {
                Some(idx) => lines[..idx].join("\n"),
                None => merged,
            }
        }
        None => merged,
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
    fn backspace_erases_preceding_char() {
        let raw = "abc\u{8}\u{8}d";
        assert_eq!(normalize_unix_log(raw), "ad");
    }

    #[test]
    fn strips_csi_sequences() {
        let raw = "\x1b[31mred text\x1b[0m";
        assert_eq!(normalize_unix_log(raw), "red text");
    }

    #[test]
    fn drops_spinner_only_lines() {
        let raw = "ls -la\n|\n/\nfile.txt\n-\n";
        let result = normalize_unix_log(raw);
        assert!(!result.contains('|'));
        assert!(result.contains("file.txt"));
    }

    #[test]
    fn extracts_powershell_metadata_header() {
        let raw = "**********************\nPowerShell transcript start\nStart time: 20260101\nUsername: dev\n**********************\nPS> ls\nfile.txt\n**********************\nPowerShell transcript end\nEnd time: 20260101\n**********************\n";
        let result = normalize_powershell_transcript(raw);
        assert!(result.starts_with("--- PowerShell Session ---"));
        assert!(result.contains("Username: dev"));
        assert!(result.contains("PS> ls"));
        assert!(!result.contains("transcript end"));
        assert!(!result.contains('*'));
    }

    #[test]
    fn splices_self_log_segment_after_matching_invocation() {
        let outer = "$ whai fix the bug\n$ ls\nfile.txt\n";
        let self_log = "### whai fix the bug\nThinking about the bug...\nRan a fix.\n";
        let merged = merge_transcript_with_self_log(outer, self_log);
        let lines: Vec<&str> = merged.lines().collect();
        assert_eq!(lines[0], "$ whai fix the bug");
        assert_eq!(lines[1], "Thinking about the bug...");
        assert_eq!(lines[2], "Ran a fix.");
        assert_eq!(lines[3], "$ ls");
    }

    #[test]
    fn ignores_paths_that_merely_contain_whai() {
        let outer = "$ cat /usr/bin/whaiconfig\nno match here\n";
        let self_log = "### whai\nshould not splice\n";
        let merged = merge_transcript_with_self_log(outer, self_log);
        assert!(!merged.contains("should not splice"));
    }
}
