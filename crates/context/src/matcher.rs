//! The command-exclusion matcher shared by the history and tmux/session
//! tiers. Kept in one place because its rules (prompt stripping, quote
//! normalization, log-line exclusion, whole-token match) are the subtle
//! part of context capture.

use std::sync::OnceLock;

use regex::Regex;

fn log_marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*\[(INFO|DEBUG|ERROR|WARNING|CRITICAL)\]").unwrap())
}

fn own_log_phrase_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"Will exclude command from context|Found matching command at line|Filtered.*from tmux context|Captured.*scrollback",
        )
        .unwrap()
    })
}

fn quote_strip_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#""([^"]*)"|'([^']*)'"#).unwrap())
}

fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Strip surrounding double- or single-quotes from quoted substrings so
/// `"x"` and `'x'` compare equal to bare `x`.
fn normalize_quotes(s: &str) -> String {
    quote_strip_re()
        .replace_all(s, |caps: &regex::Captures| {
            caps.get(1)
                .or_else(|| caps.get(2))
                .map(|m| m.as_str().to_string())
                .unwrap_or_default()
        })
        .to_string()
}

/// Strip common prompt prefixes: `$ `, `PS>`, `[host]~/path>`.
fn strip_prompt_prefix(s: &str) -> &str {
    let trimmed = s.trim_start();
    if let Some(rest) = trimmed.strip_prefix("$ ") {
        return rest;
    }
    if let Some(rest) = trimmed.strip_prefix("PS>") {
        return rest.trim_start();
    }
    if let Some(close) = trimmed.strip_prefix('[').and_then(|r| r.find(']').map(|i| i)) {
        let rest = &trimmed[close + 2..];
        if let Some(after_prompt) = rest.find('>') {
            return rest[after_prompt + 1..].trim_start();
        }
    }
    trimmed
}

fn normalize(s: &str) -> String {
    normalize_quotes(&normalize_whitespace(strip_prompt_prefix(s)))
}

fn is_word_boundary(c: char) -> bool {
    !(c.is_alphanumeric() || c == '_')
}

/// Whole-token containment: `needle` occurs in `haystack` bounded by
/// non-word characters (or string edges) on both sides — forbids matching
/// `whai` inside `whaiting` or inside a longer path component.
fn contains_whole_token(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    let mut start = 0;
    while let Some(pos) = haystack[start..].find(needle) {
        let abs = start + pos;
        let before_ok = haystack[..abs].chars().next_back().map(is_word_boundary).unwrap_or(true);
        let after_idx = abs + needle.len();
        let after_ok = haystack[after_idx..].chars().next().map(is_word_boundary).unwrap_or(true);
        if before_ok && after_ok {
            return true;
        }
        start = abs + 1;
        if start >= haystack.len() {
            break;
        }
    }
    false
}

/// True if `line` is clearly log output that should never be treated as
/// the invoking command, regardless of its content.
pub fn is_log_line(line: &str) -> bool {
    log_marker_re().is_match(line) || own_log_phrase_re().is_match(line)
}

/// Does `line` represent an invocation of `command`, after prompt
/// stripping and quote/whitespace normalization, matched as a whole
/// token rather than a substring?
pub fn matches_command_pattern(line: &str, command: &str) -> bool {
    if is_log_line(line) {
        return false;
    }
    let norm_line = normalize(line);
    let norm_cmd = normalize(command);
    if norm_cmd.is_empty() {
        return false;
    }

    if norm_line == norm_cmd {
        return true;
    }
    contains_whole_token(&norm_line, &norm_cmd)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_exact_command() {
        assert!(matches_command_pattern("$ whai -v DEBUG", "whai -v DEBUG"));
    }

    #[test]
    fn matches_through_quote_normalization() {
        assert!(matches_command_pattern(
            "whai -v \"DEBUG\"",
            "whai -v DEBUG"
        ));
    }

    #[test]
    fn does_not_match_substring_inside_longer_word() {
        assert!(!matches_command_pattern("echo whaiting for it", "whai"));
    }

    #[test]
    fn does_not_match_inside_path() {
        assert!(!matches_command_pattern("cat /usr/bin/whaiconfig", "whai"));
    }

    #[test]
    fn skips_log_marker_lines() {
        assert!(!matches_command_pattern("[INFO] whai -v DEBUG", "whai -v DEBUG"));
    }

    #[test]
    fn skips_own_log_phrases() {
        assert!(!matches_command_pattern(
            "Will exclude command from context: whai -v DEBUG",
            "whai -v DEBUG"
        ));
    }

    #[test]
    fn strips_dollar_prompt_prefix() {
        assert!(matches_command_pattern("$ ls -la", "ls -la"));
    }
}
