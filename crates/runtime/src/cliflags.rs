//! Inline-flag extraction from free-form query tokens.
//!
//! Ported from `original_source/whai/cli/flags.py::extract_inline_overrides`:
//! a single left-to-right scan that strips recognized flag/value pairs out
//! of the token stream, returning the remainder as the free-form query.
//! This lets a user type `whai what does -t 0.2 this regex do` and have
//! `-t 0.2` recognized without quoting the rest of the sentence.

use thiserror::Error;

#[derive(Debug, Clone, Default)]
pub struct InlineOverrides {
    pub role: Option<String>,
    pub no_context: bool,
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub timeout: Option<u64>,
    pub log_level: Option<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FlagError {
    #[error("--timeout requires a value (seconds)")]
    TimeoutMissingValue,
    #[error("--timeout must be a positive integer (seconds)")]
    TimeoutNotPositive,
    #[error("--timeout must be an integer (seconds)")]
    TimeoutNotAnInteger,
    #[error("--model requires a value")]
    ModelMissingValue,
    #[error("--temperature requires a value")]
    TemperatureMissingValue,
    #[error("--temperature must be a number")]
    TemperatureNotANumber,
    #[error("--role requires a value")]
    RoleMissingValue,
}

const LOG_LEVELS: [&str; 5] = ["CRITICAL", "ERROR", "WARNING", "INFO", "DEBUG"];

/// Rebuild the literal `whai ...` invocation from raw `argv` (excluding the
/// program name) so it can be located and stripped out of captured context.
/// Per spec §6/GLOSSARY: "the exact invocation of whai ... reconstructed
/// from argv" — the command matcher (see `whai_context::matcher`) handles
/// quote-style and whitespace differences between this and however the
/// shell history or tmux pane actually recorded the line.
pub fn reconstruct_invocation(argv: &[String]) -> String {
    let mut parts = Vec::with_capacity(argv.len() + 1);
    parts.push("whai".to_string());
    parts.extend(argv.iter().cloned());
    parts.join(" ")
}

/// Scan `tokens` for inline flag/value pairs, returning the cleaned
/// free-form query tokens and whatever overrides were recognized. Initial
/// values from actual CLI flags are passed in as the starting point so an
/// inline flag can still override them.
pub fn extract_inline_overrides(
    tokens: &[String],
    initial: InlineOverrides,
) -> Result<(Vec<String>, InlineOverrides), FlagError> {
    let mut cleaned = Vec::new();
    let mut overrides = initial;
    let mut i = 0;

    while i < tokens.len() {
        let token = tokens[i].as_str();
        match token {
            "--timeout" => {
                let value = tokens.get(i + 1).ok_or(FlagError::TimeoutMissingValue)?;
                let parsed: i64 = value.parse().map_err(|_| FlagError::TimeoutNotAnInteger)?;
                if parsed <= 0 {
                    return Err(FlagError::TimeoutNotPositive);
                }
                overrides.timeout = Some(parsed as u64);
                i += 2;
            }
            "--no-context" => {
                overrides.no_context = true;
                i += 1;
            }
            "--model" | "-m" => {
                let value = tokens.get(i + 1).ok_or(FlagError::ModelMissingValue)?;
                overrides.model = Some(value.clone());
                i += 2;
            }
            "--temperature" | "-t" => {
                let value = tokens.get(i + 1).ok_or(FlagError::TemperatureMissingValue)?;
                let parsed: f32 = value.parse().map_err(|_| FlagError::TemperatureNotANumber)?;
                overrides.temperature = Some(parsed);
                i += 2;
            }
            "--role" | "-r" => {
                let value = tokens.get(i + 1).ok_or(FlagError::RoleMissingValue)?;
                overrides.role = Some(value.clone());
                i += 2;
            }
            "-v" => {
                let next = tokens.get(i + 1).map(|t| t.to_uppercase());
                match next {
                    Some(candidate) if LOG_LEVELS.contains(&candidate.as_str()) => {
                        overrides.log_level = Some(candidate);
                        i += 2;
                    }
                    _ => {
                        overrides.log_level = Some("INFO".to_string());
                        i += 1;
                    }
                }
            }
            _ => {
                cleaned.push(tokens[i].clone());
                i += 1;
            }
        }
    }

    Ok((cleaned, overrides))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(s: &str) -> Vec<String> {
        s.split_whitespace().map(str::to_string).collect()
    }

    #[test]
    fn strips_recognized_flags_and_keeps_query_words() {
        let (cleaned, overrides) =
            extract_inline_overrides(&toks("what -t 0.2 does this regex do"), InlineOverrides::default()).unwrap();
        assert_eq!(cleaned.join(" "), "what does this regex do");
        assert_eq!(overrides.temperature, Some(0.2));
    }

    #[test]
    fn no_context_flag_needs_no_value() {
        let (cleaned, overrides) =
            extract_inline_overrides(&toks("explain --no-context this"), InlineOverrides::default()).unwrap();
        assert_eq!(cleaned.join(" "), "explain this");
        assert!(overrides.no_context);
    }

    #[test]
    fn v_flag_defaults_to_info_when_no_level_follows() {
        let (cleaned, overrides) =
            extract_inline_overrides(&toks("-v tell me"), InlineOverrides::default()).unwrap();
        assert_eq!(cleaned.join(" "), "tell me");
        assert_eq!(overrides.log_level.as_deref(), Some("INFO"));
    }

    #[test]
    fn v_flag_consumes_a_recognized_level() {
        let (cleaned, overrides) =
            extract_inline_overrides(&toks("-v DEBUG tell me"), InlineOverrides::default()).unwrap();
        assert_eq!(cleaned.join(" "), "tell me");
        assert_eq!(overrides.log_level.as_deref(), Some("DEBUG"));
    }

    #[test]
    fn v_flag_does_not_consume_a_non_level_token() {
        let (cleaned, overrides) =
            extract_inline_overrides(&toks("-v explain this"), InlineOverrides::default()).unwrap();
        assert_eq!(cleaned.join(" "), "explain this");
        assert_eq!(overrides.log_level.as_deref(), Some("INFO"));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let err = extract_inline_overrides(&toks("--timeout 0 ls"), InlineOverrides::default()).unwrap_err();
        assert_eq!(err, FlagError::TimeoutNotPositive);
    }

    #[test]
    fn missing_timeout_value_is_an_error() {
        let err = extract_inline_overrides(&toks("run --timeout"), InlineOverrides::default()).unwrap_err();
        assert_eq!(err, FlagError::TimeoutMissingValue);
    }

    #[test]
    fn reconstructs_invocation_with_whai_prefix() {
        let argv = toks("-v DEBUG");
        assert_eq!(reconstruct_invocation(&argv), "whai -v DEBUG");
    }
}
