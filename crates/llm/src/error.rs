//! Provider error taxonomy and sanitization.
//!
//! Grounded on `original_source/whai/llm.py`'s `_friendly_message`/`_sanitize`
//! closures: every backend exception is classified into one of a fixed set
//! of kinds and rendered as a single actionable line naming the provider,
//! the model, and the next step.

use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmErrorKind {
    Authentication,
    InvalidModel,
    PermissionDenied,
    RateLimit,
    NetworkOrService,
    Other,
}

#[derive(Debug, Error)]
#[error("{message}")]
pub struct LlmError {
    pub kind: LlmErrorKind,
    pub message: String,
}

impl LlmError {
    pub fn new(kind: LlmErrorKind, provider: &str, model: &str, detail: &str) -> Self {
        let base = format!("provider={provider} model={model}");
        let detail = sanitize(detail);
        let message = match kind {
            LlmErrorKind::Authentication => format!(
                "LLM API error: Authentication failed. {base}. Check your API key. Run 'whai --interactive-config' to update your configuration."
            ),
            LlmErrorKind::InvalidModel => format!(
                "LLM API error: Model is invalid or unavailable. {base}. Choose a valid model with --model or run 'whai --interactive-config' to pick one."
            ),
            LlmErrorKind::PermissionDenied => format!(
                "LLM API error: Permission denied for this model with the current API key. {base}. Verify access for your account or pick another model via 'whai --interactive-config'."
            ),
            LlmErrorKind::RateLimit => format!(
                "LLM API error: Rate limit reached. {base}. Try again later or switch model/provider."
            ),
            LlmErrorKind::NetworkOrService => format!(
                "LLM API error: Network or service error talking to the provider. {base}. Check your connection or try again."
            ),
            LlmErrorKind::Other => format!("LLM API error: {base}. {detail}"),
        };
        Self { kind, message }
    }

    /// Classify a raw HTTP status + body into a kind, matching the original's
    /// string-sniffing fallback when the backend doesn't expose a typed
    /// exception hierarchy (true of every HTTP-based provider here).
    pub fn from_http(provider: &str, model: &str, status: u16, body: &str) -> Self {
        let lower = body.to_lowercase();
        let kind = match status {
            401 => LlmErrorKind::Authentication,
            403 => LlmErrorKind::PermissionDenied,
            404 => LlmErrorKind::InvalidModel,
            429 => LlmErrorKind::RateLimit,
            _ if (500..600).contains(&status) => LlmErrorKind::NetworkOrService,
            _ if lower.contains("authentication") || lower.contains("invalid api key") => {
                LlmErrorKind::Authentication
            }
            _ if lower.contains("model") && (lower.contains("not found") || lower.contains("does not exist") || lower.contains("unknown")) => {
                LlmErrorKind::InvalidModel
            }
            _ if lower.contains("permission") => LlmErrorKind::PermissionDenied,
            _ if lower.contains("rate limit") => LlmErrorKind::RateLimit,
            _ if lower.contains("timeout") || lower.contains("temporarily unavailable") || lower.contains("connection") => {
                LlmErrorKind::NetworkOrService
            }
            _ => LlmErrorKind::Other,
        };
        Self::new(kind, provider, model, body)
    }

    pub fn network(provider: &str, model: &str, detail: &str) -> Self {
        Self::new(LlmErrorKind::NetworkOrService, provider, model, detail)
    }
}

fn key_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)\b[prsu]?k[-_][A-Za-z0-9]{8,}\b").expect("static regex is valid")
    })
}

/// Redact API-key-like tokens (shape: 2 letters + `-`/`_` + >=8 alphanumerics).
pub fn sanitize(text: &str) -> String {
    key_pattern().replace_all(text, "<redacted>").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_redacts_openai_style_keys() {
        let text = "auth failed for key sk-abcdefgh12345678";
        assert_eq!(sanitize(text), "auth failed for key <redacted>");
    }

    #[test]
    fn sanitize_leaves_ordinary_text_alone() {
        assert_eq!(sanitize("model gpt-5-mini not found"), "model gpt-5-mini not found");
    }

    #[test]
    fn classifies_401_as_authentication() {
        let err = LlmError::from_http("openai", "gpt-5-mini", 401, "invalid api key");
        assert_eq!(err.kind, LlmErrorKind::Authentication);
        assert!(err.message.contains("Authentication failed"));
    }

    #[test]
    fn classifies_429_as_rate_limit() {
        let err = LlmError::from_http("openai", "gpt-5-mini", 429, "too many requests");
        assert_eq!(err.kind, LlmErrorKind::RateLimit);
    }

    #[test]
    fn error_message_never_contains_raw_key() {
        let err = LlmError::new(LlmErrorKind::Other, "openai", "gpt-5-mini", "leaked sk-deadbeef12345678");
        assert!(!err.message.contains("sk-deadbeef12345678"));
    }
}
