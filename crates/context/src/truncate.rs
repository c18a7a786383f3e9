//! Token-budget truncation. We have no tokenizer available (the spec
//! treats token counting as an estimate, not a provider-exact count), so
//! we use the same 4-characters-per-token heuristic as the source this
//! was ported from.

const CHARS_PER_TOKEN: usize = 4;

fn notice(removed_chars: usize) -> String {
    format!("{removed_chars} CHARACTERS REMOVED TO RESPECT TOKEN LIMITS\n\n")
}

/// Truncate `text` to approximately `max_tokens`, keeping the tail (most
/// recent content) and prefixing a removal notice. Returns `(text,
/// was_truncated)`. If even the notice alone would not fit the budget,
/// returns `("", true)`.
pub fn truncate(text: &str, max_tokens: usize) -> (String, bool) {
    let max_chars = max_tokens.saturating_mul(CHARS_PER_TOKEN);
    if text.len() <= max_chars {
        return (text.to_string(), false);
    }

    let removed = text.len() - max_chars;
    let notice = notice(removed);
    if notice.len() >= max_chars {
        return (String::new(), true);
    }

    let keep_chars = max_chars - notice.len();
    let tail_start = char_boundary_from_end(text, keep_chars);
    let mut out = notice;
    out.push_str(&text[tail_start..]);
    (out, true)
}

/// Find the nearest valid char boundary at or after `text.len() -
/// keep_chars`, so we never slice through a multi-byte UTF-8 sequence.
fn char_boundary_from_end(text: &str, keep_chars: usize) -> usize {
    let target = text.len().saturating_sub(keep_chars);
    let mut idx = target;
    while idx < text.len() && !text.is_char_boundary(idx) {
        idx += 1;
    }
    idx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaves_short_text_untouched() {
        let (result, truncated) = truncate("hello", 100);
        assert_eq!(result, "hello");
        assert!(!truncated);
    }

    #[test]
    fn truncates_and_keeps_tail() {
        let text = "a".repeat(100) + "TAIL";
        let (result, truncated) = truncate(&text, 10);
        assert!(truncated);
        assert!(result.ends_with("TAIL"));
        assert!(result.contains("CHARACTERS REMOVED TO RESPECT TOKEN LIMITS\n\n"));
    }

    #[test]
    fn returns_empty_when_notice_exceeds_budget() {
        let text = "a".repeat(1000);
        let (result, truncated) = truncate(&text, 1);
        assert!(truncated);
        assert_eq!(result, "");
    }

    #[test]
    fn never_splits_a_multibyte_char() {
        let text = "日".repeat(50);
        let (result, _) = truncate(&text, 5);
        assert!(result.chars().all(|c| c != '\u{FFFD}'));
    }

    #[test]
    fn reapplying_truncate_is_a_no_op() {
        let text = "x".repeat(500);
        let (once, _) = truncate(&text, 20);
        let (twice, _) = truncate(&once, 20);
        assert_eq!(once, twice);
    }
}
