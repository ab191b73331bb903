use once_cell::sync::Lazy;
use regex::Regex;

pub const MAX_REMOTE_CHARS: usize = 600;
const CONTINUATION: &str = "... (continúa en el texto escrito)";

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));
static BRACKETS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[.*?\]").expect("valid regex"));

/// Collapse whitespace and drop bracketed annotations such as `[nota 3]`.
pub fn clean(text: &str) -> String {
    let collapsed = WHITESPACE_RE.replace_all(text, " ");
    BRACKETS_RE.replace_all(&collapsed, "").trim().to_string()
}

/// Cap text sent to remote engines, counting characters rather than bytes.
pub fn truncate_for_remote(text: &str) -> String {
    if text.chars().count() <= MAX_REMOTE_CHARS {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(MAX_REMOTE_CHARS).collect();
    truncated.push_str(CONTINUATION);
    truncated
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_whitespace_and_annotations() {
        assert_eq!(clean("  Hola\n\n mundo [1] cruel  "), "Hola mundo  cruel");
    }

    #[test]
    fn truncates_long_text_on_char_boundary() {
        let text = "ñ".repeat(MAX_REMOTE_CHARS + 5);
        let truncated = truncate_for_remote(&text);
        assert!(truncated.ends_with(CONTINUATION));
        assert_eq!(
            truncated.chars().count(),
            MAX_REMOTE_CHARS + CONTINUATION.chars().count()
        );
    }

    #[test]
    fn keeps_short_text() {
        assert_eq!(truncate_for_remote("Hola"), "Hola");
    }
}
