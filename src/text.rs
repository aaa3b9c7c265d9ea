//! Transcript text normalization
//!
//! Dictated text is injected at the cursor as one continuous run:
//! line breaks become spaces and whitespace runs collapse, so a paste
//! into a terminal or form field never submits early on a newline.

use regex::Regex;
use std::sync::OnceLock;

fn whitespace_runs() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("static regex"))
}

/// Collapse the transcript into continuous text
pub fn continuous(text: &str) -> String {
    whitespace_runs().replace_all(text.trim(), " ").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_line_breaks() {
        assert_eq!(continuous("hello\nworld"), "hello world");
        assert_eq!(continuous("a\r\nb\rc"), "a b c");
    }

    #[test]
    fn collapses_whitespace_runs() {
        assert_eq!(continuous("  spaced   out\t\ttext  "), "spaced out text");
    }

    #[test]
    fn plain_text_unchanged() {
        assert_eq!(continuous("already clean"), "already clean");
    }

    #[test]
    fn empty_stays_empty() {
        assert_eq!(continuous(""), "");
        assert_eq!(continuous("\n\n"), "");
    }
}
