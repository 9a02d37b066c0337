//! Post-processing: deterministic cleanup of raw Tesseract output.
//!
//! Tesseract terminates every page with a form feed, may emit CRLF line
//! endings on Windows builds and sprinkles trailing spaces and blank lines.
//! None of that belongs in the rebuilt PDF. The rules here never touch the
//! recognised words themselves.
//!
//! Rules (applied in order):
//! 1. Normalise line endings (CRLF / CR → LF)
//! 2. Drop form feeds
//! 3. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens)
//! 4. Trim trailing whitespace per line
//! 5. Collapse 3+ consecutive blank lines down to 2
//! 6. Drop leading and trailing blank lines

use once_cell::sync::Lazy;
use regex::Regex;

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{4,}").unwrap());

/// Apply all cleanup rules to raw OCR output.
pub fn clean_text(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = s.replace('\x0c', "");
    let s = remove_invisible_chars(&s);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    s.trim_matches('\n').to_string()
}

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

fn remove_invisible_chars(input: &str) -> String {
    input
        .chars()
        .filter(|c| !matches!(c, '\u{200B}' | '\u{200C}' | '\u{200D}' | '\u{2060}' | '\u{FEFF}' | '\u{00AD}'))
        .collect()
}

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
}

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n\n").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_tesseract_form_feed() {
        assert_eq!(clean_text("Hello world\n\n\x0c"), "Hello world");
    }

    #[test]
    fn normalises_crlf() {
        assert_eq!(clean_text("a\r\nb\rc"), "a\nb\nc");
    }

    #[test]
    fn trims_trailing_spaces_but_keeps_indent() {
        assert_eq!(clean_text("  indented   \nnext\t"), "  indented\nnext");
    }

    #[test]
    fn collapses_runs_of_blank_lines() {
        assert_eq!(clean_text("a\n\n\n\n\n\nb"), "a\n\n\nb");
        assert_eq!(clean_text("a\n\nb"), "a\n\nb");
    }

    #[test]
    fn removes_invisible_chars() {
        assert_eq!(clean_text("\u{FEFF}zero\u{200B}width"), "zerowidth");
    }

    #[test]
    fn blank_page_becomes_empty() {
        assert_eq!(clean_text(" \n \n\x0c"), "");
    }

    #[test]
    fn keeps_unicode_text() {
        assert_eq!(clean_text("Grüße\nПривет\n"), "Grüße\nПривет");
    }
}
