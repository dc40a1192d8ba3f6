//! Comment-tolerant JSON pre-pass.
//!
//! The manifest and sidecar config files allow `//`-prefixed comment lines so
//! asset authors can annotate them. Lines whose trimmed start is `//` are
//! dropped wholesale before the content reaches serde_json; everything else
//! passes through untouched (inline `//` inside a line is NOT a comment).

/// Remove every line that begins (after leading whitespace) with `//`.
pub fn strip_comment_lines(raw: &str) -> String {
    raw.lines()
        .filter(|line| !line.trim_start().starts_with("//"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passes_plain_json_through() {
        let raw = "{\n  \"a\": 1\n}";
        assert_eq!(strip_comment_lines(raw), raw);
    }

    #[test]
    fn drops_comment_lines_with_leading_whitespace() {
        let raw = "// header\n{\n   // indented note\n  \"a\": 1\n}";
        assert_eq!(strip_comment_lines(raw), "{\n  \"a\": 1\n}");
    }

    #[test]
    fn keeps_inline_slashes() {
        let raw = "{ \"url\": \"http://example\" }";
        assert_eq!(strip_comment_lines(raw), raw);
    }

    #[test]
    fn handles_crlf_input() {
        let raw = "// note\r\n{ \"a\": 1 }\r\n";
        assert_eq!(strip_comment_lines(raw), "{ \"a\": 1 }");
    }
}
