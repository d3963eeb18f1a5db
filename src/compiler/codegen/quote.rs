//! Quoting and escaping helpers for emitted Go source.

use std::fmt::Write;

/// Backtick-quotes text for a Go string literal. An embedded backtick closes
/// the raw literal, splices in a double-quoted backtick, and resumes.
pub fn quote_text(val: &str) -> String {
    format!("`{}`", val.replace('`', "` + \"`\" + `"))
}

/// HTML-escapes text the way Go's `html.EscapeString` does.
pub fn html_escape(val: &str) -> String {
    let mut out = String::with_capacity(val.len());
    for c in val.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '\'' => out.push_str("&#39;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            _ => out.push(c),
        }
    }
    out
}

/// Double-quotes text for a Go string literal, escaping as `%q` would.
pub fn go_quote(val: &str) -> String {
    let mut out = String::with_capacity(val.len() + 2);
    out.push('"');
    for c in val.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c if (c as u32) < 0x20 => {
                let _ = write!(out, "\\x{:02x}", c as u32);
            }
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_text_plain() {
        assert_eq!(quote_text("hello"), "`hello`");
    }

    #[test]
    fn test_quote_text_with_backtick() {
        assert_eq!(quote_text("a`b"), "`a` + \"`\" + `b`");
    }

    #[test]
    fn test_html_escape() {
        assert_eq!(
            html_escape(r#"<a href="x">'&'</a>"#),
            "&lt;a href=&#34;x&#34;&gt;&#39;&amp;&#39;&lt;/a&gt;"
        );
    }

    #[test]
    fn test_go_quote() {
        assert_eq!(go_quote(", "), r#"", ""#);
        assert_eq!(go_quote("a\nb"), r#""a\nb""#);
        assert_eq!(go_quote(r#"say "hi""#), r#""say \"hi\"""#);
    }
}
