//! Parameter handling for named-block substitution and joins.
//!
//! Parameters are comma-separated. A parameter may be a double-quoted string
//! with standard escape sequences, or an arbitrary balanced expression
//! containing parentheses, brackets and quoted substrings; commas inside
//! either do not split. Empty positions produce empty parameters.

use crate::compiler::blocks::BlockEntry;
use crate::compiler::error::ErrorKind;
use crate::compiler::ParamMode;

/// Splits a raw parameter string into its positional values.
///
/// Quoted parameters are unquoted; a lone opening quote is an error. The
/// error is the message text; the lexer attaches the location.
pub fn split_params(input: &str) -> Result<Vec<String>, String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    let mut params = Vec::new();
    let mut cur = String::new();
    let mut depth: usize = 0;
    let mut chars = trimmed.chars();

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                cur.push('"');
                let mut closed = false;
                while let Some(c2) = chars.next() {
                    cur.push(c2);
                    if c2 == '\\' {
                        if let Some(esc) = chars.next() {
                            cur.push(esc);
                        }
                    } else if c2 == '"' {
                        closed = true;
                        break;
                    }
                }
                if !closed {
                    return Err(format!(
                        "parameter has a beginning quote with no ending quote: {cur}"
                    ));
                }
            }
            '(' | '[' => {
                depth += 1;
                cur.push(c);
            }
            ')' | ']' => {
                depth = depth.saturating_sub(1);
                cur.push(c);
            }
            ',' if depth == 0 => {
                params.push(finish_param(&cur)?);
                cur.clear();
            }
            _ => cur.push(c),
        }
    }
    params.push(finish_param(&cur)?);
    Ok(params)
}

fn finish_param(raw: &str) -> Result<String, String> {
    let trimmed = raw.trim();
    if trimmed.starts_with('"') {
        unquote(trimmed)
    } else {
        Ok(trimmed.to_string())
    }
}

/// Unquotes a double-quoted string with standard escape sequences.
pub fn unquote(s: &str) -> Result<String, String> {
    let malformed = || {
        format!("parameter starts with a quote but does not end with a quote: {s}")
    };

    let inner = s
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .ok_or_else(malformed)?;
    if s.len() < 2 {
        return Err(malformed());
    }

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('r') => out.push('\r'),
                Some('0') => out.push('\0'),
                Some('\\') => out.push('\\'),
                Some('"') => out.push('"'),
                Some('\'') => out.push('\''),
                Some(other) => {
                    out.push('\\');
                    out.push(other);
                }
                // A trailing backslash escaped the closing quote.
                None => return Err(malformed()),
            }
        } else if c == '"' {
            // An unescaped quote before the end means trailing content.
            return Err(malformed());
        } else {
            out.push(c);
        }
    }
    Ok(out)
}

/// Replaces `$1`..`$9` in a block body with the given parameters and
/// enforces the declared count. `$10` and beyond stay literal.
pub fn process_params(
    name: &str,
    entry: &BlockEntry,
    params: &[String],
    mode: ParamMode,
) -> Result<String, (ErrorKind, String)> {
    if params.len() > entry.param_count {
        return Err((
            ErrorKind::TooManyParams,
            format!("too many parameters given for named block {name}"),
        ));
    }
    if params.len() < entry.param_count && mode == ParamMode::Exact {
        return Err((
            ErrorKind::MissingParams,
            format!(
                "missing parameters for named block {name}: expected {}, got {}",
                entry.param_count,
                params.len()
            ),
        ));
    }
    Ok(substitute_placeholders(&entry.text, params))
}

fn substitute_placeholders(text: &str, params: &[String]) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '$' {
            if let Some(&d) = chars.peek() {
                if ('1'..='9').contains(&d) {
                    let mut ahead = chars.clone();
                    ahead.next();
                    let more_digits = ahead.peek().is_some_and(|c2| c2.is_ascii_digit());
                    if !more_digits {
                        chars.next();
                        if let Some(param) = params.get((d as u8 - b'1') as usize) {
                            out.push_str(param);
                        }
                        continue;
                    }
                }
            }
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::error::Frame;

    #[test]
    fn test_split_params() {
        let cases: &[(&str, &str, &[&str])] = &[
            ("one", "test", &["test"]),
            ("two", "test, test2", &["test", "test2"]),
            ("three", "test, test2, test3", &["test", "test2", "test3"]),
            ("no space", "test,test2,test3", &["test", "test2", "test3"]),
            ("one quote", r#""test""#, &["test"]),
            ("one quote with space", r#""test test2""#, &["test test2"]),
            ("one quote with param", r#""test", test2"#, &["test", "test2"]),
            (
                "quote and params",
                r#""test test2", test3, test4"#,
                &["test test2", "test3", "test4"],
            ),
            ("quote with comma", r#""test, test2""#, &["test, test2"]),
            (
                "quote with escaped quote",
                r#""test]\", test2""#,
                &[r#"test]", test2"#],
            ),
            (
                "quote with two escaped quotes",
                r#""test]\", \"test2""#,
                &[r#"test]", "test2"#],
            ),
            ("call", r#"a.b.c("d"), test2"#, &[r#"a.b.c("d")"#, "test2"]),
            (
                "call with escaped quote",
                r#"a.b.c("d\""), test2"#,
                &[r#"a.b.c("d\"")"#, "test2"]),
            ("call with comma", "f(a, b), c", &["f(a, b)", "c"]),
            ("empty param", "test1,,test2", &["test1", "", "test2"]),
            ("empty space param", "test1, ,test2", &["test1", "", "test2"]),
            ("quoted space param", r#"test1," " ,test2"#, &["test1", " ", "test2"]),
            ("three empty params", ",,", &["", "", ""]),
            ("no params", "", &[]),
            ("blank", "   ", &[]),
        ];
        for (name, input, want) in cases {
            let got = split_params(input).unwrap_or_else(|e| panic!("{name}: {e}"));
            assert_eq!(&got, want, "{name}");
        }
    }

    #[test]
    fn test_split_params_errors() {
        let cases: &[(&str, &str)] = &[
            ("one quote", r#""test"#),
            ("escaped close", r#""test \""#),
            ("quote with comma", r#""test ,"#),
            ("second param unterminated", r#"test1, "test ,"#),
            ("reopened quote", r#""test1"", test ,"#),
            ("reopened quote no space", r#""test1"",test,"#),
            ("bare quote second", r#"test1,""#),
            ("only quote", r#"""#),
            ("comma then quote", r#",""#),
        ];
        for (name, input) in cases {
            assert!(split_params(input).is_err(), "{name}");
        }
    }

    fn entry(text: &str, param_count: usize) -> BlockEntry {
        BlockEntry {
            text: text.to_string(),
            param_count,
            defined_at: Frame::file("/t.tpl", 1, 1),
        }
    }

    fn params(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_process_params_substitutes() {
        let e = entry("Hi $1, meet $2!", 2);
        let out = process_params("greet", &e, &params(&["a", "b"]), ParamMode::Exact).unwrap();
        assert_eq!(out, "Hi a, meet b!");
    }

    #[test]
    fn test_process_params_repeated_placeholder() {
        let e = entry("$1 and $1", 1);
        let out = process_params("x", &e, &params(&["v"]), ParamMode::Exact).unwrap();
        assert_eq!(out, "v and v");
    }

    #[test]
    fn test_ten_stays_literal() {
        let e = entry("$1 $10", 1);
        let out = process_params("x", &e, &params(&["v"]), ParamMode::Exact).unwrap();
        assert_eq!(out, "v $10");
    }

    #[test]
    fn test_too_many_params() {
        let e = entry("$1", 1);
        let err = process_params("x", &e, &params(&["a", "b"]), ParamMode::Exact).unwrap_err();
        assert_eq!(err.0, ErrorKind::TooManyParams);
    }

    #[test]
    fn test_exact_mode_rejects_missing() {
        let e = entry("$1 $2", 2);
        let err = process_params("x", &e, &params(&["a"]), ParamMode::Exact).unwrap_err();
        assert_eq!(err.0, ErrorKind::MissingParams);
    }

    #[test]
    fn test_lenient_mode_fills_empty() {
        let e = entry("[$1][$2]", 2);
        let out = process_params("x", &e, &params(&["a"]), ParamMode::Lenient).unwrap();
        assert_eq!(out, "[a][]");
    }

    #[test]
    fn test_unquote_escapes() {
        assert_eq!(unquote(r#""a\nb""#).unwrap(), "a\nb");
        assert_eq!(unquote(r#""a\"b""#).unwrap(), "a\"b");
        assert!(unquote(r#"""#).is_err());
        assert!(unquote(r#""a"b""#).is_err());
    }
}
