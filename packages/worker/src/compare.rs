//! Output comparison.
//!
//! Outputs are normalized by trimming trailing whitespace on every line and
//! dropping trailing blank lines. If the normalized texts differ, both sides
//! are parsed as ordered sequences (`[0, 1]`, `["a","b"]`, `[[1,2],[3]]`) and
//! compared element-wise, so spacing and the quote style inside brackets do
//! not matter. A string element never equals a number, boolean or null.

use serde_json::Value;

/// One element of a parsed sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    /// Quoted string element.
    Str(String),
    /// Number, boolean or null, in JSON spelling.
    Lit(String),
    Seq(Vec<Token>),
}

/// Normalized lines of program output.
pub fn normalize(s: &str) -> Vec<&str> {
    let mut lines: Vec<&str> = s.lines().map(str::trim_end).collect();
    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    lines
}

/// Whether `actual` is an accepted answer for `expected`. No partial credit.
pub fn outputs_match(actual: &str, expected: &str) -> bool {
    let actual = normalize(actual);
    let expected = normalize(expected);
    if actual == expected {
        return true;
    }

    match (
        parse_sequence(&actual.join("\n")),
        parse_sequence(&expected.join("\n")),
    ) {
        (Some(a), Some(e)) => a == e,
        _ => false,
    }
}

fn parse_sequence(text: &str) -> Option<Token> {
    let text = text.trim();
    if !(text.starts_with('[') && text.ends_with(']')) {
        return None;
    }
    match serde_json::from_str::<Value>(text) {
        Ok(value @ Value::Array(_)) => Some(from_json(value)),
        _ => parse_loose(text),
    }
}

fn from_json(value: Value) -> Token {
    match value {
        Value::Array(items) => Token::Seq(items.into_iter().map(from_json).collect()),
        Value::String(s) => Token::Str(s),
        other => Token::Lit(other.to_string()),
    }
}

/// Bracketed lists that are not JSON, e.g. Python's `['a', 'b']` or `[True, None]`.
fn parse_loose(text: &str) -> Option<Token> {
    let inner = text.strip_prefix('[')?.strip_suffix(']')?;
    let mut items = Vec::new();
    for part in split_top_level(inner)? {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        if part.starts_with('[') {
            items.push(parse_loose(part)?);
        } else {
            items.push(loose_atom(part));
        }
    }
    Some(Token::Seq(items))
}

fn loose_atom(part: &str) -> Token {
    let unquoted = ['\'', '"'].iter().find_map(|q| {
        part.strip_prefix(*q)
            .and_then(|p| p.strip_suffix(*q))
    });
    match unquoted {
        Some(s) => Token::Str(s.to_string()),
        None => Token::Lit(
            match part {
                "True" => "true",
                "False" => "false",
                "None" => "null",
                other => other,
            }
            .to_string(),
        ),
    }
}

/// Split on commas that are not nested inside brackets or quotes.
/// Returns `None` on unbalanced brackets.
fn split_top_level(s: &str) -> Option<Vec<&str>> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (i, c) in s.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, '[') => depth += 1,
            (None, ']') => depth = depth.checked_sub(1)?,
            (None, ',') if depth == 0 => {
                parts.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if depth != 0 || quote.is_some() {
        return None;
    }
    parts.push(&s[start..]);
    Some(parts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compare_output_exact() {
        assert!(outputs_match("3\n", "3\n"));
    }

    #[test]
    fn test_compare_output_trailing_whitespace() {
        assert!(outputs_match("3  \n", "3\n"));
        assert!(outputs_match("3\n\n\n", "3"));
    }

    #[test]
    fn test_compare_output_mismatch() {
        assert!(!outputs_match("4\n", "3\n"));
        assert!(!outputs_match("[1,2]", "[0,1]"));
        assert!(!outputs_match("[\"0\",\"1\"]", "[0,1]"));
        assert!(!outputs_match("[\"true\"]", "[true]"));
        assert!(!outputs_match("['0', '1']", "[0,1]"));
    }

    #[test]
    fn test_leading_whitespace_is_significant() {
        assert!(!outputs_match("  3", "3"));
    }

    #[test]
    fn test_sequence_spacing_ignored() {
        assert!(outputs_match("[0, 1]\n", "[0,1]"));
        assert!(outputs_match("[[1, 2], [3]]", "[[1,2],[3]]"));
        assert!(!outputs_match("[1, 0]", "[0,1]"));
        assert!(!outputs_match("[0, 1, 2]", "[0,1]"));
    }

    #[test]
    fn test_python_repr_sequences() {
        assert!(outputs_match("['bab', 'x']", "[\"bab\",\"x\"]"));
        assert!(outputs_match("[True, False]", "[true,false]"));
        assert!(outputs_match("[]", "[]"));
    }

    #[test]
    fn test_unbalanced_brackets_do_not_match() {
        assert!(!outputs_match("[[1, 2]", "[[1,2]]"));
        assert_eq!(split_top_level("1,[2"), None);
    }
}
