//! Tokenizer for `{name:Type}` query parameter placeholders.
//!
//! Splits SQL into literal text and placeholders so that parameters can be
//! listed, renamed or substituted without touching anything else. Handles:
//! - Placeholders: `{start_date:String}`, `{ids:Array(UInt64)}`
//! - Single-quoted string literals with `\'` and `''` escapes
//! - Double-quoted and backquoted identifiers
//! - Line (`--`) and block (`/* */`) comments
//!
//! Braces inside literals, identifiers and comments are never placeholders,
//! and a brace sequence that does not match the grammar stays literal text.

use std::collections::HashSet;

/// A piece of tokenized SQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlToken<'a> {
    /// Literal SQL text, reproduced verbatim.
    Text(&'a str),
    /// A parameter placeholder.
    Placeholder { name: &'a str, ty: &'a str },
}

/// A placeholder found in a SQL string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    /// Parameter name.
    pub name: String,
    /// Declared type, e.g. `String` or `Array(String)`.
    pub ty: String,
}

/// Tokenizes SQL into text runs and placeholders.
pub fn tokenize(sql: &str) -> Vec<SqlToken<'_>> {
    let bytes = sql.as_bytes();
    let mut tokens = Vec::new();
    let mut text_start = 0;
    let mut pos = 0;

    while pos < bytes.len() {
        match bytes[pos] {
            b'\'' => pos = skip_quoted(bytes, pos, b'\''),
            b'"' => pos = skip_quoted(bytes, pos, b'"'),
            b'`' => pos = skip_quoted(bytes, pos, b'`'),
            b'-' if bytes.get(pos + 1) == Some(&b'-') => {
                pos = skip_line_comment(bytes, pos);
            }
            b'/' if bytes.get(pos + 1) == Some(&b'*') => {
                pos = skip_block_comment(bytes, pos);
            }
            b'{' => match parse_placeholder(sql, pos) {
                Some((name, ty, end)) => {
                    if text_start < pos {
                        tokens.push(SqlToken::Text(&sql[text_start..pos]));
                    }
                    tokens.push(SqlToken::Placeholder { name, ty });
                    pos = end;
                    text_start = end;
                }
                None => pos += 1,
            },
            _ => pos += 1,
        }
    }

    if text_start < bytes.len() {
        tokens.push(SqlToken::Text(&sql[text_start..]));
    }

    tokens
}

/// Returns the distinct placeholders in order of first appearance.
pub fn placeholders(sql: &str) -> Vec<Placeholder> {
    let mut seen = HashSet::new();
    tokenize(sql)
        .into_iter()
        .filter_map(|token| match token {
            SqlToken::Placeholder { name, ty } if seen.insert(name) => Some(Placeholder {
                name: name.to_string(),
                ty: ty.to_string(),
            }),
            _ => None,
        })
        .collect()
}

/// Replaces every placeholder with the text returned by `replace(name, ty)`.
pub fn substitute<F>(sql: &str, mut replace: F) -> String
where
    F: FnMut(&str, &str) -> String,
{
    let mut out = String::with_capacity(sql.len());
    for token in tokenize(sql) {
        match token {
            SqlToken::Text(text) => out.push_str(text),
            SqlToken::Placeholder { name, ty } => out.push_str(&replace(name, ty)),
        }
    }
    out
}

/// Renames every placeholder `{x:T}` to `{<prefix>x:T}`.
pub fn prefix_placeholders(sql: &str, prefix: &str) -> String {
    substitute(sql, |name, ty| format!("{{{prefix}{name}:{ty}}}"))
}

/// Returns true if `name` is a valid placeholder name.
pub fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Attempts to parse `{name:Type}` starting at the `{` at `start`.
///
/// Returns the name, the type and the index just past the closing brace.
fn parse_placeholder(sql: &str, start: usize) -> Option<(&str, &str, usize)> {
    let bytes = sql.as_bytes();
    let name_start = start + 1;
    let mut pos = name_start;

    match bytes.get(pos) {
        Some(c) if c.is_ascii_alphabetic() || *c == b'_' => pos += 1,
        _ => return None,
    }
    while pos < bytes.len() && (bytes[pos].is_ascii_alphanumeric() || bytes[pos] == b'_') {
        pos += 1;
    }
    let name_end = pos;

    if bytes.get(pos) != Some(&b':') {
        return None;
    }
    pos += 1;

    let ty_start = pos;
    let mut depth = 0usize;
    while pos < bytes.len() {
        match bytes[pos] {
            b'(' => depth += 1,
            b')' => depth = depth.checked_sub(1)?,
            b'}' if depth == 0 => break,
            b'{' | b'\n' | b'\'' | b';' => return None,
            _ => {}
        }
        pos += 1;
    }
    if pos >= bytes.len() {
        return None;
    }

    let ty = sql[ty_start..pos].trim();
    if ty.is_empty() {
        return None;
    }

    Some((&sql[name_start..name_end], ty, pos + 1))
}

/// Skips a quoted region starting at `start`, returning the index after it.
///
/// A doubled quote or a backslash escapes the quote character. An unterminated
/// region runs to the end of input.
fn skip_quoted(bytes: &[u8], start: usize, quote: u8) -> usize {
    let mut pos = start + 1;
    while pos < bytes.len() {
        match bytes[pos] {
            b'\\' => pos += 2,
            c if c == quote => {
                if bytes.get(pos + 1) == Some(&quote) {
                    pos += 2;
                } else {
                    return pos + 1;
                }
            }
            _ => pos += 1,
        }
    }
    bytes.len()
}

fn skip_line_comment(bytes: &[u8], start: usize) -> usize {
    bytes[start..]
        .iter()
        .position(|&b| b == b'\n')
        .map(|offset| start + offset + 1)
        .unwrap_or(bytes.len())
}

fn skip_block_comment(bytes: &[u8], start: usize) -> usize {
    bytes[start + 2..]
        .windows(2)
        .position(|w| w == b"*/")
        .map(|offset| start + 2 + offset + 2)
        .unwrap_or(bytes.len())
}
