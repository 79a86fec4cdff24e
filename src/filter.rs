//! JMESPath filtering and JSON pretty-printing of response bodies.

use crate::error::Error;
use serde::de::IgnoredAny;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::Value;

/// Evaluates a JMESPath expression against a JSON body.
///
/// Returns `None` when the expression selects nothing.
///
/// # Errors
///
/// Returns a filter error if the body is not JSON, the expression does not
/// compile, or evaluation fails (e.g. a type mismatch).
pub fn evaluate(body: &[u8], expression: &str) -> Result<Option<Value>, Error> {
    let compiled = jmespath::compile(expression).map_err(|e| Error::filter(expression, e))?;
    let data: Value = serde_json::from_slice(body)
        .map_err(|e| Error::filter(expression, format!("response is not valid JSON: {e}")))?;
    let result = compiled
        .search(data)
        .map_err(|e| Error::filter(expression, e))?;
    if result.is_null() {
        return Ok(None);
    }
    let value = serde_json::to_value(&*result).map_err(|e| Error::filter(expression, e))?;
    Ok(Some(value))
}

/// Serializes a value with the given indent string.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn to_pretty(value: &Value, indent: &str) -> Result<String, Error> {
    let mut buf = Vec::new();
    let formatter = PrettyFormatter::with_indent(indent.as_bytes());
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut serializer)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Re-indents a JSON body.
///
/// Only whitespace changes: numbers and string escapes keep the exact text
/// they were received with.
///
/// # Errors
///
/// Returns a JSON error if the body does not parse.
pub fn pretty_print(body: &[u8], indent: &str) -> Result<String, Error> {
    serde_json::from_slice::<IgnoredAny>(body)?;
    let text = std::str::from_utf8(body)
        .map_err(|e| Error::InvalidArgument(format!("response is not UTF-8: {e}")))?;
    Ok(reindent(text, indent))
}

fn push_newline(out: &mut String, indent: &str, depth: usize) {
    out.push('\n');
    for _ in 0..depth {
        out.push_str(indent);
    }
}

/// Lays out already validated JSON text, one member per line.
fn reindent(text: &str, indent: &str) -> String {
    let mut out = String::with_capacity(text.len() * 2);
    let mut depth = 0usize;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                out.push(c);
                while let Some(c) = chars.next() {
                    out.push(c);
                    match c {
                        '\\' => {
                            if let Some(escaped) = chars.next() {
                                out.push(escaped);
                            }
                        }
                        '"' => break,
                        _ => {}
                    }
                }
            }
            '{' | '[' => {
                out.push(c);
                while chars.next_if(char::is_ascii_whitespace).is_some() {}
                match chars.peek() {
                    Some(&(close @ ('}' | ']'))) => {
                        out.push(close);
                        chars.next();
                    }
                    _ => {
                        depth += 1;
                        push_newline(&mut out, indent, depth);
                    }
                }
            }
            '}' | ']' => {
                depth = depth.saturating_sub(1);
                push_newline(&mut out, indent, depth);
                out.push(c);
            }
            ',' => {
                out.push(c);
                push_newline(&mut out, indent, depth);
            }
            ':' => out.push_str(": "),
            c if c.is_ascii_whitespace() => {}
            c => out.push(c),
        }
    }
    out
}

/// Display form of a filter result.
///
/// Pretty output of a bare string drops the surrounding JSON quotes so the
/// value can be pasted straight into a shell; escapes inside it are kept.
/// Without pretty output the result is compact JSON. An empty selection
/// renders as nothing.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn render_filtered(value: Option<&Value>, pretty: bool, indent: &str) -> Result<String, Error> {
    match value {
        None => Ok(String::new()),
        Some(value @ Value::String(_)) if pretty => {
            let quoted = serde_json::to_string(value)?;
            Ok(quoted
                .strip_prefix('"')
                .and_then(|s| s.strip_suffix('"'))
                .unwrap_or(quoted.as_str())
                .to_string())
        }
        Some(value) if pretty => to_pretty(value, indent),
        Some(value) => Ok(serde_json::to_string(value)?),
    }
}

/// Text stored for an extracted parameter: strings unquoted, anything else
/// as compact JSON.
#[must_use]
pub fn stored_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
