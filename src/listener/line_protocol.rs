//! Line protocol parsing for text received by listeners.
//!
//! Each non-empty line that does not start with `#` is one point:
//! `measurement[,tag=value...] field=value[,field=value...] [timestamp]`.

use crate::domain::{FieldValue, Point, Precision};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("line {line}: {reason}")]
pub struct ParseError {
    pub line: usize,
    pub reason: String,
}

/// Parses every line of `input`. Valid lines become points; each invalid line
/// yields its own error without affecting the others.
///
/// Timestamps are read in `precision` units. Lines without one get
/// `default_time_ns`.
pub fn parse_points(
    input: &str,
    precision: Precision,
    default_time_ns: i64,
) -> (Vec<Point>, Vec<ParseError>) {
    let mut points = Vec::new();
    let mut errors = Vec::new();

    for (index, raw) in input.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        match parse_line(line, precision, default_time_ns) {
            Ok(point) => points.push(point),
            Err(reason) => errors.push(ParseError {
                line: index + 1,
                reason,
            }),
        }
    }

    (points, errors)
}

/// Parses a single, already trimmed line.
pub fn parse_line(line: &str, precision: Precision, default_time_ns: i64) -> Result<Point, String> {
    let key_end = find_unescaped(line, ' ', false).ok_or("missing fields")?;
    let (key_section, rest) = line.split_at(key_end);
    let rest = rest.trim_start();

    let (field_section, timestamp_section) = match find_unescaped(rest, ' ', true) {
        Some(idx) => {
            let (fields, ts) = rest.split_at(idx);
            (fields, ts.trim())
        }
        None => (rest, ""),
    };

    let mut key_parts = split_unescaped(key_section, ',', false).into_iter();
    let measurement = unescape(key_parts.next().unwrap_or_default(), &[',', ' ']);
    if measurement.is_empty() {
        return Err("missing measurement".to_string());
    }

    let mut tags = BTreeMap::new();
    for tag in key_parts {
        let eq = find_unescaped(tag, '=', false)
            .ok_or_else(|| format!("missing tag value in '{tag}'"))?;
        let (key, value) = (&tag[..eq], &tag[eq + 1..]);
        if key.is_empty() || value.is_empty() {
            return Err(format!("invalid tag '{tag}'"));
        }
        tags.insert(
            unescape(key, &[',', '=', ' ']),
            unescape(value, &[',', '=', ' ']),
        );
    }

    if field_section.is_empty() {
        return Err("missing fields".to_string());
    }

    let mut fields = BTreeMap::new();
    for field in split_unescaped(field_section, ',', true) {
        let eq = find_unescaped(field, '=', true)
            .ok_or_else(|| format!("missing field value in '{field}'"))?;
        let (key, value) = (&field[..eq], &field[eq + 1..]);
        if key.is_empty() {
            return Err(format!("missing field key in '{field}'"));
        }
        fields.insert(unescape(key, &[',', '=', ' ']), parse_field_value(value)?);
    }

    let timestamp_ns = if timestamp_section.is_empty() {
        default_time_ns
    } else {
        let value: i64 = timestamp_section
            .parse()
            .map_err(|e| format!("invalid timestamp '{timestamp_section}': {e}"))?;
        precision
            .scale_to_nanos(value)
            .ok_or_else(|| format!("timestamp '{timestamp_section}' out of range"))?
    };

    Point::new(measurement, tags, fields, timestamp_ns).map_err(|e| e.to_string())
}

fn parse_field_value(raw: &str) -> Result<FieldValue, String> {
    if raw.is_empty() {
        return Err("missing field value".to_string());
    }

    if let Some(inner) = raw.strip_prefix('"') {
        let inner = inner
            .strip_suffix('"')
            .filter(|_| raw.len() >= 2 && !ends_with_escape(&raw[..raw.len() - 1]))
            .ok_or_else(|| format!("unterminated string {raw}"))?;
        return Ok(FieldValue::String(unescape(inner, &['"', '\\'])));
    }

    match raw {
        "t" | "T" | "true" | "True" | "TRUE" => return Ok(FieldValue::Boolean(true)),
        "f" | "F" | "false" | "False" | "FALSE" => return Ok(FieldValue::Boolean(false)),
        _ => {}
    }

    if let Some(digits) = raw.strip_suffix('i') {
        return digits
            .parse::<i64>()
            .map(FieldValue::Integer)
            .map_err(|e| format!("invalid integer '{raw}': {e}"));
    }

    raw.parse::<f64>()
        .map(FieldValue::Float)
        .map_err(|_| format!("invalid field value '{raw}'"))
}

/// True when `s` ends in an odd number of backslashes.
fn ends_with_escape(s: &str) -> bool {
    s.chars().rev().take_while(|c| *c == '\\').count() % 2 == 1
}

fn find_unescaped(s: &str, target: char, respect_quotes: bool) -> Option<usize> {
    let mut escaped = false;
    let mut in_quotes = false;

    for (i, c) in s.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '"' if respect_quotes => in_quotes = !in_quotes,
            c if c == target && !in_quotes => return Some(i),
            _ => {}
        }
    }
    None
}

fn split_unescaped(s: &str, target: char, respect_quotes: bool) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut rest = s;
    while let Some(idx) = find_unescaped(rest, target, respect_quotes) {
        parts.push(&rest[..idx]);
        rest = &rest[idx + target.len_utf8()..];
    }
    parts.push(rest);
    parts
}

/// Drops the backslash in front of any character listed in `special`.
fn unescape(s: &str, special: &[char]) -> String {
    if !s.contains('\\') {
        return s.to_string();
    }

    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\'
            && let Some(&next) = chars.peek()
            && special.contains(&next)
        {
            out.push(next);
            chars.next();
            continue;
        }
        out.push(c);
    }
    out
}
