//! Line protocol payload encoding.
//!
//! ```text
//! measurement,tag1=val1,tag2=val2 field1=val1,field2=val2 timestamp
//! ```

use crate::domain::{FieldValue, Point, Precision};
use bytes::Bytes;
use flate2::{Compression, write::GzEncoder};
use std::io::{self, Write};
use thiserror::Error;

// Rough per-line size used to pre-size the output buffer
const ESTIMATED_LINE_SIZE: usize = 128;
// Upper bound on the initial allocation
const MAX_INITIAL_CAPACITY: usize = 16 * 1024 * 1024;

#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("IO error during encoding: {0}")]
    Io(#[from] io::Error),
}

/// Encodes `points` as newline-terminated line protocol at `precision`,
/// gzip-compressing the whole payload when `gzip` is set.
///
/// Nothing is returned unless every point was written; a failure drops the
/// partially filled buffer.
pub fn encode(points: &[Point], precision: Precision, gzip: bool) -> Result<Bytes, EncodeError> {
    let capacity = points
        .len()
        .saturating_mul(ESTIMATED_LINE_SIZE)
        .min(MAX_INITIAL_CAPACITY);

    if gzip {
        let mut encoder = GzEncoder::new(Vec::with_capacity(capacity / 4), Compression::default());
        write_lines(points, precision, &mut encoder)?;
        let compressed = encoder.finish()?;
        Ok(Bytes::from(compressed))
    } else {
        let mut buffer = Vec::with_capacity(capacity);
        write_lines(points, precision, &mut buffer)?;
        Ok(Bytes::from(buffer))
    }
}

fn write_lines<W: Write>(points: &[Point], precision: Precision, out: &mut W) -> io::Result<()> {
    for point in points {
        render_line(point, precision, out)?;
        out.write_all(b"\n")?;
    }
    Ok(())
}

/// Writes one point without the trailing newline.
pub fn render_line<W: Write>(point: &Point, precision: Precision, out: &mut W) -> io::Result<()> {
    write_escaped(out, point.measurement(), &[',', ' '])?;

    for (key, value) in point.tags() {
        out.write_all(b",")?;
        write_escaped(out, key, &[',', '=', ' '])?;
        out.write_all(b"=")?;
        write_escaped(out, value, &[',', '=', ' '])?;
    }

    out.write_all(b" ")?;

    for (i, (key, value)) in point.fields().iter().enumerate() {
        if i > 0 {
            out.write_all(b",")?;
        }
        write_escaped(out, key, &[',', '=', ' '])?;
        out.write_all(b"=")?;
        write_field_value(out, value)?;
    }

    write!(out, " {}", precision.scale_from_nanos(point.timestamp_ns()))
}

/// Renders a single point as a `String`, mainly for logging and tests.
pub fn line_string(point: &Point, precision: Precision) -> String {
    let mut buffer = Vec::with_capacity(ESTIMATED_LINE_SIZE);
    // Writing into a Vec cannot fail
    let _ = render_line(point, precision, &mut buffer);
    String::from_utf8_lossy(&buffer).into_owned()
}

fn write_field_value<W: Write>(out: &mut W, value: &FieldValue) -> io::Result<()> {
    match value {
        FieldValue::Integer(v) => write!(out, "{v}i"),
        FieldValue::Float(v) => write!(out, "{v}"),
        FieldValue::Boolean(v) => out.write_all(if *v { b"true" } else { b"false" }),
        FieldValue::String(v) => {
            out.write_all(b"\"")?;
            write_escaped(out, v, &['\\', '"'])?;
            out.write_all(b"\"")
        }
    }
}

fn write_escaped<W: Write>(out: &mut W, s: &str, special: &[char]) -> io::Result<()> {
    if !s.contains(special) {
        return out.write_all(s.as_bytes());
    }
    let mut buf = [0u8; 4];
    for c in s.chars() {
        if special.contains(&c) {
            out.write_all(b"\\")?;
        }
        out.write_all(c.encode_utf8(&mut buf).as_bytes())?;
    }
    Ok(())
}
