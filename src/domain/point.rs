use super::error::PointError;
use std::collections::BTreeMap;

/// Typed value of a single point field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Integer(i64),
    Float(f64),
    Boolean(bool),
    String(String),
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Integer(v)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Float(v)
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Boolean(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::String(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::String(v)
    }
}

/// A single measurement observation.
///
/// Tags and fields are kept in key order so that the rendered line is
/// canonical. The timestamp is always stored in nanoseconds since the Unix
/// epoch; the wire precision is applied only when encoding.
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    measurement: String,
    tags: BTreeMap<String, String>,
    fields: BTreeMap<String, FieldValue>,
    timestamp_ns: i64,
}

impl Point {
    pub fn new(
        measurement: impl Into<String>,
        tags: BTreeMap<String, String>,
        fields: BTreeMap<String, FieldValue>,
        timestamp_ns: i64,
    ) -> Result<Self, PointError> {
        let measurement = measurement.into();
        if measurement.is_empty() {
            return Err(PointError::EmptyMeasurement);
        }
        if fields.is_empty() {
            return Err(PointError::NoFields { measurement });
        }
        if tags.keys().any(String::is_empty) {
            return Err(PointError::EmptyTagKey { measurement });
        }
        // One point must render as exactly one line
        if has_line_break(&measurement)
            || tags
                .iter()
                .any(|(key, value)| has_line_break(key) || has_line_break(value))
            || fields.iter().any(|(key, value)| {
                has_line_break(key)
                    || matches!(value, FieldValue::String(s) if has_line_break(s))
            })
        {
            return Err(PointError::LineBreak { measurement });
        }
        for (key, value) in &fields {
            if key.is_empty() {
                return Err(PointError::EmptyFieldKey { measurement });
            }
            if let FieldValue::Float(v) = value
                && !v.is_finite()
            {
                return Err(PointError::NonFiniteFloat {
                    measurement,
                    field: key.clone(),
                });
            }
        }

        Ok(Self {
            measurement,
            tags,
            fields,
            timestamp_ns,
        })
    }

    /// Starts a builder for the given measurement.
    pub fn builder(measurement: impl Into<String>) -> PointBuilder {
        PointBuilder {
            measurement: measurement.into(),
            tags: BTreeMap::new(),
            fields: BTreeMap::new(),
            timestamp_ns: 0,
        }
    }

    pub fn measurement(&self) -> &str {
        &self.measurement
    }

    pub fn tags(&self) -> &BTreeMap<String, String> {
        &self.tags
    }

    pub fn fields(&self) -> &BTreeMap<String, FieldValue> {
        &self.fields
    }

    pub fn timestamp_ns(&self) -> i64 {
        self.timestamp_ns
    }
}

fn has_line_break(s: &str) -> bool {
    s.contains(['\n', '\r'])
}

#[derive(Debug, Clone)]
pub struct PointBuilder {
    measurement: String,
    tags: BTreeMap<String, String>,
    fields: BTreeMap<String, FieldValue>,
    timestamp_ns: i64,
}

impl PointBuilder {
    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn field(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn timestamp_ns(mut self, timestamp_ns: i64) -> Self {
        self.timestamp_ns = timestamp_ns;
        self
    }

    pub fn build(self) -> Result<Point, PointError> {
        Point::new(self.measurement, self.tags, self.fields, self.timestamp_ns)
    }
}
