use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UnitParseError {
    #[error("Invalid precision '{0}'. Valid values: ns, us, ms, s")]
    Precision(String),
    #[error("Invalid consistency level '{0}'. Valid values: any, one, quorum, all")]
    Consistency(String),
}

/// Time unit used to render point timestamps on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Precision {
    #[default]
    Nanoseconds,
    Microseconds,
    Milliseconds,
    Seconds,
}

impl Precision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Precision::Nanoseconds => "ns",
            Precision::Microseconds => "us",
            Precision::Milliseconds => "ms",
            Precision::Seconds => "s",
        }
    }

    /// Number of nanoseconds in one unit of this precision.
    pub fn nanos_per_unit(&self) -> i64 {
        match self {
            Precision::Nanoseconds => 1,
            Precision::Microseconds => 1_000,
            Precision::Milliseconds => 1_000_000,
            Precision::Seconds => 1_000_000_000,
        }
    }

    /// Converts a nanosecond timestamp to this unit, truncating toward zero.
    pub fn scale_from_nanos(&self, nanos: i64) -> i64 {
        nanos / self.nanos_per_unit()
    }

    /// Converts a timestamp expressed in this unit to nanoseconds.
    /// Returns `None` when the result does not fit in an `i64`.
    pub fn scale_to_nanos(&self, value: i64) -> Option<i64> {
        value.checked_mul(self.nanos_per_unit())
    }
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Precision {
    type Err = UnitParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ns" | "n" => Ok(Precision::Nanoseconds),
            "us" | "u" | "µ" | "µs" => Ok(Precision::Microseconds),
            "ms" => Ok(Precision::Milliseconds),
            "s" => Ok(Precision::Seconds),
            other => Err(UnitParseError::Precision(other.to_string())),
        }
    }
}

impl Serialize for Precision {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Precision {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Replica acknowledgement hint sent along with every write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConsistencyLevel {
    Any,
    #[default]
    One,
    Quorum,
    All,
}

impl ConsistencyLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsistencyLevel::Any => "any",
            ConsistencyLevel::One => "one",
            ConsistencyLevel::Quorum => "quorum",
            ConsistencyLevel::All => "all",
        }
    }
}

impl fmt::Display for ConsistencyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConsistencyLevel {
    type Err = UnitParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "any" => Ok(ConsistencyLevel::Any),
            "one" => Ok(ConsistencyLevel::One),
            "quorum" => Ok(ConsistencyLevel::Quorum),
            "all" => Ok(ConsistencyLevel::All),
            _ => Err(UnitParseError::Consistency(s.to_string())),
        }
    }
}

impl Serialize for ConsistencyLevel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ConsistencyLevel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precision_aliases() {
        assert_eq!("n".parse::<Precision>().unwrap(), Precision::Nanoseconds);
        assert_eq!("u".parse::<Precision>().unwrap(), Precision::Microseconds);
        assert_eq!("ms".parse::<Precision>().unwrap(), Precision::Milliseconds);
        assert_eq!("s".parse::<Precision>().unwrap(), Precision::Seconds);
        assert!("h".parse::<Precision>().is_err());
    }

    #[test]
    fn test_precision_scaling_truncates() {
        let ts = 1_700_000_000_123_456_789;
        assert_eq!(Precision::Nanoseconds.scale_from_nanos(ts), ts);
        assert_eq!(Precision::Microseconds.scale_from_nanos(ts), 1_700_000_000_123_456);
        assert_eq!(Precision::Milliseconds.scale_from_nanos(ts), 1_700_000_000_123);
        assert_eq!(Precision::Seconds.scale_from_nanos(ts), 1_700_000_000);
    }

    #[test]
    fn test_scale_to_nanos_overflow() {
        assert_eq!(Precision::Seconds.scale_to_nanos(2), Some(2_000_000_000));
        assert_eq!(Precision::Seconds.scale_to_nanos(i64::MAX), None);
    }

    #[test]
    fn test_consistency_case_insensitive() {
        assert_eq!(
            "QUORUM".parse::<ConsistencyLevel>().unwrap(),
            ConsistencyLevel::Quorum
        );
        assert_eq!(ConsistencyLevel::default().as_str(), "one");
        assert!("most".parse::<ConsistencyLevel>().is_err());
    }
}
