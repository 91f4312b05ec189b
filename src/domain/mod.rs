//! Domain layer for influx-gateway.
//!
//! Contains the canonical types shared across all modules:
//! - `Point`: a measurement with tags, typed fields and a nanosecond timestamp
//! - `Precision` / `ConsistencyLevel`: write parameters understood by the destination
//! - `PointError`: invalid point construction

pub mod error;
pub mod point;
pub mod precision;

pub use error::PointError;
pub use point::{FieldValue, Point, PointBuilder};
pub use precision::{ConsistencyLevel, Precision, UnitParseError};
