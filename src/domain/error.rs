use thiserror::Error;

/// Reasons a point cannot be represented on the wire.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PointError {
    #[error("Measurement name is empty")]
    EmptyMeasurement,

    #[error("Point '{measurement}' has no fields")]
    NoFields { measurement: String },

    #[error("Point '{measurement}' has an empty tag key")]
    EmptyTagKey { measurement: String },

    #[error("Point '{measurement}' has an empty field key")]
    EmptyFieldKey { measurement: String },

    #[error("Point '{measurement}' contains a line break")]
    LineBreak { measurement: String },

    #[error("Field '{field}' of point '{measurement}' is not a finite number")]
    NonFiniteFloat { measurement: String, field: String },
}
