use super::SenderError;
use crate::domain::{ConsistencyLevel, Point};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WriteError {
    #[error("Send failed: {0}")]
    Send(#[from] SenderError),
    #[error("Write queue is full ({capacity} batches pending)")]
    QueueFull { capacity: usize },
    #[error("Writer is closed")]
    Closed,
}

/// One write call: where the points go and the points themselves.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteRequest {
    pub database: String,
    pub retention_policy: String,
    pub consistency: ConsistencyLevel,
    pub points: Vec<Point>,
}

impl WriteRequest {
    pub fn new(
        database: impl Into<String>,
        retention_policy: impl Into<String>,
        consistency: ConsistencyLevel,
        points: Vec<Point>,
    ) -> Self {
        Self {
            database: database.into(),
            retention_policy: retention_policy.into(),
            consistency,
            points,
        }
    }
}

/// Destination for points produced by listeners.
#[async_trait]
pub trait PointsWriter: Send + Sync {
    async fn write_points(&self, request: WriteRequest) -> Result<(), WriteError>;
}
