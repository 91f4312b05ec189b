use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid service configuration: {0}")]
    InvalidConfig(String),
    #[error("Service already open")]
    AlreadyOpen,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
    #[error("{0}")]
    Other(String),
}

/// Lifecycle capability shared by every listener the gateway runs.
#[async_trait]
pub trait Service: Send + Sync {
    /// Short identifier used in logs and close reports.
    fn name(&self) -> &str;

    async fn open(&mut self) -> Result<(), ServiceError>;

    async fn close(&mut self) -> Result<(), ServiceError>;
}
