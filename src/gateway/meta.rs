use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MetaError {
    #[error("Failed to create database '{database}': {reason}")]
    CreateDatabase { database: String, reason: String },
}

/// Database metadata as reported by a catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseInfo {
    pub name: String,
    pub default_retention_policy: Option<String>,
}

/// Catalog operations listeners may request before accepting data.
#[async_trait]
pub trait MetaClient: Send + Sync {
    async fn create_database(&self, name: &str) -> Result<Option<DatabaseInfo>, MetaError>;
}

/// Catalog that provisions nothing; databases are expected to exist on the
/// destination already.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMetaClient;

#[async_trait]
impl MetaClient for NoopMetaClient {
    async fn create_database(&self, _name: &str) -> Result<Option<DatabaseInfo>, MetaError> {
        Ok(None)
    }
}
