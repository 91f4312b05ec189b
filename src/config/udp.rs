use super::ConfigError;
use crate::domain::Precision;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

pub const DEFAULT_BIND_ADDRESS: &str = ":8089";
pub const DEFAULT_DATABASE: &str = "udp";
pub const DEFAULT_BATCH_SIZE: usize = 5000;
pub const DEFAULT_BATCH_PENDING: usize = 10;
pub const DEFAULT_BATCH_TIMEOUT: Duration = Duration::from_secs(1);

/// One `[[sender.udp]]` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct UdpConfig {
    pub enabled: bool,
    pub bind_address: String,
    pub database: String,
    pub retention_policy: String,
    pub batch_size: usize,
    pub batch_pending: usize,
    #[serde(with = "super::serde_helpers::duration")]
    pub batch_timeout: Duration,
    /// Socket receive buffer in bytes; 0 keeps the OS default.
    pub read_buffer: usize,
    #[serde(deserialize_with = "super::serde_helpers::empty_as_none")]
    pub precision: Option<Precision>,
}

impl Default for UdpConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            database: DEFAULT_DATABASE.to_string(),
            retention_policy: String::new(),
            batch_size: DEFAULT_BATCH_SIZE,
            batch_pending: DEFAULT_BATCH_PENDING,
            batch_timeout: DEFAULT_BATCH_TIMEOUT,
            read_buffer: 0,
            precision: None,
        }
    }
}

impl UdpConfig {
    /// Resolves `bind-address`; a bare `:port` listens on all interfaces.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let address = if self.bind_address.starts_with(':') {
            format!("0.0.0.0{}", self.bind_address)
        } else {
            self.bind_address.clone()
        };

        address.parse().map_err(|e| {
            ConfigError::InvalidConfig(format!(
                "Invalid UDP bind address '{}': {}",
                self.bind_address, e
            ))
        })
    }

    pub fn precision(&self) -> Precision {
        self.precision.unwrap_or_default()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.socket_addr()?;

        if self.batch_size == 0 {
            return Err(ConfigError::InvalidConfig(format!(
                "UDP listener {}: batch-size must be greater than 0",
                self.bind_address
            )));
        }

        if self.batch_pending == 0 {
            return Err(ConfigError::InvalidConfig(format!(
                "UDP listener {}: batch-pending must be greater than 0",
                self.bind_address
            )));
        }

        if self.batch_timeout.is_zero() {
            return Err(ConfigError::InvalidConfig(format!(
                "UDP listener {}: batch-timeout must be greater than 0",
                self.bind_address
            )));
        }

        Ok(())
    }
}
