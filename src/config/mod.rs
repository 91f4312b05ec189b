pub mod sender;
pub mod serde_helpers;
pub mod udp;

use crate::gateway::ShutdownPolicy;
use serde::{Deserialize, Serialize};
use serde_helpers::{load_string, load_var};
use std::path::Path;
use thiserror::Error;

pub use sender::SenderConfig;
pub use udp::UdpConfig;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("File error: {0}")]
    FileError(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Environment error: {0}")]
    EnvError(String),
}

/// Optional `[gateway]` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct GatewaySettings {
    pub shutdown_policy: ShutdownPolicy,
}

/// Root of the configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    pub sender: SenderConfig,
    #[serde(default)]
    pub gateway: GatewaySettings,
}

impl Config {
    /// Reads, parses, applies environment overrides and validates.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml_str(&content)?;
        config.apply_overrides(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parses TOML without touching the environment or validating.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Applies `GATEWAY_SENDER_*` overrides obtained through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        load_string(&lookup, "GATEWAY_SENDER_ADDR", &mut self.sender.addr);
        load_string(&lookup, "GATEWAY_SENDER_USERNAME", &mut self.sender.username);
        load_string(&lookup, "GATEWAY_SENDER_PASSWORD", &mut self.sender.password);
        load_var(&lookup, "GATEWAY_SENDER_GZIP", &mut self.sender.gzip)?;
        load_var(&lookup, "GATEWAY_SENDER_TIMEOUT", &mut self.sender.timeout)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sender.addr.is_empty() {
            return Err(ConfigError::InvalidConfig(
                "sender.addr is required".to_string(),
            ));
        }

        crate::sender::parse_base_url(&self.sender.addr)
            .map_err(|e| ConfigError::InvalidUrl(e.to_string()))?;

        if self.sender.workers == 0 {
            return Err(ConfigError::InvalidConfig(
                "sender.workers must be greater than 0".to_string(),
            ));
        }

        if self.sender.queue_size == 0 {
            return Err(ConfigError::InvalidConfig(
                "sender.queue-size must be greater than 0".to_string(),
            ));
        }

        for udp in self.sender.udp.iter().filter(|udp| udp.enabled) {
            udp.validate()?;
        }

        Ok(())
    }
}
