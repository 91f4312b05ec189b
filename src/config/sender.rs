use super::udp::UdpConfig;
use crate::domain::{ConsistencyLevel, Precision};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

pub const DEFAULT_WORKERS: usize = 4;
pub const DEFAULT_QUEUE_SIZE: usize = 256;
pub const DEFAULT_DRAIN_TIMEOUT_SECS: u64 = 5;

/// The `[sender]` section: destination, credentials, transport settings and
/// the listeners feeding it.
///
/// Unset optional values (empty strings, zero timeout) are resolved to their
/// defaults when the `Sender` is built, not here.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct SenderConfig {
    pub addr: String,
    pub username: String,
    pub password: String,
    pub user_agent: String,
    /// Request timeout in seconds; 0 selects the default.
    pub timeout: u64,
    pub gzip: bool,
    #[serde(alias = "insucure-skip-verify")]
    pub insecure_skip_verify: bool,
    #[serde(deserialize_with = "super::serde_helpers::empty_as_none")]
    pub precision: Option<Precision>,
    #[serde(deserialize_with = "super::serde_helpers::empty_as_none")]
    pub consistency: Option<ConsistencyLevel>,
    /// Number of tasks draining the write queue.
    pub workers: usize,
    /// Maximum number of batches waiting to be sent.
    pub queue_size: usize,
    /// Seconds `close` waits for queued writes before giving up on them.
    pub drain_timeout: u64,
    pub udp: Vec<UdpConfig>,
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            addr: String::new(),
            username: String::new(),
            password: String::new(),
            user_agent: String::new(),
            timeout: 0,
            gzip: false,
            insecure_skip_verify: false,
            precision: None,
            consistency: None,
            workers: DEFAULT_WORKERS,
            queue_size: DEFAULT_QUEUE_SIZE,
            drain_timeout: DEFAULT_DRAIN_TIMEOUT_SECS,
            udp: Vec::new(),
        }
    }
}

impl SenderConfig {
    pub fn with_addr(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            ..Self::default()
        }
    }

    pub fn drain_timeout(&self) -> Duration {
        Duration::from_secs(self.drain_timeout)
    }
}

impl fmt::Debug for SenderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SenderConfig")
            .field("addr", &self.addr)
            .field("username", &self.username)
            .field("password", &if self.password.is_empty() { "" } else { "***" })
            .field("user_agent", &self.user_agent)
            .field("timeout", &self.timeout)
            .field("gzip", &self.gzip)
            .field("insecure_skip_verify", &self.insecure_skip_verify)
            .field("precision", &self.precision)
            .field("consistency", &self.consistency)
            .field("workers", &self.workers)
            .field("queue_size", &self.queue_size)
            .field("drain_timeout", &self.drain_timeout)
            .field("udp", &self.udp)
            .finish()
    }
}
