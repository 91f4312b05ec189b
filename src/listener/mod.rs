//! Listeners that feed points into the gateway.

pub mod batcher;
pub mod line_protocol;
pub mod udp;

pub use batcher::PointBatcher;
pub use line_protocol::{ParseError, parse_line, parse_points};
pub use udp::{UdpListener, UdpStatsSnapshot};

use crate::config::UdpConfig;
use crate::gateway::{MetaClient, Service, ServiceError};
use crate::sender::PointsWriter;
use async_trait::async_trait;
use std::net::SocketAddr;
use std::sync::Arc;

/// Every listener kind the gateway can build from configuration.
pub enum Listener {
    Udp(UdpListener),
}

impl Listener {
    pub fn udp(
        config: UdpConfig,
        writer: Arc<dyn PointsWriter>,
        meta_client: Arc<dyn MetaClient>,
    ) -> Self {
        Listener::Udp(UdpListener::new(config, writer, meta_client))
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        match self {
            Listener::Udp(listener) => listener.local_addr(),
        }
    }
}

#[async_trait]
impl Service for Listener {
    fn name(&self) -> &str {
        match self {
            Listener::Udp(listener) => listener.name(),
        }
    }

    async fn open(&mut self) -> Result<(), ServiceError> {
        match self {
            Listener::Udp(listener) => listener.open().await,
        }
    }

    async fn close(&mut self) -> Result<(), ServiceError> {
        match self {
            Listener::Udp(listener) => listener.close().await,
        }
    }
}
