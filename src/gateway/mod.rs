//! Gateway: owns the shared sender and the lifecycle of every listener.

pub mod meta;
pub mod service;

pub use meta::{DatabaseInfo, MetaClient, MetaError, NoopMetaClient};
pub use service::{Service, ServiceError};

use crate::config::{Config, UdpConfig};
use crate::listener::Listener;
use crate::sender::{Dispatcher, PointsWriter, Sender, SenderError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// How `close` reports services that failed to stop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ShutdownPolicy {
    /// Log failures and report success.
    #[default]
    BestEffort,
    /// Attempt every service, then fail if any of them failed.
    Strict,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayState {
    Constructed,
    Opened,
    Closed,
}

impl fmt::Display for GatewayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GatewayState::Constructed => "constructed",
            GatewayState::Opened => "opened",
            GatewayState::Closed => "closed",
        };
        f.write_str(name)
    }
}

#[derive(Debug)]
pub struct ServiceFailure {
    pub service: String,
    pub error: ServiceError,
}

impl fmt::Display for ServiceFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.service, self.error)
    }
}

/// Outcome of [`Gateway::close`].
#[derive(Debug, Default)]
pub struct CloseReport {
    /// Services `close` was called on, in order.
    pub attempted: Vec<String>,
    pub failures: Vec<ServiceFailure>,
    /// Whether queued writes finished within the drain timeout.
    pub drained: bool,
}

impl CloseReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Failed to create sender: {0}")]
    Sender(#[from] SenderError),
    #[error("Failed to open service '{service}': {source}")]
    Open {
        service: String,
        #[source]
        source: ServiceError,
    },
    #[error("Cannot {operation} gateway in state {state}")]
    InvalidState {
        operation: &'static str,
        state: GatewayState,
    },
    #[error("{} service(s) failed to close: {}", .failures.len(), join_failures(.failures))]
    Shutdown { failures: Vec<ServiceFailure> },
}

fn join_failures(failures: &[ServiceFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Runs listeners against one shared [`Sender`].
///
/// Listeners never talk to the sender directly; they enqueue batches on a
/// [`Dispatcher`] whose workers perform the HTTP writes. Services are opened
/// in insertion order and stop at the first failure; they are closed in
/// insertion order and every one of them is attempted.
pub struct Gateway {
    sender: Arc<Sender>,
    dispatcher: Arc<Dispatcher>,
    meta_client: Arc<dyn MetaClient>,
    services: Vec<Box<dyn Service>>,
    state: GatewayState,
    shutdown_policy: ShutdownPolicy,
    drain_timeout: Duration,
}

impl Gateway {
    /// Builds the sender and one listener per enabled entry. A sender error
    /// aborts construction.
    pub fn new(config: &Config) -> Result<Self, GatewayError> {
        Self::with_meta_client(config, Arc::new(NoopMetaClient))
    }

    pub fn with_meta_client(
        config: &Config,
        meta_client: Arc<dyn MetaClient>,
    ) -> Result<Self, GatewayError> {
        let sender = Arc::new(Sender::new(&config.sender)?);
        let dispatcher = Arc::new(Dispatcher::new(
            Arc::clone(&sender),
            config.sender.workers,
            config.sender.queue_size,
        ));

        let mut gateway = Self {
            sender,
            dispatcher,
            meta_client,
            services: Vec::new(),
            state: GatewayState::Constructed,
            shutdown_policy: config.gateway.shutdown_policy,
            drain_timeout: config.sender.drain_timeout(),
        };

        for udp in config.sender.udp.iter().filter(|udp| udp.enabled) {
            gateway.append_udp_service(udp.clone());
        }

        info!(
            addr = %gateway.sender.write_url(),
            services = gateway.services.len(),
            shutdown_policy = ?gateway.shutdown_policy,
            "Gateway created"
        );
        Ok(gateway)
    }

    fn append_udp_service(&mut self, config: UdpConfig) {
        let listener = Listener::udp(config, self.writer(), Arc::clone(&self.meta_client));
        debug!(service = listener.name(), "Appending service");
        self.services.push(Box::new(listener));
    }

    /// Appends a service. Only allowed before [`Gateway::open`].
    pub fn push_service(&mut self, service: Box<dyn Service>) -> Result<(), GatewayError> {
        if self.state != GatewayState::Constructed {
            return Err(GatewayError::InvalidState {
                operation: "add a service to",
                state: self.state,
            });
        }
        self.services.push(service);
        Ok(())
    }

    /// The writer handed to listeners.
    pub fn writer(&self) -> Arc<dyn PointsWriter> {
        Arc::clone(&self.dispatcher) as Arc<dyn PointsWriter>
    }

    pub fn sender(&self) -> &Arc<Sender> {
        &self.sender
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    pub fn state(&self) -> GatewayState {
        self.state
    }

    pub fn shutdown_policy(&self) -> ShutdownPolicy {
        self.shutdown_policy
    }

    pub fn set_shutdown_policy(&mut self, policy: ShutdownPolicy) {
        self.shutdown_policy = policy;
    }

    pub fn service_names(&self) -> Vec<&str> {
        self.services.iter().map(|service| service.name()).collect()
    }

    /// Starts the write workers, then every service in order.
    ///
    /// The first failing service is returned and later services are not
    /// opened. Services already open stay open; call [`Gateway::close`] to
    /// stop them.
    pub async fn open(&mut self) -> Result<(), GatewayError> {
        if self.state != GatewayState::Constructed {
            return Err(GatewayError::InvalidState {
                operation: "open",
                state: self.state,
            });
        }
        self.state = GatewayState::Opened;
        self.dispatcher.start();

        for service in &mut self.services {
            let name = service.name().to_string();
            debug!(service = %name, "Opening service");

            if let Err(source) = service.open().await {
                error!(service = %name, "Failed to open service: {}", source);
                return Err(GatewayError::Open {
                    service: name,
                    source,
                });
            }
            info!(service = %name, "Service opened");
        }

        info!(services = self.services.len(), "Gateway opened");
        Ok(())
    }

    /// Stops every service in order, then drains the write queue.
    ///
    /// A failing service never prevents the rest from being closed. Under
    /// [`ShutdownPolicy::BestEffort`] failures are logged and returned in the
    /// report; under [`ShutdownPolicy::Strict`] they are returned as
    /// [`GatewayError::Shutdown`].
    pub async fn close(&mut self) -> Result<CloseReport, GatewayError> {
        if self.state != GatewayState::Opened {
            debug!(state = %self.state, "Gateway not open; nothing to close");
            return Ok(CloseReport {
                drained: true,
                ..CloseReport::default()
            });
        }
        self.state = GatewayState::Closed;

        let mut report = CloseReport::default();
        for service in &mut self.services {
            let name = service.name().to_string();
            report.attempted.push(name.clone());

            match service.close().await {
                Ok(()) => info!(service = %name, "Service closed"),
                Err(e) => {
                    error!(service = %name, "Failed to close service: {}", e);
                    report.failures.push(ServiceFailure {
                        service: name,
                        error: e,
                    });
                }
            }
        }

        report.drained = self.dispatcher.shutdown(self.drain_timeout).await;

        let stats = self.sender.metrics().snapshot();
        info!(
            requests = stats.requests,
            failures = stats.failures,
            points_sent = stats.points_sent,
            rejected = stats.rejected,
            "Gateway closed"
        );

        if report.failures.is_empty() {
            return Ok(report);
        }

        match self.shutdown_policy {
            ShutdownPolicy::BestEffort => {
                warn!(
                    failed = report.failures.len(),
                    attempted = report.attempted.len(),
                    "Gateway closed with service failures"
                );
                Ok(report)
            }
            ShutdownPolicy::Strict => Err(GatewayError::Shutdown {
                failures: report.failures,
            }),
        }
    }
}

impl fmt::Debug for Gateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gateway")
            .field("sender", &self.sender)
            .field("services", &self.service_names())
            .field("state", &self.state)
            .field("shutdown_policy", &self.shutdown_policy)
            .field("drain_timeout", &self.drain_timeout)
            .finish()
    }
}
