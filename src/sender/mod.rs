pub mod dispatch;
pub mod encoder;
pub mod metrics;
pub mod writer;

pub use dispatch::Dispatcher;
pub use encoder::{EncodeError, encode};
pub use metrics::{SenderMetrics, SenderStats};
pub use writer::{PointsWriter, WriteError, WriteRequest};

use crate::config::SenderConfig;
use crate::domain::{ConsistencyLevel, Point, Precision};
use async_trait::async_trait;
use reqwest::header::CONTENT_ENCODING;
use reqwest::{Client, ClientBuilder, StatusCode};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::debug;
use url::Url;

pub const DEFAULT_USER_AGENT: &str = "InfluxDB-Gateway";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);
pub const DEFAULT_PRECISION: Precision = Precision::Nanoseconds;
pub const DEFAULT_CONSISTENCY: ConsistencyLevel = ConsistencyLevel::One;

#[derive(Error, Debug)]
pub enum SenderError {
    #[error("Invalid address '{addr}': {source}")]
    InvalidUrl {
        addr: String,
        #[source]
        source: url::ParseError,
    },
    #[error(
        "Unsupported protocol scheme: {0}, your address must start with http:// or https://"
    )]
    UnsupportedScheme(String),
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
    #[error("Encoding failed: {0}")]
    Encode(#[from] EncodeError),
    #[error("Network error: {0}")]
    Network(#[source] reqwest::Error),
    #[error("Write rejected with HTTP {status}: {body}")]
    Status { status: u16, body: String },
}

impl SenderError {
    /// Response body returned by the destination for a rejected write.
    pub fn response_body(&self) -> Option<&str> {
        match self {
            SenderError::Status { body, .. } => Some(body),
            _ => None,
        }
    }
}

/// Result of a successful write.
#[derive(Debug, Clone)]
pub struct WriteOutcome {
    pub status: u16,
    pub points: usize,
    pub bytes_sent: usize,
    pub latency: Duration,
}

/// Parses a destination address, accepting only absolute http/https URLs.
pub fn parse_base_url(addr: &str) -> Result<Url, SenderError> {
    let url = Url::parse(addr).map_err(|source| SenderError::InvalidUrl {
        addr: addr.to_string(),
        source,
    })?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(SenderError::UnsupportedScheme(other.to_string())),
    }
}

/// Encodes point batches and posts them to `{addr}/write`.
///
/// Configuration is fixed at construction; a `Sender` is shared by reference
/// between every writer task and never mutated afterwards.
pub struct Sender {
    client: Client,
    write_url: Url,
    username: String,
    password: String,
    user_agent: String,
    timeout: Duration,
    gzip: bool,
    precision: Precision,
    consistency: ConsistencyLevel,
    metrics: Arc<SenderMetrics>,
}

impl Sender {
    pub fn new(config: &SenderConfig) -> Result<Self, SenderError> {
        let base_url = parse_base_url(&config.addr)?;
        let write_url = join_write_path(&base_url);

        let user_agent = if config.user_agent.is_empty() {
            DEFAULT_USER_AGENT.to_string()
        } else {
            config.user_agent.clone()
        };
        let timeout = if config.timeout == 0 {
            DEFAULT_TIMEOUT
        } else {
            Duration::from_secs(config.timeout)
        };

        let client = ClientBuilder::new()
            .timeout(timeout)
            .user_agent(user_agent.as_str())
            .danger_accept_invalid_certs(config.insecure_skip_verify)
            .build()
            .map_err(SenderError::ClientBuild)?;

        Ok(Self {
            client,
            write_url,
            username: config.username.clone(),
            password: config.password.clone(),
            user_agent,
            timeout,
            gzip: config.gzip,
            precision: config.precision.unwrap_or(DEFAULT_PRECISION),
            consistency: config.consistency.unwrap_or(DEFAULT_CONSISTENCY),
            metrics: Arc::new(SenderMetrics::new()),
        })
    }

    pub fn write_url(&self) -> &Url {
        &self.write_url
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn gzip(&self) -> bool {
        self.gzip
    }

    pub fn precision(&self) -> Precision {
        self.precision
    }

    pub fn consistency(&self) -> ConsistencyLevel {
        self.consistency
    }

    pub fn metrics(&self) -> Arc<SenderMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Builds the per-call request URL. The shared write URL is cloned, never
    /// modified.
    pub fn request_url(&self, database: &str, retention_policy: &str) -> Url {
        let mut url = self.write_url.clone();
        url.query_pairs_mut()
            .append_pair("consistency", self.consistency.as_str())
            .append_pair("db", database)
            .append_pair("precision", self.precision.as_str())
            .append_pair("rp", retention_policy);
        url
    }

    /// Encodes `points` and posts them, waiting for the response.
    ///
    /// 200 and 204 are success; any other status fails with the response
    /// body as detail. The destination always receives the configured
    /// consistency level; `consistency` is informational only.
    pub async fn write_points(
        &self,
        database: &str,
        retention_policy: &str,
        consistency: ConsistencyLevel,
        points: &[Point],
    ) -> Result<WriteOutcome, SenderError> {
        let start = Instant::now();

        let payload = encode(points, self.precision, self.gzip).inspect_err(|_| {
            self.metrics.record_encode_failure();
        })?;
        let bytes_sent = payload.len();

        debug!(
            database,
            retention_policy,
            requested_consistency = %consistency,
            points = points.len(),
            bytes = bytes_sent,
            "Posting points"
        );

        let mut request = self
            .client
            .post(self.request_url(database, retention_policy))
            .body(payload);
        if self.gzip {
            request = request.header(CONTENT_ENCODING, "gzip");
        }
        if !self.username.is_empty() {
            request = request.basic_auth(&self.username, Some(&self.password));
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                self.metrics
                    .record_request(false, points.len(), bytes_sent, start.elapsed());
                return Err(SenderError::Network(e));
            }
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                self.metrics
                    .record_request(false, points.len(), bytes_sent, start.elapsed());
                return Err(SenderError::Network(e));
            }
        };
        let latency = start.elapsed();

        if status == StatusCode::NO_CONTENT || status == StatusCode::OK {
            self.metrics
                .record_request(true, points.len(), bytes_sent, latency);
            debug!(
                database,
                status = status.as_u16(),
                points = points.len(),
                ?latency,
                "Write accepted"
            );
            Ok(WriteOutcome {
                status: status.as_u16(),
                points: points.len(),
                bytes_sent,
                latency,
            })
        } else {
            self.metrics
                .record_request(false, points.len(), bytes_sent, latency);
            Err(SenderError::Status {
                status: status.as_u16(),
                body,
            })
        }
    }
}

#[async_trait]
impl PointsWriter for Sender {
    async fn write_points(&self, request: WriteRequest) -> Result<(), WriteError> {
        Sender::write_points(
            self,
            &request.database,
            &request.retention_policy,
            request.consistency,
            &request.points,
        )
        .await?;
        Ok(())
    }
}

impl fmt::Debug for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sender")
            .field("write_url", &self.write_url.as_str())
            .field("username", &self.username)
            .field("user_agent", &self.user_agent)
            .field("timeout", &self.timeout)
            .field("gzip", &self.gzip)
            .field("precision", &self.precision)
            .field("consistency", &self.consistency)
            .finish_non_exhaustive()
    }
}

fn join_write_path(base: &Url) -> Url {
    let mut url = base.clone();
    let prefix = base.path().trim_end_matches('/').to_string();
    url.set_path(&format!("{prefix}/write"));
    url.set_query(None);
    url.set_fragment(None);
    url
}
