use super::batcher::PointBatcher;
use super::line_protocol::parse_points;
use crate::config::UdpConfig;
use crate::domain::{ConsistencyLevel, Point, Precision};
use crate::gateway::{MetaClient, Service, ServiceError};
use crate::sender::{PointsWriter, WriteRequest};
use async_trait::async_trait;
use socket2::{Domain, Protocol, Socket, Type};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::sleep_until;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Largest payload a single UDP datagram can carry.
pub const MAX_DATAGRAM_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UdpStatsSnapshot {
    pub datagrams: u64,
    pub points_received: u64,
    pub parse_failures: u64,
    pub batches_written: u64,
    pub write_failures: u64,
}

#[derive(Debug, Default)]
struct UdpStats {
    datagrams: AtomicU64,
    points_received: AtomicU64,
    parse_failures: AtomicU64,
    batches_written: AtomicU64,
    write_failures: AtomicU64,
}

impl UdpStats {
    fn snapshot(&self) -> UdpStatsSnapshot {
        UdpStatsSnapshot {
            datagrams: self.datagrams.load(Ordering::Relaxed),
            points_received: self.points_received.load(Ordering::Relaxed),
            parse_failures: self.parse_failures.load(Ordering::Relaxed),
            batches_written: self.batches_written.load(Ordering::Relaxed),
            write_failures: self.write_failures.load(Ordering::Relaxed),
        }
    }
}

struct Running {
    cancel: CancellationToken,
    receiver: JoinHandle<()>,
    batcher: JoinHandle<()>,
    local_addr: SocketAddr,
}

/// Receives line protocol datagrams and forwards them in batches.
pub struct UdpListener {
    config: UdpConfig,
    name: String,
    writer: Arc<dyn PointsWriter>,
    meta_client: Arc<dyn MetaClient>,
    stats: Arc<UdpStats>,
    running: Option<Running>,
}

impl UdpListener {
    pub fn new(
        config: UdpConfig,
        writer: Arc<dyn PointsWriter>,
        meta_client: Arc<dyn MetaClient>,
    ) -> Self {
        let name = format!("udp:{}", config.bind_address);
        Self {
            config,
            name,
            writer,
            meta_client,
            stats: Arc::new(UdpStats::default()),
            running: None,
        }
    }

    pub fn config(&self) -> &UdpConfig {
        &self.config
    }

    /// Bound address while open; useful when binding to port 0.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.running.as_ref().map(|running| running.local_addr)
    }

    pub fn is_open(&self) -> bool {
        self.running.is_some()
    }

    pub fn stats(&self) -> UdpStatsSnapshot {
        self.stats.snapshot()
    }
}

#[async_trait]
impl Service for UdpListener {
    fn name(&self) -> &str {
        &self.name
    }

    async fn open(&mut self) -> Result<(), ServiceError> {
        if self.running.is_some() {
            return Err(ServiceError::AlreadyOpen);
        }

        let addr = self
            .config
            .socket_addr()
            .map_err(|e| ServiceError::InvalidConfig(e.to_string()))?;

        if let Err(e) = self.meta_client.create_database(&self.config.database).await {
            warn!(listener = %self.name, "Database provisioning failed: {}", e);
        }

        let socket = bind_socket(addr, self.config.read_buffer).map_err(|source| {
            ServiceError::Bind {
                address: addr.to_string(),
                source,
            }
        })?;
        let local_addr = socket.local_addr()?;

        let capacity = self
            .config
            .batch_size
            .saturating_mul(self.config.batch_pending)
            .max(1);
        let (tx, rx) = mpsc::channel(capacity);
        let cancel = CancellationToken::new();

        let receiver = tokio::spawn(receive_loop(
            socket,
            tx,
            cancel.clone(),
            self.config.precision(),
            Arc::clone(&self.stats),
            self.name.clone(),
        ));

        let sink = BatchSink {
            writer: Arc::clone(&self.writer),
            database: self.config.database.clone(),
            retention_policy: self.config.retention_policy.clone(),
            stats: Arc::clone(&self.stats),
            name: self.name.clone(),
        };
        let batcher = tokio::spawn(batch_loop(
            rx,
            PointBatcher::new(self.config.batch_size, self.config.batch_timeout),
            sink,
        ));

        info!(
            listener = %self.name,
            %local_addr,
            database = %self.config.database,
            batch_size = self.config.batch_size,
            batch_timeout = ?self.config.batch_timeout,
            "UDP listener started"
        );

        self.running = Some(Running {
            cancel,
            receiver,
            batcher,
            local_addr,
        });
        Ok(())
    }

    async fn close(&mut self) -> Result<(), ServiceError> {
        let Some(running) = self.running.take() else {
            debug!(listener = %self.name, "UDP listener not open; nothing to close");
            return Ok(());
        };

        running.cancel.cancel();
        let receiver = running.receiver.await;
        // The batcher flushes what is pending once the receiver hangs up
        let batcher = running.batcher.await;
        receiver?;
        batcher?;

        info!(listener = %self.name, "UDP listener closed");
        Ok(())
    }
}

fn bind_socket(addr: SocketAddr, read_buffer: usize) -> std::io::Result<UdpSocket> {
    let socket = Socket::new(Domain::for_address(addr), Type::DGRAM, Some(Protocol::UDP))?;
    if read_buffer > 0 {
        socket.set_recv_buffer_size(read_buffer)?;
    }
    socket.bind(&addr.into())?;
    socket.set_nonblocking(true)?;

    let std_socket: std::net::UdpSocket = socket.into();
    UdpSocket::from_std(std_socket)
}

async fn receive_loop(
    socket: UdpSocket,
    tx: mpsc::Sender<Point>,
    cancel: CancellationToken,
    precision: Precision,
    stats: Arc<UdpStats>,
    name: String,
) {
    let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];

    loop {
        let received = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            result = socket.recv_from(&mut buf) => result,
        };

        let (len, peer) = match received {
            Ok(received) => received,
            Err(e) => {
                warn!(listener = %name, "UDP receive error: {}", e);
                continue;
            }
        };
        stats.datagrams.fetch_add(1, Ordering::Relaxed);

        let text = match std::str::from_utf8(&buf[..len]) {
            Ok(text) => text,
            Err(e) => {
                stats.parse_failures.fetch_add(1, Ordering::Relaxed);
                debug!(listener = %name, %peer, "Dropping non UTF-8 datagram: {}", e);
                continue;
            }
        };

        let now = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
        let (points, errors) = parse_points(text, precision, now);

        if !errors.is_empty() {
            stats
                .parse_failures
                .fetch_add(errors.len() as u64, Ordering::Relaxed);
            for e in &errors {
                debug!(listener = %name, %peer, "Dropping unparseable line: {}", e);
            }
        }
        stats
            .points_received
            .fetch_add(points.len() as u64, Ordering::Relaxed);

        for point in points {
            if tx.send(point).await.is_err() {
                return;
            }
        }
    }
}

struct BatchSink {
    writer: Arc<dyn PointsWriter>,
    database: String,
    retention_policy: String,
    stats: Arc<UdpStats>,
    name: String,
}

impl BatchSink {
    async fn flush(&self, points: Vec<Point>) {
        let count = points.len();
        let request = WriteRequest::new(
            self.database.as_str(),
            self.retention_policy.as_str(),
            ConsistencyLevel::Any,
            points,
        );

        match self.writer.write_points(request).await {
            Ok(()) => {
                self.stats.batches_written.fetch_add(1, Ordering::Relaxed);
                debug!(listener = %self.name, points = count, "Batch handed to writer");
            }
            Err(e) => {
                self.stats.write_failures.fetch_add(1, Ordering::Relaxed);
                error!(
                    listener = %self.name,
                    points = count,
                    "Failed to write batch: {}",
                    e
                );
            }
        }
    }
}

async fn batch_loop(mut rx: mpsc::Receiver<Point>, mut batcher: PointBatcher, sink: BatchSink) {
    loop {
        let deadline = batcher.deadline();
        let flush_timer = async move {
            match deadline {
                Some(deadline) => sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            next = rx.recv() => match next {
                Some(point) => {
                    if let Some(batch) = batcher.push(point) {
                        sink.flush(batch).await;
                    }
                }
                None => break,
            },
            () = flush_timer => {
                if let Some(batch) = batcher.take() {
                    sink.flush(batch).await;
                }
            }
        }
    }

    if let Some(batch) = batcher.take() {
        sink.flush(batch).await;
    }
}
