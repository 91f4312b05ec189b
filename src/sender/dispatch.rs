use super::{PointsWriter, Sender, SenderMetrics, WriteError, WriteRequest};
use async_trait::async_trait;
use futures::future::join_all;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

type SharedReceiver = Arc<tokio::sync::Mutex<mpsc::Receiver<WriteRequest>>>;

/// Bounded write queue in front of a [`Sender`], drained by a fixed pool of
/// worker tasks.
///
/// Enqueueing never waits on the network: a full queue is reported back to the
/// caller as [`WriteError::QueueFull`]. Send failures are counted in the
/// sender's metrics and logged; they are not returned to whoever enqueued the
/// batch.
pub struct Dispatcher {
    sender: Arc<Sender>,
    metrics: Arc<SenderMetrics>,
    queue: Mutex<Option<mpsc::Sender<WriteRequest>>>,
    receiver: Mutex<Option<mpsc::Receiver<WriteRequest>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    worker_count: usize,
    capacity: usize,
}

impl Dispatcher {
    /// Creates the queue. Workers are spawned by [`Dispatcher::start`];
    /// batches enqueued before that wait in the queue.
    pub fn new(sender: Arc<Sender>, worker_count: usize, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, rx) = mpsc::channel(capacity);
        let metrics = sender.metrics();

        Self {
            sender,
            metrics,
            queue: Mutex::new(Some(tx)),
            receiver: Mutex::new(Some(rx)),
            workers: Mutex::new(Vec::new()),
            worker_count: worker_count.max(1),
            capacity,
        }
    }

    /// Spawns the worker pool. Subsequent calls do nothing.
    pub fn start(&self) {
        let Some(rx) = self.receiver.lock().take() else {
            debug!("Dispatcher already started");
            return;
        };
        let rx: SharedReceiver = Arc::new(tokio::sync::Mutex::new(rx));

        let mut workers = self.workers.lock();
        for id in 0..self.worker_count {
            let rx = Arc::clone(&rx);
            let sender = Arc::clone(&self.sender);
            workers.push(tokio::spawn(worker_loop(id, rx, sender)));
        }

        info!(
            workers = self.worker_count,
            queue_size = self.capacity,
            "Write dispatcher started"
        );
    }

    pub fn sender(&self) -> &Arc<Sender> {
        &self.sender
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of batches waiting for a worker.
    pub fn pending(&self) -> usize {
        self.queue
            .lock()
            .as_ref()
            .map_or(0, |tx| self.capacity - tx.capacity())
    }

    pub fn is_closed(&self) -> bool {
        self.queue.lock().is_none()
    }

    /// Stops accepting batches and waits up to `drain_timeout` for the queue
    /// to empty. Returns `false` if workers were still busy when the timeout
    /// expired; those writes keep running in the background. A dispatcher
    /// that was never started drains only if nothing was queued.
    pub async fn shutdown(&self, drain_timeout: Duration) -> bool {
        let pending = self.pending();
        drop(self.queue.lock().take());

        // Never started: nothing will drain the queue
        if self.receiver.lock().take().is_some() {
            if pending > 0 {
                warn!(
                    dropped = pending,
                    "Write dispatcher closed before it was started; queued batches dropped"
                );
            }
            return pending == 0;
        }

        let handles: Vec<JoinHandle<()>> = std::mem::take(&mut *self.workers.lock());
        if handles.is_empty() {
            return true;
        }

        match tokio::time::timeout(drain_timeout, join_all(handles)).await {
            Ok(results) => {
                for result in results {
                    if let Err(e) = result {
                        error!("Write worker terminated abnormally: {}", e);
                    }
                }
                info!("Write dispatcher drained");
                true
            }
            Err(_) => {
                warn!(
                    ?drain_timeout,
                    "Write dispatcher did not drain in time; in-flight writes continue"
                );
                false
            }
        }
    }
}

#[async_trait]
impl PointsWriter for Dispatcher {
    async fn write_points(&self, request: WriteRequest) -> Result<(), WriteError> {
        let result = match self.queue.lock().as_ref() {
            None => Err(WriteError::Closed),
            Some(tx) => match tx.try_send(request) {
                Ok(()) => Ok(()),
                Err(TrySendError::Full(_)) => Err(WriteError::QueueFull {
                    capacity: self.capacity,
                }),
                Err(TrySendError::Closed(_)) => Err(WriteError::Closed),
            },
        };

        match &result {
            Ok(()) => self.metrics.record_enqueued(),
            Err(_) => self.metrics.record_rejected(),
        }
        result
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("sender", &self.sender)
            .field("worker_count", &self.worker_count)
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}

async fn worker_loop(id: usize, rx: SharedReceiver, sender: Arc<Sender>) {
    debug!(worker = id, "Write worker started");

    loop {
        let next = rx.lock().await.recv().await;
        let Some(request) = next else {
            break;
        };

        let result = sender
            .write_points(
                &request.database,
                &request.retention_policy,
                request.consistency,
                &request.points,
            )
            .await;

        if let Err(e) = result {
            error!(
                worker = id,
                database = %request.database,
                retention_policy = %request.retention_policy,
                points = request.points.len(),
                "Failed to write points: {}",
                e
            );
        }
    }

    debug!(worker = id, "Write worker stopped");
}
