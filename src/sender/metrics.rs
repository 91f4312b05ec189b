use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Point-in-time view of [`SenderMetrics`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SenderStats {
    pub requests: u64,
    pub successes: u64,
    pub failures: u64,
    pub encode_failures: u64,
    pub points_sent: u64,
    pub bytes_sent: u64,
    pub average_latency: Duration,
    pub enqueued: u64,
    pub rejected: u64,
}

/// Lock-free counters shared by the sender and its dispatcher.
#[derive(Debug, Default)]
pub struct SenderMetrics {
    requests: AtomicU64,
    successes: AtomicU64,
    failures: AtomicU64,
    encode_failures: AtomicU64,
    points_sent: AtomicU64,
    bytes_sent: AtomicU64,
    total_latency_ms: AtomicU64,
    enqueued: AtomicU64,
    rejected: AtomicU64,
}

impl SenderMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_request(&self, success: bool, points: usize, bytes: usize, latency: Duration) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        self.total_latency_ms
            .fetch_add(latency.as_millis() as u64, Ordering::Relaxed);

        if success {
            self.successes.fetch_add(1, Ordering::Relaxed);
            self.points_sent.fetch_add(points as u64, Ordering::Relaxed);
            self.bytes_sent.fetch_add(bytes as u64, Ordering::Relaxed);
        } else {
            self.failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_encode_failure(&self) {
        self.encode_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_enqueued(&self) {
        self.enqueued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> SenderStats {
        let requests = self.requests.load(Ordering::Relaxed);
        let total_latency_ms = self.total_latency_ms.load(Ordering::Relaxed);

        let average_latency = if requests > 0 {
            Duration::from_millis(total_latency_ms / requests)
        } else {
            Duration::ZERO
        };

        SenderStats {
            requests,
            successes: self.successes.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            encode_failures: self.encode_failures.load(Ordering::Relaxed),
            points_sent: self.points_sent.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            average_latency,
            enqueued: self.enqueued.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
        }
    }
}
