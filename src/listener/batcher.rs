use crate::domain::Point;
use std::time::Duration;
use tokio::time::Instant;

/// Groups points into batches bounded by size and age.
///
/// A batch is emitted as soon as `size` points are pending, or once
/// `timeout` has elapsed since the first pending point arrived.
#[derive(Debug)]
pub struct PointBatcher {
    size: usize,
    timeout: Duration,
    pending: Vec<Point>,
    started_at: Option<Instant>,
}

impl PointBatcher {
    pub fn new(size: usize, timeout: Duration) -> Self {
        let size = size.max(1);
        Self {
            size,
            timeout,
            pending: Vec::with_capacity(size),
            started_at: None,
        }
    }

    /// Adds one point, returning a full batch if this point completed one.
    pub fn push(&mut self, point: Point) -> Option<Vec<Point>> {
        if self.pending.is_empty() {
            self.started_at = Some(Instant::now());
        }
        self.pending.push(point);

        if self.pending.len() >= self.size {
            self.take()
        } else {
            None
        }
    }

    /// When the pending batch must be flushed, if anything is pending.
    pub fn deadline(&self) -> Option<Instant> {
        self.started_at.map(|start| start + self.timeout)
    }

    /// Removes and returns the pending points, if any.
    pub fn take(&mut self) -> Option<Vec<Point>> {
        self.started_at = None;
        if self.pending.is_empty() {
            return None;
        }
        Some(std::mem::replace(
            &mut self.pending,
            Vec::with_capacity(self.size),
        ))
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
