//! Per-connection bookkeeping for the serve loop.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Tracks one client from accept to disconnect.
pub(crate) struct ConnectionState {
    id: u64,
    connected_at: Instant,
    requests: u64,
    failed_requests: u64,
}

impl ConnectionState {
    pub(crate) fn new() -> Self {
        Self {
            id: NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
            connected_at: Instant::now(),
            requests: 0,
            failed_requests: 0,
        }
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    /// Record one answered request.
    pub(crate) fn record(&mut self, succeeded: bool) {
        self.requests += 1;
        if !succeeded {
            self.failed_requests += 1;
        }
    }

    pub(crate) fn requests(&self) -> u64 {
        self.requests
    }

    pub(crate) fn failed_requests(&self) -> u64 {
        self.failed_requests
    }

    pub(crate) fn uptime(&self) -> Duration {
        self.connected_at.elapsed()
    }
}
