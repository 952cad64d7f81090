//! Trailing-edge debouncing for repagination requests.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Hands out runs; only the most recently scheduled run is allowed to fire.
#[derive(Debug, Clone, Default)]
pub struct Debouncer {
    generation: Arc<AtomicU64>,
}

/// A scheduled run. Superseded as soon as another run is scheduled or the debouncer is cancelled.
#[derive(Debug)]
pub struct PendingRun {
    generation: Arc<AtomicU64>,
    ticket: u64,
    delay: Duration,
}

impl Debouncer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&self, delay: Duration) -> PendingRun {
        let ticket = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        PendingRun { generation: Arc::clone(&self.generation), ticket, delay }
    }

    /// Supersede every outstanding run.
    pub fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }
}

impl PendingRun {
    pub fn is_current(&self) -> bool {
        self.generation.load(Ordering::SeqCst) == self.ticket
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Sleep out the delay. Returns `true` if this run is still the newest one afterwards.
    pub async fn wait(&self) -> bool {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.is_current()
    }
}

/// Repagination delay for a reader sitting on `page_index`.
///
/// On the first page nothing has been read yet, so layout is redone immediately.
pub fn repagination_delay(base: Duration, page_index: usize) -> Duration {
    if page_index == 0 { Duration::ZERO } else { base }
}
