//! Runtime counters for the reading engine.
//!
//! The cache records lookups and fetch latency, the paginator records how long a layout pass
//! took, and the session publishes how many prefetches are outstanding. Hosts read everything
//! back through [`StatsCollector::snapshot`].

use std::cmp::Ordering;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

use serde::Serialize;

const SAMPLE_CAPACITY: usize = 120;

#[derive(Debug)]
struct SampleWindow {
    samples: VecDeque<f32>,
    capacity: usize,
}

impl SampleWindow {
    fn new(capacity: usize) -> Self {
        Self { samples: VecDeque::with_capacity(capacity), capacity }
    }

    fn push(&mut self, value: f32) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(value);
    }

    fn percentile(&self, percentile: f32) -> f32 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let mut sorted: Vec<f32> = self.samples.iter().copied().collect();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
        let rank = (percentile.clamp(0.0, 1.0) * (sorted.len() - 1) as f32).round() as usize;
        sorted.get(rank).copied().unwrap_or(0.0)
    }
}

#[derive(Debug)]
struct Counters {
    started_at: Instant,
    fetch_ms: SampleWindow,
    pagination_ms: SampleWindow,
    lookups: u64,
    hits: u64,
    fetches: u64,
    fetch_failures: u64,
    cached_chapters: usize,
    prefetch_pending: usize,
}

impl Default for Counters {
    fn default() -> Self {
        Self {
            started_at: Instant::now(),
            fetch_ms: SampleWindow::new(SAMPLE_CAPACITY),
            pagination_ms: SampleWindow::new(SAMPLE_CAPACITY),
            lookups: 0,
            hits: 0,
            fetches: 0,
            fetch_failures: 0,
            cached_chapters: 0,
            prefetch_pending: 0,
        }
    }
}

/// Thread-safe counter collection shared by the engine components.
#[derive(Debug, Default)]
pub struct StatsCollector {
    inner: parking_lot::Mutex<Counters>,
}

impl StatsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a cache lookup; `hit` covers both ready content and joining an in-flight fetch.
    pub fn record_lookup(&self, hit: bool) {
        let mut guard = self.inner.lock();
        guard.lookups = guard.lookups.saturating_add(1);
        if hit {
            guard.hits = guard.hits.saturating_add(1);
        }
    }

    /// Record one network fetch and its outcome.
    pub fn record_fetch(&self, duration: Duration, succeeded: bool) {
        let mut guard = self.inner.lock();
        guard.fetches = guard.fetches.saturating_add(1);
        if !succeeded {
            guard.fetch_failures = guard.fetch_failures.saturating_add(1);
        }
        guard.fetch_ms.push(duration.as_secs_f32() * 1_000.0);
    }

    pub fn record_pagination(&self, duration: Duration) {
        self.inner.lock().pagination_ms.push(duration.as_secs_f32() * 1_000.0);
    }

    pub fn update_cached_chapters(&self, count: usize) {
        self.inner.lock().cached_chapters = count;
    }

    pub fn update_prefetch_pending(&self, pending: usize) {
        self.inner.lock().prefetch_pending = pending;
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let guard = self.inner.lock();
        let hit_ratio =
            if guard.lookups == 0 { 0.0 } else { guard.hits as f32 / guard.lookups as f32 };
        StatsSnapshot {
            uptime_ms: guard.started_at.elapsed().as_millis() as u64,
            lookups: guard.lookups,
            hit_ratio,
            fetches: guard.fetches,
            fetch_failures: guard.fetch_failures,
            fetch_ms_p50: guard.fetch_ms.percentile(0.50),
            fetch_ms_p95: guard.fetch_ms.percentile(0.95),
            pagination_ms_p50: guard.pagination_ms.percentile(0.50),
            pagination_ms_p95: guard.pagination_ms.percentile(0.95),
            cached_chapters: guard.cached_chapters,
            prefetch_pending: guard.prefetch_pending,
        }
    }
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    pub uptime_ms: u64,
    pub lookups: u64,
    pub hit_ratio: f32,
    pub fetches: u64,
    pub fetch_failures: u64,
    pub fetch_ms_p50: f32,
    pub fetch_ms_p95: f32,
    pub pagination_ms_p50: f32,
    pub pagination_ms_p95: f32,
    pub cached_chapters: usize,
    pub prefetch_pending: usize,
}
