//! Session cache of fetched chapters with single-flight fetching.
//!
//! Every key is in one of three states: absent, pending (exactly one fetch in flight, shared by
//! all callers through a `watch` channel), or ready (content kept until the cache is dropped or
//! cleared). Failures move a key back to absent so the next caller retries.
//!
//! The fetch itself runs on its own task, so a caller that stops waiting never cancels it; a late
//! response is still cached.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::FetchError;
use crate::stats::StatsCollector;
use crate::types::{ChapterContent, ChapterKey};

use super::{ContentService, Result};

type Outcome = Option<Result<Arc<ChapterContent>>>;

#[derive(Debug, Default)]
struct CacheState {
    ready: HashMap<ChapterKey, Arc<ChapterContent>>,
    pending: HashMap<ChapterKey, watch::Receiver<Outcome>>,
}

/// Everything a detached fetch task needs to publish its outcome.
struct Shared {
    service: Arc<dyn ContentService>,
    state: Mutex<CacheState>,
    stats: Arc<StatsCollector>,
}

enum Lookup {
    Ready(Arc<ChapterContent>),
    Wait(watch::Receiver<Outcome>),
}

/// Fetches chapters through a [`ContentService`] and memoizes them for the session.
pub struct ContentCache {
    shared: Arc<Shared>,
    prefetching: AtomicUsize,
}

impl fmt::Debug for ContentCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("ContentCache")
            .field("ready", &state.ready.len())
            .field("pending", &state.pending.len())
            .field("prefetching", &self.prefetching.load(Ordering::Relaxed))
            .finish()
    }
}

impl ContentCache {
    pub fn new(service: Arc<dyn ContentService>, stats: Arc<StatsCollector>) -> Self {
        let shared = Shared { service, state: Mutex::new(CacheState::default()), stats };
        Self { shared: Arc::new(shared), prefetching: AtomicUsize::new(0) }
    }

    pub fn service(&self) -> Arc<dyn ContentService> {
        Arc::clone(&self.shared.service)
    }

    pub fn stats(&self) -> Arc<StatsCollector> {
        Arc::clone(&self.shared.stats)
    }

    /// Number of chapters held ready.
    pub fn len(&self) -> usize {
        self.shared.state.lock().ready.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, key: &ChapterKey) -> bool {
        self.shared.state.lock().ready.contains_key(key)
    }

    pub fn is_in_flight(&self, key: &ChapterKey) -> bool {
        self.shared.state.lock().pending.contains_key(key)
    }

    /// Drop every ready chapter. In-flight fetches still complete and repopulate their key.
    pub fn clear(&self) {
        let mut state = self.shared.state.lock();
        state.ready.clear();
        self.shared.stats.update_cached_chapters(0);
    }

    /// Return the chapter, fetching it at most once no matter how many callers ask concurrently.
    ///
    /// Must be called from within a tokio runtime; the fetch is spawned onto it.
    pub async fn get(&self, key: &ChapterKey) -> Result<Arc<ChapterContent>> {
        let lookup = {
            let mut state = self.shared.state.lock();
            if let Some(content) = state.ready.get(key) {
                self.shared.stats.record_lookup(true);
                debug!(chapter = %key, "chapter cache hit");
                Lookup::Ready(Arc::clone(content))
            } else if let Some(receiver) = state.pending.get(key) {
                self.shared.stats.record_lookup(true);
                debug!(chapter = %key, "joining in-flight fetch");
                Lookup::Wait(receiver.clone())
            } else {
                self.shared.stats.record_lookup(false);
                let (sender, receiver) = watch::channel(None);
                state.pending.insert(key.clone(), receiver.clone());
                tokio::spawn(fetch(Arc::clone(&self.shared), key.clone(), sender));
                Lookup::Wait(receiver)
            }
        };

        match lookup {
            Lookup::Ready(content) => Ok(content),
            Lookup::Wait(receiver) => wait(key, receiver).await,
        }
    }

    /// Warm the cache for `key`. Failures are logged and swallowed.
    pub async fn prefetch(&self, key: &ChapterKey) {
        if self.contains(key) {
            debug!(chapter = %key, "prefetch skipped; already cached");
            return;
        }

        let pending = self.prefetching.fetch_add(1, Ordering::Relaxed) + 1;
        self.shared.stats.update_prefetch_pending(pending);

        match self.get(key).await {
            Ok(_) => debug!(chapter = %key, "prefetched chapter"),
            Err(err) => warn!(chapter = %key, error = %err, "prefetch failed; ignoring"),
        }

        let pending = self.prefetching.fetch_sub(1, Ordering::Relaxed).saturating_sub(1);
        self.shared.stats.update_prefetch_pending(pending);
    }

    /// Run [`ContentCache::prefetch`] as a detached task on the current runtime.
    pub fn spawn_prefetch(self: &Arc<Self>, key: ChapterKey) -> JoinHandle<()> {
        let cache = Arc::clone(self);
        tokio::spawn(async move { cache.prefetch(&key).await })
    }
}

/// The single fetch for `key`. Runs to completion even when every caller has stopped waiting.
async fn fetch(shared: Arc<Shared>, key: ChapterKey, sender: watch::Sender<Outcome>) {
    let started = Instant::now();
    let fetched = shared.service.fetch_chapter(&key).await;
    shared.stats.record_fetch(started.elapsed(), fetched.is_ok());

    let outcome = fetched.map(|mut content| {
        content.key = key.clone();
        Arc::new(content)
    });

    {
        let mut state = shared.state.lock();
        state.pending.remove(&key);
        if let Ok(content) = &outcome {
            state.ready.insert(key.clone(), Arc::clone(content));
        }
        shared.stats.update_cached_chapters(state.ready.len());
    }

    match &outcome {
        Ok(_) => debug!(chapter = %key, elapsed_ms = started.elapsed().as_millis() as u64, "chapter fetched"),
        Err(err) => warn!(chapter = %key, error = %err, "chapter fetch failed"),
    }

    // No receivers left simply means nobody is waiting any more.
    let _ = sender.send(Some(outcome));
}

async fn wait(key: &ChapterKey, mut receiver: watch::Receiver<Outcome>) -> Result<Arc<ChapterContent>> {
    let outcome = match receiver.wait_for(Option::is_some).await {
        Ok(slot) => (*slot).clone(),
        Err(_) => None,
    };
    // The sender only goes away without an outcome if the fetch task panicked.
    outcome.unwrap_or_else(|| Err(FetchError::Abandoned(key.clone())))
}
