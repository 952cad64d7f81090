//! Bounded, insertion-ordered memory of where the reader stopped in each chapter.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use hashlink::LinkedHashMap;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::types::{ChapterKey, Position};

use super::backend::StorageBackend;

/// Durable key holding the whole position map.
pub const POSITIONS_KEY: &str = "reader.scrollPositions";

type PositionMap = LinkedHashMap<String, Position>;

/// Drops calls that arrive within `window` of the last accepted one.
#[derive(Debug, Clone)]
pub struct Throttle {
    window: Duration,
    last: Option<Instant>,
}

impl Throttle {
    pub fn new(window: Duration) -> Self {
        Self { window, last: None }
    }

    /// Whether a call at `now` passes; a passing call opens a new window.
    pub fn try_acquire(&mut self, now: Instant) -> bool {
        if let Some(last) = self.last {
            if now.saturating_duration_since(last) < self.window {
                return false;
            }
        }
        self.last = Some(now);
        true
    }

    fn mark(&mut self, now: Instant) {
        self.last = Some(now);
    }
}

pub struct PositionStore {
    backend: Arc<dyn StorageBackend>,
    positions: PositionMap,
    max_entries: usize,
    throttle: Throttle,
}

impl fmt::Debug for PositionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PositionStore")
            .field("entries", &self.positions.len())
            .field("max_entries", &self.max_entries)
            .field("throttle", &self.throttle)
            .finish()
    }
}

impl PositionStore {
    /// Load the durable map. Unreadable or corrupt data is logged and replaced by an empty map.
    pub fn open(backend: Arc<dyn StorageBackend>, config: &EngineConfig) -> Self {
        let mut positions = match backend.get(POSITIONS_KEY) {
            Ok(Some(raw)) => serde_json::from_str::<PositionMap>(&raw).unwrap_or_else(|err| {
                warn!(error = %err, "stored reading positions are corrupt; starting empty");
                PositionMap::new()
            }),
            Ok(None) => PositionMap::new(),
            Err(err) => {
                warn!(error = %err, "failed to read stored reading positions; starting empty");
                PositionMap::new()
            }
        };
        let max_entries = config.max_stored_positions.max(1);
        while positions.len() > max_entries {
            positions.pop_front();
        }
        debug!(entries = positions.len(), "reading positions loaded");

        Self { backend, positions, max_entries, throttle: Throttle::new(config.position_save_throttle()) }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Stored chapter keys, oldest first.
    pub fn keys(&self) -> Vec<ChapterKey> {
        self.positions.keys().filter_map(|key| ChapterKey::parse(key)).collect()
    }

    pub fn restore(&self, key: &ChapterKey) -> Option<Position> {
        self.positions.get(&key.storage_key()).copied()
    }

    /// Throttled save. Returns `false` when the call fell inside the throttle window and was dropped.
    pub fn save(&mut self, key: &ChapterKey, position: Position) -> bool {
        self.save_at(key, position, Instant::now())
    }

    pub fn save_at(&mut self, key: &ChapterKey, position: Position, now: Instant) -> bool {
        if !self.throttle.try_acquire(now) {
            return false;
        }
        self.store(key, position);
        true
    }

    /// Save regardless of the throttle.
    pub fn save_now(&mut self, key: &ChapterKey, position: Position) {
        self.throttle.mark(Instant::now());
        self.store(key, position);
    }

    fn store(&mut self, key: &ChapterKey, position: Position) {
        let position = normalize(position);
        let storage_key = key.storage_key();
        match self.positions.get_mut(&storage_key) {
            Some(slot) => *slot = position,
            None => {
                self.positions.insert(storage_key, position);
                while self.positions.len() > self.max_entries {
                    if let Some((evicted, _)) = self.positions.pop_front() {
                        debug!(chapter = %evicted, "evicted oldest reading position");
                    }
                }
            }
        }
        self.persist();
    }

    fn persist(&self) {
        let written = serde_json::to_string(&self.positions)
            .map_err(anyhow::Error::from)
            .and_then(|raw| self.backend.set(POSITIONS_KEY, &raw));
        if let Err(err) = written {
            warn!(error = %err, "failed to persist reading positions");
        }
    }
}

fn normalize(position: Position) -> Position {
    match position {
        Position::Percent(value) if value.is_nan() => Position::Percent(0.0),
        Position::Percent(value) => Position::Percent(value.clamp(0.0, 100.0)),
        page => page,
    }
}
