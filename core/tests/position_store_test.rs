mod common;

use std::sync::Arc;
use std::time::Duration;

use common::key;
use reader_engine::store::POSITIONS_KEY;
use reader_engine::{EngineConfig, FileStorage, MemoryStorage, Position, PositionStore, StorageBackend};
use tokio::time::Instant;

fn percent(position: Option<Position>) -> f64 {
    match position {
        Some(Position::Percent(value)) => value,
        other => panic!("expected a percentage, got {other:?}"),
    }
}

#[test]
fn positions_round_trip_through_file_storage() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = EngineConfig::default();
    {
        let backend: Arc<dyn StorageBackend> = Arc::new(FileStorage::new(dir.path()).unwrap());
        let mut store = PositionStore::open(backend, &config);
        store.save_now(&key(1), Position::percent(37.123_456));
        store.save_now(&key(2), Position::page(5));
    }

    let backend: Arc<dyn StorageBackend> = Arc::new(FileStorage::new(dir.path()).unwrap());
    let store = PositionStore::open(backend, &config);
    assert!((percent(store.restore(&key(1))) - 37.123_456).abs() <= 0.01);
    assert_eq!(store.restore(&key(2)), Some(Position::page(5)));
    assert_eq!(store.restore(&key(3)), None);
}

#[test]
fn twenty_first_chapter_evicts_the_oldest() {
    let backend = Arc::new(MemoryStorage::new());
    let mut store = PositionStore::open(Arc::clone(&backend) as _, &EngineConfig::default());

    for chapter in 1..=21 {
        store.save_now(&key(chapter), Position::percent(f64::from(chapter)));
    }

    assert_eq!(store.len(), 20);
    assert_eq!(store.restore(&key(1)), None);
    assert_eq!(store.restore(&key(2)), Some(Position::Percent(2.0)));
    assert_eq!(store.restore(&key(21)), Some(Position::Percent(21.0)));

    let reopened = PositionStore::open(backend as _, &EngineConfig::default());
    assert_eq!(reopened.len(), 20);
    assert_eq!(reopened.keys().first(), Some(&key(2)));
}

#[test]
fn updating_a_chapter_does_not_refresh_its_age() {
    let mut store = PositionStore::open(
        Arc::new(MemoryStorage::new()),
        &EngineConfig::default().with_max_stored_positions(3),
    );
    for chapter in 1..=3 {
        store.save_now(&key(chapter), Position::percent(10.0));
    }
    store.save_now(&key(1), Position::percent(90.0));
    store.save_now(&key(4), Position::percent(10.0));

    assert_eq!(store.keys(), vec![key(2), key(3), key(4)]);
}

#[test]
fn throttled_saves_inside_the_window_are_dropped() {
    let mut store = PositionStore::open(Arc::new(MemoryStorage::new()), &EngineConfig::default());
    let start = Instant::now();

    assert!(store.save_at(&key(1), Position::percent(10.0), start));
    assert!(!store.save_at(&key(1), Position::percent(20.0), start + Duration::from_millis(400)));
    assert_eq!(store.restore(&key(1)), Some(Position::Percent(10.0)));

    assert!(store.save_at(&key(1), Position::percent(30.0), start + Duration::from_millis(1_000)));
    assert_eq!(store.restore(&key(1)), Some(Position::Percent(30.0)));
}

#[test]
fn failed_writes_keep_the_in_memory_mirror() {
    struct ReadOnly;
    impl StorageBackend for ReadOnly {
        fn get(&self, _: &str) -> reader_engine::Result<Option<String>> {
            Ok(None)
        }
        fn set(&self, key: &str, _: &str) -> reader_engine::Result<()> {
            anyhow::bail!("{key} is read-only")
        }
        fn remove(&self, _: &str) -> reader_engine::Result<()> {
            Ok(())
        }
    }

    let mut store = PositionStore::open(Arc::new(ReadOnly), &EngineConfig::default());
    store.save_now(&key(1), Position::percent(55.0));
    assert_eq!(store.restore(&key(1)), Some(Position::Percent(55.0)));
}

#[test]
fn corrupt_durable_map_is_ignored() {
    let backend = Arc::new(MemoryStorage::new());
    backend.set(POSITIONS_KEY, "[1, 2, 3]").unwrap();
    let store = PositionStore::open(backend as _, &EngineConfig::default());
    assert!(store.is_empty());
}
