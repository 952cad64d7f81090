mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{FakeService, key};
use reader_engine::stats::StatsCollector;
use reader_engine::{ContentCache, FetchError};

fn cache(service: &Arc<FakeService>) -> Arc<ContentCache> {
    Arc::new(ContentCache::new(Arc::clone(service) as _, Arc::new(StatsCollector::new())))
}

#[tokio::test(start_paused = true)]
async fn concurrent_tasks_trigger_a_single_fetch() {
    let service = Arc::new(FakeService::with_chapters(3, 4));
    let cache = cache(&service);

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move { cache.get(&key(2)).await })
        })
        .collect();

    for task in tasks {
        let content = task.await.expect("task joins").expect("fetch succeeds");
        assert_eq!(content.title, "Chapter 2");
    }
    assert_eq!(service.fetch_count(&key(2)), 1);
    assert_eq!(cache.len(), 1);

    let stats = cache.stats().snapshot();
    assert_eq!(stats.lookups, 8);
    assert_eq!(stats.fetches, 1);
}

#[tokio::test(start_paused = true)]
async fn cached_content_is_served_without_refetching() {
    let service = Arc::new(FakeService::with_chapters(3, 4));
    let cache = cache(&service);

    let first = cache.get(&key(1)).await.unwrap();
    let second = cache.get(&key(1)).await.unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(service.fetches(), vec![key(1)]);
}

#[tokio::test(start_paused = true)]
async fn missing_chapters_are_retried_on_the_next_get() {
    let service = Arc::new(FakeService::with_chapters(2, 1));
    let cache = cache(&service);

    assert_eq!(cache.get(&key(9)).await.unwrap_err(), FetchError::NotFound(key(9)));
    assert!(!cache.contains(&key(9)));
    assert!(cache.get(&key(9)).await.is_err());
    assert_eq!(service.fetch_count(&key(9)), 2);
}

#[tokio::test(start_paused = true)]
async fn prefetch_populates_the_cache() {
    let service = Arc::new(FakeService::with_chapters(3, 2));
    let cache = cache(&service);

    cache.spawn_prefetch(key(3)).await.expect("prefetch task joins");
    assert!(cache.contains(&key(3)));

    cache.get(&key(3)).await.unwrap();
    assert_eq!(service.fetch_count(&key(3)), 1);
}

#[tokio::test(start_paused = true)]
async fn late_response_is_cached_after_the_caller_moves_on() {
    let service = Arc::new(FakeService::with_chapters(3, 2));
    let cache = cache(&service);

    let joiner = {
        let cache = Arc::clone(&cache);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            cache.get(&key(2)).await
        })
    };
    assert!(tokio::time::timeout(Duration::from_millis(10), cache.get(&key(2))).await.is_err());

    let joined = joiner.await.expect("task joins").expect("joiner sees the shared fetch");
    assert_eq!(joined.title, "Chapter 2");

    let abandoned = tokio::time::timeout(Duration::from_millis(10), cache.get(&key(3))).await;
    assert!(abandoned.is_err());
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(cache.contains(&key(3)), "response that nobody waited for is still cached");
    assert_eq!(service.fetch_count(&key(2)), 1);
    assert_eq!(service.fetch_count(&key(3)), 1);
}
