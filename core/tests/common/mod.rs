#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use reader_engine::error::{FetchError, MeasureError};
use reader_engine::{ChapterContent, ChapterKey, ContentService, LayoutMeasurementProvider, Typography};

pub const WORK: &str = "the-wandering-inn";
pub const SOURCE: &str = "royalroad";

pub fn key(chapter: u32) -> ChapterKey {
    ChapterKey::new(WORK, SOURCE, chapter)
}

/// In-memory chapter service with a fixed latency that counts every call.
#[derive(Default)]
pub struct FakeService {
    chapters: HashMap<u32, String>,
    latency: Duration,
    fetches: Mutex<Vec<ChapterKey>>,
    reads: Mutex<Vec<ChapterKey>>,
}

impl FakeService {
    /// Chapters `1..=count`, each with `paragraphs` numbered paragraphs.
    pub fn with_chapters(count: u32, paragraphs: usize) -> Self {
        let chapters = (1..=count)
            .map(|number| {
                let body = (1..=paragraphs).map(|p| format!("<p>Chapter {number}, paragraph {p}.</p>")).collect();
                (number, body)
            })
            .collect();
        Self { chapters, latency: Duration::from_millis(40), ..Self::default() }
    }

    pub fn fetches(&self) -> Vec<ChapterKey> {
        self.fetches.lock().clone()
    }

    pub fn fetch_count(&self, key: &ChapterKey) -> usize {
        self.fetches.lock().iter().filter(|fetched| *fetched == key).count()
    }

    pub fn reads(&self) -> Vec<ChapterKey> {
        self.reads.lock().clone()
    }
}

#[async_trait]
impl ContentService for FakeService {
    async fn fetch_chapter(&self, key: &ChapterKey) -> Result<ChapterContent, FetchError> {
        self.fetches.lock().push(key.clone());
        tokio::time::sleep(self.latency).await;
        let body = self.chapters.get(&key.chapter_number).ok_or_else(|| FetchError::NotFound(key.clone()))?;
        let last = self.chapters.len() as u32;
        Ok(ChapterContent {
            key: key.clone(),
            title: format!("Chapter {}", key.chapter_number),
            body: body.clone(),
            prev_chapter: (key.chapter_number > 1).then(|| key.chapter_number - 1),
            next_chapter: (key.chapter_number < last).then(|| key.chapter_number + 1),
            asset_base_path: format!("/static/{WORK}/{SOURCE}"),
        })
    }

    async fn report_chapter_read(&self, key: &ChapterKey) -> Result<(), FetchError> {
        self.reads.lock().push(key.clone());
        Ok(())
    }
}

/// Each `<p>` is 100px tall and each `<img>` 1000px, regardless of typography.
#[derive(Debug, Clone, Copy, Default)]
pub struct TagHeights;

impl LayoutMeasurementProvider for TagHeights {
    fn measure_height(&self, markup: &str, _: &Typography, _: f32) -> Result<f32, MeasureError> {
        let paragraphs = markup.matches("<p>").count() as f32;
        let images = markup.matches("<img").count() as f32;
        Ok(paragraphs * 100.0 + images * 1000.0)
    }
}

pub fn shared(service: FakeService) -> Arc<FakeService> {
    Arc::new(service)
}
