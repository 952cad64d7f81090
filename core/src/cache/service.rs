//! Interface of the remote content service the engine reads from.

use async_trait::async_trait;

use crate::types::{ChapterContent, ChapterKey};

use super::Result;

/// Remote source of chapter bodies and sink for read-progress reports.
#[async_trait]
pub trait ContentService: Send + Sync {
    /// Fetch one chapter. Implementations map transport failures onto [`crate::FetchError`].
    async fn fetch_chapter(&self, key: &ChapterKey) -> Result<ChapterContent>;

    /// Tell the service the chapter has been read. Best-effort: callers only log failures.
    async fn report_chapter_read(&self, key: &ChapterKey) -> Result<()>;
}
