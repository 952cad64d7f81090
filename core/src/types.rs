//! Shared data structures exchanged between the engine components and the host.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of a chapter: the work, the source it is read from, and its number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChapterKey {
    pub work_id: String,
    pub source_id: String,
    pub chapter_number: u32,
}

impl ChapterKey {
    pub fn new(work_id: impl Into<String>, source_id: impl Into<String>, chapter_number: u32) -> Self {
        Self { work_id: work_id.into(), source_id: source_id.into(), chapter_number }
    }

    /// Key of another chapter of the same work and source.
    pub fn sibling(&self, chapter_number: u32) -> Self {
        Self { work_id: self.work_id.clone(), source_id: self.source_id.clone(), chapter_number }
    }

    /// Storage form, `work|source|chapter`. `%` and `|` inside the ids are percent-escaped.
    pub fn storage_key(&self) -> String {
        format!("{}|{}|{}", escape(&self.work_id), escape(&self.source_id), self.chapter_number)
    }

    /// Parse the storage form produced by [`ChapterKey::storage_key`].
    pub fn parse(value: &str) -> Option<Self> {
        let mut parts = value.split('|');
        let work_id = unescape(parts.next()?);
        let source_id = unescape(parts.next()?);
        let chapter_number = parts.next()?.parse().ok()?;
        if parts.next().is_some() {
            return None;
        }
        Some(Self::new(work_id, source_id, chapter_number))
    }
}

fn escape(id: &str) -> String {
    id.replace('%', "%25").replace('|', "%7C")
}

fn unescape(id: &str) -> String {
    id.replace("%7C", "|").replace("%25", "%")
}

impl fmt::Display for ChapterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}|{}", self.work_id, self.source_id, self.chapter_number)
    }
}

/// A fetched chapter. Immutable once fetched.
#[derive(Debug, Clone, PartialEq)]
pub struct ChapterContent {
    pub key: ChapterKey,
    pub title: String,
    pub body: String,
    pub prev_chapter: Option<u32>,
    pub next_chapter: Option<u32>,
    pub asset_base_path: String,
}

impl ChapterContent {
    pub fn prev_key(&self) -> Option<ChapterKey> {
        self.prev_chapter.map(|number| self.key.sibling(number))
    }

    pub fn next_key(&self) -> Option<ChapterKey> {
        self.next_chapter.map(|number| self.key.sibling(number))
    }

    /// Body with relative `images/` sources pointed at the chapter's asset base path.
    pub fn resolved_body(&self) -> String {
        let base = self.asset_base_path.trim_end_matches('/');
        if base.is_empty() {
            return self.body.clone();
        }
        self.body.replace("src=\"images/", &format!("src=\"{base}/"))
    }
}

/// Dimensions of the reading viewport in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self { width: 800.0, height: 1000.0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TextAlign {
    Left,
    Center,
    #[default]
    Justify,
    Right,
}

/// The subset of reader settings that influences layout.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Typography {
    pub font_size: f32,
    pub font_family: Option<String>,
    pub line_spacing: f32,
    pub margin: f32,
    pub text_align: TextAlign,
}

impl Default for Typography {
    fn default() -> Self {
        Self {
            font_size: 18.0,
            font_family: None,
            line_spacing: 1.6,
            margin: 0.0,
            text_align: TextAlign::Justify,
        }
    }
}

impl Typography {
    /// Stable digest of the typography together with the viewport it is laid out in.
    pub fn signature(&self, viewport: Viewport) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.font_size.to_bits().to_le_bytes());
        hasher.update(self.font_family.as_deref().unwrap_or("").as_bytes());
        hasher.update(&[0]);
        hasher.update(&self.line_spacing.to_bits().to_le_bytes());
        hasher.update(&self.margin.to_bits().to_le_bytes());
        hasher.update(&[self.text_align as u8]);
        hasher.update(&viewport.width.to_bits().to_le_bytes());
        hasher.update(&viewport.height.to_bits().to_le_bytes());
        hasher.finalize().to_hex().to_string()
    }

    /// Width available to content once the horizontal margin (percent per side) is removed.
    pub fn content_width(&self, viewport_width: f32) -> f32 {
        let margin = self.margin.clamp(0.0, 45.0) / 100.0;
        (viewport_width * (1.0 - 2.0 * margin)).max(1.0)
    }
}

/// Saved reading position for one chapter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Position {
    /// Percentage of the scrollable height, 0–100.
    Percent(f64),
    /// Zero-based page index in page mode.
    Page { page: u32 },
}

impl Position {
    pub fn page(index: u32) -> Self {
        Position::Page { page: index }
    }

    pub fn percent(value: f64) -> Self {
        Position::Percent(value)
    }
}

/// Cursor into the page set of the active chapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCursor {
    pub index: usize,
    pub count: usize,
}

impl PageCursor {
    pub fn is_first(&self) -> bool {
        self.index == 0
    }

    pub fn is_last(&self) -> bool {
        self.index + 1 >= self.count
    }
}

/// How the chapter is presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiMode {
    Continuous,
    Paged(PageCursor),
}

/// Scroll geometry of the rendered chapter as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScrollMetrics {
    pub scroll_top: f64,
    pub scroll_height: f64,
    pub client_height: f64,
}

impl ScrollMetrics {
    pub fn scrollable_height(&self) -> f64 {
        (self.scroll_height - self.client_height).max(0.0)
    }

    /// Progress through the chapter as a percentage; 0 when nothing scrolls.
    pub fn percent(&self) -> f64 {
        let scrollable = self.scrollable_height();
        if scrollable <= 0.0 {
            return 0.0;
        }
        (self.scroll_top / scrollable * 100.0).clamp(0.0, 100.0)
    }

    /// Scroll offset corresponding to a saved percentage.
    pub fn offset_for(&self, percent: f64) -> f64 {
        percent.clamp(0.0, 100.0) / 100.0 * self.scrollable_height()
    }

    pub fn extremes(&self) -> ScrollExtremes {
        let scrollable = self.scrollable_height();
        ScrollExtremes {
            at_top: self.scroll_top <= 0.5,
            at_bottom: scrollable <= 0.0 || self.scroll_top >= scrollable - 0.5,
        }
    }
}

/// Whether the continuous view is pinned at either end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScrollExtremes {
    pub at_top: bool,
    pub at_bottom: bool,
}
