//! Chapter reading engine: content caching, pagination, reading positions, settings and input
//! handling for a web-novel reader.

#![deny(missing_debug_implementations)]

pub mod cache;
pub mod config;
pub mod error;
pub mod input;
pub mod layout;
pub mod log;
pub mod night;
pub mod session;
pub mod settings;
pub mod stats;
pub mod store;
pub mod types;

pub type Result<T> = std::result::Result<T, anyhow::Error>;

pub use cache::{ContentCache, ContentService};
pub use config::EngineConfig;
pub use error::{FetchError, ImportError, InvalidSetting, MeasureError};
pub use input::{Action, InputEvent, NavContext};
pub use layout::{LayoutMeasurementProvider, PageSet, Paginator, TextMetricsMeasurer};
pub use session::{Effect, ReadingSession, ScrollSurface};
pub use settings::{ReaderSettings, SettingsStore};
pub use store::{FileStorage, MemoryStorage, PositionStore, StorageBackend};
pub use types::{
    ChapterContent, ChapterKey, PageCursor, Position, ScrollExtremes, ScrollMetrics, TextAlign, Typography,
    UiMode, Viewport,
};

/// Returns the version of the engine crate for telemetry and debugging.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
