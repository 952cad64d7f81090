//! Chapter content fetching and session-lifetime caching.

pub mod content;
pub mod service;

pub use content::ContentCache;
pub use service::ContentService;

pub type Result<T> = std::result::Result<T, crate::error::FetchError>;
