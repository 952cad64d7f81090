//! Typed errors surfaced at the engine's public seams.

use thiserror::Error;

use crate::types::ChapterKey;

/// Failure to obtain chapter content from the content service.
///
/// Cloneable so every caller waiting on the same in-flight fetch observes the same outcome.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("chapter {0} not found")]
    NotFound(ChapterKey),
    #[error("network error while fetching chapter: {0}")]
    Network(String),
    #[error("malformed chapter payload: {0}")]
    Decode(String),
    #[error("fetch task for chapter {0} ended without an outcome")]
    Abandoned(ChapterKey),
}

/// Failure reported by a layout measurement provider.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum MeasureError {
    #[error("layout engine unavailable: {0}")]
    Unavailable(String),
    #[error("measured height {0} is not a finite, non-negative number")]
    InvalidHeight(f32),
}

/// A setting value rejected by type or range validation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid value for setting `{field}`: {reason}")]
pub struct InvalidSetting {
    pub field: String,
    pub reason: String,
}

impl InvalidSetting {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self { field: field.into(), reason: reason.into() }
    }
}

/// Failure to import a settings snapshot. The store is never modified when this is returned.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("settings snapshot is not valid JSON")]
    Json(#[from] serde_json::Error),
    #[error("settings snapshot must be a JSON object")]
    Malformed,
    #[error(transparent)]
    InvalidField(#[from] InvalidSetting),
}
