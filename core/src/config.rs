//! Engine tunables and platform directory resolution.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::Result;

const APP_QUALIFIER: &str = "com";
const APP_ORGANISATION: &str = "NovelReader";
const APP_NAME: &str = "reader-engine";

/// Timing and sizing knobs shared by the engine components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Fraction of the viewport height a page may fill; the rest is left for controls.
    pub page_height_ratio: f32,
    /// Delay before repaginating after typography or viewport changes.
    pub repaginate_debounce_ms: u64,
    /// Minimum spacing between two position writes.
    pub position_save_throttle_ms: u64,
    /// Bound on the durable position map.
    pub max_stored_positions: usize,
    /// Width of each tap edge as a percentage of the viewport width.
    pub edge_tap_width_percent: f32,
    /// Distance of an edge-tap scroll as a fraction of the viewport height.
    pub scroll_step_ratio: f32,
    /// How many times position restoration waits for layout before giving up.
    pub restore_attempts: u32,
    /// First restoration backoff; doubled after every failed attempt.
    pub restore_backoff_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            page_height_ratio: 0.85,
            repaginate_debounce_ms: 500,
            position_save_throttle_ms: 1_000,
            max_stored_positions: 20,
            edge_tap_width_percent: 15.0,
            scroll_step_ratio: 0.8,
            restore_attempts: 8,
            restore_backoff_ms: 100,
        }
    }
}

impl EngineConfig {
    /// Parse a JSON document; absent keys keep their defaults and unknown keys are ignored.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw).context("parsing engine config")?;
        config.validate()?;
        Ok(config)
    }

    /// Load the config from a JSON file, falling back to defaults when it does not exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(raw) => Self::from_json_str(&raw)
                .with_context(|| format!("loading engine config from {}", path.display())),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(err).with_context(|| format!("reading {}", path.display())),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.1..=1.0).contains(&self.page_height_ratio) {
            return Err(anyhow!("page_height_ratio must lie in 0.1..=1.0, got {}", self.page_height_ratio));
        }
        if !(0.0..50.0).contains(&self.edge_tap_width_percent) {
            return Err(anyhow!(
                "edge_tap_width_percent must lie in 0..50, got {}",
                self.edge_tap_width_percent
            ));
        }
        if self.max_stored_positions == 0 {
            return Err(anyhow!("max_stored_positions must be at least 1"));
        }
        Ok(())
    }

    pub fn repaginate_debounce(&self) -> Duration {
        Duration::from_millis(self.repaginate_debounce_ms)
    }

    pub fn position_save_throttle(&self) -> Duration {
        Duration::from_millis(self.position_save_throttle_ms)
    }

    pub fn restore_backoff(&self) -> Duration {
        Duration::from_millis(self.restore_backoff_ms)
    }

    pub fn with_max_stored_positions(mut self, max: usize) -> Self {
        self.max_stored_positions = max;
        self
    }

    pub fn with_position_save_throttle(mut self, window: Duration) -> Self {
        self.position_save_throttle_ms = window.as_millis() as u64;
        self
    }
}

/// Platform data directory for the engine (settings, positions, logs).
pub fn data_dir() -> Result<PathBuf> {
    ProjectDirs::from(APP_QUALIFIER, APP_ORGANISATION, APP_NAME)
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_else(|| anyhow!("unable to resolve application data directory"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config =
            EngineConfig::from_json_str(r#"{ "max_stored_positions": 5, "unknown": true }"#).unwrap();
        assert_eq!(config.max_stored_positions, 5);
        assert_eq!(config.position_save_throttle_ms, 1_000);
        assert_eq!(config.page_height_ratio, 0.85);
    }

    #[test]
    fn rejects_out_of_range_ratio() {
        let err = EngineConfig::from_json_str(r#"{ "page_height_ratio": 3.0 }"#).unwrap_err();
        assert!(format!("{err:#}").contains("page_height_ratio"));
    }

    #[test]
    fn missing_file_yields_defaults() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let config = EngineConfig::load(temp.path().join("engine.json"))?;
        assert_eq!(config, EngineConfig::default());
        Ok(())
    }
}
