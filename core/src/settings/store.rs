//! Field-by-field persistence, export and import of [`ReaderSettings`].

use std::fmt;
use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::error::{ImportError, InvalidSetting};
use crate::store::StorageBackend;

use super::{FIELD_NAMES, ReaderSettings};

/// Format version written into exported snapshots.
pub const SETTINGS_VERSION: &str = "1.0";

const STORAGE_PREFIX: &str = "reader.";

/// Exported settings: every field plus export metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsSnapshot {
    #[serde(flatten)]
    pub settings: ReaderSettings,
    pub export_date: String,
    pub version: String,
}

/// Owns the current settings and writes every change through to the backend.
pub struct SettingsStore {
    backend: Arc<dyn StorageBackend>,
    current: ReaderSettings,
}

impl fmt::Debug for SettingsStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SettingsStore").field("current", &self.current).finish_non_exhaustive()
    }
}

impl SettingsStore {
    /// Load every field independently. A missing field keeps its default; a corrupt one is
    /// logged and keeps its default without affecting the others.
    pub fn open(backend: Arc<dyn StorageBackend>) -> Self {
        let mut current = ReaderSettings::default();
        for &field in FIELD_NAMES {
            let raw = match backend.get(&storage_key(field)) {
                Ok(Some(raw)) => raw,
                Ok(None) => continue,
                Err(err) => {
                    warn!(field, error = %err, "failed to read setting; using default");
                    continue;
                }
            };
            let loaded = serde_json::from_str::<Value>(&raw)
                .map_err(|err| InvalidSetting::new(field, err.to_string()))
                .and_then(|value| with_field(&current, field, value));
            match loaded {
                Ok(settings) => current = settings,
                Err(err) => warn!(field, error = %err, "stored setting is invalid; using default"),
            }
        }
        debug!("reader settings loaded");
        Self { backend, current }
    }

    pub fn get(&self) -> &ReaderSettings {
        &self.current
    }

    /// Apply `change` and persist the fields whose value changed. Returns their names.
    ///
    /// Invalid results are rejected as a whole and leave the store untouched.
    pub fn update(&mut self, change: impl FnOnce(&mut ReaderSettings)) -> Result<Vec<&'static str>, InvalidSetting> {
        let mut next = self.current.clone();
        change(&mut next);
        next.validate()?;
        Ok(self.commit(next))
    }

    /// Restore and persist every default.
    pub fn reset(&mut self) {
        let changed = self.commit(ReaderSettings::default());
        info!(changed = changed.len(), "reader settings reset to defaults");
    }

    pub fn export_all(&self) -> SettingsSnapshot {
        SettingsSnapshot {
            settings: self.current.clone(),
            export_date: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            version: SETTINGS_VERSION.to_string(),
        }
    }

    pub fn export_json(&self) -> Result<String, ImportError> {
        Ok(serde_json::to_string_pretty(&self.export_all())?)
    }

    /// Merge a previously exported snapshot onto the current settings.
    ///
    /// Unknown fields and export metadata are ignored. Every known field is validated before
    /// anything is written; one invalid field rejects the whole import.
    pub fn import_all(&mut self, payload: &Value) -> Result<Vec<&'static str>, ImportError> {
        let object = payload.as_object().ok_or(ImportError::Malformed)?;
        let mut next = self.current.clone();
        for (name, value) in object {
            if !ReaderSettings::is_known_field(name) {
                if name != "exportDate" && name != "version" {
                    debug!(field = %name, "ignoring unknown setting in import");
                }
                continue;
            }
            next = with_field(&next, name, value.clone())?;
        }
        let changed = self.commit(next);
        info!(changed = changed.len(), "reader settings imported");
        Ok(changed)
    }

    pub fn import_json(&mut self, raw: &str) -> Result<Vec<&'static str>, ImportError> {
        let payload: Value = serde_json::from_str(raw)?;
        self.import_all(&payload)
    }

    fn commit(&mut self, next: ReaderSettings) -> Vec<&'static str> {
        let before = to_map(&self.current);
        let after = to_map(&next);
        let changed: Vec<&'static str> =
            FIELD_NAMES.iter().copied().filter(|field| before.get(*field) != after.get(*field)).collect();

        for field in &changed {
            let Some(value) = after.get(*field) else { continue };
            if let Err(err) = self.backend.set(&storage_key(field), &value.to_string()) {
                warn!(field, error = %err, "failed to persist setting");
            }
        }
        self.current = next;
        changed
    }
}

fn storage_key(field: &str) -> String {
    format!("{STORAGE_PREFIX}{field}")
}

fn to_map(settings: &ReaderSettings) -> Map<String, Value> {
    match serde_json::to_value(settings) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    }
}

/// `base` with one field replaced by `value`, type- and range-checked.
fn with_field(base: &ReaderSettings, field: &str, value: Value) -> Result<ReaderSettings, InvalidSetting> {
    let mut map = to_map(base);
    map.insert(field.to_string(), value);
    let settings: ReaderSettings =
        serde_json::from_value(Value::Object(map)).map_err(|err| InvalidSetting::new(field, err.to_string()))?;
    settings.validate()?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::EdgeTapBehavior;
    use crate::store::MemoryStorage;
    use serde_json::json;

    fn open(backend: &Arc<MemoryStorage>) -> SettingsStore {
        SettingsStore::open(Arc::clone(backend) as Arc<dyn StorageBackend>)
    }

    #[test]
    fn fresh_store_has_defaults() {
        let store = open(&Arc::new(MemoryStorage::new()));
        assert_eq!(store.get(), &ReaderSettings::default());
    }

    #[test]
    fn update_persists_only_changed_fields() {
        let backend = Arc::new(MemoryStorage::new());
        let mut store = open(&backend);

        let changed = store
            .update(|settings| {
                settings.font_size = 22.0;
                settings.page_mode = true;
                settings.show_pages = true;
            })
            .unwrap();

        assert_eq!(changed, vec!["fontSize", "pageMode"]);
        assert_eq!(backend.keys(), vec!["reader.fontSize", "reader.pageMode"]);
        assert_eq!(backend.get("reader.pageMode").unwrap().as_deref(), Some("true"));

        let reopened = open(&backend);
        assert_eq!(reopened.get().font_size, 22.0);
        assert!(reopened.get().page_mode);
    }

    #[test]
    fn invalid_update_is_rejected() {
        let backend = Arc::new(MemoryStorage::new());
        let mut store = open(&backend);
        let err = store.update(|settings| settings.dim_level = 95).unwrap_err();
        assert_eq!(err.field, "dimLevel");
        assert_eq!(store.get().dim_level, 0);
        assert!(backend.is_empty());
    }

    #[test]
    fn corrupt_field_falls_back_alone() {
        let backend = Arc::new(MemoryStorage::new());
        backend.set("reader.fontSize", "\"huge\"").unwrap();
        backend.set("reader.lineSpacing", "{broken").unwrap();
        backend.set("reader.leftEdgeTapBehavior", "\"chapter\"").unwrap();

        let store = open(&backend);
        assert_eq!(store.get().font_size, 18.0);
        assert_eq!(store.get().line_spacing, 1.6);
        assert_eq!(store.get().left_edge_tap_behavior, EdgeTapBehavior::Chapter);
    }

    #[test]
    fn export_carries_metadata() {
        let store = open(&Arc::new(MemoryStorage::new()));
        let exported: Value = serde_json::from_str(&store.export_json().unwrap()).unwrap();
        assert_eq!(exported["version"], "1.0");
        assert_eq!(exported["fontSize"], 18.0);
        assert!(exported["exportDate"].as_str().unwrap().ends_with('Z'));
    }

    #[test]
    fn import_merges_known_fields_onto_current_values() {
        let backend = Arc::new(MemoryStorage::new());
        let mut store = open(&backend);
        store.update(|settings| settings.page_mode = true).unwrap();

        let changed = store.import_all(&json!({ "unknownField": 1, "fontSize": 24, "version": "1.0" })).unwrap();

        assert_eq!(changed, vec!["fontSize"]);
        assert_eq!(store.get().font_size, 24.0);
        assert!(store.get().page_mode);
        assert_eq!(backend.get("unknownField").unwrap(), None);
        assert_eq!(backend.get("reader.unknownField").unwrap(), None);
    }

    #[test]
    fn invalid_import_changes_nothing() {
        let backend = Arc::new(MemoryStorage::new());
        let mut store = open(&backend);

        let err = store.import_all(&json!({ "fontSize": 20, "nightModeStartTime": "late" })).unwrap_err();
        assert!(matches!(err, ImportError::InvalidField(ref invalid) if invalid.field == "nightModeStartTime"));
        assert_eq!(store.get(), &ReaderSettings::default());
        assert!(backend.is_empty());

        assert!(matches!(store.import_all(&json!([1, 2])), Err(ImportError::Malformed)));
        assert!(matches!(store.import_json("not json"), Err(ImportError::Json(_))));
    }

    #[test]
    fn export_then_import_restores_settings() {
        let mut source = open(&Arc::new(MemoryStorage::new()));
        source.update(|settings| settings.night_mode_start_time = "21:30".into()).unwrap();
        let exported = source.export_json().unwrap();

        let mut target = open(&Arc::new(MemoryStorage::new()));
        target.import_json(&exported).unwrap();
        assert_eq!(target.get(), source.get());
    }

    #[test]
    fn reset_restores_defaults() {
        let backend = Arc::new(MemoryStorage::new());
        let mut store = open(&backend);
        store.update(|settings| settings.font_size = 30.0).unwrap();
        store.reset();
        assert_eq!(store.get(), &ReaderSettings::default());
        assert_eq!(open(&backend).get(), &ReaderSettings::default());
    }
}
