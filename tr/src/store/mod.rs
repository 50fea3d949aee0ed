//! Durable state bridge
//!
//! The engine reads one document at boot and writes it back after every
//! state transition. Alongside the flat payload a versioned, timestamped
//! backup of the configuration is kept; restore uses it as the entry-list
//! source of last resort.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::browser::WindowId;
use crate::rotation::settings::RotationSettings;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt state document: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Timestamped copy of the configuration under a versioned key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigBackup {
    pub version: String,
    pub saved_at: DateTime<Utc>,
    pub settings: RotationSettings,
}

/// The full durable document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct PersistedState {
    #[serde(flatten)]
    pub settings: RotationSettings,
    pub is_running: bool,
    pub ensured_window_id: Option<WindowId>,
    /// Legacy key for the dedicated-window id; read, never written.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_window_id: Option<WindowId>,
    /// Legacy plain-URL entry list; read, never written.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub custom_urls: Vec<String>,
    pub config_backup: Option<ConfigBackup>,
}

impl PersistedState {
    /// Build the document written after a transition.
    pub fn snapshot(
        settings: &RotationSettings,
        is_running: bool,
        ensured_window_id: Option<WindowId>,
    ) -> Self {
        Self {
            settings: settings.clone(),
            is_running,
            ensured_window_id,
            target_window_id: None,
            custom_urls: Vec::new(),
            config_backup: Some(ConfigBackup {
                version: env!("CARGO_PKG_VERSION").to_string(),
                saved_at: Utc::now(),
                settings: settings.clone(),
            }),
        }
    }

    /// Dedicated-window id with the legacy-key fallback.
    pub fn window_id(&self) -> Option<WindowId> {
        self.ensured_window_id.or(self.target_window_id)
    }
}

/// Durable key/value bridge the engine persists through.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Read the document; `None` when nothing was ever persisted.
    async fn load(&self) -> Result<Option<PersistedState>, StoreError>;

    /// Replace the document.
    async fn save(&self, state: &PersistedState) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_carries_backup() {
        let settings = RotationSettings {
            interval_sec: 7.0,
            ..Default::default()
        };
        let state = PersistedState::snapshot(&settings, true, Some(WindowId(4)));

        assert!(state.is_running);
        assert_eq!(state.ensured_window_id, Some(WindowId(4)));
        let backup = state.config_backup.unwrap();
        assert_eq!(backup.version, env!("CARGO_PKG_VERSION"));
        assert_eq!(backup.settings.interval_sec, 7.0);
    }

    #[test]
    fn test_window_id_legacy_fallback() {
        let state = PersistedState {
            target_window_id: Some(WindowId(9)),
            ..Default::default()
        };
        assert_eq!(state.window_id(), Some(WindowId(9)));

        let state = PersistedState {
            ensured_window_id: Some(WindowId(1)),
            target_window_id: Some(WindowId(9)),
            ..Default::default()
        };
        assert_eq!(state.window_id(), Some(WindowId(1)));
    }

    #[test]
    fn test_persisted_state_json_shape() {
        let state = PersistedState::snapshot(&RotationSettings::default(), false, None);
        let json = serde_json::to_value(&state).unwrap();

        // Settings are flattened next to the flags, as stored.
        assert_eq!(json["intervalSec"], 5.0);
        assert_eq!(json["isRunning"], false);
        assert!(json["configBackup"]["savedAt"].is_string());
        // Legacy read-only keys never appear in writes.
        assert!(json.get("targetWindowId").is_none());
        assert!(json.get("customUrls").is_none());
    }

    #[test]
    fn test_legacy_keys_still_parse() {
        let json = r#"{
            "intervalSec": 3,
            "isRunning": true,
            "targetWindowId": 12,
            "customUrls": ["a.test", "b.test"]
        }"#;
        let state: PersistedState = serde_json::from_str(json).unwrap();
        assert!(state.is_running);
        assert_eq!(state.settings.interval_sec, 3.0);
        assert_eq!(state.window_id(), Some(WindowId(12)));
        assert_eq!(state.custom_urls.len(), 2);
    }
}
