//! JSON-file state store

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::debug;

use super::{PersistedState, StateStore, StoreError};

/// Stores the state document as pretty-printed JSON at a fixed path.
/// Writes go through a sibling temp file and a rename so a crash mid-write
/// never leaves a half-written document.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl StateStore for FileStore {
    async fn load(&self) -> Result<Option<PersistedState>, StoreError> {
        match fs::read_to_string(&self.path).await {
            Ok(content) => {
                let state = serde_json::from_str(&content)?;
                debug!(path = %self.path.display(), "state document loaded");
                Ok(Some(state))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, state: &PersistedState) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(state)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, &content).await?;
        fs::rename(&tmp, &self.path).await?;
        debug!(path = %self.path.display(), running = state.is_running, "state document saved");
        Ok(())
    }
}
