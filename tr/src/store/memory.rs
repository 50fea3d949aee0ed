//! In-memory state store for tests

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{PersistedState, StateStore, StoreError};

/// Keeps the document in memory. Writes can be made to fail to exercise
/// the engine's log-and-continue handling of persistence errors.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    state: Option<PersistedState>,
    fail_writes: bool,
    saves: u64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn with_state(state: PersistedState) -> Self {
        let store = Self::default();
        store.inner.lock().await.state = Some(state);
        store
    }

    pub async fn set_fail_writes(&self, fail: bool) {
        self.inner.lock().await.fail_writes = fail;
    }

    pub async fn current(&self) -> Option<PersistedState> {
        self.inner.lock().await.state.clone()
    }

    pub async fn save_count(&self) -> u64 {
        self.inner.lock().await.saves
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn load(&self) -> Result<Option<PersistedState>, StoreError> {
        Ok(self.inner.lock().await.state.clone())
    }

    async fn save(&self, state: &PersistedState) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        if inner.fail_writes {
            return Err(StoreError::Unavailable("write disabled".to_string()));
        }
        inner.state = Some(state.clone());
        inner.saves += 1;
        Ok(())
    }
}
