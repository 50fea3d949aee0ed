//! Dedicated rotation window
//!
//! When both the dedicated-window and custom-list policies are on, the
//! rotation set lives in its own unfocused window so the cycle never
//! fights the user's browsing window. The tracked id is re-probed before
//! every reuse: the user may have closed the window at any time.

use tracing::{debug, info, warn};

use crate::browser::{BrowserHost, CreateTab, HostError, WindowId};
use crate::urlmatch;

use super::settings::{Entry, RotationSettings};

/// Result of an `ensure` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowEnsure {
    pub id: Option<WindowId>,
    pub created: bool,
}

/// Tracks the dedicated window across ticks.
#[derive(Debug, Default)]
pub struct DedicatedWindow {
    id: Option<WindowId>,
}

impl DedicatedWindow {
    pub fn new(id: Option<WindowId>) -> Self {
        Self { id }
    }

    pub fn id(&self) -> Option<WindowId> {
        self.id
    }

    pub fn clear(&mut self) {
        self.id = None;
    }

    /// Re-check that the tracked window still exists. When it is gone the
    /// tracked id is dropped and `false` returned; the caller decides when
    /// to recreate (the tick that discovers the loss does not).
    pub async fn probe(&mut self, host: &dyn BrowserHost) -> bool {
        match self.id {
            None => false,
            Some(id) => match host.window_exists(id).await {
                Ok(true) => true,
                Ok(false) | Err(_) => {
                    debug!(window = %id, "dedicated window gone, dropping tracked id");
                    self.id = None;
                    false
                }
            },
        }
    }

    /// Ensure the dedicated window exists, creating and seeding it when
    /// needed. No-op unless both the dedicated-window and custom-list
    /// policies are active.
    pub async fn ensure(
        &mut self,
        host: &dyn BrowserHost,
        settings: &RotationSettings,
        entries: &[Entry],
    ) -> Result<WindowEnsure, HostError> {
        if !settings.use_dedicated_window || !settings.use_custom_list {
            return Ok(WindowEnsure {
                id: None,
                created: false,
            });
        }

        if self.probe(host).await {
            return Ok(WindowEnsure {
                id: self.id,
                created: false,
            });
        }

        let first_url = entries
            .first()
            .map(|e| urlmatch::normalize(&e.url))
            .unwrap_or_else(|| "about:blank".to_string());

        let id = host.create_window(first_url).await?;
        self.id = Some(id);

        for entry in entries.iter().skip(1) {
            host.create_tab(CreateTab {
                url: urlmatch::normalize(&entry.url),
                window_id: Some(id),
                active: false,
            })
            .await?;
        }

        info!(window = %id, tabs = entries.len(), "dedicated window created");
        Ok(WindowEnsure {
            id: Some(id),
            created: true,
        })
    }

    /// Best-effort removal of the tracked window. The tracked id is
    /// cleared regardless of the outcome.
    pub async fn close(&mut self, host: &dyn BrowserHost) {
        if let Some(id) = self.id.take() {
            if let Err(e) = host.remove_window(id).await {
                warn!(window = %id, error = %e, "dedicated window close failed (already gone?)");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::{SimBrowser, TabScope};
    use crate::rotation::settings::{EntrySpec, StartOptions};

    fn settings(urls: &[&str]) -> RotationSettings {
        StartOptions {
            use_custom_list: Some(true),
            use_dedicated_window: Some(true),
            custom_entries: urls.iter().map(|u| EntrySpec::Url((*u).to_string())).collect(),
            ..Default::default()
        }
        .apply(&RotationSettings::default())
    }

    #[tokio::test]
    async fn test_ensure_noop_without_policies() {
        let sim = SimBrowser::new();
        let mut window = DedicatedWindow::default();
        let settings = RotationSettings::default();

        let result = window.ensure(&sim, &settings, &[]).await.unwrap();
        assert_eq!(result, WindowEnsure { id: None, created: false });
        assert_eq!(sim.window_count().await, 0);
    }

    #[tokio::test]
    async fn test_ensure_creates_and_seeds() {
        let sim = SimBrowser::new();
        let mut window = DedicatedWindow::default();
        let settings = settings(&["a.test", "b.test", "c.test"]);

        let result = window
            .ensure(&sim, &settings, &settings.custom_entries)
            .await
            .unwrap();
        assert!(result.created);
        let id = result.id.unwrap();
        assert_eq!(sim.tab_count(id).await, 3);

        let tabs = sim.query_tabs(TabScope::Window(id)).await.unwrap();
        assert_eq!(tabs[0].url, "https://a.test/");
        assert!(!tabs[1].active);
    }

    #[tokio::test]
    async fn test_ensure_reuses_live_window() {
        let sim = SimBrowser::new();
        let mut window = DedicatedWindow::default();
        let settings = settings(&["a.test"]);

        let first = window
            .ensure(&sim, &settings, &settings.custom_entries)
            .await
            .unwrap();
        let second = window
            .ensure(&sim, &settings, &settings.custom_entries)
            .await
            .unwrap();
        assert!(!second.created);
        assert_eq!(first.id, second.id);
        assert_eq!(sim.window_count().await, 1);
    }

    #[tokio::test]
    async fn test_ensure_recreates_after_external_close() {
        let sim = SimBrowser::new();
        let mut window = DedicatedWindow::default();
        let settings = settings(&["a.test"]);

        let first = window
            .ensure(&sim, &settings, &settings.custom_entries)
            .await
            .unwrap();
        sim.close_window(first.id.unwrap()).await;

        let second = window
            .ensure(&sim, &settings, &settings.custom_entries)
            .await
            .unwrap();
        assert!(second.created);
        assert_ne!(first.id, second.id);
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let sim = SimBrowser::new();
        let mut window = DedicatedWindow::default();
        let settings = settings(&["a.test"]);

        window
            .ensure(&sim, &settings, &settings.custom_entries)
            .await
            .unwrap();
        window.close(&sim).await;
        assert_eq!(window.id(), None);
        // Second close with nothing tracked: harmless.
        window.close(&sim).await;
        assert_eq!(sim.window_count().await, 0);
    }
}
