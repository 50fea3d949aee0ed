//! Browser capability surface
//!
//! The engine never talks to a real browser directly; it depends on the
//! narrow [`BrowserHost`] trait so hosts can be swapped (an extension
//! bridge in production, [`SimBrowser`] in tests and simulation mode).

mod sim;

pub use sim::SimBrowser;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Opaque tab identifier assigned by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TabId(pub u64);

impl std::fmt::Display for TabId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "tab:{}", self.0)
    }
}

/// Opaque window identifier assigned by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WindowId(pub u64);

impl std::fmt::Display for WindowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "win:{}", self.0)
    }
}

/// Snapshot of one live tab as reported by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabInfo {
    pub id: TabId,
    pub window_id: WindowId,
    /// Settled address of the page.
    pub url: String,
    /// In-flight navigation target, when the tab is mid-load.
    pub pending_url: Option<String>,
    pub active: bool,
}

impl TabInfo {
    /// Address to match against: an in-flight navigation wins over the
    /// settled one, so a tab caught mid-redirect still binds to its entry.
    pub fn match_url(&self) -> &str {
        self.pending_url.as_deref().unwrap_or(&self.url)
    }
}

/// Scope for a tab query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TabScope {
    /// Every tab in every window.
    #[default]
    All,
    /// Tabs of one specific window.
    Window(WindowId),
    /// Tabs of whichever window currently has focus.
    CurrentWindow,
}

/// Options for creating a tab.
#[derive(Debug, Clone)]
pub struct CreateTab {
    pub url: String,
    /// Window to create in; `None` means the host's current window.
    pub window_id: Option<WindowId>,
    pub active: bool,
}

/// The two fixed visual states of the toolbar icon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IconState {
    Active,
    Inactive,
}

/// Host-side failures. All of these are transient from the engine's point
/// of view: a tab or window can vanish between any two awaits.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("no such tab: {0}")]
    NoSuchTab(TabId),

    #[error("no such window: {0}")]
    NoSuchWindow(WindowId),

    #[error("host unavailable: {0}")]
    Unavailable(String),
}

/// Capability interface to the browser.
///
/// Each method is one awaitable host round-trip; external state may change
/// between calls, so callers re-validate rather than caching results.
#[async_trait]
pub trait BrowserHost: Send + Sync {
    /// List live tabs within the given scope.
    async fn query_tabs(&self, scope: TabScope) -> Result<Vec<TabInfo>, HostError>;

    /// Open a new tab.
    async fn create_tab(&self, opts: CreateTab) -> Result<TabInfo, HostError>;

    /// Make the given tab the active one in its window.
    async fn activate_tab(&self, id: TabId) -> Result<(), HostError>;

    /// Reload the given tab.
    async fn reload_tab(&self, id: TabId) -> Result<(), HostError>;

    /// Create a new unfocused normal window seeded with one tab.
    async fn create_window(&self, url: String) -> Result<WindowId, HostError>;

    /// Probe whether a window still exists.
    async fn window_exists(&self, id: WindowId) -> Result<bool, HostError>;

    /// Remove a window and all its tabs.
    async fn remove_window(&self, id: WindowId) -> Result<(), HostError>;

    /// Switch the toolbar icon between its two fixed states.
    async fn set_icon(&self, state: IconState);

    /// Set the short badge text; empty clears it.
    async fn set_badge_text(&self, text: String);

    /// Set the badge background color (CSS hex string).
    async fn set_badge_color(&self, color: String);
}
