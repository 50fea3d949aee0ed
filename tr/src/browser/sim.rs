//! In-memory browser host
//!
//! Backs the test suite and `tr run --simulate`. Tabs and windows live in a
//! single mutex-guarded table; mutation helpers let tests play the user
//! (navigating, closing windows) between engine ticks.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use super::{BrowserHost, CreateTab, HostError, IconState, TabId, TabInfo, TabScope, WindowId};

#[derive(Debug, Clone)]
struct SimTab {
    id: TabId,
    url: String,
    pending_url: Option<String>,
    active: bool,
}

#[derive(Debug, Default)]
struct SimState {
    /// Window id -> ordered tab list. BTreeMap keeps query order stable.
    windows: BTreeMap<u64, Vec<SimTab>>,
    current_window: Option<u64>,
    next_tab_id: u64,
    next_window_id: u64,
    icon: Option<IconState>,
    badge_text: String,
    badge_color: String,
    reload_counts: BTreeMap<u64, u32>,
    fail_next_query: bool,
}

/// In-memory [`BrowserHost`] implementation.
#[derive(Clone, Default)]
pub struct SimBrowser {
    state: Arc<Mutex<SimState>>,
}

impl SimBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a window populated with one tab per URL; the first tab is
    /// active. Becomes the current window.
    pub async fn open_window(&self, urls: &[&str]) -> WindowId {
        let mut state = self.state.lock().await;
        let win = state.next_window_id;
        state.next_window_id += 1;
        let mut tabs = Vec::with_capacity(urls.len());
        for (i, url) in urls.iter().enumerate() {
            let id = state.next_tab_id;
            state.next_tab_id += 1;
            tabs.push(SimTab {
                id: TabId(id),
                url: (*url).to_string(),
                pending_url: None,
                active: i == 0,
            });
        }
        state.windows.insert(win, tabs);
        state.current_window = Some(win);
        WindowId(win)
    }

    /// Simulate the user (or a redirect) navigating a tab.
    pub async fn navigate(&self, tab: TabId, url: &str) {
        let mut state = self.state.lock().await;
        for tabs in state.windows.values_mut() {
            if let Some(t) = tabs.iter_mut().find(|t| t.id == tab) {
                t.url = url.to_string();
                t.pending_url = None;
            }
        }
    }

    /// Mark a navigation as in flight without settling it.
    pub async fn begin_navigation(&self, tab: TabId, url: &str) {
        let mut state = self.state.lock().await;
        for tabs in state.windows.values_mut() {
            if let Some(t) = tabs.iter_mut().find(|t| t.id == tab) {
                t.pending_url = Some(url.to_string());
            }
        }
    }

    /// Simulate the user closing a tab.
    pub async fn close_tab(&self, tab: TabId) {
        let mut state = self.state.lock().await;
        for tabs in state.windows.values_mut() {
            tabs.retain(|t| t.id != tab);
        }
        state.windows.retain(|_, tabs| !tabs.is_empty());
    }

    /// Simulate the user closing a whole window.
    pub async fn close_window(&self, win: WindowId) {
        let mut state = self.state.lock().await;
        state.windows.remove(&win.0);
        if state.current_window == Some(win.0) {
            state.current_window = state.windows.keys().next().copied();
        }
    }

    /// Make the next `query_tabs` fail once, to exercise transient-error
    /// handling in the tick path.
    pub async fn fail_next_query(&self) {
        self.state.lock().await.fail_next_query = true;
    }

    pub async fn active_tab(&self, win: WindowId) -> Option<TabId> {
        let state = self.state.lock().await;
        state
            .windows
            .get(&win.0)
            .and_then(|tabs| tabs.iter().find(|t| t.active))
            .map(|t| t.id)
    }

    pub async fn icon_state(&self) -> Option<IconState> {
        self.state.lock().await.icon
    }

    pub async fn badge_text(&self) -> String {
        self.state.lock().await.badge_text.clone()
    }

    pub async fn badge_color(&self) -> String {
        self.state.lock().await.badge_color.clone()
    }

    pub async fn reload_count(&self, tab: TabId) -> u32 {
        self.state
            .lock()
            .await
            .reload_counts
            .get(&tab.0)
            .copied()
            .unwrap_or(0)
    }

    pub async fn window_count(&self) -> usize {
        self.state.lock().await.windows.len()
    }

    pub async fn tab_count(&self, win: WindowId) -> usize {
        self.state
            .lock()
            .await
            .windows
            .get(&win.0)
            .map(|t| t.len())
            .unwrap_or(0)
    }
}

fn snapshot(win: u64, tab: &SimTab) -> TabInfo {
    TabInfo {
        id: tab.id,
        window_id: WindowId(win),
        url: tab.url.clone(),
        pending_url: tab.pending_url.clone(),
        active: tab.active,
    }
}

#[async_trait]
impl BrowserHost for SimBrowser {
    async fn query_tabs(&self, scope: TabScope) -> Result<Vec<TabInfo>, HostError> {
        let mut state = self.state.lock().await;
        if state.fail_next_query {
            state.fail_next_query = false;
            return Err(HostError::Unavailable("injected query failure".to_string()));
        }
        let out = match scope {
            TabScope::All => state
                .windows
                .iter()
                .flat_map(|(win, tabs)| tabs.iter().map(|t| snapshot(*win, t)))
                .collect(),
            TabScope::Window(id) => match state.windows.get(&id.0) {
                Some(tabs) => tabs.iter().map(|t| snapshot(id.0, t)).collect(),
                None => Vec::new(),
            },
            TabScope::CurrentWindow => match state.current_window.and_then(|w| {
                let tabs = state.windows.get(&w)?;
                Some((w, tabs))
            }) {
                Some((win, tabs)) => tabs.iter().map(|t| snapshot(win, t)).collect(),
                None => Vec::new(),
            },
        };
        Ok(out)
    }

    async fn create_tab(&self, opts: CreateTab) -> Result<TabInfo, HostError> {
        let mut state = self.state.lock().await;
        let win = match opts.window_id {
            Some(id) => {
                if !state.windows.contains_key(&id.0) {
                    return Err(HostError::NoSuchWindow(id));
                }
                id.0
            }
            None => match state.current_window {
                Some(w) => w,
                None => {
                    // No window open at all: create one, as a browser would.
                    let w = state.next_window_id;
                    state.next_window_id += 1;
                    state.windows.insert(w, Vec::new());
                    state.current_window = Some(w);
                    w
                }
            },
        };
        let id = state.next_tab_id;
        state.next_tab_id += 1;
        let tab = SimTab {
            id: TabId(id),
            url: opts.url,
            pending_url: None,
            active: opts.active,
        };
        let info = snapshot(win, &tab);
        let tabs = state.windows.entry(win).or_default();
        if opts.active {
            for t in tabs.iter_mut() {
                t.active = false;
            }
        }
        tabs.push(tab);
        debug!(tab = %info.id, window = %info.window_id, url = %info.url, "sim: tab created");
        Ok(info)
    }

    async fn activate_tab(&self, id: TabId) -> Result<(), HostError> {
        let mut state = self.state.lock().await;
        for tabs in state.windows.values_mut() {
            if tabs.iter().any(|t| t.id == id) {
                for t in tabs.iter_mut() {
                    t.active = t.id == id;
                }
                return Ok(());
            }
        }
        Err(HostError::NoSuchTab(id))
    }

    async fn reload_tab(&self, id: TabId) -> Result<(), HostError> {
        let mut state = self.state.lock().await;
        let exists = state
            .windows
            .values()
            .any(|tabs| tabs.iter().any(|t| t.id == id));
        if !exists {
            return Err(HostError::NoSuchTab(id));
        }
        *state.reload_counts.entry(id.0).or_insert(0) += 1;
        Ok(())
    }

    async fn create_window(&self, url: String) -> Result<WindowId, HostError> {
        let mut state = self.state.lock().await;
        let win = state.next_window_id;
        state.next_window_id += 1;
        let id = state.next_tab_id;
        state.next_tab_id += 1;
        state.windows.insert(
            win,
            vec![SimTab {
                id: TabId(id),
                url,
                pending_url: None,
                active: true,
            }],
        );
        // Unfocused: the current window does not change.
        debug!(window = win, "sim: window created");
        Ok(WindowId(win))
    }

    async fn window_exists(&self, id: WindowId) -> Result<bool, HostError> {
        Ok(self.state.lock().await.windows.contains_key(&id.0))
    }

    async fn remove_window(&self, id: WindowId) -> Result<(), HostError> {
        let mut state = self.state.lock().await;
        if state.windows.remove(&id.0).is_none() {
            return Err(HostError::NoSuchWindow(id));
        }
        if state.current_window == Some(id.0) {
            state.current_window = state.windows.keys().next().copied();
        }
        Ok(())
    }

    async fn set_icon(&self, icon: IconState) {
        self.state.lock().await.icon = Some(icon);
    }

    async fn set_badge_text(&self, text: String) {
        self.state.lock().await.badge_text = text;
    }

    async fn set_badge_color(&self, color: String) {
        self.state.lock().await.badge_color = color;
    }
}
