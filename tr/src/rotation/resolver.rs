//! Candidate resolution
//!
//! Maps the declarative entry list onto whatever tabs actually exist right
//! now. Resolution claims each bound tab id so no two entries share a tab,
//! and silently drops entries it cannot bind; the engine treats the result
//! as advisory and re-derives it every tick.

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use crate::browser::{BrowserHost, CreateTab, TabId, TabInfo, TabScope, WindowId};
use crate::urlmatch;

use super::settings::Entry;

/// A resolved entry-to-tab binding, held across ticks.
#[derive(Debug, Clone, PartialEq)]
pub struct RotationTarget {
    pub tab_id: TabId,
    pub refresh: bool,
    pub interval_sec: Option<f64>,
    pub refresh_delay_sec: f64,
    pub name: String,
}

/// A live tab eligible to become "next" on this tick.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub tab: TabInfo,
    pub refresh: bool,
    pub interval_sec: Option<f64>,
    pub refresh_delay_sec: f64,
    pub name: String,
}

/// Bind each entry to a live tab, opening missing tabs when allowed.
///
/// Tabs are claimed first-come: a tab bound to one entry is invisible to
/// later entries. Entries that cannot be bound are dropped for this cycle.
/// A failed tab query is fatal to the call; a failed tab creation is not.
pub async fn resolve_targets(
    host: &dyn BrowserHost,
    entries: &[Entry],
    window: Option<WindowId>,
    open_missing: bool,
) -> Result<Vec<RotationTarget>, crate::browser::HostError> {
    debug!(
        entries = entries.len(),
        ?window,
        open_missing,
        "resolve_targets: called"
    );
    if entries.is_empty() {
        return Ok(Vec::new());
    }

    let scope = match window {
        Some(id) => TabScope::Window(id),
        None => TabScope::All,
    };
    let existing = host.query_tabs(scope).await?;

    let mut targets = Vec::new();
    let mut claimed: HashSet<TabId> = HashSet::new();

    for entry in entries {
        let normalized_url = urlmatch::normalize(&entry.url);

        let mut found = existing
            .iter()
            .find(|t| !claimed.contains(&t.id) && urlmatch::matches(t.match_url(), &normalized_url))
            .cloned();

        if found.is_none() && open_missing {
            match host
                .create_tab(CreateTab {
                    url: normalized_url.clone(),
                    window_id: window,
                    active: false,
                })
                .await
            {
                Ok(tab) => found = Some(tab),
                Err(e) => {
                    warn!(url = %entry.url, error = %e, "resolve_targets: could not open missing tab");
                }
            }
        }

        match found {
            Some(tab) if !claimed.contains(&tab.id) => {
                claimed.insert(tab.id);
                targets.push(RotationTarget {
                    tab_id: tab.id,
                    refresh: entry.refresh,
                    interval_sec: entry.interval_sec,
                    refresh_delay_sec: entry.refresh_delay_sec,
                    name: entry.name.clone(),
                });
            }
            _ => {
                debug!(url = %entry.url, "resolve_targets: entry not bound this cycle");
            }
        }
    }

    debug!(bound = targets.len(), "resolve_targets: done");
    Ok(targets)
}

/// Build this tick's rotation pool from the entry list.
///
/// Walks entries in declared order against the live tabs, skipping
/// excluded hosts and already-claimed tabs. If fewer than 2 candidates
/// result, the previously resolved targets are re-tried (same filters) as
/// a second attempt before the engine falls back further.
pub fn build_candidates(
    entries: &[Entry],
    tabs: &[TabInfo],
    excluded: &[String],
    prior_targets: &[RotationTarget],
) -> Vec<Candidate> {
    if entries.is_empty() {
        return Vec::new();
    }

    let mut claimed: HashSet<TabId> = HashSet::new();
    let mut candidates = Vec::new();

    for entry in entries {
        let target_url = urlmatch::normalize(&entry.url);
        let found = tabs.iter().find(|t| {
            !claimed.contains(&t.id)
                && !urlmatch::is_excluded(t.match_url(), excluded)
                && urlmatch::matches(t.match_url(), &target_url)
        });
        if let Some(tab) = found {
            claimed.insert(tab.id);
            candidates.push(Candidate {
                tab: tab.clone(),
                refresh: entry.refresh,
                interval_sec: entry.interval_sec,
                refresh_delay_sec: entry.refresh_delay_sec,
                name: entry.name.clone(),
            });
        }
    }

    if candidates.len() < 2 && !prior_targets.is_empty() {
        let by_id: HashMap<TabId, &TabInfo> = tabs.iter().map(|t| (t.id, t)).collect();
        for rt in prior_targets {
            if let Some(tab) = by_id.get(&rt.tab_id) {
                if !claimed.contains(&tab.id) && !urlmatch::is_excluded(tab.match_url(), excluded) {
                    claimed.insert(tab.id);
                    candidates.push(Candidate {
                        tab: (*tab).clone(),
                        refresh: rt.refresh,
                        interval_sec: rt.interval_sec,
                        refresh_delay_sec: rt.refresh_delay_sec,
                        name: rt.name.clone(),
                    });
                }
            }
        }
    }

    candidates
}

/// Find the entry a live tab originates from, in declared order.
pub fn find_entry_for_tab<'a>(entries: &'a [Entry], tab_url: &str) -> Option<&'a Entry> {
    entries
        .iter()
        .find(|entry| urlmatch::matches(tab_url, &urlmatch::normalize(&entry.url)))
}
