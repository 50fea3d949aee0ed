//! Rotation configuration types and normalization
//!
//! `StartOptions` is the partial payload a START command carries; applying
//! it over the current `RotationSettings` yields the next full
//! configuration. Normalization here is what makes the engine's invariants
//! hold: intervals are clamped, empty entries dropped, and custom-list-only
//! options forced off when custom-list mode itself is off.

use serde::{Deserialize, Serialize};

use crate::urlmatch;

/// Default base interval, seconds.
pub const DEFAULT_INTERVAL_SEC: f64 = 5.0;

/// One page to rotate through, with optional per-entry overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub url: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub refresh: bool,
    /// Per-entry interval override, seconds. `None` uses the base interval.
    #[serde(default)]
    pub interval_sec: Option<f64>,
    /// Wait before reloading after activation, seconds.
    #[serde(default)]
    pub refresh_delay_sec: f64,
}

/// Wire form of an entry: a bare URL string or a detailed object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntrySpec {
    Url(String),
    Detailed {
        #[serde(default)]
        url: String,
        #[serde(default)]
        name: String,
        #[serde(default)]
        refresh: bool,
        #[serde(default, rename = "intervalSec")]
        interval_sec: Option<f64>,
        #[serde(default, rename = "refreshDelaySec")]
        refresh_delay_sec: Option<f64>,
    },
}

impl From<Entry> for EntrySpec {
    fn from(e: Entry) -> Self {
        EntrySpec::Detailed {
            url: e.url,
            name: e.name,
            refresh: e.refresh,
            interval_sec: e.interval_sec,
            refresh_delay_sec: Some(e.refresh_delay_sec),
        }
    }
}

/// Normalize wire entries: trim, drop empty URLs, discard out-of-range
/// overrides.
pub fn normalize_entries(specs: &[EntrySpec]) -> Vec<Entry> {
    specs
        .iter()
        .map(|spec| match spec {
            EntrySpec::Url(url) => Entry {
                url: url.trim().to_string(),
                name: String::new(),
                refresh: false,
                interval_sec: None,
                refresh_delay_sec: 0.0,
            },
            EntrySpec::Detailed {
                url,
                name,
                refresh,
                interval_sec,
                refresh_delay_sec,
            } => Entry {
                url: url.trim().to_string(),
                name: name.trim().to_string(),
                refresh: *refresh,
                interval_sec: interval_sec.filter(|v| v.is_finite() && *v >= 1.0),
                refresh_delay_sec: refresh_delay_sec
                    .filter(|v| v.is_finite() && *v >= 0.0)
                    .unwrap_or(0.0),
            },
        })
        .filter(|entry| !entry.url.is_empty())
        .collect()
}

/// The full rotation policy. Replaced wholesale on every start; read-only
/// while a cycle runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RotationSettings {
    pub interval_sec: f64,
    pub auto_start: bool,
    pub use_custom_list: bool,
    pub custom_entries: Vec<Entry>,
    pub open_custom_tabs: bool,
    pub enable_refresh_flags: bool,
    pub custom_raw_text: String,
    pub use_dedicated_window: bool,
    pub shuffle: bool,
    /// Comma-separated domain list; parsed on use.
    pub exclude_domains: String,
    pub badge_countdown: bool,
    pub allow_rotation_while_surface_open: bool,
}

impl Default for RotationSettings {
    fn default() -> Self {
        Self {
            interval_sec: DEFAULT_INTERVAL_SEC,
            auto_start: false,
            use_custom_list: false,
            custom_entries: Vec::new(),
            open_custom_tabs: true,
            enable_refresh_flags: false,
            custom_raw_text: String::new(),
            use_dedicated_window: false,
            shuffle: false,
            exclude_domains: String::new(),
            badge_countdown: true,
            allow_rotation_while_surface_open: false,
        }
    }
}

impl RotationSettings {
    pub fn excluded_domains(&self) -> Vec<String> {
        urlmatch::parse_excluded_domains(&self.exclude_domains)
    }
}

/// Partial configuration carried by a START command (or a boot restore).
/// Absent fields keep their current values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StartOptions {
    pub interval_sec: Option<f64>,
    pub use_custom_list: Option<bool>,
    pub custom_entries: Vec<EntrySpec>,
    /// Legacy plain-URL list; used only when `custom_entries` is empty.
    pub custom_urls: Vec<String>,
    pub open_custom_tabs: Option<bool>,
    pub auto_start: Option<bool>,
    pub enable_refresh_flags: Option<bool>,
    pub custom_raw_text: Option<String>,
    pub use_dedicated_window: Option<bool>,
    pub shuffle: Option<bool>,
    pub exclude_domains: Option<String>,
    pub badge_countdown: Option<bool>,
    pub allow_rotation_while_popup_open: Option<bool>,
}

impl StartOptions {
    /// Entry list after the legacy fallback: detailed entries win, plain
    /// URLs fill in when they are absent.
    pub fn entry_specs(&self) -> Vec<EntrySpec> {
        if !self.custom_entries.is_empty() {
            self.custom_entries.clone()
        } else {
            self.custom_urls.iter().cloned().map(EntrySpec::Url).collect()
        }
    }

    /// Merge these options over `current` and normalize the result.
    pub fn apply(&self, current: &RotationSettings) -> RotationSettings {
        // Zero and non-finite fall back to the default; anything else
        // clamps to the 1 s floor.
        let interval_raw = self.interval_sec.unwrap_or(current.interval_sec);
        let interval_sec = if interval_raw.is_finite() && interval_raw != 0.0 {
            interval_raw.max(1.0)
        } else {
            DEFAULT_INTERVAL_SEC
        };

        let custom_entries = normalize_entries(&self.entry_specs());
        let use_custom_list =
            self.use_custom_list.unwrap_or(current.use_custom_list) && !custom_entries.is_empty();

        let mut settings = RotationSettings {
            interval_sec,
            auto_start: self.auto_start.unwrap_or(current.auto_start),
            use_custom_list,
            custom_entries,
            open_custom_tabs: self.open_custom_tabs.unwrap_or(current.open_custom_tabs),
            enable_refresh_flags: self
                .enable_refresh_flags
                .unwrap_or(current.enable_refresh_flags),
            custom_raw_text: self
                .custom_raw_text
                .clone()
                .unwrap_or_else(|| current.custom_raw_text.clone()),
            use_dedicated_window: self
                .use_dedicated_window
                .unwrap_or(current.use_dedicated_window),
            shuffle: self.shuffle.unwrap_or(current.shuffle),
            exclude_domains: self
                .exclude_domains
                .clone()
                .unwrap_or_else(|| current.exclude_domains.clone()),
            badge_countdown: self.badge_countdown.unwrap_or(current.badge_countdown),
            allow_rotation_while_surface_open: self
                .allow_rotation_while_popup_open
                .unwrap_or(current.allow_rotation_while_surface_open),
        };

        if !settings.use_custom_list {
            settings.open_custom_tabs = false;
            settings.enable_refresh_flags = false;
            settings.custom_raw_text.clear();
            settings.use_dedicated_window = false;
            settings.shuffle = false;
        }

        settings
    }
}

impl From<RotationSettings> for StartOptions {
    /// A full-settings start (snapshot resume, boot restore) expressed as
    /// options. Applying the result over any current settings reproduces
    /// the source settings exactly.
    fn from(s: RotationSettings) -> Self {
        StartOptions {
            interval_sec: Some(s.interval_sec),
            use_custom_list: Some(s.use_custom_list),
            custom_entries: s.custom_entries.into_iter().map(EntrySpec::from).collect(),
            custom_urls: Vec::new(),
            open_custom_tabs: Some(s.open_custom_tabs),
            auto_start: Some(s.auto_start),
            enable_refresh_flags: Some(s.enable_refresh_flags),
            custom_raw_text: Some(s.custom_raw_text),
            use_dedicated_window: Some(s.use_dedicated_window),
            shuffle: Some(s.shuffle),
            exclude_domains: Some(s.exclude_domains),
            badge_countdown: Some(s.badge_countdown),
            allow_rotation_while_popup_open: Some(s.allow_rotation_while_surface_open),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(url: &str) -> EntrySpec {
        EntrySpec::Url(url.to_string())
    }

    #[test]
    fn test_normalize_entries_from_strings() {
        let entries = normalize_entries(&[spec("  example.com  "), spec("")]);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].url, "example.com");
        assert!(!entries[0].refresh);
        assert_eq!(entries[0].interval_sec, None);
    }

    #[test]
    fn test_normalize_entries_discards_bad_overrides() {
        let entries = normalize_entries(&[EntrySpec::Detailed {
            url: "example.com".to_string(),
            name: " dash ".to_string(),
            refresh: true,
            interval_sec: Some(0.5),
            refresh_delay_sec: Some(-3.0),
        }]);
        assert_eq!(entries[0].name, "dash");
        assert!(entries[0].refresh);
        assert_eq!(entries[0].interval_sec, None);
        assert_eq!(entries[0].refresh_delay_sec, 0.0);
    }

    #[test]
    fn test_apply_clamps_interval() {
        let opts = StartOptions {
            interval_sec: Some(0.2),
            ..Default::default()
        };
        assert_eq!(opts.apply(&RotationSettings::default()).interval_sec, 1.0);

        let opts = StartOptions {
            interval_sec: Some(f64::NAN),
            ..Default::default()
        };
        assert_eq!(
            opts.apply(&RotationSettings::default()).interval_sec,
            DEFAULT_INTERVAL_SEC
        );
    }

    #[test]
    fn test_custom_list_requires_entries() {
        let opts = StartOptions {
            use_custom_list: Some(true),
            ..Default::default()
        };
        let settings = opts.apply(&RotationSettings::default());
        assert!(!settings.use_custom_list);
    }

    #[test]
    fn test_dependent_options_forced_off_without_custom_list() {
        let opts = StartOptions {
            use_custom_list: Some(false),
            shuffle: Some(true),
            use_dedicated_window: Some(true),
            enable_refresh_flags: Some(true),
            custom_raw_text: Some("a\nb".to_string()),
            ..Default::default()
        };
        let settings = opts.apply(&RotationSettings::default());
        assert!(!settings.shuffle);
        assert!(!settings.use_dedicated_window);
        assert!(!settings.enable_refresh_flags);
        assert!(!settings.open_custom_tabs);
        assert!(settings.custom_raw_text.is_empty());
    }

    #[test]
    fn test_legacy_urls_fallback() {
        let opts = StartOptions {
            use_custom_list: Some(true),
            custom_urls: vec!["a.test".to_string(), "b.test".to_string()],
            ..Default::default()
        };
        let settings = opts.apply(&RotationSettings::default());
        assert!(settings.use_custom_list);
        assert_eq!(settings.custom_entries.len(), 2);
    }

    #[test]
    fn test_detailed_entries_win_over_legacy_urls() {
        let opts = StartOptions {
            use_custom_list: Some(true),
            custom_entries: vec![spec("primary.test")],
            custom_urls: vec!["legacy.test".to_string()],
            ..Default::default()
        };
        let settings = opts.apply(&RotationSettings::default());
        assert_eq!(settings.custom_entries.len(), 1);
        assert_eq!(settings.custom_entries[0].url, "primary.test");
    }

    #[test]
    fn test_settings_roundtrip_through_options_is_identity() {
        let opts = StartOptions {
            interval_sec: Some(7.0),
            use_custom_list: Some(true),
            custom_entries: vec![
                spec("a.test"),
                EntrySpec::Detailed {
                    url: "b.test".to_string(),
                    name: "bee".to_string(),
                    refresh: true,
                    interval_sec: Some(2.0),
                    refresh_delay_sec: Some(1.5),
                },
            ],
            shuffle: Some(true),
            exclude_domains: Some("bank.test".to_string()),
            ..Default::default()
        };
        let settings = opts.apply(&RotationSettings::default());
        let resumed = StartOptions::from(settings.clone()).apply(&RotationSettings::default());
        assert_eq!(settings, resumed);
    }

    #[test]
    fn test_entry_spec_wire_forms() {
        let from_string: EntrySpec = serde_json::from_str(r#""example.com""#).unwrap();
        assert_eq!(from_string, EntrySpec::Url("example.com".to_string()));

        let from_object: EntrySpec =
            serde_json::from_str(r#"{"url":"example.com","refresh":true,"intervalSec":2}"#).unwrap();
        match from_object {
            EntrySpec::Detailed {
                url,
                refresh,
                interval_sec,
                ..
            } => {
                assert_eq!(url, "example.com");
                assert!(refresh);
                assert_eq!(interval_sec, Some(2.0));
            }
            other => panic!("expected detailed entry, got {other:?}"),
        }
    }
}
