//! URL normalization and loose matching
//!
//! Entries identify pages by intent ("the dashboard tab"), while live tabs
//! accumulate query strings, fragments, and redirects. Matching is therefore
//! host-plus-path containment rather than equality: equal or subdomain-
//! related hosts, and (when the target names a non-root path) the live path
//! equal to or nested under the target path.

use url::Url;

/// Normalize a user-supplied address to a canonical absolute URL string.
///
/// Trims the input; if it does not parse as an absolute URL, prefixes
/// `https://` and retries. On total parse failure the prefixed string is
/// returned as-is so callers still have something stable to compare.
pub fn normalize(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    if let Ok(parsed) = Url::parse(trimmed) {
        if !parsed.cannot_be_a_base() {
            return parsed.to_string();
        }
    }
    let prefixed = format!("https://{trimmed}");
    match Url::parse(&prefixed) {
        Ok(parsed) => parsed.to_string(),
        Err(_) => prefixed,
    }
}

/// Does a live tab address correspond to a target entry address?
pub fn matches(live_url: &str, target_url: &str) -> bool {
    if live_url.is_empty() || target_url.is_empty() {
        return false;
    }

    let live_norm = normalize(live_url);
    let target_norm = normalize(target_url);

    match (Url::parse(&live_norm), Url::parse(&target_norm)) {
        (Ok(live), Ok(target)) => {
            let (Some(live_host), Some(target_host)) = (live.host_str(), target.host_str()) else {
                return raw_containment(&live_norm, &target_norm, target_url);
            };

            if !hosts_correspond(live_host, target_host) {
                return raw_containment(&live_norm, &target_norm, target_url);
            }

            let target_path = target.path().trim_end_matches('/');
            if target_path.is_empty() {
                // Root target: any path on a corresponding host matches.
                return true;
            }
            let live_path = live.path().trim_end_matches('/');
            live_path == target_path || live_path.starts_with(&format!("{target_path}/"))
        }
        _ => raw_containment(&live_norm, &target_norm, target_url),
    }
}

/// Equal hosts, or one a dot-boundary subdomain of the other.
fn hosts_correspond(a: &str, b: &str) -> bool {
    a == b || a.ends_with(&format!(".{b}")) || b.ends_with(&format!(".{a}"))
}

/// Fallback for unparseable addresses: prefix match on the normalized
/// strings, or substring containment of the raw target.
fn raw_containment(live_norm: &str, target_norm: &str, raw_target: &str) -> bool {
    live_norm.starts_with(target_norm) || live_norm.contains(raw_target)
}

/// Parse a comma-separated excluded-domain list into lowercased hosts.
pub fn parse_excluded_domains(text: &str) -> Vec<String> {
    text.split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Is the tab's host excluded? A domain excludes itself and its subdomains.
/// Unparseable addresses are never excluded.
pub fn is_excluded(tab_url: &str, excluded: &[String]) -> bool {
    if excluded.is_empty() || tab_url.is_empty() {
        return false;
    }
    let Ok(parsed) = Url::parse(&normalize(tab_url)) else {
        return false;
    };
    let Some(host) = parsed.host_str() else {
        return false;
    };
    let host = host.to_lowercase();
    excluded
        .iter()
        .any(|d| host == *d || host.ends_with(&format!(".{d}")))
}
