//! Configuration loading
//!
//! Merges fetch option sources, lowest priority first: built-in defaults,
//! a JSON config file, then environment variables. Loading never raises;
//! unreadable sources are skipped with a warning. The rest of the crate
//! only ever consumes the merged [`FetchOptions`].

use crate::types::{FetchOptions, FetchOptionsPatch};
use std::env;
use std::path::PathBuf;
use tracing::warn;

/// Config file looked up in the working directory
const CONFIG_FILE: &str = "fetchmark.config.json";

/// Config file looked up in the home directory
const HOME_CONFIG_FILE: &str = ".fetchmark.config.json";

/// Load fetch options from all configuration sources
pub fn load_options() -> FetchOptions {
    let mut options = FetchOptions::default();
    if let Some(patch) = file_patch() {
        options = options.merged(patch);
    }
    options.merged(env_patch())
}

/// First readable and parseable config file, if any
fn file_patch() -> Option<FetchOptionsPatch> {
    for path in candidate_paths() {
        let Ok(raw) = std::fs::read_to_string(&path) else {
            continue;
        };
        match serde_json::from_str(&raw) {
            Ok(patch) => return Some(patch),
            Err(err) => {
                warn!(path = %path.display(), %err, "ignoring unparseable config file");
            }
        }
    }
    None
}

fn candidate_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(CONFIG_FILE)];
    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(HOME_CONFIG_FILE));
    }
    paths
}

/// Overrides supplied through the environment
fn env_patch() -> FetchOptionsPatch {
    FetchOptionsPatch {
        timeout_ms: env_parse("FETCHMARK_TIMEOUT_MS"),
        max_retries: env_parse("FETCHMARK_MAX_RETRIES"),
        convert_to_markdown: env_parse("FETCHMARK_CONVERT_MARKDOWN"),
        allowed_domains: env_list("FETCHMARK_ALLOWED_DOMAINS"),
        blocked_domains: env_list("FETCHMARK_BLOCKED_DOMAINS"),
        ..Default::default()
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = env::var(name).ok()?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(name, %raw, "ignoring unparseable environment variable");
            None
        }
    }
}

fn env_list(name: &str) -> Option<Vec<String>> {
    let raw = env::var(name).ok()?;
    let entries: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect();
    if entries.is_empty() {
        None
    } else {
        Some(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // One test mutates the environment, so all load_options assertions live
    // together instead of racing in parallel test threads.
    #[test]
    fn test_load_options_priority() {
        // No sources configured: defaults come through unchanged
        let options = load_options();
        assert_eq!(options.timeout_ms, FetchOptions::default().timeout_ms);
        assert_eq!(options.max_retries, FetchOptions::default().max_retries);

        // Environment overrides take priority
        env::set_var("FETCHMARK_TIMEOUT_MS", "2500");
        env::set_var("FETCHMARK_BLOCKED_DOMAINS", "a.com, b.com,");
        let options = load_options();
        assert_eq!(options.timeout_ms, 2500);
        assert_eq!(options.blocked_domains, vec!["a.com", "b.com"]);
        env::remove_var("FETCHMARK_TIMEOUT_MS");
        env::remove_var("FETCHMARK_BLOCKED_DOMAINS");

        // Unparseable values are skipped, not fatal
        env::set_var("FETCHMARK_MAX_RETRIES", "not-a-number");
        let options = load_options();
        assert_eq!(options.max_retries, FetchOptions::default().max_retries);
        env::remove_var("FETCHMARK_MAX_RETRIES");
    }
}
