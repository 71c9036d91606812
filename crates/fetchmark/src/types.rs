//! Core types for fetchmark

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Retry policy for a single URL variation
///
/// The delay before retry `n` (zero-based) is
/// `min_timeout_ms * backoff_factor^n`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct RetryPolicy {
    /// Attempts per URL variation
    pub attempts: u32,
    /// Exponential backoff multiplier
    pub backoff_factor: f64,
    /// Base delay between retries in milliseconds
    pub min_timeout_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff_factor: 2.0,
            min_timeout_ms: 1_000,
        }
    }
}

impl RetryPolicy {
    /// Backoff delay before the retry with the given zero-based index
    pub fn delay_ms(&self, attempt: u32) -> u64 {
        let factor = self.backoff_factor.powi(attempt as i32);
        (self.min_timeout_ms as f64 * factor) as u64
    }
}

/// Options controlling a fetch call
///
/// All fields have defaults; callers override them by merging a
/// [`FetchOptionsPatch`] with [`FetchOptions::merged`].
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct FetchOptions {
    /// Per-attempt timeout in milliseconds
    pub timeout_ms: u64,
    /// Attempts per URL variation (kept in sync with `retry.attempts`)
    pub max_retries: u32,
    /// Convert HTML responses to Markdown
    pub convert_to_markdown: bool,
    /// Request headers; a random User-Agent is added when absent
    pub headers: HashMap<String, String>,
    /// When non-empty, only hosts matching one of these domains may be fetched
    pub allowed_domains: Vec<String>,
    /// Hosts matching any of these domains are rejected
    pub blocked_domains: Vec<String>,
    /// Retry/backoff policy
    pub retry: RetryPolicy,
}

impl Default for FetchOptions {
    fn default() -> Self {
        let mut headers = HashMap::new();
        headers.insert(
            "Accept".to_string(),
            "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8".to_string(),
        );
        headers.insert("Accept-Language".to_string(), "en-US,en;q=0.5".to_string());

        Self {
            timeout_ms: 10_000,
            max_retries: 3,
            convert_to_markdown: true,
            headers,
            allowed_domains: Vec::new(),
            blocked_domains: Vec::new(),
            retry: RetryPolicy::default(),
        }
    }
}

impl FetchOptions {
    /// Merge caller overrides onto these options
    ///
    /// Scalars are overwritten, `headers` is merged key-wise with the patch
    /// winning, domain lists become a deduplicated union, and `retry` is
    /// merged one level deep. `max_retries` and `retry.attempts` stay in
    /// sync when only one of them is patched; an explicit `retry.attempts`
    /// wins over `max_retries`.
    pub fn merged(mut self, patch: FetchOptionsPatch) -> Self {
        if let Some(v) = patch.timeout_ms {
            self.timeout_ms = v;
        }
        if let Some(v) = patch.max_retries {
            self.max_retries = v;
            self.retry.attempts = v;
        }
        if let Some(v) = patch.convert_to_markdown {
            self.convert_to_markdown = v;
        }
        if let Some(headers) = patch.headers {
            self.headers.extend(headers);
        }
        if let Some(domains) = patch.allowed_domains {
            union_into(&mut self.allowed_domains, domains);
        }
        if let Some(domains) = patch.blocked_domains {
            union_into(&mut self.blocked_domains, domains);
        }
        if let Some(retry) = patch.retry {
            if let Some(attempts) = retry.attempts {
                self.retry.attempts = attempts;
                self.max_retries = attempts;
            }
            if let Some(factor) = retry.backoff_factor {
                self.retry.backoff_factor = factor;
            }
            if let Some(min_timeout) = retry.min_timeout_ms {
                self.retry.min_timeout_ms = min_timeout;
            }
        }
        self
    }
}

/// Append incoming entries not already present, preserving order
fn union_into(existing: &mut Vec<String>, incoming: Vec<String>) {
    for entry in incoming {
        if !existing.contains(&entry) {
            existing.push(entry);
        }
    }
}

/// Partial [`RetryPolicy`] override
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct RetryPolicyPatch {
    /// Attempts per URL variation
    pub attempts: Option<u32>,
    /// Exponential backoff multiplier
    pub backoff_factor: Option<f64>,
    /// Base delay between retries in milliseconds
    pub min_timeout_ms: Option<u64>,
}

/// Partial [`FetchOptions`] override
///
/// Deserializable from config files and environment-derived values; every
/// field is optional and missing fields leave the base options untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct FetchOptionsPatch {
    /// Per-attempt timeout in milliseconds
    pub timeout_ms: Option<u64>,
    /// Attempts per URL variation
    pub max_retries: Option<u32>,
    /// Convert HTML responses to Markdown
    pub convert_to_markdown: Option<bool>,
    /// Additional request headers
    pub headers: Option<HashMap<String, String>>,
    /// Domains allowed for fetching
    pub allowed_domains: Option<Vec<String>>,
    /// Domains rejected for fetching
    pub blocked_domains: Option<Vec<String>>,
    /// Retry/backoff overrides
    pub retry: Option<RetryPolicyPatch>,
}

/// Successful terminal outcome of a fetch call
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FetchSuccess {
    /// Unique identifier for this fetch call
    pub fetch_id: String,
    /// The URL variation that succeeded
    pub url: String,
    /// HTTP status code
    pub status: u16,
    /// Response headers
    pub headers: HashMap<String, String>,
    /// Content-Type header value (empty when absent)
    pub content_type: String,
    /// Body text, converted to Markdown for HTML responses when enabled
    pub content: String,
    /// Wall-clock duration of the whole call in milliseconds
    pub duration_ms: u64,
}

/// Failed terminal outcome of a fetch call
///
/// Produced only after the full variation x retry matrix is exhausted (or
/// the call is cancelled); individual attempt failures are never surfaced.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FetchFailure {
    /// Unique identifier for this fetch call
    pub fetch_id: String,
    /// Always `true`; distinguishes the failure shape when serialized
    pub error: bool,
    /// Human-readable summary including the last attempt error
    pub message: String,
    /// Every URL variation that was attempted, in order
    pub attempted_urls: Vec<String>,
    /// Wall-clock duration of the whole call in milliseconds
    pub duration_ms: u64,
}

/// Terminal outcome of a fetch call
///
/// Every call resolves to exactly one of the two variants; transient
/// attempt-level failures are internal to the orchestration loop.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum FetchOutcome {
    /// A variation responded with a success status
    Success(FetchSuccess),
    /// Every variation exhausted its retry budget
    Failure(FetchFailure),
}

impl FetchOutcome {
    /// True for the success variant
    pub fn is_success(&self) -> bool {
        matches!(self, FetchOutcome::Success(_))
    }

    /// The success record, if any
    pub fn success(&self) -> Option<&FetchSuccess> {
        match self {
            FetchOutcome::Success(s) => Some(s),
            FetchOutcome::Failure(_) => None,
        }
    }

    /// The failure record, if any
    pub fn failure(&self) -> Option<&FetchFailure> {
        match self {
            FetchOutcome::Success(_) => None,
            FetchOutcome::Failure(f) => Some(f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = FetchOptions::default();
        assert_eq!(options.timeout_ms, 10_000);
        assert_eq!(options.max_retries, 3);
        assert!(options.convert_to_markdown);
        assert!(options.headers.contains_key("Accept"));
        assert!(options.allowed_domains.is_empty());
        assert_eq!(options.retry.attempts, 3);
        assert_eq!(options.retry.backoff_factor, 2.0);
        assert_eq!(options.retry.min_timeout_ms, 1_000);
    }

    #[test]
    fn test_merge_overwrites_scalars() {
        let options = FetchOptions::default().merged(FetchOptionsPatch {
            timeout_ms: Some(500),
            convert_to_markdown: Some(false),
            ..Default::default()
        });
        assert_eq!(options.timeout_ms, 500);
        assert!(!options.convert_to_markdown);
        // Untouched fields keep their defaults
        assert_eq!(options.max_retries, 3);
    }

    #[test]
    fn test_merge_headers_key_wise() {
        let mut headers = HashMap::new();
        headers.insert("Accept".to_string(), "text/plain".to_string());
        headers.insert("X-Custom".to_string(), "1".to_string());

        let options = FetchOptions::default().merged(FetchOptionsPatch {
            headers: Some(headers),
            ..Default::default()
        });

        assert_eq!(options.headers.get("Accept").unwrap(), "text/plain");
        assert_eq!(options.headers.get("X-Custom").unwrap(), "1");
        // Default keys not named by the patch survive
        assert!(options.headers.contains_key("Accept-Language"));
    }

    #[test]
    fn test_merge_domain_lists_dedup_union() {
        let base = FetchOptions::default().merged(FetchOptionsPatch {
            blocked_domains: Some(vec!["a.com".to_string(), "b.com".to_string()]),
            ..Default::default()
        });
        let options = base.merged(FetchOptionsPatch {
            blocked_domains: Some(vec!["b.com".to_string(), "c.com".to_string()]),
            ..Default::default()
        });
        assert_eq!(options.blocked_domains, vec!["a.com", "b.com", "c.com"]);
    }

    #[test]
    fn test_merge_retry_one_level() {
        let options = FetchOptions::default().merged(FetchOptionsPatch {
            retry: Some(RetryPolicyPatch {
                backoff_factor: Some(3.0),
                ..Default::default()
            }),
            ..Default::default()
        });
        assert_eq!(options.retry.backoff_factor, 3.0);
        // Unpatched nested fields keep their defaults
        assert_eq!(options.retry.attempts, 3);
        assert_eq!(options.retry.min_timeout_ms, 1_000);
    }

    #[test]
    fn test_merge_keeps_retry_knobs_in_sync() {
        let options = FetchOptions::default().merged(FetchOptionsPatch {
            max_retries: Some(5),
            ..Default::default()
        });
        assert_eq!(options.max_retries, 5);
        assert_eq!(options.retry.attempts, 5);

        // An explicit retry.attempts wins over max_retries
        let options = FetchOptions::default().merged(FetchOptionsPatch {
            max_retries: Some(5),
            retry: Some(RetryPolicyPatch {
                attempts: Some(2),
                ..Default::default()
            }),
            ..Default::default()
        });
        assert_eq!(options.retry.attempts, 2);
        assert_eq!(options.max_retries, 2);
    }

    #[test]
    fn test_backoff_delay() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_ms(0), 1_000);
        assert_eq!(policy.delay_ms(1), 2_000);
        assert_eq!(policy.delay_ms(2), 4_000);
    }

    #[test]
    fn test_outcome_exclusivity() {
        let outcome = FetchOutcome::Success(FetchSuccess {
            fetch_id: "id".to_string(),
            url: "https://example.com".to_string(),
            status: 200,
            headers: HashMap::new(),
            content_type: "text/html".to_string(),
            content: "# Hi".to_string(),
            duration_ms: 5,
        });
        assert!(outcome.is_success());
        assert!(outcome.success().is_some());
        assert!(outcome.failure().is_none());

        let outcome = FetchOutcome::Failure(FetchFailure {
            fetch_id: "id".to_string(),
            error: true,
            message: "All URL variations failed".to_string(),
            attempted_urls: vec!["https://example.com".to_string()],
            duration_ms: 5,
        });
        assert!(!outcome.is_success());
        assert!(outcome.success().is_none());
        assert!(outcome.failure().is_some());
    }

    #[test]
    fn test_options_deserialize_partial_json() {
        let patch: FetchOptionsPatch =
            serde_json::from_str(r#"{"timeout_ms": 250, "retry": {"attempts": 1}}"#).unwrap();
        let options = FetchOptions::default().merged(patch);
        assert_eq!(options.timeout_ms, 250);
        assert_eq!(options.retry.attempts, 1);
        assert_eq!(options.retry.backoff_factor, 2.0);
    }
}
