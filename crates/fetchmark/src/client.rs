//! Fetch orchestration
//!
//! Drives the URL variation list through HTTP attempts with per-variation
//! retry budgets and exponential backoff. Transient conditions (transport
//! errors, non-2xx statuses, timeouts) are absorbed by the loop; only the
//! exhausted-everything case surfaces, as a returned [`FetchFailure`]
//! record. [`FetchError`] is raised solely for caller misuse detected
//! before any network activity.

use crate::agent::select_user_agent;
use crate::convert::{convert_to_markdown, ConvertOptions};
use crate::dns::HostAliasSource;
use crate::error::FetchError;
use crate::normalize::validate_url;
use crate::types::{FetchFailure, FetchOptions, FetchOutcome, FetchSuccess};
use crate::variations::{generate_url_variations, generate_url_variations_with_aliases};
use bytes::Bytes;
use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;
use uuid::Uuid;

/// Fetch a URL with default options
///
/// Resolves to a [`FetchOutcome`] record for every expected condition;
/// raising is reserved for caller misuse (invalid URL, domain policy).
pub async fn fetch(url: &str) -> Result<FetchOutcome, FetchError> {
    Fetcher::default().fetch(url).await
}

/// Fetch a URL with custom options
pub async fn fetch_with_options(
    url: &str,
    options: FetchOptions,
) -> Result<FetchOutcome, FetchError> {
    Fetcher::builder().options(options).build().fetch(url).await
}

/// Classification of a single (variation, retry) attempt
///
/// Transient by construction; never retained after the loop and never
/// surfaced directly to callers.
#[derive(Debug, Error)]
enum AttemptFailure {
    #[error("{0}")]
    Transport(String),
    #[error("HTTP error! status: {0}")]
    Status(u16),
    #[error("attempt timed out")]
    TimedOut,
    #[error("fetch cancelled")]
    Cancelled,
}

/// Raw response parts carried from a successful attempt
struct RawResponse {
    status: u16,
    headers: HashMap<String, String>,
    content_type: String,
    body: String,
}

/// Configured fetch orchestrator
///
/// Holds merged options and optional capabilities; every call is
/// independent and safe to run concurrently with other calls.
pub struct Fetcher {
    options: FetchOptions,
    convert: ConvertOptions,
    aliases: Option<Arc<dyn HostAliasSource>>,
}

impl Default for Fetcher {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Builder for [`Fetcher`]
#[derive(Default)]
pub struct FetcherBuilder {
    options: Option<FetchOptions>,
    convert: Option<ConvertOptions>,
    aliases: Option<Arc<dyn HostAliasSource>>,
}

impl FetcherBuilder {
    /// Set the fetch options
    pub fn options(mut self, options: FetchOptions) -> Self {
        self.options = Some(options);
        self
    }

    /// Set the Markdown conversion options
    pub fn convert_options(mut self, convert: ConvertOptions) -> Self {
        self.convert = Some(convert);
        self
    }

    /// Install an optional host alias source for URL variation enrichment
    pub fn alias_source(mut self, source: Arc<dyn HostAliasSource>) -> Self {
        self.aliases = Some(source);
        self
    }

    /// Build the fetcher
    pub fn build(self) -> Fetcher {
        Fetcher {
            options: self.options.unwrap_or_default(),
            convert: self.convert.unwrap_or_default(),
            aliases: self.aliases,
        }
    }
}

impl Fetcher {
    /// Create a builder
    pub fn builder() -> FetcherBuilder {
        FetcherBuilder::default()
    }

    /// Fetch without external cancellation
    pub async fn fetch(&self, url: &str) -> Result<FetchOutcome, FetchError> {
        self.fetch_cancellable(url, CancellationToken::new()).await
    }

    /// Fetch with an external cancellation token
    ///
    /// The token is observed by every attempt and every backoff wait; a
    /// cancelled call resolves to a terminal [`FetchFailure`] listing the
    /// URLs attempted so far.
    pub async fn fetch_cancellable(
        &self,
        url: &str,
        cancel: CancellationToken,
    ) -> Result<FetchOutcome, FetchError> {
        let started = Instant::now();
        let fetch_id = Uuid::new_v4().to_string();

        // Validation is the only raising path; everything past this point
        // resolves to an outcome record.
        let parsed = validate_url(url)?;
        self.check_domain_policy(&parsed)?;

        let variations = match &self.aliases {
            Some(source) => generate_url_variations_with_aliases(url, source.as_ref()).await,
            None => generate_url_variations(url).await,
        };
        debug!(url, candidates = variations.len(), %fetch_id, "starting fetch");

        let client = reqwest::Client::builder()
            .default_headers(self.request_headers())
            .connect_timeout(Duration::from_millis(self.options.timeout_ms))
            .build()
            .map_err(FetchError::ClientBuildError)?;

        let attempts = self.options.retry.attempts.max(1);
        let mut attempted: Vec<String> = Vec::new();
        let mut last_failure: Option<AttemptFailure> = None;

        'variations: for variation in &variations {
            attempted.push(variation.clone());
            // Each variation gets its own full retry allowance; advancing to
            // the next variation happens without additional delay.
            for attempt in 0..attempts {
                if cancel.is_cancelled() {
                    last_failure = Some(AttemptFailure::Cancelled);
                    break 'variations;
                }

                match self.attempt(&client, variation, &cancel).await {
                    Ok(raw) => {
                        debug!(url = %variation, status = raw.status, attempt, "fetch succeeded");
                        return Ok(FetchOutcome::Success(self.success_record(
                            fetch_id.clone(),
                            variation,
                            raw,
                            started,
                        )));
                    }
                    Err(AttemptFailure::Cancelled) => {
                        last_failure = Some(AttemptFailure::Cancelled);
                        break 'variations;
                    }
                    Err(failure) => {
                        debug!(url = %variation, attempt, %failure, "fetch attempt failed");
                        let out_of_retries = attempt + 1 == attempts;
                        last_failure = Some(failure);
                        if !out_of_retries {
                            let delay = Duration::from_millis(self.options.retry.delay_ms(attempt));
                            tokio::select! {
                                _ = tokio::time::sleep(delay) => {}
                                _ = cancel.cancelled() => {
                                    last_failure = Some(AttemptFailure::Cancelled);
                                    break 'variations;
                                }
                            }
                        }
                    }
                }
            }
        }

        let message = match &last_failure {
            Some(AttemptFailure::Cancelled) => "fetch cancelled".to_string(),
            Some(failure) => format!("All URL variations failed; last error: {failure}"),
            None => "All URL variations failed".to_string(),
        };
        warn!(url, attempted = attempted.len(), %message, "fetch exhausted");

        Ok(FetchOutcome::Failure(FetchFailure {
            fetch_id,
            error: true,
            message,
            attempted_urls: attempted,
            duration_ms: started.elapsed().as_millis() as u64,
        }))
    }

    /// One HTTP attempt, guarded by the per-attempt deadline and the token
    async fn attempt(
        &self,
        client: &reqwest::Client,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<RawResponse, AttemptFailure> {
        let deadline =
            tokio::time::Instant::now() + Duration::from_millis(self.options.timeout_ms);

        let response = tokio::select! {
            result = client.get(url).send() => {
                result.map_err(|err| AttemptFailure::Transport(err.to_string()))?
            }
            _ = tokio::time::sleep_until(deadline) => return Err(AttemptFailure::TimedOut),
            _ = cancel.cancelled() => return Err(AttemptFailure::Cancelled),
        };

        let status = response.status();
        if !status.is_success() {
            return Err(AttemptFailure::Status(status.as_u16()));
        }

        let mut headers = HashMap::new();
        for (name, value) in response.headers() {
            if let Ok(value) = value.to_str() {
                headers.insert(name.as_str().to_string(), value.to_string());
            }
        }
        let content_type = headers.get("content-type").cloned().unwrap_or_default();

        let body = read_body(response, deadline, cancel).await?;

        Ok(RawResponse {
            status: status.as_u16(),
            headers,
            content_type,
            body: String::from_utf8_lossy(&body).to_string(),
        })
    }

    /// Build the terminal success record, converting HTML when enabled
    fn success_record(
        &self,
        fetch_id: String,
        url: &str,
        raw: RawResponse,
        started: Instant,
    ) -> FetchSuccess {
        let content = if self.options.convert_to_markdown && raw.content_type.contains("text/html")
        {
            convert_to_markdown(&raw.body, &self.convert)
        } else {
            raw.body
        };

        FetchSuccess {
            fetch_id,
            url: url.to_string(),
            status: raw.status,
            headers: raw.headers,
            content_type: raw.content_type,
            content,
            duration_ms: started.elapsed().as_millis() as u64,
        }
    }

    /// Merged request headers with a random user agent when none is set
    fn request_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in &self.options.headers {
            match (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                (Ok(name), Ok(value)) => {
                    headers.insert(name, value);
                }
                _ => warn!(header = %name, "skipping invalid request header"),
            }
        }
        if !headers.contains_key(USER_AGENT) {
            let agent = select_user_agent(&mut rand::rng());
            headers.insert(USER_AGENT, HeaderValue::from_static(agent));
        }
        headers
    }

    /// Domain allow/block policy, applied before any network activity
    fn check_domain_policy(&self, url: &Url) -> Result<(), FetchError> {
        let host = url.host_str().unwrap_or_default();

        if self
            .options
            .blocked_domains
            .iter()
            .any(|domain| host.contains(domain.as_str()))
        {
            return Err(FetchError::BlockedDomain);
        }

        if !self.options.allowed_domains.is_empty()
            && !self
                .options
                .allowed_domains
                .iter()
                .any(|domain| host.contains(domain.as_str()))
        {
            return Err(FetchError::BlockedDomain);
        }

        Ok(())
    }
}

/// Read the response body under the same deadline as the attempt
async fn read_body(
    response: reqwest::Response,
    deadline: tokio::time::Instant,
    cancel: &CancellationToken,
) -> Result<Bytes, AttemptFailure> {
    let mut body = Vec::new();
    let mut stream = response.bytes_stream();

    loop {
        tokio::select! {
            chunk = stream.next() => match chunk {
                Some(Ok(bytes)) => body.extend_from_slice(&bytes),
                Some(Err(err)) => return Err(AttemptFailure::Transport(err.to_string())),
                None => return Ok(Bytes::from(body)),
            },
            _ = tokio::time::sleep_until(deadline) => return Err(AttemptFailure::TimedOut),
            _ = cancel.cancelled() => return Err(AttemptFailure::Cancelled),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FetchOptionsPatch;

    #[tokio::test]
    async fn test_fetch_empty_url() {
        let result = fetch("").await;
        assert!(matches!(result, Err(FetchError::MissingUrl)));
    }

    #[tokio::test]
    async fn test_fetch_invalid_scheme() {
        let result = fetch("ftp://example.com").await;
        assert!(matches!(result, Err(FetchError::DisallowedScheme)));
    }

    #[tokio::test]
    async fn test_fetch_oversized_url() {
        let url = format!("https://example.com/{}", "a".repeat(3000));
        let result = fetch(&url).await;
        assert!(matches!(result, Err(FetchError::UrlTooLong { .. })));
    }

    #[tokio::test]
    async fn test_blocked_domain_rejected_before_network() {
        let options = FetchOptions::default().merged(FetchOptionsPatch {
            blocked_domains: Some(vec!["blocked.example".to_string()]),
            ..Default::default()
        });
        let fetcher = Fetcher::builder().options(options).build();
        let result = fetcher.fetch("https://www.blocked.example/page").await;
        assert!(matches!(result, Err(FetchError::BlockedDomain)));
    }

    #[tokio::test]
    async fn test_allow_list_rejects_other_hosts() {
        let options = FetchOptions::default().merged(FetchOptionsPatch {
            allowed_domains: Some(vec!["allowed.example".to_string()]),
            ..Default::default()
        });
        let fetcher = Fetcher::builder().options(options).build();
        let result = fetcher.fetch("https://other.example/page").await;
        assert!(matches!(result, Err(FetchError::BlockedDomain)));
    }

    #[test]
    fn test_request_headers_insert_user_agent() {
        let fetcher = Fetcher::default();
        let headers = fetcher.request_headers();
        assert!(headers.contains_key(USER_AGENT));
        assert!(headers.contains_key("accept"));
    }

    #[test]
    fn test_request_headers_respect_caller_user_agent() {
        let options = FetchOptions::default().merged(FetchOptionsPatch {
            headers: Some(
                [("User-Agent".to_string(), "CustomBot/1.0".to_string())]
                    .into_iter()
                    .collect(),
            ),
            ..Default::default()
        });
        let fetcher = Fetcher::builder().options(options).build();
        let headers = fetcher.request_headers();
        assert_eq!(headers.get(USER_AGENT).unwrap(), "CustomBot/1.0");
    }
}
