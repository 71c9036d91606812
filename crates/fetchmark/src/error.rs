//! Error types for fetchmark
//!
//! [`FetchError`] covers caller misuse only. Transient conditions (transport
//! errors, non-2xx statuses, timeouts) are absorbed by the retry loop and
//! reported through the returned [`FetchFailure`](crate::FetchFailure)
//! record instead.

use thiserror::Error;

/// Errors raised synchronously before any network activity
#[derive(Debug, Error)]
pub enum FetchError {
    /// URL is missing
    #[error("Missing required parameter: url")]
    MissingUrl,

    /// URL could not be parsed
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[source] url::ParseError),

    /// URL has a scheme other than http/https
    #[error("Invalid URL: must start with http:// or https://")]
    DisallowedScheme,

    /// URL exceeds the maximum accepted length
    #[error("URL exceeds maximum length of {max} characters")]
    UrlTooLong {
        /// Configured maximum
        max: usize,
    },

    /// URL host is blocked by domain policy
    #[error("Blocked URL: domain not allowed")]
    BlockedDomain,

    /// Failed to build HTTP client
    #[error("Failed to create HTTP client")]
    ClientBuildError(#[source] reqwest::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            FetchError::MissingUrl.to_string(),
            "Missing required parameter: url"
        );
        assert_eq!(
            FetchError::DisallowedScheme.to_string(),
            "Invalid URL: must start with http:// or https://"
        );
        assert_eq!(
            FetchError::UrlTooLong { max: 2048 }.to_string(),
            "URL exceeds maximum length of 2048 characters"
        );
        assert_eq!(
            FetchError::BlockedDomain.to_string(),
            "Blocked URL: domain not allowed"
        );
    }
}
