//! URL normalization and pre-flight validation

use crate::error::FetchError;
use tracing::debug;
use url::Url;

/// Maximum accepted URL length
pub const MAX_URL_LENGTH: usize = 2048;

/// TLDs rejected by pre-flight validation
const SUSPICIOUS_TLDS: &[&str] = &[".tk", ".ml", ".ga", ".cf", ".gq"];

/// Canonicalize a URL string into a comparable form
///
/// Lowercases the host, drops scheme-default ports, strips trailing slashes
/// from non-root paths, and removes query parameters with empty values while
/// preserving the order of the remainder. Scheme, user-info, inner path
/// segments, and fragment are left untouched. Returns the input unchanged if
/// it cannot be parsed; never raises.
pub fn normalize_url(url: &str) -> String {
    let mut parsed = match Url::parse(url) {
        Ok(parsed) => parsed,
        Err(err) => {
            debug!(url, %err, "URL normalization skipped");
            return url.to_string();
        }
    };

    // Host lowercasing and default-port stripping are part of the parser's
    // canonical form, so only the path and query need explicit handling.
    let path = parsed.path().to_string();
    if path != "/" && path.ends_with('/') {
        parsed.set_path(path.trim_end_matches('/'));
    }

    if parsed.query().is_some() {
        let kept: Vec<(String, String)> = parsed
            .query_pairs()
            .filter(|(_, value)| !value.is_empty())
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();
        if kept.is_empty() {
            parsed.set_query(None);
        } else {
            parsed
                .query_pairs_mut()
                .clear()
                .extend_pairs(kept.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        }
    }

    parsed.to_string()
}

/// Validate a URL before any network activity
///
/// Rejections here are caller misuse and raise [`FetchError`]; everything
/// that can fail transiently belongs to the retry loop instead.
pub fn validate_url(url: &str) -> Result<Url, FetchError> {
    if url.is_empty() {
        return Err(FetchError::MissingUrl);
    }
    if url.len() > MAX_URL_LENGTH {
        return Err(FetchError::UrlTooLong {
            max: MAX_URL_LENGTH,
        });
    }

    let parsed = Url::parse(url).map_err(FetchError::InvalidUrl)?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(FetchError::DisallowedScheme);
    }

    if let Some(host) = parsed.host_str() {
        if SUSPICIOUS_TLDS.iter().any(|tld| host.ends_with(tld)) {
            return Err(FetchError::BlockedDomain);
        }
    }

    Ok(parsed)
}
