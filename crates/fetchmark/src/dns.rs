//! Optional DNS-based host alias discovery
//!
//! Alias sources are best-effort enrichment for the URL variation list:
//! they may add candidates, never remove any, and never fail the caller.

use async_trait::async_trait;
use hickory_resolver::proto::rr::RecordType;
use hickory_resolver::TokioAsyncResolver;
use tracing::debug;

/// Capability for discovering alternate hostnames
///
/// Implementations return a possibly-empty list and must not raise; callers
/// may not depend on an alias source for correctness, only for opportunistic
/// extra resilience.
#[async_trait]
pub trait HostAliasSource: Send + Sync {
    /// Alternate hostnames for the given host, possibly empty
    async fn aliases(&self, host: &str) -> Vec<String>;
}

/// Alias source backed by CNAME lookups against the system resolver
pub struct CnameAliasSource {
    resolver: TokioAsyncResolver,
}

impl CnameAliasSource {
    /// Build from the system resolver configuration
    ///
    /// Returns `None` when no resolver configuration is available; the
    /// variation generator works without one.
    pub fn from_system_conf() -> Option<Self> {
        match TokioAsyncResolver::tokio_from_system_conf() {
            Ok(resolver) => Some(Self { resolver }),
            Err(err) => {
                debug!(%err, "system resolver unavailable, alias discovery disabled");
                None
            }
        }
    }
}

#[async_trait]
impl HostAliasSource for CnameAliasSource {
    async fn aliases(&self, host: &str) -> Vec<String> {
        match self.resolver.lookup(host, RecordType::CNAME).await {
            Ok(lookup) => lookup
                .iter()
                .filter_map(|record| record.as_cname())
                .map(|cname| cname.0.to_utf8().trim_end_matches('.').to_string())
                .collect(),
            Err(err) => {
                debug!(host, %err, "CNAME lookup failed");
                Vec::new()
            }
        }
    }
}
