//! Bearer token acquisition for the configuration endpoint
//!
//! Two strategies exist, chosen once at startup from the environment:
//!
//! - [`MetadataTokenSource`] on the managed runtime, asking the instance
//!   metadata server
//! - [`GcloudTokenSource`] on developer machines, running the gcloud CLI with
//!   service account impersonation
//!
//! [`TokenProvider`] caches whichever source is in use for nine minutes.

pub mod gcloud;
pub mod metadata;

pub use gcloud::GcloudTokenSource;
pub use metadata::MetadataTokenSource;

use crate::cache::{CacheStats, Clock, SystemClock, TtlCache};
use crate::config::{AuthzConfig, CredentialConfig};
use crate::error::{AuthzError, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Strategy for obtaining a fresh bearer token
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Fetch a new access token, bypassing any cache
    async fn fetch_token(&self) -> Result<String>;

    /// Short strategy name for logs
    fn name(&self) -> &'static str;
}

const TOKEN_KEY: &str = "access_token";

/// Cached access to a [`TokenSource`]
pub struct TokenProvider {
    source: Arc<dyn TokenSource>,
    cache: TtlCache<&'static str, String>,
    ttl: Duration,
}

impl TokenProvider {
    /// Wrap `source`, caching tokens for `ttl`
    pub fn new(source: Arc<dyn TokenSource>, ttl: Duration) -> Self {
        Self::with_clock(source, ttl, Arc::new(SystemClock))
    }

    /// Same as [`TokenProvider::new`] on a custom clock
    pub fn with_clock(source: Arc<dyn TokenSource>, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            source,
            cache: TtlCache::with_clock(clock),
            ttl,
        }
    }

    /// Select the token strategy for this environment
    pub fn from_config(config: &AuthzConfig, client: reqwest::Client) -> Self {
        let source: Arc<dyn TokenSource> = match &config.credentials {
            CredentialConfig::Metadata { host } => {
                Arc::new(MetadataTokenSource::new(client, host))
            }
            CredentialConfig::Local {
                program,
                service_account,
                project,
                timeout,
            } => Arc::new(
                GcloudTokenSource::new(program.clone(), service_account.clone(), project.clone())
                    .with_timeout(*timeout),
            ),
        };

        info!("Using '{}' token source", source.name());
        Self::new(source, config.ttls.token)
    }

    /// Current bearer token, fetched on first use and after expiry
    pub async fn get_token(&self) -> Result<String> {
        self.cache
            .get_or_fetch(TOKEN_KEY, self.ttl, move || async move {
                info!("Token cache miss, fetching from '{}'", self.source.name());
                self.source.fetch_token().await
            })
            .await
            .map_err(AuthzError::from_shared)
    }

    /// Forget the cached token (e.g. after the endpoint rejected it)
    pub fn invalidate(&self) {
        self.cache.invalidate(&TOKEN_KEY);
    }

    /// Name of the selected strategy
    pub fn source_name(&self) -> &'static str {
        self.source.name()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}
