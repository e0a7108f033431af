//! Spreadsheet-backed configuration store
//!
//! Reads the two tables from the Sheets values endpoint:
//!
//! ```text
//! GET {endpoint}/v4/spreadsheets/{sheet_id}/values/{range}
//! Authorization: Bearer {token}
//! ```
//!
//! Each table sits behind its own TTL cache (rules 2 min, roles 3 min). Any
//! failure while loading (token, transport, status, JSON) is logged and turns
//! into "unavailable" for that call; nothing is cached, so the next call
//! retries.

use super::ConfigStore;
use crate::cache::{CacheStats, Clock, TtlCache};
use crate::config::{AuthzConfig, CacheTtls, DEFAULT_ROLES_RANGE, DEFAULT_RULES_RANGE};
use crate::error::{AuthzError, Result};
use crate::roles::RoleTable;
use crate::token::TokenProvider;
use crate::types::{RuleTable, SheetValues};
use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Remote role/rule store with TTL caching
pub struct RemoteConfigStore {
    client: reqwest::Client,
    endpoint: String,
    sheet_id: String,
    rules_range: String,
    roles_range: String,
    ttls: CacheTtls,
    tokens: Arc<TokenProvider>,
    roles: TtlCache<String, Arc<RoleTable>>,
    rules: TtlCache<String, Arc<RuleTable>>,
}

impl RemoteConfigStore {
    /// Create a store reading the default ranges of `sheet_id`
    pub fn new(
        client: reqwest::Client,
        endpoint: impl Into<String>,
        sheet_id: impl Into<String>,
        tokens: Arc<TokenProvider>,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            sheet_id: sheet_id.into(),
            rules_range: DEFAULT_RULES_RANGE.to_string(),
            roles_range: DEFAULT_ROLES_RANGE.to_string(),
            ttls: CacheTtls::default(),
            tokens,
            roles: TtlCache::new(),
            rules: TtlCache::new(),
        }
    }

    /// Create a store from service configuration
    pub fn from_config(
        config: &AuthzConfig,
        client: reqwest::Client,
        tokens: Arc<TokenProvider>,
    ) -> Result<Self> {
        let sheet_id = config.require_sheet_id()?;

        Ok(Self::new(client, config.endpoint.clone(), sheet_id, tokens)
            .with_ranges(config.rules_range.clone(), config.roles_range.clone())
            .with_ttls(config.ttls))
    }

    /// Override the rules and roles ranges
    pub fn with_ranges(
        mut self,
        rules_range: impl Into<String>,
        roles_range: impl Into<String>,
    ) -> Self {
        self.rules_range = rules_range.into();
        self.roles_range = roles_range.into();
        self
    }

    /// Override the table TTLs
    pub fn with_ttls(mut self, ttls: CacheTtls) -> Self {
        self.ttls = ttls;
        self
    }

    /// Run the table caches on `clock`
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.roles = TtlCache::with_clock(clock.clone());
        self.rules = TtlCache::with_clock(clock);
        self
    }

    /// Values endpoint URL for `range`
    pub fn values_url(&self, range: &str) -> Result<Url> {
        let mut url = Url::parse(&self.endpoint).map_err(|e| {
            AuthzError::Configuration(format!("invalid endpoint '{}': {}", self.endpoint, e))
        })?;

        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                AuthzError::Configuration(format!(
                    "endpoint '{}' cannot be a base URL",
                    self.endpoint
                ))
            })?;
            segments
                .pop_if_empty()
                .extend(["v4", "spreadsheets", self.sheet_id.as_str(), "values", range]);
        }

        Ok(url)
    }

    /// Fetch one range, uncached
    pub async fn fetch_values(&self, range: &str) -> Result<SheetValues> {
        let token = self.tokens.get_token().await?;
        let url = self.values_url(range)?;

        debug!("Fetching range '{}' from {}", range, url);

        let response = self.client.get(url).bearer_auth(&token).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            if status == StatusCode::UNAUTHORIZED {
                // Rejected token: drop it so the next load acquires a new one
                self.tokens.invalidate();
            }
            return Err(AuthzError::ConfigUnavailable {
                range: range.to_string(),
                reason: format!("{}: {}", status, body.trim()),
            });
        }

        Ok(serde_json::from_str(&body)?)
    }

    /// Drop both cached tables
    pub fn invalidate(&self) {
        self.roles.clear();
        self.rules.clear();
        info!("Configuration caches invalidated");
    }

    pub fn roles_cache_stats(&self) -> CacheStats {
        self.roles.stats()
    }

    pub fn rules_cache_stats(&self) -> CacheStats {
        self.rules.stats()
    }
}

async fn load_table<T, F, Fut>(
    cache: &TtlCache<String, Arc<T>>,
    range: &str,
    ttl: Duration,
    load: F,
) -> Option<Arc<T>>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Arc<T>>>,
{
    match cache.get_or_fetch(range.to_string(), ttl, load).await {
        Ok(table) => Some(table),
        Err(e) => {
            warn!("Table '{}' unavailable: {}", range, e);
            None
        }
    }
}

#[async_trait]
impl ConfigStore for RemoteConfigStore {
    async fn get_roles(&self) -> Option<Arc<RoleTable>> {
        let range = self.roles_range.as_str();
        load_table(&self.roles, range, self.ttls.roles, move || async move {
            info!("Roles cache miss, fetching '{}'", range);
            let rows = self.fetch_values(range).await?.into_rows();
            Ok::<_, AuthzError>(Arc::new(RoleTable::from_rows(&rows)))
        })
        .await
    }

    async fn get_rules(&self) -> Option<Arc<RuleTable>> {
        let range = self.rules_range.as_str();
        load_table(&self.rules, range, self.ttls.rules, move || async move {
            info!("Rules cache miss, fetching '{}'", range);
            let rows = self.fetch_values(range).await?.into_rows();
            Ok::<_, AuthzError>(Arc::new(RuleTable::from_rows(&rows)))
        })
        .await
    }
}
