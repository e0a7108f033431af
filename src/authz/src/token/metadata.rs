//! Token source for the managed runtime (instance metadata server)

use super::TokenSource;
use crate::error::{AuthzError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

const TOKEN_PATH: &str = "/computeMetadata/v1/instance/service-accounts/default/token";

#[derive(Debug, Deserialize)]
struct MetadataToken {
    access_token: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
}

/// Fetches the default service account's token from the metadata server
pub struct MetadataTokenSource {
    client: reqwest::Client,
    url: String,
}

impl MetadataTokenSource {
    /// `host` is a bare host (and optional port), e.g. `metadata.google.internal`
    pub fn new(client: reqwest::Client, host: &str) -> Self {
        let host = host.trim_end_matches('/');
        let url = if host.starts_with("http://") || host.starts_with("https://") {
            format!("{}{}", host, TOKEN_PATH)
        } else {
            format!("http://{}{}", host, TOKEN_PATH)
        };

        Self { client, url }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl TokenSource for MetadataTokenSource {
    async fn fetch_token(&self) -> Result<String> {
        debug!("Fetching token from metadata server: {}", self.url);

        let response = self
            .client
            .get(&self.url)
            .header("Metadata-Flavor", "Google")
            .send()
            .await
            .map_err(|e| {
                AuthzError::CredentialUnavailable(format!("metadata request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Metadata server returned {}", status);
            return Err(AuthzError::CredentialUnavailable(format!(
                "metadata server returned {}: {}",
                status,
                body.trim()
            )));
        }

        let token: MetadataToken = response.json().await.map_err(|e| {
            AuthzError::CredentialUnavailable(format!("unreadable metadata response: {}", e))
        })?;

        match token.access_token.filter(|t| !t.is_empty()) {
            Some(access_token) => {
                debug!("Fetched metadata token (expires_in={:?})", token.expires_in);
                Ok(access_token)
            }
            None => Err(AuthzError::CredentialUnavailable(
                "'access_token' not found in metadata server response".to_string(),
            )),
        }
    }

    fn name(&self) -> &'static str {
        "metadata"
    }
}
