//! Environment-driven configuration
//!
//! Environment variables:
//! - `SHEET_ID` - spreadsheet holding the `Rules` and `Roles` tabs
//! - `SHEETS_ENDPOINT` - Sheets API base URL (default: https://sheets.googleapis.com)
//! - `RULES_RANGE` / `ROLES_RANGE` - ranges to read (default: Rules!A2:D102 / Roles!A2:B102)
//! - `K_SERVICE` - set by the managed runtime; selects the metadata token source
//! - `SA_EMAIL` - service account to impersonate when running locally
//! - `PROJECT_ID` - project used for local token acquisition
//! - `GCE_METADATA_HOST` - metadata server host (default: metadata.google.internal)
//! - `GCLOUD_BIN` - credential helper binary (default: gcloud)
//! - `PORT` - decision server port (default: 9090)

use crate::error::{AuthzError, Result};
use std::time::Duration;

pub const DEFAULT_SHEETS_ENDPOINT: &str = "https://sheets.googleapis.com";
pub const DEFAULT_RULES_RANGE: &str = "Rules!A2:D102";
pub const DEFAULT_ROLES_RANGE: &str = "Roles!A2:B102";
pub const DEFAULT_METADATA_HOST: &str = "metadata.google.internal";
pub const DEFAULT_CREDENTIAL_HELPER: &str = "gcloud";
pub const DEFAULT_PORT: u16 = 9090;

/// Read-only scope requested for the configuration endpoint
pub const SHEETS_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets.readonly";

/// Cache lifetimes for the remote tables and the bearer token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheTtls {
    pub roles: Duration,
    pub rules: Duration,
    pub token: Duration,
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            roles: Duration::from_secs(3 * 60),
            rules: Duration::from_secs(2 * 60),
            token: Duration::from_secs(9 * 60),
        }
    }
}

/// How bearer tokens are obtained
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialConfig {
    /// Managed runtime: ask the instance metadata server
    Metadata { host: String },

    /// Developer machine: shell out to the credential helper
    Local {
        program: String,
        service_account: Option<String>,
        project: Option<String>,
        timeout: Duration,
    },
}

/// Service configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthzConfig {
    /// Sheets API base URL
    pub endpoint: String,

    /// Spreadsheet identifier
    pub sheet_id: Option<String>,

    /// Range holding (role, resource, action, permission) rows
    pub rules_range: String,

    /// Range holding (pattern, role) rows
    pub roles_range: String,

    /// Token strategy, picked once from the environment
    pub credentials: CredentialConfig,

    /// Cache lifetimes
    pub ttls: CacheTtls,

    /// Decision server port
    pub port: u16,
}

impl AuthzConfig {
    /// Load configuration from process environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable lookup
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let credentials = if var("K_SERVICE").is_some() {
            CredentialConfig::Metadata {
                host: var("GCE_METADATA_HOST").unwrap_or_else(|| DEFAULT_METADATA_HOST.to_string()),
            }
        } else {
            CredentialConfig::Local {
                program: var("GCLOUD_BIN").unwrap_or_else(|| DEFAULT_CREDENTIAL_HELPER.to_string()),
                service_account: var("SA_EMAIL"),
                project: var("PROJECT_ID"),
                timeout: Duration::from_secs(60),
            }
        };

        Self {
            endpoint: var("SHEETS_ENDPOINT").unwrap_or_else(|| DEFAULT_SHEETS_ENDPOINT.to_string()),
            sheet_id: var("SHEET_ID"),
            rules_range: var("RULES_RANGE").unwrap_or_else(|| DEFAULT_RULES_RANGE.to_string()),
            roles_range: var("ROLES_RANGE").unwrap_or_else(|| DEFAULT_ROLES_RANGE.to_string()),
            credentials,
            ttls: CacheTtls::default(),
            port: var("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_PORT),
        }
    }

    /// Whether the managed-runtime marker was present
    pub fn is_managed(&self) -> bool {
        matches!(self.credentials, CredentialConfig::Metadata { .. })
    }

    /// Spreadsheet identifier, required for the remote store
    pub fn require_sheet_id(&self) -> Result<&str> {
        self.sheet_id
            .as_deref()
            .ok_or_else(|| AuthzError::Configuration("SHEET_ID is not set".to_string()))
    }
}
