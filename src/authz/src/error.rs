//! Error types for the access decision engine

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Access decision engine errors
///
/// None of these ever reach the caller of
/// [`AccessDecisionEngine::evaluate`](crate::engine::AccessDecisionEngine::evaluate):
/// the configuration store absorbs them and the engine falls back to DENY.
#[derive(Debug, Error)]
pub enum AuthzError {
    /// A role or rule table could not be fetched or parsed
    #[error("Configuration unavailable for range '{range}': {reason}")]
    ConfigUnavailable { range: String, reason: String },

    /// Token endpoint or credential helper failed
    #[error("Credential unavailable: {0}")]
    CredentialUnavailable(String),

    /// Credential helper exceeded its execution bound and was killed
    #[error("Credential helper '{command}' timed out after {timeout:?}")]
    CredentialTimeout { command: String, timeout: Duration },

    /// Required configuration value missing or invalid
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// External command exited unsuccessfully
    #[error("Command '{command}' failed with exit code {code:?}: {stderr}")]
    CommandFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parse error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// Error of a load shared with every caller that waited on it
    #[error(transparent)]
    Shared(Arc<AuthzError>),
}

impl AuthzError {
    /// Whether this error came from credential acquisition
    pub fn is_credential_failure(&self) -> bool {
        match self {
            AuthzError::Shared(inner) => inner.is_credential_failure(),
            other => matches!(
                other,
                AuthzError::CredentialUnavailable(_)
                    | AuthzError::CredentialTimeout { .. }
                    | AuthzError::CommandFailed { .. }
            ),
        }
    }

    /// Unwrap an error handed out by the cache, keeping it shared if other
    /// callers still hold it
    pub fn from_shared(error: Arc<AuthzError>) -> Self {
        Arc::try_unwrap(error).unwrap_or_else(AuthzError::Shared)
    }
}

/// Result type for access decision operations
pub type Result<T> = std::result::Result<T, AuthzError>;
