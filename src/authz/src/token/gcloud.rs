//! Token source for developer machines (gcloud CLI with impersonation)

use super::TokenSource;
use crate::command::{CommandRunner, ProcessRunner};
use crate::config::SHEETS_READONLY_SCOPE;
use crate::error::{AuthzError, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Runs `gcloud auth print-access-token` impersonating a service account
pub struct GcloudTokenSource {
    program: String,
    service_account: Option<String>,
    project: Option<String>,
    scope: String,
    timeout: Duration,
    runner: Arc<dyn CommandRunner>,
}

impl GcloudTokenSource {
    pub fn new(
        program: impl Into<String>,
        service_account: Option<String>,
        project: Option<String>,
    ) -> Self {
        Self {
            program: program.into(),
            service_account,
            project,
            scope: SHEETS_READONLY_SCOPE.to_string(),
            timeout: Duration::from_secs(60),
            runner: Arc::new(ProcessRunner),
        }
    }

    /// Replace the process runner
    pub fn with_runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.runner = runner;
        self
    }

    /// Hard limit on the helper's run time
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn args(&self, service_account: &str, project: &str) -> Vec<String> {
        [
            "auth",
            "print-access-token",
            "--impersonate-service-account",
            service_account,
            "--project",
            project,
            "--scopes",
            self.scope.as_str(),
            "--quiet",
        ]
        .iter()
        .map(|arg| arg.to_string())
        .collect()
    }
}

#[async_trait]
impl TokenSource for GcloudTokenSource {
    async fn fetch_token(&self) -> Result<String> {
        let service_account = self.service_account.as_deref().ok_or_else(|| {
            AuthzError::Configuration("SA_EMAIL is required for local token retrieval".to_string())
        })?;
        let project = self.project.as_deref().ok_or_else(|| {
            AuthzError::Configuration(
                "PROJECT_ID is required for local token retrieval".to_string(),
            )
        })?;

        info!("Requesting token via {} as {}", self.program, service_account);

        let output = self
            .runner
            .run(&self.program, &self.args(service_account, project), self.timeout)
            .await
            .map_err(|e| match e {
                AuthzError::Io(io) => AuthzError::CredentialUnavailable(format!(
                    "could not start '{}': {}",
                    self.program, io
                )),
                other => other,
            })?;

        let token = output.stdout.trim();
        if token.is_empty() {
            warn!("{} printed no token", self.program);
            return Err(AuthzError::CredentialUnavailable(format!(
                "'{}' printed no token",
                self.program
            )));
        }

        Ok(token.to_string())
    }

    fn name(&self) -> &'static str {
        "gcloud"
    }
}
