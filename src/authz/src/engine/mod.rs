//! Access decision engine
//!
//! Orchestrates table retrieval, role resolution and rule matching.

pub mod decision;
pub mod metrics;

pub use decision::{AccessDecision, DecisionReason};
pub use metrics::{EngineMetrics, MetricsCollector};

use crate::config::AuthzConfig;
use crate::error::{AuthzError, Result};
use crate::roles::{RoleResolver, RoleTable};
use crate::store::{ConfigStore, RemoteConfigStore};
use crate::token::TokenProvider;
use crate::types::{AccessRequest, Decision, RuleTable, ANY_ROLE};

use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Timeout applied to every HTTP call the engine's stores make
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Main access decision engine
///
/// # Architecture
///
/// ```text
/// Request → ConfigStore (rules, roles) → RoleResolver → Pass A → Pass B → Decision
///              ↓                                        (role)    ("any")      ↓
///          [TTL cache] ← TokenProvider                                     [Metrics]
/// ```
///
/// Fail-closed: unavailable tables count as empty, and no matching rule means
/// DENY.
pub struct AccessDecisionEngine {
    /// Role and rule table source
    store: Arc<dyn ConfigStore>,

    /// Subject → role resolution
    resolver: RoleResolver,

    /// Decision counters
    metrics: Arc<MetricsCollector>,
}

impl AccessDecisionEngine {
    /// Create an engine over the given table store
    pub fn new(store: Arc<dyn ConfigStore>) -> Self {
        Self {
            store,
            resolver: RoleResolver::new(),
            metrics: Arc::new(MetricsCollector::new()),
        }
    }

    /// Build the production engine: spreadsheet store plus the token strategy
    /// picked from the environment
    pub fn from_config(config: &AuthzConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| AuthzError::Internal(format!("failed to build HTTP client: {}", e)))?;

        let tokens = Arc::new(TokenProvider::from_config(config, client.clone()));
        let store = RemoteConfigStore::from_config(config, client, tokens)?;

        info!(
            "AccessDecisionEngine initialized with endpoint={}, rules={}, roles={}",
            config.endpoint, config.rules_range, config.roles_range
        );

        Ok(Self::new(Arc::new(store)))
    }

    /// ALLOW (`true`) or DENY (`false`) for one access check
    pub async fn evaluate(&self, subject: &str, resource: &str, action: &str) -> bool {
        self.decide(&AccessRequest::new(subject, resource, action))
            .await
            .allowed()
    }

    /// Decide an access request, keeping the matched rule and resolved role
    ///
    /// # Pipeline
    ///
    /// 1. Fetch the rule and role tables together (may block on a cache miss)
    /// 2. Resolve the subject's role
    /// 3. Pass A: first rule for the resolved role, if any
    /// 4. Pass B: first rule for the `any` role
    /// 5. Default deny
    pub async fn decide(&self, request: &AccessRequest) -> AccessDecision {
        let start = Instant::now();

        let (rules, roles) = tokio::join!(self.store.get_rules(), self.store.get_roles());

        if rules.is_none() || roles.is_none() {
            warn!(
                "Deciding with missing tables: rules_available={}, roles_available={}",
                rules.is_some(),
                roles.is_some()
            );
            self.metrics.record_unavailable(roles.is_none(), rules.is_none());
        }

        let empty_roles = RoleTable::default();
        let empty_rules = RuleTable::default();

        let mut decision = self.decide_with_tables(
            request,
            roles.as_deref().unwrap_or(&empty_roles),
            rules.as_deref().unwrap_or(&empty_rules),
        );

        if let DecisionReason::NoMatchingRule {
            roles_available,
            rules_available,
        } = &mut decision.reason
        {
            *roles_available = roles.is_some();
            *rules_available = rules.is_some();
        }

        self.metrics.record_decision(decision.allowed(), start.elapsed());
        decision
    }

    /// Apply role resolution and rule matching to explicit table snapshots
    pub fn decide_with_tables(
        &self,
        request: &AccessRequest,
        roles: &RoleTable,
        rules: &RuleTable,
    ) -> AccessDecision {
        let role = self.resolver.resolve(&request.subject, roles);

        if let Some(role) = role {
            if let Some((index, rule)) =
                rules.first_match(role, &request.resource, &request.action)
            {
                info!(
                    "Role match: role='{}', resource='{}', action='{}', rule={}",
                    role, request.resource, request.action, rule
                );
                return AccessDecision::new(
                    Decision::from(rule.allows()),
                    Some(role.to_string()),
                    DecisionReason::RoleRule {
                        index,
                        rule: rule.clone(),
                    },
                );
            }
            debug!("No rule for role '{}', falling back to '{}'", role, ANY_ROLE);
        }

        if let Some((index, rule)) =
            rules.first_match(ANY_ROLE, &request.resource, &request.action)
        {
            info!(
                "'{}' role match: resource='{}', action='{}', rule={}",
                ANY_ROLE, request.resource, request.action, rule
            );
            return AccessDecision::new(
                Decision::from(rule.allows()),
                role.map(str::to_string),
                DecisionReason::AnyRule {
                    index,
                    rule: rule.clone(),
                },
            );
        }

        info!(
            "No matching rule: role='{}', resource='{}', action='{}'. Denying access",
            role.unwrap_or("none"),
            request.resource,
            request.action
        );

        AccessDecision::new(
            Decision::Deny,
            role.map(str::to_string),
            DecisionReason::NoMatchingRule {
                roles_available: true,
                rules_available: true,
            },
        )
    }

    /// Get engine metrics
    pub fn metrics(&self) -> EngineMetrics {
        self.metrics.snapshot()
    }
}
