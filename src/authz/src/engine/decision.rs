//! Access decision types

use crate::types::{AccessRule, Decision};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Access decision with the reasoning behind it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessDecision {
    /// Unique decision ID
    pub id: String,

    /// ALLOW or DENY
    pub decision: Decision,

    /// Role resolved for the subject, if any
    pub role: Option<String>,

    /// Why the engine decided this way
    pub reason: DecisionReason,

    /// Decision timestamp (milliseconds since epoch)
    pub timestamp: i64,
}

impl AccessDecision {
    pub fn new(decision: Decision, role: Option<String>, reason: DecisionReason) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            decision,
            role,
            reason,
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    pub fn allowed(&self) -> bool {
        self.decision.is_allowed()
    }

    /// Rule that decided, if one matched
    pub fn matched_rule(&self) -> Option<&AccessRule> {
        match &self.reason {
            DecisionReason::RoleRule { rule, .. } | DecisionReason::AnyRule { rule, .. } => {
                Some(rule)
            }
            DecisionReason::NoMatchingRule { .. } => None,
        }
    }
}

/// Reason for an access decision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DecisionReason {
    /// A rule for the subject's resolved role matched
    RoleRule { index: usize, rule: AccessRule },

    /// A rule for the `any` role matched
    AnyRule { index: usize, rule: AccessRule },

    /// Nothing matched; default deny
    NoMatchingRule {
        roles_available: bool,
        rules_available: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matched_rule() {
        let rule = AccessRule::new("admin", "/x", "GET", "ALLOW");
        let decision = AccessDecision::new(
            Decision::Allow,
            Some("admin".to_string()),
            DecisionReason::RoleRule { index: 0, rule: rule.clone() },
        );

        assert!(decision.allowed());
        assert_eq!(decision.matched_rule(), Some(&rule));
        assert!(!decision.id.is_empty());
    }

    #[test]
    fn test_default_deny_serialization() {
        let decision = AccessDecision::new(
            Decision::Deny,
            None,
            DecisionReason::NoMatchingRule {
                roles_available: true,
                rules_available: false,
            },
        );

        let json = serde_json::to_value(&decision).unwrap();
        assert_eq!(json["decision"], "DENY");
        assert_eq!(json["reason"]["type"], "NoMatchingRule");
        assert!(decision.matched_rule().is_none());
    }
}
