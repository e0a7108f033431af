//! Access decision engine tests
//!
//! Role resolution → Pass A (resolved role) → Pass B ("any") → default deny

use proptest::prelude::*;
use sheetgate_authz::{
    AccessDecisionEngine, AccessRequest, AccessRule, Decision, DecisionReason, RoleMapping,
    RoleResolver, RoleTable, RuleTable, StaticConfigStore,
};
use std::sync::Arc;

fn rows(data: &[&[&str]]) -> Vec<Vec<String>> {
    data.iter()
        .map(|row| row.iter().map(|cell| cell.to_string()).collect())
        .collect()
}

fn scenario_engine() -> AccessDecisionEngine {
    let store = StaticConfigStore::from_rows(
        &rows(&[&["alice@co.com", "admin"], &["*@co.com", "member"]]),
        &rows(&[&["admin", "/x", "GET", "ALLOW"], &["any", "/x", "GET", "DENY"]]),
    );
    AccessDecisionEngine::new(Arc::new(store))
}

// ============================================================================
// DECISION SCENARIOS
// ============================================================================

#[tokio::test]
async fn test_exact_subject_role_allows() {
    let engine = scenario_engine();
    assert!(engine.evaluate("alice@co.com", "/x", "GET").await);
}

#[tokio::test]
async fn test_domain_role_without_rule_falls_back_to_any() {
    let engine = scenario_engine();
    let decision = engine
        .decide(&AccessRequest::new("bob@co.com", "/x", "GET"))
        .await;

    assert_eq!(decision.decision, Decision::Deny);
    assert_eq!(decision.role.as_deref(), Some("member"));
    assert!(matches!(decision.reason, DecisionReason::AnyRule { index: 1, .. }));
}

#[tokio::test]
async fn test_unresolved_subject_still_gets_any_pass() {
    let engine = scenario_engine();
    let decision = engine
        .decide(&AccessRequest::new("nobody@other.com", "/x", "GET"))
        .await;

    assert!(!decision.allowed());
    assert!(decision.role.is_none());
    assert!(matches!(decision.reason, DecisionReason::AnyRule { .. }));
}

#[tokio::test]
async fn test_unavailable_rules_deny_everything() {
    let store = Arc::new(StaticConfigStore::from_rows(
        &rows(&[&["alice@co.com", "admin"]]),
        &rows(&[&["admin", "/x", "GET", "ALLOW"]]),
    ));
    let engine = AccessDecisionEngine::new(store.clone());
    assert!(engine.evaluate("alice@co.com", "/x", "GET").await);

    store.set_rules(None).await;
    assert!(!engine.evaluate("alice@co.com", "/x", "GET").await);
    assert!(!engine.evaluate("anyone", "/anything", "POST").await);
    assert_eq!(engine.metrics().rules_unavailable, 2);
}

#[tokio::test]
async fn test_empty_rule_table_denies() {
    let store = StaticConfigStore::new(
        RoleTable::new(vec![RoleMapping::new("alice@co.com", "admin")]),
        RuleTable::default(),
    );
    let engine = AccessDecisionEngine::new(Arc::new(store));

    assert!(!engine.evaluate("alice@co.com", "/x", "GET").await);
}

#[tokio::test]
async fn test_malformed_rule_row_is_skipped() {
    let store = StaticConfigStore::from_rows(
        &rows(&[&["alice@co.com", "admin"]]),
        &rows(&[&["admin", "/x"], &["admin", "/x", "GET", "ALLOW"]]),
    );
    let engine = AccessDecisionEngine::new(Arc::new(store));

    assert!(engine.evaluate("alice@co.com", "/x", "GET").await);
}

#[tokio::test]
async fn test_unavailable_roles_still_match_any_rules() {
    let store = Arc::new(StaticConfigStore::new(
        RoleTable::default(),
        RuleTable::new(vec![AccessRule::new("any", "/public", "GET", "ALLOW")]),
    ));
    store.set_roles(None).await;
    let engine = AccessDecisionEngine::new(store);

    assert!(engine.evaluate("someone@co.com", "/public", "GET").await);
    assert_eq!(engine.metrics().roles_unavailable, 1);
}

#[test]
fn test_evaluate_from_sync_context() {
    let engine = scenario_engine();
    let allowed =
        tokio_test::block_on(async { engine.evaluate("alice@co.com", "/x", "GET").await });
    assert!(allowed);
}

// ============================================================================
// MATCHING SEMANTICS
// ============================================================================

#[tokio::test]
async fn test_rule_fields_compare_case_insensitively() {
    let store = StaticConfigStore::new(
        RoleTable::new(vec![RoleMapping::new("alice@co.com", "Admin")]),
        RuleTable::new(vec![AccessRule::new("ADMIN", "/Reports", "get", "allow")]),
    );
    let engine = AccessDecisionEngine::new(Arc::new(store));

    assert!(engine.evaluate("alice@co.com", "/reports", "GET").await);
}

#[tokio::test]
async fn test_exact_subject_compares_case_sensitively() {
    let engine = scenario_engine();

    // Falls through to the domain wildcard instead of the exact row
    let decision = engine
        .decide(&AccessRequest::new("Alice@co.com", "/x", "GET"))
        .await;
    assert_eq!(decision.role.as_deref(), Some("member"));
    assert!(!decision.allowed());
}

#[tokio::test]
async fn test_first_matching_rule_wins() {
    let store = StaticConfigStore::new(
        RoleTable::new(vec![RoleMapping::new("alice@co.com", "admin")]),
        RuleTable::new(vec![
            AccessRule::new("admin", "/x", "GET", "DENY"),
            AccessRule::new("admin", "/x", "GET", "ALLOW"),
        ]),
    );
    let engine = AccessDecisionEngine::new(Arc::new(store));

    assert!(!engine.evaluate("alice@co.com", "/x", "GET").await);
}

#[tokio::test]
async fn test_role_pass_beats_earlier_any_rule() {
    let store = StaticConfigStore::new(
        RoleTable::new(vec![RoleMapping::new("alice@co.com", "admin")]),
        RuleTable::new(vec![
            AccessRule::new("any", "/x", "GET", "DENY"),
            AccessRule::new("admin", "/x", "GET", "ALLOW"),
        ]),
    );
    let engine = AccessDecisionEngine::new(Arc::new(store));

    let decision = engine
        .decide(&AccessRequest::new("alice@co.com", "/x", "GET"))
        .await;
    assert!(decision.allowed());
    assert!(matches!(decision.reason, DecisionReason::RoleRule { index: 1, .. }));
}

#[tokio::test]
async fn test_unknown_permission_denies() {
    let store = StaticConfigStore::new(
        RoleTable::new(vec![RoleMapping::new("alice@co.com", "admin")]),
        RuleTable::new(vec![AccessRule::new("admin", "/x", "GET", "MAYBE")]),
    );
    let engine = AccessDecisionEngine::new(Arc::new(store));

    assert!(!engine.evaluate("alice@co.com", "/x", "GET").await);
}

#[tokio::test]
async fn test_concurrent_decisions() {
    let engine = Arc::new(scenario_engine());

    let handles: Vec<_> = (0..50)
        .map(|i| {
            let engine = engine.clone();
            tokio::spawn(async move {
                let subject = if i % 2 == 0 { "alice@co.com" } else { "bob@co.com" };
                (i, engine.evaluate(subject, "/x", "GET").await)
            })
        })
        .collect();

    for result in futures::future::join_all(handles).await {
        let (i, allowed) = result.unwrap();
        assert_eq!(allowed, i % 2 == 0);
    }

    let metrics = engine.metrics();
    assert_eq!(metrics.total_decisions, 50);
    assert_eq!(metrics.allowed_decisions, 25);
}

// ============================================================================
// PROPERTY TESTS
// ============================================================================

proptest! {
    #[test]
    fn prop_exact_match_beats_wildcards(
        local in "[a-z]{1,8}",
        domain in "[a-z]{1,8}\\.(com|org)",
        wildcards in 0usize..4,
    ) {
        let subject = format!("{}@{}", local, domain);
        let mut mappings: Vec<RoleMapping> = (0..wildcards)
            .map(|i| RoleMapping::new(format!("*@{}", domain), format!("wild-{}", i)))
            .collect();
        mappings.push(RoleMapping::new(subject.clone(), "exact-first"));
        mappings.push(RoleMapping::new(subject.clone(), "exact-second"));

        let table = RoleTable::new(mappings);
        prop_assert_eq!(RoleResolver::new().resolve(&subject, &table), Some("exact-first"));
    }

    #[test]
    fn prop_domain_wildcard_ignores_case(
        local in "[a-z]{1,8}",
        domain in "[a-z]{1,8}\\.com",
    ) {
        let table = RoleTable::new(vec![RoleMapping::new(format!("*@{}", domain), "member")]);
        let subject = format!("{}@{}", local, domain.to_uppercase());

        prop_assert_eq!(RoleResolver::new().resolve(&subject, &table), Some("member"));
        prop_assert_eq!(RoleResolver::new().resolve(&local, &table), None);
    }

    #[test]
    fn prop_first_matching_rule_decides(
        permissions in prop::collection::vec(prop::bool::ANY, 1..8),
        noise in 0usize..4,
    ) {
        let mut rules: Vec<AccessRule> = (0..noise)
            .map(|i| AccessRule::new("admin", format!("/other/{}", i), "GET", "ALLOW"))
            .collect();
        rules.extend(permissions.iter().map(|&allow| {
            AccessRule::new("admin", "/x", "GET", if allow { "ALLOW" } else { "DENY" })
        }));

        let engine = AccessDecisionEngine::new(Arc::new(StaticConfigStore::default()));
        let roles = RoleTable::new(vec![RoleMapping::new("alice@co.com", "admin")]);
        let decision = engine.decide_with_tables(
            &AccessRequest::new("alice@co.com", "/x", "GET"),
            &roles,
            &RuleTable::new(rules),
        );

        prop_assert_eq!(decision.allowed(), permissions[0]);
        let matched_at_first = matches!(
            decision.reason,
            DecisionReason::RoleRule { index, .. } if index == noise
        );
        prop_assert!(matched_at_first);
    }

    #[test]
    fn prop_no_matching_rule_denies(
        subject in "[a-z]{1,8}@[a-z]{1,8}\\.com",
        resource in "/[a-z]{1,8}",
    ) {
        let engine = AccessDecisionEngine::new(Arc::new(StaticConfigStore::default()));
        let rules = RuleTable::new(vec![AccessRule::new(
            "any",
            "/never-requested/0",
            "GET",
            "ALLOW",
        )]);
        let decision = engine.decide_with_tables(
            &AccessRequest::new(subject, resource, "GET"),
            &RoleTable::default(),
            &rules,
        );

        prop_assert_eq!(decision.decision, Decision::Deny);
    }
}
