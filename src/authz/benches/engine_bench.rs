//! Access decision benchmarks
//!
//! Measures role resolution plus both rule passes over in-memory tables of
//! realistic spreadsheet sizes (the default ranges hold up to 101 rows).

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use sheetgate_authz::{
    AccessDecisionEngine, AccessRequest, AccessRule, RoleMapping, RoleResolver, RoleTable,
    RuleTable, StaticConfigStore,
};
use std::sync::Arc;
use tokio::runtime::Runtime;

fn create_roles(count: usize) -> RoleTable {
    let mut mappings: Vec<RoleMapping> = (0..count)
        .map(|i| RoleMapping::new(format!("user-{}@co.com", i), format!("role-{}", i % 10)))
        .collect();
    mappings.push(RoleMapping::new("*@co.com", "member"));
    RoleTable::new(mappings)
}

fn create_rules(count: usize) -> RuleTable {
    let mut rules: Vec<AccessRule> = (0..count)
        .map(|i| {
            AccessRule::new(
                format!("role-{}", i % 10),
                format!("/resource/{}", i),
                "GET",
                if i % 2 == 0 { "ALLOW" } else { "DENY" },
            )
        })
        .collect();
    rules.push(AccessRule::new("any", "/public", "GET", "ALLOW"));
    RuleTable::new(rules)
}

fn bench_decide_with_tables(c: &mut Criterion) {
    let mut group = c.benchmark_group("decide_with_tables");
    let engine = AccessDecisionEngine::new(Arc::new(StaticConfigStore::default()));

    for size in [10, 100, 1000].iter() {
        let roles = create_roles(*size);
        let rules = create_rules(*size);

        group.bench_with_input(BenchmarkId::new("role_pass_hit", size), size, |b, &size| {
            let request = AccessRequest::new(
                format!("user-{}@co.com", size - 1),
                format!("/resource/{}", size - 1),
                "GET",
            );
            b.iter(|| black_box(engine.decide_with_tables(&request, &roles, &rules)))
        });

        group.bench_with_input(BenchmarkId::new("any_fallback", size), size, |b, _| {
            let request = AccessRequest::new("guest@other.org", "/public", "GET");
            b.iter(|| black_box(engine.decide_with_tables(&request, &roles, &rules)))
        });
    }

    group.finish();
}

fn bench_role_resolution(c: &mut Criterion) {
    let resolver = RoleResolver::new();
    let roles = create_roles(100);

    c.bench_function("resolve_exact", |b| {
        b.iter(|| black_box(resolver.resolve(black_box("user-99@co.com"), &roles)))
    });

    c.bench_function("resolve_domain_wildcard", |b| {
        b.iter(|| black_box(resolver.resolve(black_box("someone@CO.COM"), &roles)))
    });
}

fn bench_evaluate(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let store = StaticConfigStore::new(create_roles(100), create_rules(100));
    let engine = AccessDecisionEngine::new(Arc::new(store));

    c.bench_function("evaluate_cached_tables", |b| {
        b.to_async(&rt).iter(|| async {
            black_box(engine.evaluate("user-42@co.com", "/resource/42", "GET").await)
        })
    });
}

criterion_group!(benches, bench_decide_with_tables, bench_role_resolution, bench_evaluate);
criterion_main!(benches);
