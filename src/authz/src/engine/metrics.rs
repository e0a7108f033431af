//! Decision counters for observability

use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Snapshot of engine counters
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EngineMetrics {
    /// Total number of decisions
    pub total_decisions: u64,

    /// Number of ALLOW decisions
    pub allowed_decisions: u64,

    /// Number of DENY decisions
    pub denied_decisions: u64,

    /// Decisions made while the role table was unavailable
    pub roles_unavailable: u64,

    /// Decisions made while the rule table was unavailable
    pub rules_unavailable: u64,

    /// Average decision latency
    pub avg_latency_ms: f64,
}

impl EngineMetrics {
    /// Calculate allow rate
    pub fn allow_rate(&self) -> f64 {
        if self.total_decisions == 0 {
            0.0
        } else {
            self.allowed_decisions as f64 / self.total_decisions as f64
        }
    }

    /// Render in the Prometheus text exposition format
    pub fn to_prometheus(&self) -> String {
        let mut out = String::new();
        let counters = [
            ("sheetgate_decisions_total", "Access decisions made", self.total_decisions),
            ("sheetgate_decisions_allowed_total", "ALLOW decisions", self.allowed_decisions),
            ("sheetgate_decisions_denied_total", "DENY decisions", self.denied_decisions),
            (
                "sheetgate_roles_unavailable_total",
                "Decisions without a role table",
                self.roles_unavailable,
            ),
            (
                "sheetgate_rules_unavailable_total",
                "Decisions without a rule table",
                self.rules_unavailable,
            ),
        ];

        for (name, help, value) in counters {
            let _ = writeln!(out, "# HELP {} {}", name, help);
            let _ = writeln!(out, "# TYPE {} counter", name);
            let _ = writeln!(out, "{} {}", name, value);
        }

        let _ = writeln!(out, "# HELP sheetgate_decision_latency_avg_ms Average decision latency");
        let _ = writeln!(out, "# TYPE sheetgate_decision_latency_avg_ms gauge");
        let _ = writeln!(out, "sheetgate_decision_latency_avg_ms {:.3}", self.avg_latency_ms);
        out
    }
}

/// Lock-free metrics collector
#[derive(Debug, Default)]
pub struct MetricsCollector {
    total: AtomicU64,
    allowed: AtomicU64,
    roles_unavailable: AtomicU64,
    rules_unavailable: AtomicU64,
    latency_micros: AtomicU64,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one decision
    pub fn record_decision(&self, allowed: bool, latency: Duration) {
        self.total.fetch_add(1, Ordering::Relaxed);
        if allowed {
            self.allowed.fetch_add(1, Ordering::Relaxed);
        }
        self.latency_micros
            .fetch_add(latency.as_micros() as u64, Ordering::Relaxed);
    }

    /// Record which tables were missing for a decision
    pub fn record_unavailable(&self, roles_missing: bool, rules_missing: bool) {
        if roles_missing {
            self.roles_unavailable.fetch_add(1, Ordering::Relaxed);
        }
        if rules_missing {
            self.rules_unavailable.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> EngineMetrics {
        let total = self.total.load(Ordering::Relaxed);
        let allowed = self.allowed.load(Ordering::Relaxed);
        let latency_micros = self.latency_micros.load(Ordering::Relaxed);

        EngineMetrics {
            total_decisions: total,
            allowed_decisions: allowed,
            denied_decisions: total.saturating_sub(allowed),
            roles_unavailable: self.roles_unavailable.load(Ordering::Relaxed),
            rules_unavailable: self.rules_unavailable.load(Ordering::Relaxed),
            avg_latency_ms: if total == 0 {
                0.0
            } else {
                latency_micros as f64 / total as f64 / 1000.0
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_decisions() {
        let metrics = MetricsCollector::new();
        metrics.record_decision(true, Duration::from_millis(2));
        metrics.record_decision(false, Duration::from_millis(4));
        metrics.record_unavailable(false, true);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.total_decisions, 2);
        assert_eq!(snapshot.allowed_decisions, 1);
        assert_eq!(snapshot.denied_decisions, 1);
        assert_eq!(snapshot.rules_unavailable, 1);
        assert_eq!(snapshot.roles_unavailable, 0);
        assert_eq!(snapshot.allow_rate(), 0.5);
        assert!((snapshot.avg_latency_ms - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_prometheus_rendering() {
        let metrics = MetricsCollector::new();
        metrics.record_decision(false, Duration::from_micros(500));

        let text = metrics.snapshot().to_prometheus();
        assert!(text.contains("# TYPE sheetgate_decisions_total counter"));
        assert!(text.contains("sheetgate_decisions_denied_total 1"));
        assert!(text.contains("sheetgate_decision_latency_avg_ms 0.500"));
    }
}
