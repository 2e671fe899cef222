//! Read-only status snapshot for observability.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::catalog::{Availability, Catalog};
use crate::chain::ChainBuilder;
use crate::types::{BackendKey, ProviderKind, TaskCategory};

/// Per-backend view.
#[derive(Debug, Clone, Serialize)]
pub struct BackendStatus {
    pub name: String,
    pub kind: ProviderKind,
    pub availability: Availability,
    pub success_count: u64,
    pub failure_count: u64,
    pub success_rate: f64,
    pub avg_response_time_ms: f64,
    pub last_used_at: Option<DateTime<Utc>>,
}

/// Aggregated catalog snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub total_backends: usize,
    pub available_backends: usize,
    pub backends: BTreeMap<BackendKey, BackendStatus>,
    pub chains: BTreeMap<TaskCategory, Vec<BackendKey>>,
    pub generated_at: DateTime<Utc>,
}

pub struct StatusReporter;

impl StatusReporter {
    /// Snapshot the catalog. Chains are derived from the same snapshot so
    /// the report is internally consistent; nothing is written back.
    pub fn snapshot(catalog: &Catalog) -> StatusReport {
        let snapshot = catalog.snapshot();

        let backends = snapshot
            .backends
            .iter()
            .map(|d| {
                (
                    d.key().clone(),
                    BackendStatus {
                        name: d.profile.name.clone(),
                        kind: d.profile.kind,
                        availability: d.availability,
                        success_count: d.stats.success_count,
                        failure_count: d.stats.failure_count,
                        success_rate: d.stats.success_rate(),
                        avg_response_time_ms: d.stats.avg_response_time.as_secs_f64() * 1000.0,
                        last_used_at: d.stats.last_used_at,
                    },
                )
            })
            .collect();

        let chains = ChainBuilder::build_all(&snapshot.backends)
            .into_iter()
            .map(|(category, chain)| (category, chain.keys))
            .collect();

        StatusReport {
            total_backends: snapshot.backends.len(),
            available_backends: snapshot.backends.iter().filter(|d| d.is_available()).count(),
            backends,
            chains,
            generated_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::tests::profile;
    use crate::catalog::BackendDescriptor;
    use std::time::Duration;

    #[test]
    fn test_snapshot_counts_and_chains() {
        let catalog = Catalog::default();
        catalog
            .register(BackendDescriptor::new(profile("a", 9.0, 0.9, &[TaskCategory::Research]), true))
            .unwrap();
        catalog
            .register(BackendDescriptor::new(profile("b", 8.0, 0.9, &[TaskCategory::Research]), false))
            .unwrap();
        catalog
            .record_success(&BackendKey::from("a"), Duration::from_millis(250))
            .unwrap();

        let report = StatusReporter::snapshot(&catalog);
        assert_eq!(report.total_backends, 2);
        assert_eq!(report.available_backends, 1);
        assert_eq!(report.chains[&TaskCategory::Research], vec![BackendKey::from("a")]);

        let a = &report.backends[&BackendKey::from("a")];
        assert_eq!(a.success_count, 1);
        assert!((a.avg_response_time_ms - 250.0).abs() < 1e-6);
        assert_eq!(report.backends[&BackendKey::from("b")].availability, Availability::Unconfigured);
    }

    #[test]
    fn test_snapshot_does_not_mutate() {
        let catalog = Catalog::default();
        catalog
            .register(BackendDescriptor::new(profile("a", 9.0, 0.9, &[]), true))
            .unwrap();
        let before = catalog.snapshot();
        let _ = StatusReporter::snapshot(&catalog);
        let after = catalog.snapshot();

        assert_eq!(before.backends, after.backends);
        assert_eq!(before.generation, after.generation);
    }

    #[test]
    fn test_report_serializes() {
        let catalog = Catalog::default();
        catalog
            .register(BackendDescriptor::new(profile("a", 9.0, 0.9, &[TaskCategory::General]), true))
            .unwrap();
        let json = serde_json::to_value(StatusReporter::snapshot(&catalog)).unwrap();

        assert_eq!(json["total_backends"], 1);
        assert_eq!(json["chains"]["general"][0], "a");
        assert_eq!(json["backends"]["a"]["availability"]["state"], "available");
    }
}
