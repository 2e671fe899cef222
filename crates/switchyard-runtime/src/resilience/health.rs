//! Concurrent readiness probing of provider adapters.
//!
//! Probing is informational. It never touches the catalog; only real
//! invocations can quarantine a backend.

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use switchyard_core::BackendKey;

use crate::providers::ProviderAdapter;

/// Result of probing every adapter once.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub checked_at: DateTime<Utc>,
    pub results: BTreeMap<BackendKey, bool>,
}

impl HealthReport {
    pub fn healthy_count(&self) -> usize {
        self.results.values().filter(|ok| **ok).count()
    }
}

/// Checks adapters in parallel, each bounded by `timeout`.
#[derive(Debug, Clone, Copy)]
pub struct HealthMonitor {
    timeout: Duration,
}

impl HealthMonitor {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Check every adapter. A check that does not answer in time counts as
    /// unhealthy.
    pub async fn check<'a, I>(&self, adapters: I) -> HealthReport
    where
        I: IntoIterator<Item = (&'a BackendKey, &'a Arc<dyn ProviderAdapter>)>,
    {
        let timeout = self.timeout;
        let checks = adapters.into_iter().map(|(key, adapter)| async move {
            let healthy = tokio::time::timeout(timeout, adapter.health_check())
                .await
                .unwrap_or(false);
            if !healthy {
                tracing::debug!(backend = %key, adapter = adapter.name(), "Health check failed");
            }
            (key.clone(), healthy)
        });

        let results = join_all(checks).await.into_iter().collect();

        HealthReport {
            checked_at: Utc::now(),
            results,
        }
    }
}
