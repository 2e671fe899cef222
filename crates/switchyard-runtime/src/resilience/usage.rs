//! Usage and cost accounting across every request served by an orchestrator.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use switchyard_core::{BackendKey, ExecutionResult};

/// Usage attributed to one backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BackendUsage {
    /// Provider invocations, successful or not
    pub calls: u64,

    /// Invocations that failed, timed out or came back empty
    pub failures: u64,

    /// Estimated cost in USD of successful calls
    pub estimated_cost: f64,
}

/// Aggregated usage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageSummary {
    /// Requests handled
    pub requests: u64,

    /// Requests that produced content
    pub succeeded: u64,

    /// Requests that ran out of attempts
    pub exhausted: u64,

    /// Provider invocations across all requests
    pub provider_calls: u64,

    /// Invocations beyond the first one of each request
    pub fallback_attempts: u64,

    /// Estimated cost in USD
    pub estimated_cost: f64,

    pub per_backend: BTreeMap<BackendKey, BackendUsage>,
}

impl UsageSummary {
    /// Fraction of requests that produced content.
    pub fn success_ratio(&self) -> f64 {
        if self.requests == 0 {
            return 0.0;
        }
        self.succeeded as f64 / self.requests as f64
    }
}

/// Thread-safe usage ledger.
#[derive(Debug, Default)]
pub struct UsageLedger {
    usage: RwLock<UsageSummary>,
}

impl UsageLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one provider invocation.
    pub fn record_call(&self, key: &BackendKey, ok: bool, cost: f64) {
        let mut usage = self.usage.write();
        usage.provider_calls += 1;
        usage.estimated_cost += cost;

        let entry = usage.per_backend.entry(key.clone()).or_default();
        entry.calls += 1;
        entry.estimated_cost += cost;
        if !ok {
            entry.failures += 1;
        }
    }

    /// Record the outcome of a whole request.
    pub fn record_request(&self, result: &ExecutionResult) {
        let mut usage = self.usage.write();
        usage.requests += 1;
        usage.fallback_attempts += u64::from(result.attempts.saturating_sub(1));
        if result.is_exhausted() {
            usage.exhausted += 1;
        } else {
            usage.succeeded += 1;
        }
    }

    /// Copy of the current totals.
    pub fn summary(&self) -> UsageSummary {
        self.usage.read().clone()
    }

    /// Clear all totals.
    pub fn reset(&self) {
        *self.usage.write() = UsageSummary::default();
    }
}
