//! Quarantine rule for failing backends.
//!
//! A backend is quarantined once it has failed more than `min_failures`
//! times AND more than `max_failure_rate` of its calls failed. Both
//! conditions are required so one transient error never takes a backend out.
//! Quarantine is never reversed automatically; see [`super::Catalog::reinstate`].

use serde::{Deserialize, Serialize};

/// Quarantine thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuarantinePolicy {
    /// Failure count that must be exceeded before quarantine is considered
    pub min_failures: u64,

    /// Failure rate (failures / calls) that must be exceeded
    pub max_failure_rate: f64,
}

impl Default for QuarantinePolicy {
    fn default() -> Self {
        Self {
            min_failures: 3,
            max_failure_rate: 0.5,
        }
    }
}

impl QuarantinePolicy {
    /// Whether a backend with these counters should be quarantined.
    pub fn should_quarantine(&self, success_count: u64, failure_count: u64) -> bool {
        if failure_count <= self.min_failures {
            return false;
        }
        let total = success_count + failure_count;
        (failure_count as f64 / total as f64) > self.max_failure_rate
    }
}
