//! Picks the backend to try first for a fresh request.
//!
//! Score:
//!
//! ```text
//! (speed*0.3 + quality*0.4 + reliability*10*0.3)
//!     * success_rate
//!     * (1 + min(idle / 60s, 1) * 0.2)
//! ```
//!
//! where `success_rate = successes / (successes + failures + 1)` and `idle` is
//! the time since the backend was last used (never-used backends count as
//! fully idle). Scores are heuristic; they are computed from a snapshot that
//! may lag concurrent writers.

use chrono::{DateTime, Utc};

use crate::catalog::{BackendDescriptor, Catalog};
use crate::chain::FallbackChain;
use crate::types::BackendKey;
use crate::RoutingError;

/// Seconds of idleness that earn the full load-balancing bonus.
const IDLE_WINDOW_SECS: f64 = 60.0;

/// Maximum load-balancing bonus.
const IDLE_BONUS: f64 = 0.2;

/// The chosen backend and its score.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub key: BackendKey,
    pub score: f64,

    /// Whether the budget filter had to be dropped
    pub budget_relaxed: bool,
}

pub struct Selector;

impl Selector {
    /// Composite score for one backend at `now`.
    pub fn score(descriptor: &BackendDescriptor, now: DateTime<Utc>) -> f64 {
        let p = &descriptor.profile;
        let performance = p.speed * 0.3 + p.quality * 0.4 + p.reliability * 10.0 * 0.3;

        let idle_factor = match descriptor.stats.last_used_at {
            Some(last) => {
                let idle = (now - last).num_milliseconds().max(0) as f64 / 1000.0;
                (idle / IDLE_WINDOW_SECS).min(1.0)
            }
            None => 1.0,
        };

        performance * descriptor.stats.success_rate() * (1.0 + idle_factor * IDLE_BONUS)
    }

    /// Choose the best backend of `chain`.
    ///
    /// With a `budget_limit`, only backends whose cost per 1k tokens is within
    /// the limit are considered, unless that leaves nothing, in which case the
    /// limit is ignored. Ties go to the earlier chain entry.
    pub fn select(
        catalog: &Catalog,
        chain: &FallbackChain,
        budget_limit: Option<f64>,
        now: DateTime<Utc>,
    ) -> Result<Selection, RoutingError> {
        let snapshot = catalog.snapshot();
        let candidates: Vec<&BackendDescriptor> = chain
            .keys
            .iter()
            .filter_map(|key| snapshot.backends.iter().find(|d| d.key() == key))
            .filter(|d| d.is_available())
            .collect();

        if candidates.is_empty() {
            return Err(RoutingError::NoBackendAvailable(chain.category));
        }

        let within_budget: Vec<&BackendDescriptor> = match budget_limit {
            Some(limit) => candidates
                .iter()
                .copied()
                .filter(|d| d.profile.cost_per_k_tokens <= limit)
                .collect(),
            None => candidates.clone(),
        };

        let budget_relaxed = within_budget.is_empty();
        if budget_relaxed {
            tracing::debug!(
                category = %chain.category,
                budget_limit = ?budget_limit,
                "No backend within budget, ignoring budget limit"
            );
        }
        let pool = if budget_relaxed { candidates } else { within_budget };

        let mut best: Option<Selection> = None;
        for descriptor in pool {
            let score = Self::score(descriptor, now);
            if best.as_ref().map_or(true, |b| score > b.score) {
                best = Some(Selection {
                    key: descriptor.key().clone(),
                    score,
                    budget_relaxed,
                });
            }
        }

        let selection = best.ok_or(RoutingError::NoBackendAvailable(chain.category))?;
        tracing::debug!(
            category = %chain.category,
            backend = %selection.key,
            score = selection.score,
            "Selected backend"
        );
        Ok(selection)
    }
}
