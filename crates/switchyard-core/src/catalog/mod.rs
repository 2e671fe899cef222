//! Backend catalog: identity, static ratings and live health of every backend.
//!
//! The catalog is the only shared mutable state in the orchestrator. All
//! mutation goes through a single catalog-wide lock so concurrent callers
//! never lose counter updates. Readers get cloned snapshots and may observe
//! values that are slightly stale relative to a concurrent writer.

mod defaults;
mod quarantine;

pub use defaults::builtin_profiles;
pub use quarantine::QuarantinePolicy;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;

use crate::types::{BackendKey, ProviderKind, TaskCategory};
use crate::RoutingError;

fn default_max_output_tokens() -> u32 {
    8192
}

fn default_temperature() -> f32 {
    0.7
}

/// Author-assigned, static description of a backend.
///
/// Two profiles are equal only if every rating matches; registration uses
/// this to tell an idempotent re-register from a conflicting one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendProfile {
    /// Unique catalog key
    pub key: BackendKey,

    /// Human-readable name
    pub name: String,

    /// Provider family, selects the adapter
    pub kind: ProviderKind,

    /// Model identifier sent to the provider
    pub model: String,

    /// Speed rating, 0-10
    pub speed: f64,

    /// Quality rating, 0-10
    pub quality: f64,

    /// Reliability, 0-1
    pub reliability: f64,

    /// USD per 1k tokens
    pub cost_per_k_tokens: f64,

    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Categories this backend is well suited for
    #[serde(default)]
    pub task_specialties: BTreeSet<TaskCategory>,
}

impl BackendProfile {
    /// Whether the backend declares `category` as a specialty.
    pub fn specializes_in(&self, category: TaskCategory) -> bool {
        self.task_specialties.contains(&category)
    }

    /// Sort key used for fallback chains.
    pub fn chain_rank(&self) -> f64 {
        self.quality + self.reliability
    }
}

/// Whether a backend may be invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Availability {
    /// Credential present and healthy
    Available,

    /// No credential at startup; never invoked
    Unconfigured,

    /// Taken out after crossing the failure threshold
    Quarantined { since: DateTime<Utc> },
}

/// Mutable health counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BackendStats {
    pub success_count: u64,
    pub failure_count: u64,

    /// Set on every successful invocation
    pub last_used_at: Option<DateTime<Utc>>,

    /// Running mean over successful invocations only
    pub avg_response_time: Duration,
}

impl BackendStats {
    /// `successes / (successes + failures + 1)`; untested backends score 0.
    pub fn success_rate(&self) -> f64 {
        self.success_count as f64 / (self.success_count + self.failure_count + 1) as f64
    }
}

/// A backend as the catalog sees it: profile, availability and stats.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendDescriptor {
    pub profile: BackendProfile,
    pub availability: Availability,
    pub stats: BackendStats,
}

impl BackendDescriptor {
    /// Create a descriptor with zeroed stats.
    ///
    /// `configured` reflects whether the backend's credential is present.
    pub fn new(profile: BackendProfile, configured: bool) -> Self {
        Self {
            profile,
            availability: if configured {
                Availability::Available
            } else {
                Availability::Unconfigured
            },
            stats: BackendStats::default(),
        }
    }

    pub fn key(&self) -> &BackendKey {
        &self.profile.key
    }

    pub fn is_available(&self) -> bool {
        matches!(self.availability, Availability::Available)
    }
}

struct CatalogInner {
    /// Insertion order is the tie-break order everywhere
    entries: Vec<BackendDescriptor>,

    /// Bumped on every availability change
    generation: u64,
}

impl CatalogInner {
    fn find_mut(&mut self, key: &BackendKey) -> Result<&mut BackendDescriptor, RoutingError> {
        self.entries
            .iter_mut()
            .find(|d| d.key() == key)
            .ok_or_else(|| RoutingError::UnknownBackend(key.clone()))
    }
}

/// Snapshot of the whole catalog, taken under one read lock.
#[derive(Debug, Clone)]
pub struct CatalogSnapshot {
    pub backends: Vec<BackendDescriptor>,
    pub generation: u64,
}

/// Single source of truth for backend identity, ratings and health.
pub struct Catalog {
    inner: RwLock<CatalogInner>,
    policy: QuarantinePolicy,
}

impl Catalog {
    /// Create an empty catalog with the given quarantine policy.
    pub fn new(policy: QuarantinePolicy) -> Self {
        Self {
            inner: RwLock::new(CatalogInner {
                entries: Vec::new(),
                generation: 0,
            }),
            policy,
        }
    }

    pub fn policy(&self) -> &QuarantinePolicy {
        &self.policy
    }

    /// Insert a backend.
    ///
    /// Registering the same key again with an identical profile is a no-op
    /// and leaves stats untouched. A different profile under an existing key
    /// fails with [`RoutingError::DuplicateKey`].
    pub fn register(&self, descriptor: BackendDescriptor) -> Result<(), RoutingError> {
        let mut inner = self.inner.write();

        if let Some(existing) = inner.entries.iter().find(|d| d.key() == descriptor.key()) {
            if existing.profile == descriptor.profile {
                return Ok(());
            }
            return Err(RoutingError::DuplicateKey(descriptor.key().clone()));
        }

        tracing::debug!(
            backend = %descriptor.key(),
            kind = %descriptor.profile.kind,
            available = descriptor.is_available(),
            "Registered backend"
        );
        inner.entries.push(descriptor);
        inner.generation += 1;
        Ok(())
    }

    /// Get a copy of one backend.
    pub fn get(&self, key: &BackendKey) -> Result<BackendDescriptor, RoutingError> {
        self.inner
            .read()
            .entries
            .iter()
            .find(|d| d.key() == key)
            .cloned()
            .ok_or_else(|| RoutingError::UnknownBackend(key.clone()))
    }

    /// Available backends in insertion order, optionally narrowed to the
    /// specialists of `category`.
    pub fn list_available(&self, category: Option<TaskCategory>) -> Vec<BackendDescriptor> {
        self.inner
            .read()
            .entries
            .iter()
            .filter(|d| d.is_available())
            .filter(|d| category.map_or(true, |c| d.profile.specializes_in(c)))
            .cloned()
            .collect()
    }

    /// Consistent copy of every backend plus the availability generation.
    pub fn snapshot(&self) -> CatalogSnapshot {
        let inner = self.inner.read();
        CatalogSnapshot {
            backends: inner.entries.clone(),
            generation: inner.generation,
        }
    }

    /// Changes whenever any backend's availability changes.
    pub fn generation(&self) -> u64 {
        self.inner.read().generation
    }

    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().entries.is_empty()
    }

    /// Count a success and fold `elapsed` into the running mean.
    pub fn record_success(&self, key: &BackendKey, elapsed: Duration) -> Result<(), RoutingError> {
        let mut inner = self.inner.write();
        let stats = &mut inner.find_mut(key)?.stats;

        stats.success_count += 1;
        let avg = stats.avg_response_time.as_secs_f64();
        let next = avg + (elapsed.as_secs_f64() - avg) / stats.success_count as f64;
        stats.avg_response_time = Duration::from_secs_f64(next.max(0.0));
        stats.last_used_at = Some(Utc::now());
        Ok(())
    }

    /// Count a failure. Call [`Catalog::maybe_quarantine`] afterwards.
    pub fn record_failure(&self, key: &BackendKey) -> Result<(), RoutingError> {
        let mut inner = self.inner.write();
        inner.find_mut(key)?.stats.failure_count += 1;
        Ok(())
    }

    /// Quarantine the backend if it crossed the policy threshold.
    ///
    /// Returns true only for the call that performed the transition.
    pub fn maybe_quarantine(&self, key: &BackendKey) -> Result<bool, RoutingError> {
        let mut inner = self.inner.write();
        let policy = self.policy;
        let descriptor = inner.find_mut(key)?;

        if !descriptor.is_available()
            || !policy.should_quarantine(descriptor.stats.success_count, descriptor.stats.failure_count)
        {
            return Ok(false);
        }

        descriptor.availability = Availability::Quarantined { since: Utc::now() };
        tracing::warn!(
            backend = %key,
            failures = descriptor.stats.failure_count,
            successes = descriptor.stats.success_count,
            "Backend quarantined after high failure rate"
        );
        inner.generation += 1;
        Ok(true)
    }

    /// Explicitly return a quarantined backend to service with fresh counters.
    ///
    /// Unconfigured and already-available backends are left alone.
    pub fn reinstate(&self, key: &BackendKey) -> Result<bool, RoutingError> {
        let mut inner = self.inner.write();
        let descriptor = inner.find_mut(key)?;

        if !matches!(descriptor.availability, Availability::Quarantined { .. }) {
            return Ok(false);
        }

        descriptor.availability = Availability::Available;
        descriptor.stats = BackendStats::default();
        tracing::info!(backend = %key, "Backend reinstated");
        inner.generation += 1;
        Ok(true)
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new(QuarantinePolicy::default())
    }
}

impl std::fmt::Debug for Catalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("Catalog")
            .field("backends", &inner.entries.iter().map(|d| d.key()).collect::<Vec<_>>())
            .field("generation", &inner.generation)
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::Arc;

    pub(crate) fn profile(key: &str, quality: f64, reliability: f64, specialties: &[TaskCategory]) -> BackendProfile {
        BackendProfile {
            key: BackendKey::from(key),
            name: format!("Backend {}", key),
            kind: ProviderKind::Groq,
            model: key.to_string(),
            speed: 8.0,
            quality,
            reliability,
            cost_per_k_tokens: 0.0005,
            max_output_tokens: 8192,
            temperature: 0.7,
            task_specialties: specialties.iter().copied().collect(),
        }
    }

    fn key(s: &str) -> BackendKey {
        BackendKey::from(s)
    }

    #[test]
    fn test_register_is_idempotent() {
        let catalog = Catalog::default();
        let p = profile("a", 9.0, 0.9, &[TaskCategory::Research]);

        catalog.register(BackendDescriptor::new(p.clone(), true)).unwrap();
        catalog.record_success(&key("a"), Duration::from_secs(1)).unwrap();
        catalog.register(BackendDescriptor::new(p, true)).unwrap();

        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.get(&key("a")).unwrap().stats.success_count, 1);
    }

    #[test]
    fn test_register_conflicting_profile_fails() {
        let catalog = Catalog::default();
        catalog
            .register(BackendDescriptor::new(profile("a", 9.0, 0.9, &[]), true))
            .unwrap();

        let err = catalog
            .register(BackendDescriptor::new(profile("a", 7.0, 0.9, &[]), true))
            .unwrap_err();
        assert_eq!(err, RoutingError::DuplicateKey(key("a")));
    }

    #[test]
    fn test_unknown_backend() {
        let catalog = Catalog::default();
        assert_eq!(
            catalog.get(&key("nope")).unwrap_err(),
            RoutingError::UnknownBackend(key("nope"))
        );
        assert!(catalog.record_failure(&key("nope")).is_err());
    }

    #[test]
    fn test_list_available_filters() {
        let catalog = Catalog::default();
        catalog
            .register(BackendDescriptor::new(profile("a", 9.0, 0.9, &[TaskCategory::Research]), true))
            .unwrap();
        catalog
            .register(BackendDescriptor::new(profile("b", 8.0, 0.9, &[TaskCategory::Sentiment]), true))
            .unwrap();
        catalog
            .register(BackendDescriptor::new(profile("c", 8.0, 0.9, &[TaskCategory::Research]), false))
            .unwrap();

        assert_eq!(catalog.list_available(None).len(), 2);
        let research = catalog.list_available(Some(TaskCategory::Research));
        assert_eq!(research.len(), 1);
        assert_eq!(research[0].key(), &key("a"));
    }

    #[test]
    fn test_running_mean_response_time() {
        let catalog = Catalog::default();
        catalog
            .register(BackendDescriptor::new(profile("a", 9.0, 0.9, &[]), true))
            .unwrap();

        catalog.record_success(&key("a"), Duration::from_secs(2)).unwrap();
        catalog.record_success(&key("a"), Duration::from_secs(4)).unwrap();
        catalog.record_failure(&key("a")).unwrap();

        let stats = catalog.get(&key("a")).unwrap().stats;
        assert_eq!(stats.success_count, 2);
        assert_eq!(stats.failure_count, 1);
        assert!((stats.avg_response_time.as_secs_f64() - 3.0).abs() < 1e-9);
        assert!(stats.last_used_at.is_some());
    }

    #[test]
    fn test_quarantine_after_four_failures() {
        let catalog = Catalog::default();
        catalog
            .register(BackendDescriptor::new(profile("d", 9.0, 0.9, &[]), true))
            .unwrap();
        let before = catalog.generation();

        for _ in 0..3 {
            catalog.record_failure(&key("d")).unwrap();
            assert!(!catalog.maybe_quarantine(&key("d")).unwrap());
        }
        catalog.record_failure(&key("d")).unwrap();
        assert!(catalog.maybe_quarantine(&key("d")).unwrap());

        let d = catalog.get(&key("d")).unwrap();
        assert!(matches!(d.availability, Availability::Quarantined { .. }));
        assert!(catalog.generation() > before);

        // Already quarantined: no second transition
        catalog.record_failure(&key("d")).unwrap();
        assert!(!catalog.maybe_quarantine(&key("d")).unwrap());
    }

    #[test]
    fn test_quarantine_is_not_undone_by_success() {
        let catalog = Catalog::default();
        catalog
            .register(BackendDescriptor::new(profile("d", 9.0, 0.9, &[]), true))
            .unwrap();
        for _ in 0..4 {
            catalog.record_failure(&key("d")).unwrap();
        }
        catalog.maybe_quarantine(&key("d")).unwrap();

        for _ in 0..20 {
            catalog.record_success(&key("d"), Duration::from_millis(10)).unwrap();
            catalog.maybe_quarantine(&key("d")).unwrap();
        }
        assert!(!catalog.get(&key("d")).unwrap().is_available());
    }

    #[test]
    fn test_reinstate_only_from_quarantine() {
        let catalog = Catalog::default();
        catalog
            .register(BackendDescriptor::new(profile("d", 9.0, 0.9, &[]), true))
            .unwrap();
        catalog
            .register(BackendDescriptor::new(profile("u", 9.0, 0.9, &[]), false))
            .unwrap();

        assert!(!catalog.reinstate(&key("d")).unwrap());
        assert!(!catalog.reinstate(&key("u")).unwrap());

        for _ in 0..4 {
            catalog.record_failure(&key("d")).unwrap();
        }
        catalog.maybe_quarantine(&key("d")).unwrap();
        assert!(catalog.reinstate(&key("d")).unwrap());

        let d = catalog.get(&key("d")).unwrap();
        assert!(d.is_available());
        assert_eq!(d.stats, BackendStats::default());
        assert_eq!(catalog.get(&key("u")).unwrap().availability, Availability::Unconfigured);
    }

    #[test]
    fn test_concurrent_updates_are_not_lost() {
        let catalog = Arc::new(Catalog::default());
        catalog
            .register(BackendDescriptor::new(profile("a", 9.0, 0.9, &[]), true))
            .unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let catalog = Arc::clone(&catalog);
                std::thread::spawn(move || {
                    for _ in 0..250 {
                        catalog.record_success(&key("a"), Duration::from_millis(5)).unwrap();
                        catalog.record_failure(&key("a")).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let stats = catalog.get(&key("a")).unwrap().stats;
        assert_eq!(stats.success_count, 2000);
        assert_eq!(stats.failure_count, 2000);
    }

    proptest! {
        // Once quarantined, no sequence of successes or failures brings a
        // backend back; only reinstate does.
        #[test]
        fn prop_quarantine_is_monotonic(ops in proptest::collection::vec(any::<bool>(), 1..200)) {
            let catalog = Catalog::default();
            catalog.register(BackendDescriptor::new(profile("x", 9.0, 0.9, &[]), true)).unwrap();
            let mut quarantined = false;

            for success in ops {
                if success {
                    catalog.record_success(&key("x"), Duration::from_millis(1)).unwrap();
                } else {
                    catalog.record_failure(&key("x")).unwrap();
                }
                catalog.maybe_quarantine(&key("x")).unwrap();

                let d = catalog.get(&key("x")).unwrap();
                if quarantined {
                    prop_assert!(!d.is_available());
                }
                if !d.is_available() {
                    prop_assert!(d.stats.failure_count > 3);
                    quarantined = true;
                }
            }
        }

        #[test]
        fn prop_register_twice_is_noop(quality in 0.0f64..10.0, reliability in 0.0f64..1.0) {
            let catalog = Catalog::default();
            let p = profile("x", quality, reliability, &[TaskCategory::General]);
            catalog.register(BackendDescriptor::new(p.clone(), true)).unwrap();
            let first = catalog.snapshot();
            catalog.register(BackendDescriptor::new(p, true)).unwrap();
            let second = catalog.snapshot();

            prop_assert_eq!(first.backends, second.backends);
            prop_assert_eq!(first.generation, second.generation);
        }
    }
}
