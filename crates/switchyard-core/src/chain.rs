//! Fallback chains: per-category try-order of backends.
//!
//! A chain only ever contains backends that were available when it was
//! built. Chains are derived data; [`ChainSet`] rebuilds them whenever the
//! catalog's availability generation moves.

use parking_lot::RwLock;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::catalog::{BackendDescriptor, Catalog};
use crate::types::{BackendKey, TaskCategory};

/// Ordered backend keys for one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FallbackChain {
    pub category: TaskCategory,
    pub keys: Vec<BackendKey>,
}

impl FallbackChain {
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Primary backend, if any.
    pub fn primary(&self) -> Option<&BackendKey> {
        self.keys.first()
    }

    pub fn contains(&self, key: &BackendKey) -> bool {
        self.keys.contains(key)
    }
}

/// Builds chains from a catalog snapshot without touching the catalog.
pub struct ChainBuilder;

impl ChainBuilder {
    /// Build the chain for one category.
    ///
    /// Specialists come first if there are any; otherwise every available
    /// backend is used. Sorted by `quality + reliability` descending, ties
    /// keep insertion order.
    pub fn build(backends: &[BackendDescriptor], category: TaskCategory) -> FallbackChain {
        let available: Vec<&BackendDescriptor> =
            backends.iter().filter(|d| d.is_available()).collect();

        let specialists: Vec<&BackendDescriptor> = available
            .iter()
            .copied()
            .filter(|d| d.profile.specializes_in(category))
            .collect();

        let mut candidates = if specialists.is_empty() {
            available
        } else {
            specialists
        };

        // Stable sort keeps insertion order on ties
        candidates.sort_by(|a, b| b.profile.chain_rank().total_cmp(&a.profile.chain_rank()));

        FallbackChain {
            category,
            keys: candidates.into_iter().map(|d| d.key().clone()).collect(),
        }
    }

    /// Build the chain of every category.
    pub fn build_all(backends: &[BackendDescriptor]) -> BTreeMap<TaskCategory, FallbackChain> {
        TaskCategory::ALL
            .iter()
            .map(|&category| (category, Self::build(backends, category)))
            .collect()
    }
}

struct CachedChains {
    generation: u64,
    chains: Arc<BTreeMap<TaskCategory, FallbackChain>>,
}

/// Lazily rebuilt chains for every category.
#[derive(Default)]
pub struct ChainSet {
    cached: RwLock<Option<CachedChains>>,
}

impl ChainSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current chains, rebuilt first if availability changed since the last build.
    pub fn chains(&self, catalog: &Catalog) -> Arc<BTreeMap<TaskCategory, FallbackChain>> {
        let generation = catalog.generation();
        if let Some(cached) = self.cached.read().as_ref() {
            if cached.generation == generation {
                return Arc::clone(&cached.chains);
            }
        }

        let snapshot = catalog.snapshot();
        let chains = Arc::new(ChainBuilder::build_all(&snapshot.backends));
        tracing::debug!(generation = snapshot.generation, "Rebuilt fallback chains");

        let mut cached = self.cached.write();
        // Another caller may have stored a newer build meanwhile
        let stale = cached
            .as_ref()
            .map_or(true, |c| c.generation <= snapshot.generation);
        if stale {
            *cached = Some(CachedChains {
                generation: snapshot.generation,
                chains: Arc::clone(&chains),
            });
        }
        chains
    }

    /// Chain for one category.
    pub fn chain(&self, catalog: &Catalog, category: TaskCategory) -> FallbackChain {
        self.chains(catalog)
            .get(&category)
            .cloned()
            .unwrap_or(FallbackChain {
                category,
                keys: Vec::new(),
            })
    }

    /// Drop the cached chains so the next call rebuilds.
    pub fn invalidate(&self) {
        *self.cached.write() = None;
    }
}
