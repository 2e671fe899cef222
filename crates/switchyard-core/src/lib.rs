//! # switchyard-core
//!
//! Deterministic routing logic for multi-provider model execution.
//!
//! This crate answers, for a given task category:
//! - Which backends may be tried, and in what order?
//! - Which one should go first right now?
//! - How much should we trust (and pay for) the answer we got?
//!
//! ## Key Guarantees
//!
//! 1. **No I/O**: never calls a provider, never reads the environment
//! 2. **Chain purity**: a fallback chain only holds backends that were
//!    available when it was built
//! 3. **Monotonic quarantine**: only an explicit reinstate brings a
//!    quarantined backend back
//! 4. **Concurrent-safe**: catalog counters never lose updates
//!
//! ## Example
//!
//! ```rust,ignore
//! use switchyard_core::{builtin_profiles, BackendDescriptor, Catalog, ChainSet, Selector, TaskCategory};
//!
//! let catalog = Catalog::default();
//! for profile in builtin_profiles() {
//!     catalog.register(BackendDescriptor::new(profile, true))?;
//! }
//!
//! let chains = ChainSet::new();
//! let chain = chains.chain(&catalog, TaskCategory::Research);
//! let first = Selector::select(&catalog, &chain, Some(0.0005), chrono::Utc::now())?;
//! ```

pub mod catalog;
pub mod chain;
pub mod grader;
pub mod selector;
pub mod status;
pub mod types;

// Re-export main types at crate root
pub use catalog::{
    builtin_profiles, Availability, BackendDescriptor, BackendProfile, BackendStats, Catalog,
    CatalogSnapshot, QuarantinePolicy,
};
pub use chain::{ChainBuilder, ChainSet, FallbackChain};
pub use grader::{approx_token_count, Grader};
pub use selector::{Selection, Selector};
pub use status::{BackendStatus, StatusReport, StatusReporter};
pub use types::{
    BackendKey, ExecutionRequest, ExecutionResult, ProviderKind, TaskCategory,
    DEFAULT_MAX_FALLBACKS,
};

use thiserror::Error;

/// Configuration errors: the orchestrator cannot possibly satisfy the request.
///
/// These are never retried. Ordinary provider failures are not errors at this
/// level; they are reported inside [`ExecutionResult::errors`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RoutingError {
    #[error("Unknown backend: {0}")]
    UnknownBackend(BackendKey),

    #[error("Backend '{0}' is already registered with different static ratings")]
    DuplicateKey(BackendKey),

    #[error("No backend available for task category '{0}'")]
    NoBackendAvailable(TaskCategory),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog_routes_every_category() {
        let catalog = Catalog::default();
        for profile in builtin_profiles() {
            catalog.register(BackendDescriptor::new(profile, true)).unwrap();
        }

        let chains = ChainSet::new();
        for category in TaskCategory::ALL {
            let chain = chains.chain(&catalog, category);
            assert!(!chain.is_empty(), "{} has no chain", category);
            let selection = Selector::select(&catalog, &chain, None, chrono::Utc::now()).unwrap();
            assert!(chain.contains(&selection.key));
        }

        // Gemini 2.5 Flash ranks highest on quality + reliability
        let research = chains.chain(&catalog, TaskCategory::Research);
        assert_eq!(research.primary().map(|k| k.as_str()), Some("gemini-2.5-flash"));
    }

    #[test]
    fn test_only_groq_configured() {
        let catalog = Catalog::default();
        for profile in builtin_profiles() {
            let configured = profile.kind == ProviderKind::Groq;
            catalog.register(BackendDescriptor::new(profile, configured)).unwrap();
        }

        let report = StatusReporter::snapshot(&catalog);
        assert_eq!(report.total_backends, 8);
        assert_eq!(report.available_backends, 5);
        for keys in report.chains.values() {
            assert!(keys.iter().all(|k| k.as_str().starts_with("groq/")));
        }
    }

    #[test]
    fn test_error_messages() {
        let err = RoutingError::NoBackendAvailable(TaskCategory::Valuation);
        assert!(err.to_string().contains("valuation"));
    }
}
