//! # switchyard-runtime
//!
//! Async execution for Switchyard: provider adapters, bounded fallback and
//! usage accounting on top of the routing logic in `switchyard-core`.
//!
//! ## Important
//!
//! All routing decisions (chains, selection, quarantine, grading) live in
//! `switchyard-core` and are deterministic. This crate only adds the parts
//! that touch the outside world:
//! - Provider adapters behind the [`ProviderAdapter`] trait
//! - Credential lookup and adapter construction at startup
//! - Per-attempt timeouts and the sequential fallback loop
//! - Health checks and a usage ledger
//!
//! ## Example
//!
//! ```rust,ignore
//! use switchyard_runtime::{AdapterRegistry, EnvCredentials, Orchestrator, RuntimeConfig};
//! use switchyard_core::TaskCategory;
//!
//! let config = RuntimeConfig::from_yaml_file("switchyard.yaml")?;
//! let orchestrator = Orchestrator::from_config(config, &AdapterRegistry::with_defaults(), &EnvCredentials)?;
//!
//! let result = orchestrator.execute_prompt("Bull case for NVDA?", TaskCategory::Thesis).await?;
//! if result.is_exhausted() {
//!     eprintln!("analysis unavailable: {:?}", result.errors);
//! }
//! ```

pub mod config;
pub mod orchestrator;
pub mod providers;
pub mod resilience;

pub use config::{ConfigError, RuntimeConfig, DEFAULT_ATTEMPT_TIMEOUT};
pub use orchestrator::{Orchestrator, OrchestratorBuilder, OrchestratorStatus};
pub use providers::{
    AdapterFactory, AdapterRegistry, ApiCredential, CredentialOrigin, CredentialStore,
    EnvCredentials, ProviderAdapter, ProviderError, ProviderSettings, StaticCredentials,
};
pub use resilience::{BackendUsage, HealthMonitor, HealthReport, UsageLedger, UsageSummary};

use switchyard_core::RoutingError;
use thiserror::Error;

/// Errors from the runtime.
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error(transparent)]
    Routing(#[from] RoutingError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use switchyard_core::TaskCategory;

    #[test]
    fn test_error_conversion() {
        let err: RuntimeError = RoutingError::NoBackendAvailable(TaskCategory::Thesis).into();
        assert!(matches!(err, RuntimeError::Routing(_)));
        assert_eq!(err.to_string(), "No backend available for task category 'thesis'");

        let err: RuntimeError = ProviderError::AuthError.into();
        assert_eq!(err.to_string(), "Authentication failed");
    }

    #[test]
    fn test_default_registry_matches_features() {
        let registry = AdapterRegistry::with_defaults();
        assert_eq!(registry.has_kind(switchyard_core::ProviderKind::Groq), cfg!(feature = "groq"));
        assert_eq!(registry.has_kind(switchyard_core::ProviderKind::Gemini), cfg!(feature = "gemini"));
    }
}
