//! Execution engine with bounded, ordered fallback.
//!
//! For each request the orchestrator:
//! - Picks the first backend with the [`Selector`]
//! - Invokes it under the per-attempt timeout
//! - On failure, walks the category's fallback chain in order, skipping
//!   backends already tried or no longer available
//! - Stops at the first content or after `max_fallbacks + 1` invocations
//!
//! Attempts within one request are strictly sequential. Provider failures
//! never surface as `Err`; they are collected into
//! [`ExecutionResult::errors`]. Only configuration errors
//! ([`RoutingError`]) are returned as errors.

use chrono::Utc;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use switchyard_core::{
    BackendDescriptor, BackendKey, BackendProfile, Catalog, ChainSet, ExecutionRequest,
    ExecutionResult, FallbackChain, Grader, QuarantinePolicy, RoutingError, Selector,
    StatusReport, StatusReporter, TaskCategory, DEFAULT_MAX_FALLBACKS,
};

use crate::config::{validate_quarantine, ConfigError, RuntimeConfig, DEFAULT_ATTEMPT_TIMEOUT};
use crate::providers::{AdapterRegistry, CredentialStore, ProviderAdapter, ProviderError};
use crate::resilience::{HealthMonitor, HealthReport, UsageLedger, UsageSummary};
use crate::RuntimeError;

/// Catalog snapshot plus process-wide usage.
#[derive(Debug, Clone, Serialize)]
pub struct OrchestratorStatus {
    #[serde(flatten)]
    pub catalog: StatusReport,

    pub usage: UsageSummary,
}

/// Routes prompts to provider backends.
///
/// Share it behind an `Arc`; every method takes `&self`.
pub struct Orchestrator {
    catalog: Arc<Catalog>,
    chains: ChainSet,
    adapters: HashMap<BackendKey, Arc<dyn ProviderAdapter>>,
    attempt_timeout: Duration,
    default_max_fallbacks: u32,
    usage: UsageLedger,
    health: HealthMonitor,
}

impl Orchestrator {
    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::new()
    }

    /// Build from configuration, resolving one adapter per backend.
    ///
    /// A backend is available only if its provider's credential is present
    /// and an adapter could be built for it. Otherwise it is registered as
    /// unconfigured and never appears in a chain.
    pub fn from_config(
        config: RuntimeConfig,
        registry: &AdapterRegistry,
        credentials: &dyn CredentialStore,
    ) -> Result<Self, RuntimeError> {
        config.validate()?;

        for (kind, description) in registry.descriptions() {
            tracing::debug!(kind = %kind, adapter = description, "Adapter factory registered");
        }
        // A malformed endpoint is a setup error, not a reason to quietly drop backends
        for (kind, settings) in &config.providers {
            if registry.has_kind(*kind) {
                registry.validate(*kind, settings)?;
            }
        }

        let mut builder = OrchestratorBuilder::new().config(&config);

        for profile in &config.backends {
            let Some(credential) = credentials.credential(profile.kind) else {
                tracing::debug!(
                    backend = %profile.key,
                    env = profile.kind.credential_env(),
                    "No credential, backend unconfigured"
                );
                builder = builder.unconfigured(profile.clone());
                continue;
            };

            match registry.create(profile, credential, &config.provider(profile.kind)) {
                Ok(adapter) => builder = builder.backend(profile.clone(), adapter),
                Err(e) => {
                    tracing::warn!(
                        backend = %profile.key,
                        kind = %profile.kind,
                        error = %e,
                        "Could not build adapter, backend unconfigured"
                    );
                    builder = builder.unconfigured(profile.clone());
                }
            }
        }

        let orchestrator = builder.build()?;
        orchestrator.log_summary();
        Ok(orchestrator)
    }

    fn log_summary(&self) {
        let available = self.catalog.list_available(None);
        tracing::info!(
            available = available.len(),
            total = self.catalog.len(),
            "Orchestrator ready"
        );
        for (category, chain) in self.chains.chains(&self.catalog).iter() {
            match chain.primary() {
                Some(primary) => tracing::info!(
                    category = %category,
                    primary = %primary,
                    fallbacks = chain.len().saturating_sub(1),
                    "Fallback chain"
                ),
                None => tracing::warn!(category = %category, "No backend available for category"),
            }
        }
    }

    /// Run a prompt with the configured default fallback count.
    pub async fn execute_prompt(
        &self,
        prompt: impl Into<String>,
        category: TaskCategory,
    ) -> Result<ExecutionResult, RoutingError> {
        let request =
            ExecutionRequest::new(prompt, category).with_max_fallbacks(self.default_max_fallbacks);
        self.execute(&request).await
    }

    /// Run one request.
    ///
    /// Returns `Err` only when no backend is available for the category.
    /// When every attempt fails the result is exhausted: empty content and
    /// one error string per failed attempt.
    pub async fn execute(&self, request: &ExecutionRequest) -> Result<ExecutionResult, RoutingError> {
        let started = Instant::now();
        let chain = self.chains.chain(&self.catalog, request.category);
        let selection =
            Selector::select(&self.catalog, &chain, request.budget_limit, Utc::now())?;

        if selection.budget_relaxed {
            tracing::debug!(
                category = %request.category,
                budget_limit = ?request.budget_limit,
                backend = %selection.key,
                "Budget limit relaxed"
            );
        }

        let max_attempts = request.max_attempts();
        let mut tried: HashSet<BackendKey> = HashSet::new();
        let mut errors: Vec<String> = Vec::new();
        let mut attempts: u32 = 0;

        let order = std::iter::once(selection.key).chain(chain.keys.iter().cloned());

        for key in order {
            if attempts as usize >= max_attempts {
                break;
            }
            if !tried.insert(key.clone()) {
                continue;
            }

            // Another request may have quarantined it since the chain was built
            let descriptor = self.catalog.get(&key)?;
            if !descriptor.is_available() {
                tracing::debug!(backend = %key, "Skipping unavailable backend");
                continue;
            }

            let Some(adapter) = self.adapters.get(&key) else {
                tracing::warn!(backend = %key, "No adapter for available backend");
                errors.push(format!("No adapter registered for {}", key));
                continue;
            };

            attempts += 1;
            tracing::debug!(attempt = attempts, backend = %key, "Invoking backend");

            let attempt_started = Instant::now();
            let outcome = self.invoke(adapter.as_ref(), &request.prompt).await;
            let attempt_elapsed = attempt_started.elapsed();

            match outcome {
                Ok(content) => {
                    self.catalog.record_success(&key, attempt_elapsed)?;
                    return Ok(self.complete(request, &descriptor, content, attempts, attempt_elapsed, errors, started));
                }
                Err(e) => {
                    tracing::warn!(
                        attempt = attempts,
                        backend = %key,
                        elapsed_ms = attempt_elapsed.as_millis() as u64,
                        error = %e,
                        "Attempt failed"
                    );
                    self.catalog.record_failure(&key)?;
                    self.catalog.maybe_quarantine(&key)?;
                    self.usage.record_call(&key, false, 0.0);
                    errors.push(format!("Attempt {} failed with {}: {}", attempts, key, e));
                }
            }
        }

        if errors.is_empty() {
            errors.push(format!(
                "No available backend remained in the {} chain",
                request.category
            ));
        }

        let result = ExecutionResult::exhausted(started.elapsed(), attempts, errors);
        tracing::warn!(
            category = %request.category,
            attempts = result.attempts,
            elapsed_ms = result.elapsed.as_millis() as u64,
            "All attempts exhausted"
        );
        self.usage.record_request(&result);
        Ok(result)
    }

    /// One provider call under the attempt timeout. Blank text is a failure.
    async fn invoke(&self, adapter: &dyn ProviderAdapter, prompt: &str) -> Result<String, ProviderError> {
        match tokio::time::timeout(self.attempt_timeout, adapter.invoke(prompt, self.attempt_timeout)).await {
            Ok(Ok(text)) if text.trim().is_empty() => Err(ProviderError::EmptyResponse),
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout(self.attempt_timeout)),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn complete(
        &self,
        request: &ExecutionRequest,
        descriptor: &BackendDescriptor,
        content: String,
        attempts: u32,
        attempt_elapsed: Duration,
        errors: Vec<String>,
        started: Instant,
    ) -> ExecutionResult {
        let profile = &descriptor.profile;
        let confidence = Grader::confidence(profile, attempt_elapsed, attempts.saturating_sub(1));
        let cost_estimate = Grader::cost(&request.prompt, &content, profile.cost_per_k_tokens);

        self.usage.record_call(descriptor.key(), true, cost_estimate);

        let result = ExecutionResult {
            content,
            backend: Some(descriptor.key().clone()),
            elapsed: started.elapsed(),
            cost_estimate,
            confidence,
            attempts,
            errors,
        };

        tracing::info!(
            category = %request.category,
            backend = %descriptor.key(),
            attempts,
            elapsed_ms = result.elapsed.as_millis() as u64,
            confidence,
            "Execution succeeded"
        );
        self.usage.record_request(&result);
        result
    }

    /// Catalog snapshot plus usage. Never mutates anything.
    pub fn status(&self) -> OrchestratorStatus {
        OrchestratorStatus {
            catalog: StatusReporter::snapshot(&self.catalog),
            usage: self.usage.summary(),
        }
    }

    /// Health-check every adapter concurrently.
    pub async fn health_check(&self) -> HealthReport {
        self.health.check(&self.adapters).await
    }

    /// Return a quarantined backend to service.
    pub fn reinstate(&self, key: &BackendKey) -> Result<bool, RoutingError> {
        self.catalog.reinstate(key)
    }

    /// Current fallback chain for `category`.
    pub fn chain(&self, category: TaskCategory) -> FallbackChain {
        self.chains.chain(&self.catalog, category)
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn usage(&self) -> UsageSummary {
        self.usage.summary()
    }

    pub fn reset_usage(&self) {
        self.usage.reset();
    }

    pub fn attempt_timeout(&self) -> Duration {
        self.attempt_timeout
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("catalog", &self.catalog)
            .field("adapters", &self.adapters.len())
            .field("attempt_timeout", &self.attempt_timeout)
            .finish()
    }
}

/// Builder for [`Orchestrator`].
pub struct OrchestratorBuilder {
    attempt_timeout: Duration,
    default_max_fallbacks: u32,
    policy: QuarantinePolicy,
    entries: Vec<(BackendProfile, Option<Arc<dyn ProviderAdapter>>)>,
}

impl OrchestratorBuilder {
    pub fn new() -> Self {
        Self {
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
            default_max_fallbacks: DEFAULT_MAX_FALLBACKS,
            policy: QuarantinePolicy::default(),
            entries: Vec::new(),
        }
    }

    /// Take timeout, fallback count and quarantine policy from `config`.
    /// Backends are added separately.
    pub fn config(mut self, config: &RuntimeConfig) -> Self {
        self.attempt_timeout = config.attempt_timeout;
        self.default_max_fallbacks = config.default_max_fallbacks;
        self.policy = config.quarantine;
        self
    }

    pub fn attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    pub fn default_max_fallbacks(mut self, max_fallbacks: u32) -> Self {
        self.default_max_fallbacks = max_fallbacks;
        self
    }

    pub fn quarantine(mut self, policy: QuarantinePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Add an available backend served by `adapter`.
    pub fn backend(mut self, profile: BackendProfile, adapter: Arc<dyn ProviderAdapter>) -> Self {
        self.entries.push((profile, Some(adapter)));
        self
    }

    /// Add a backend that has no credential.
    pub fn unconfigured(mut self, profile: BackendProfile) -> Self {
        self.entries.push((profile, None));
        self
    }

    /// Build the orchestrator.
    pub fn build(self) -> Result<Orchestrator, RuntimeError> {
        if self.attempt_timeout.is_zero() {
            return Err(RuntimeError::Config(ConfigError::Invalid(
                "attempt_timeout must be greater than zero".to_string(),
            )));
        }
        validate_quarantine(&self.policy)?;

        let catalog = Arc::new(Catalog::new(self.policy));
        let mut adapters = HashMap::new();

        for (profile, adapter) in self.entries {
            let key = profile.key.clone();
            catalog.register(BackendDescriptor::new(profile, adapter.is_some()))?;
            if let Some(adapter) = adapter {
                adapters.insert(key, adapter);
            }
        }

        Ok(Orchestrator {
            catalog,
            chains: ChainSet::new(),
            adapters,
            attempt_timeout: self.attempt_timeout,
            default_max_fallbacks: self.default_max_fallbacks,
            usage: UsageLedger::new(),
            health: HealthMonitor::new(self.attempt_timeout),
        })
    }
}

impl Default for OrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
