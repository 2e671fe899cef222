//! Adapter factories keyed by [`ProviderKind`].
//!
//! The registry is consulted once at startup to build one adapter per
//! backend; nothing is re-resolved per call.
//!
//! ## Usage
//!
//! ```ignore
//! let registry = AdapterRegistry::with_defaults();
//! let adapter = registry.create(&profile, credential, &settings)?;
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use switchyard_core::{BackendProfile, ProviderKind};

use super::{ApiCredential, ProviderAdapter, ProviderError, ProviderSettings};

/// Builds adapters for one provider kind.
pub trait AdapterFactory: Send + Sync {
    /// Kind served by this factory.
    fn kind(&self) -> ProviderKind;

    /// Build the adapter for one backend.
    fn create(
        &self,
        profile: &BackendProfile,
        credential: ApiCredential,
        settings: &ProviderSettings,
    ) -> Result<Arc<dyn ProviderAdapter>, ProviderError>;

    /// Validate settings without building anything.
    fn validate_settings(&self, settings: &ProviderSettings) -> Result<(), ProviderError> {
        if let Some(url) = settings.base_url.as_deref() {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ProviderError::NotConfigured(format!(
                    "{} base_url must start with http:// or https://",
                    self.kind()
                )));
            }
        }
        Ok(())
    }

    /// Human-readable description.
    fn description(&self) -> &'static str {
        "Provider adapter"
    }
}

/// Registry of adapter factories.
#[derive(Default)]
pub struct AdapterRegistry {
    factories: BTreeMap<ProviderKind, Arc<dyn AdapterFactory>>,
}

impl AdapterRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory, replacing any existing one for the same kind.
    pub fn register(&mut self, factory: Arc<dyn AdapterFactory>) {
        self.factories.insert(factory.kind(), factory);
    }

    /// Build an adapter for `profile`.
    pub fn create(
        &self,
        profile: &BackendProfile,
        credential: ApiCredential,
        settings: &ProviderSettings,
    ) -> Result<Arc<dyn ProviderAdapter>, ProviderError> {
        let factory = self.factories.get(&profile.kind).ok_or_else(|| {
            ProviderError::NotConfigured(format!(
                "No adapter registered for provider kind '{}'. Available: {:?}",
                profile.kind,
                self.kinds()
            ))
        })?;
        factory.validate_settings(settings)?;
        factory.create(profile, credential, settings)
    }

    /// Validate settings for a kind.
    pub fn validate(&self, kind: ProviderKind, settings: &ProviderSettings) -> Result<(), ProviderError> {
        self.factories
            .get(&kind)
            .ok_or_else(|| ProviderError::NotConfigured(format!("No adapter registered for '{}'", kind)))?
            .validate_settings(settings)
    }

    /// Registered kinds.
    pub fn kinds(&self) -> Vec<ProviderKind> {
        self.factories.keys().copied().collect()
    }

    pub fn has_kind(&self, kind: ProviderKind) -> bool {
        self.factories.contains_key(&kind)
    }

    /// Registered kinds with their factory descriptions.
    pub fn descriptions(&self) -> Vec<(ProviderKind, &'static str)> {
        self.factories
            .iter()
            .map(|(kind, factory)| (*kind, factory.description()))
            .collect()
    }

    /// Registry with every adapter compiled into this build.
    pub fn with_defaults() -> Self {
        #[allow(unused_mut)]
        let mut registry = Self::new();

        #[cfg(feature = "groq")]
        registry.register(Arc::new(super::OpenAiCompatFactory::new(ProviderKind::Groq)));

        #[cfg(feature = "openai")]
        registry.register(Arc::new(super::OpenAiCompatFactory::new(ProviderKind::OpenAi)));

        #[cfg(feature = "gemini")]
        registry.register(Arc::new(super::GeminiFactory));

        registry
    }
}

impl std::fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}
