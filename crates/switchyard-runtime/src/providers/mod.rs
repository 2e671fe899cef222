//! Provider adapters: the uniform "send prompt, get text" call.
//!
//! One adapter instance is built per backend at startup by the
//! [`AdapterRegistry`], keyed by the backend's [`ProviderKind`]. The engine
//! treats any error, any timeout and any empty response the same way.
//!
//! ## Security
//!
//! All adapters hold their key as an [`ApiCredential`]; see [`secrets`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use switchyard_core::ProviderKind;

mod factory;
pub mod secrets;

#[cfg(any(feature = "groq", feature = "openai"))]
mod openai_compat;

#[cfg(feature = "gemini")]
mod gemini;

#[cfg(test)]
pub(crate) mod scripted;

pub use factory::{AdapterFactory, AdapterRegistry};
pub use secrets::{ApiCredential, CredentialOrigin, CredentialStore, EnvCredentials, StaticCredentials};

#[cfg(any(feature = "groq", feature = "openai"))]
pub use openai_compat::{OpenAiCompatAdapter, OpenAiCompatFactory};

#[cfg(feature = "gemini")]
pub use gemini::{GeminiAdapter, GeminiFactory};

/// Errors from provider adapters.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    #[error("Rate limit exceeded, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    ParseError(String),

    #[error("Authentication failed")]
    AuthError,

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Provider returned an empty response")]
    EmptyResponse,

    #[error("Provider not configured: {0}")]
    NotConfigured(String),
}

/// Per-kind settings from configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    /// Override for the kind's default endpoint
    pub base_url: Option<String>,
}

impl ProviderSettings {
    /// Configured endpoint, or the kind's default.
    pub fn base_url_for(&self, kind: ProviderKind) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| kind.default_base_url().to_string())
            .trim_end_matches('/')
            .to_string()
    }
}

/// A chat message for chat-style APIs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role: "system", "user", or "assistant"
    pub role: String,

    /// Message content
    pub content: String,
}

impl ChatMessage {
    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Uniform call into one backend.
///
/// Implementations should honor `timeout` on their own transport; the
/// engine also enforces it from the outside.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Send `prompt` and return the generated text.
    async fn invoke(&self, prompt: &str, timeout: Duration) -> Result<String, ProviderError>;

    /// Cheap readiness check that does not spend tokens.
    async fn health_check(&self) -> bool;

    /// Adapter name for logs.
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_defaults_per_kind() {
        let settings = ProviderSettings::default();
        assert_eq!(
            settings.base_url_for(ProviderKind::Groq),
            "https://api.groq.com/openai/v1"
        );

        let custom = ProviderSettings {
            base_url: Some("http://localhost:8080/v1/".to_string()),
        };
        assert_eq!(custom.base_url_for(ProviderKind::OpenAi), "http://localhost:8080/v1");
    }

    #[test]
    fn test_error_display() {
        let err = ProviderError::ApiError {
            status: 503,
            message: "overloaded".to_string(),
        };
        assert_eq!(err.to_string(), "API error: 503 - overloaded");
        assert!(ProviderError::EmptyResponse.to_string().contains("empty"));
    }
}
