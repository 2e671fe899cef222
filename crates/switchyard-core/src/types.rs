//! Shared value types for backend routing.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Default number of fallback attempts after the first invocation.
pub const DEFAULT_MAX_FALLBACKS: u32 = 3;

/// Coarse classification of the work a prompt represents.
///
/// Used purely as a selection key when building fallback chains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskCategory {
    Research,
    Sentiment,
    Valuation,
    Thesis,
    Critique,
    General,
}

impl TaskCategory {
    /// Every category, in declaration order.
    pub const ALL: [TaskCategory; 6] = [
        TaskCategory::Research,
        TaskCategory::Sentiment,
        TaskCategory::Valuation,
        TaskCategory::Thesis,
        TaskCategory::Critique,
        TaskCategory::General,
    ];

    /// Stable lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskCategory::Research => "research",
            TaskCategory::Sentiment => "sentiment",
            TaskCategory::Valuation => "valuation",
            TaskCategory::Thesis => "thesis",
            TaskCategory::Critique => "critique",
            TaskCategory::General => "general",
        }
    }
}

impl fmt::Display for TaskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for TaskCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaskCategory::ALL
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                format!(
                    "unknown task category '{}', expected one of: research, sentiment, valuation, thesis, critique, general",
                    s
                )
            })
    }
}

/// Which provider family a backend talks to.
///
/// Resolved once at startup to pick an adapter factory; never inferred from
/// the backend key or model name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Groq,
    Gemini,
    OpenAi,
}

impl ProviderKind {
    /// Stable lowercase name, also used as the registry key.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Groq => "groq",
            ProviderKind::Gemini => "gemini",
            ProviderKind::OpenAi => "openai",
        }
    }

    /// Environment variable holding this provider's API key.
    pub fn credential_env(&self) -> &'static str {
        match self {
            ProviderKind::Groq => "GROQ_API_KEY",
            ProviderKind::Gemini => "GOOGLE_API_KEY",
            ProviderKind::OpenAi => "OPENAI_API_KEY",
        }
    }

    /// Default API endpoint.
    pub fn default_base_url(&self) -> &'static str {
        match self {
            ProviderKind::Groq => "https://api.groq.com/openai/v1",
            ProviderKind::Gemini => "https://generativelanguage.googleapis.com/v1beta",
            ProviderKind::OpenAi => "https://api.openai.com/v1",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Unique identifier of a backend in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BackendKey(String);

impl BackendKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BackendKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl From<&str> for BackendKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for BackendKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Borrow<str> for BackendKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// A single request to the orchestrator.
#[derive(Debug, Clone)]
pub struct ExecutionRequest {
    /// Prompt text sent verbatim to the provider
    pub prompt: String,

    /// Task category used to pick the fallback chain
    pub category: TaskCategory,

    /// Maximum acceptable cost per 1k tokens (soft filter)
    pub budget_limit: Option<f64>,

    /// Fallback attempts allowed after the first invocation
    pub max_fallbacks: u32,
}

impl ExecutionRequest {
    /// Create a request with no budget limit and the default fallback count.
    pub fn new(prompt: impl Into<String>, category: TaskCategory) -> Self {
        Self {
            prompt: prompt.into(),
            category,
            budget_limit: None,
            max_fallbacks: DEFAULT_MAX_FALLBACKS,
        }
    }

    pub fn with_budget_limit(mut self, limit: f64) -> Self {
        self.budget_limit = Some(limit);
        self
    }

    pub fn with_max_fallbacks(mut self, max_fallbacks: u32) -> Self {
        self.max_fallbacks = max_fallbacks;
        self
    }

    /// Upper bound on provider invocations for this request.
    pub fn max_attempts(&self) -> usize {
        self.max_fallbacks as usize + 1
    }
}

/// Outcome of an execution, returned even when every attempt failed.
///
/// An exhausted execution has empty `content`, no `backend`, and a non-empty
/// `errors` list. Callers must check [`ExecutionResult::is_exhausted`].
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionResult {
    /// Text returned by the provider (empty when exhausted)
    pub content: String,

    /// Backend that produced `content`
    pub backend: Option<BackendKey>,

    /// Total wall time across all attempts
    #[serde(serialize_with = "serialize_millis")]
    pub elapsed: Duration,

    /// Estimated cost in USD
    pub cost_estimate: f64,

    /// Heuristic trustworthiness in [0, 1]
    pub confidence: f64,

    /// Provider invocations made
    pub attempts: u32,

    /// Error text from each failed attempt, in order
    pub errors: Vec<String>,
}

impl ExecutionResult {
    /// Build the result for a request where nothing succeeded.
    pub fn exhausted(elapsed: Duration, attempts: u32, errors: Vec<String>) -> Self {
        Self {
            content: String::new(),
            backend: None,
            elapsed,
            cost_estimate: 0.0,
            confidence: 0.0,
            attempts,
            errors,
        }
    }

    /// True when no attempt produced content.
    pub fn is_exhausted(&self) -> bool {
        self.content.is_empty()
    }
}

fn serialize_millis<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_u64(duration.as_millis() as u64)
}
