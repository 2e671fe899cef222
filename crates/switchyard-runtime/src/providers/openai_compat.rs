//! OpenAI-compatible chat completions adapter.
//!
//! Serves both Groq (whose API is OpenAI-compatible) and OpenAI itself; the
//! factory is parameterized by [`ProviderKind`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use switchyard_core::{BackendProfile, ProviderKind};

use super::{
    factory::AdapterFactory, secrets::ApiCredential, ChatMessage, ProviderAdapter, ProviderError,
    ProviderSettings,
};

/// Adapter for one backend on an OpenAI-compatible endpoint.
pub struct OpenAiCompatAdapter {
    label: String,
    credential: ApiCredential,
    base_url: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
    client: reqwest::Client,
}

impl std::fmt::Debug for OpenAiCompatAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCompatAdapter")
            .field("label", &self.label)
            .field("credential", &self.credential)
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

impl OpenAiCompatAdapter {
    pub fn new(
        profile: &BackendProfile,
        credential: ApiCredential,
        base_url: impl Into<String>,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| ProviderError::HttpError(e.to_string()))?;

        Ok(Self {
            label: format!("{}:{}", profile.kind, profile.model),
            credential,
            base_url: base_url.into(),
            model: profile.model.clone(),
            max_tokens: profile.max_output_tokens,
            temperature: profile.temperature,
            client,
        })
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

fn parse_chat_response(body: &str) -> Result<String, ProviderError> {
    let response: ChatResponse =
        serde_json::from_str(body).map_err(|e| ProviderError::ParseError(e.to_string()))?;

    let content = response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .unwrap_or_default();

    if content.trim().is_empty() {
        return Err(ProviderError::EmptyResponse);
    }
    Ok(content)
}

fn parse_error_message(body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.chars().take(200).collect())
}

#[async_trait]
impl ProviderAdapter for OpenAiCompatAdapter {
    async fn invoke(&self, prompt: &str, timeout: Duration) -> Result<String, ProviderError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage::user(prompt)],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        // Only expose the credential here, at the point of use
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(self.credential.expose())
            .timeout(timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(timeout)
                } else {
                    ProviderError::HttpError(e.to_string())
                }
            })?;

        let status = response.status();

        if status.as_u16() == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_secs);
            return Err(ProviderError::RateLimited { retry_after });
        }

        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(ProviderError::AuthError);
        }

        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::HttpError(e.to_string()))?;

        if !status.is_success() {
            return Err(ProviderError::ApiError {
                status: status.as_u16(),
                message: parse_error_message(&body),
            });
        }

        parse_chat_response(&body)
    }

    async fn health_check(&self) -> bool {
        !self.credential.is_empty()
    }

    fn name(&self) -> &str {
        &self.label
    }
}

/// Factory for OpenAI-compatible backends of one kind.
pub struct OpenAiCompatFactory {
    kind: ProviderKind,
}

impl OpenAiCompatFactory {
    pub fn new(kind: ProviderKind) -> Self {
        Self { kind }
    }
}

impl AdapterFactory for OpenAiCompatFactory {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn create(
        &self,
        profile: &BackendProfile,
        credential: ApiCredential,
        settings: &ProviderSettings,
    ) -> Result<Arc<dyn ProviderAdapter>, ProviderError> {
        let adapter = OpenAiCompatAdapter::new(profile, credential, settings.base_url_for(self.kind))?;
        Ok(Arc::new(adapter))
    }

    fn description(&self) -> &'static str {
        "OpenAI-compatible chat completions adapter"
    }
}
