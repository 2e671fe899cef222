//! Google Gemini `generateContent` adapter.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use switchyard_core::{BackendProfile, ProviderKind};

use super::{
    factory::AdapterFactory, secrets::ApiCredential, ProviderAdapter, ProviderError,
    ProviderSettings,
};

/// Adapter for one Gemini model.
pub struct GeminiAdapter {
    label: String,
    credential: ApiCredential,
    base_url: String,
    model: String,
    max_output_tokens: u32,
    temperature: f32,
    client: reqwest::Client,
}

impl std::fmt::Debug for GeminiAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiAdapter")
            .field("credential", &self.credential)
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

impl GeminiAdapter {
    pub fn new(
        profile: &BackendProfile,
        credential: ApiCredential,
        base_url: impl Into<String>,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| ProviderError::HttpError(e.to_string()))?;

        Ok(Self {
            label: format!("gemini:{}", profile.model),
            credential,
            base_url: base_url.into(),
            model: profile.model.clone(),
            max_output_tokens: profile.max_output_tokens,
            temperature: profile.temperature,
            client,
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

fn parse_generate_response(body: &str) -> Result<String, ProviderError> {
    let response: GenerateResponse =
        serde_json::from_str(body).map_err(|e| ProviderError::ParseError(e.to_string()))?;

    let text = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| {
            c.parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(ProviderError::EmptyResponse);
    }
    Ok(text)
}

#[async_trait]
impl ProviderAdapter for GeminiAdapter {
    async fn invoke(&self, prompt: &str, timeout: Duration) -> Result<String, ProviderError> {
        let request = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
                max_output_tokens: self.max_output_tokens,
            },
        };

        let response = self
            .client
            .post(format!("{}/models/{}:generateContent", self.base_url, self.model))
            .header("x-goog-api-key", self.credential.expose())
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
            return Err(ProviderError::RateLimited { retry_after: None });
        }
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(ProviderError::AuthError);
        }

        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::HttpError(e.to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorBody>(&body)
                .map(|e| e.error.message)
                .unwrap_or_else(|_| body.chars().take(200).collect());
            return Err(ProviderError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        parse_generate_response(&body)
    }

    async fn health_check(&self) -> bool {
        !self.credential.is_empty()
    }

    fn name(&self) -> &str {
        &self.label
    }
}

/// Factory for Gemini backends.
pub struct GeminiFactory;

impl AdapterFactory for GeminiFactory {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Gemini
    }

    fn create(
        &self,
        profile: &BackendProfile,
        credential: ApiCredential,
        settings: &ProviderSettings,
    ) -> Result<Arc<dyn ProviderAdapter>, ProviderError> {
        let adapter = GeminiAdapter::new(profile, credential, settings.base_url_for(ProviderKind::Gemini))?;
        Ok(Arc::new(adapter))
    }

    fn description(&self) -> &'static str {
        "Google Gemini generateContent adapter"
    }
}
