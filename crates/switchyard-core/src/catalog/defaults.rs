//! Built-in backend table.

use std::collections::BTreeSet;

use super::BackendProfile;
use crate::types::{BackendKey, ProviderKind, TaskCategory};

use crate::types::TaskCategory::{Critique, General, Research, Sentiment, Thesis, Valuation};

#[allow(clippy::too_many_arguments)]
fn entry(
    key: &str,
    name: &str,
    kind: ProviderKind,
    model: &str,
    speed: f64,
    quality: f64,
    reliability: f64,
    cost_per_k_tokens: f64,
    specialties: &[TaskCategory],
) -> BackendProfile {
    BackendProfile {
        key: BackendKey::from(key),
        name: name.to_string(),
        kind,
        model: model.to_string(),
        speed,
        quality,
        reliability,
        cost_per_k_tokens,
        max_output_tokens: 8192,
        temperature: 0.7,
        task_specialties: specialties.iter().copied().collect::<BTreeSet<_>>(),
    }
}

/// Default backend profiles, in catalog insertion order.
pub fn builtin_profiles() -> Vec<BackendProfile> {
    vec![
        entry(
            "gemini-2.5-flash",
            "Gemini 2.5 Flash",
            ProviderKind::Gemini,
            "gemini-2.5-flash",
            9.0,
            9.5,
            0.92,
            0.0005,
            &TaskCategory::ALL,
        ),
        entry(
            "groq/deepseek-r1-distill-llama-70b",
            "Groq DeepSeek R1 Distill Llama-70B",
            ProviderKind::Groq,
            "deepseek-r1-distill-llama-70b",
            9.2,
            8.8,
            0.94,
            0.0006,
            &[Research, Valuation, Thesis, Critique],
        ),
        entry(
            "groq/llama-3.3-70b-versatile",
            "Groq Llama 3.3-70B Versatile",
            ProviderKind::Groq,
            "llama-3.3-70b-versatile",
            8.8,
            9.0,
            0.93,
            0.0007,
            &TaskCategory::ALL,
        ),
        entry(
            "groq/llama3.1-70b-8192",
            "Groq Llama3.1-70B",
            ProviderKind::Groq,
            "llama-3.1-70b-versatile",
            9.0,
            8.5,
            0.95,
            0.0007,
            &[Research, Valuation, Thesis],
        ),
        entry(
            "groq/llama3.1-8b-8192",
            "Groq Llama3.1-8B",
            ProviderKind::Groq,
            "llama-3.1-8b-instant",
            9.5,
            7.0,
            0.98,
            0.0002,
            &[Sentiment, General],
        ),
        entry(
            "groq/mixtral-8x7b-32768",
            "Groq Mixtral-8x7B",
            ProviderKind::Groq,
            "mixtral-8x7b-32768",
            9.3,
            8.0,
            0.96,
            0.0003,
            &[Research, Sentiment, General],
        ),
        entry(
            "gemini-2.0-flash",
            "Gemini 2.0 Flash",
            ProviderKind::Gemini,
            "gemini-2.0-flash",
            8.5,
            8.5,
            0.90,
            0.0004,
            &[Research, Sentiment, General],
        ),
        entry(
            "gemini-1.5-flash",
            "Gemini 1.5 Flash",
            ProviderKind::Gemini,
            "gemini-1.5-flash",
            8.0,
            8.0,
            0.88,
            0.0003,
            &[Research, Sentiment, General],
        ),
    ]
}
