//! LLM provider implementations
//!
//! A unified non-streaming completion interface over the providers the
//! editor supports (Gemini, Groq). Orchestration streams its own progress
//! events; individual completions are awaited whole.

mod gemini;
mod groq;

pub use gemini::GeminiProvider;
pub use groq::GroqProvider;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::config::{Credentials, ProviderKind, RuntimeConfig};
use super::error::{LlmError, LlmResult};

/// Role of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A chat message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Request for an LLM completion
#[derive(Debug, Clone, Default)]
pub struct CompletionRequest {
    pub messages: Vec<Message>,
    pub temperature: Option<f32>,
}

/// Response from an LLM completion.
///
/// `content` is kept as raw JSON because providers disagree on shape;
/// callers run it through [`crate::agents::normalize::extract_text`].
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub content: Value,
}

/// Trait for LLM providers
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Get the provider name
    fn name(&self) -> &str;

    /// Get the model being used
    fn model(&self) -> &str;

    /// Complete a request
    async fn complete(&self, request: CompletionRequest) -> LlmResult<CompletionResponse>;
}

/// Factory seam for per-role provider creation.
///
/// The orchestrators resolve one provider per role per request; tests
/// substitute scripted implementations.
pub trait LlmFactory: Send + Sync {
    fn provider(&self, role: &str, config: &RuntimeConfig) -> LlmResult<Arc<dyn LlmProvider>>;
}

/// Pick the provider that actually has a usable key. A groq request without
/// a Groq key degrades to gemini when a Google key exists, and vice versa.
pub fn resolve_provider(requested: ProviderKind, credentials: &Credentials) -> ProviderKind {
    let has_google = credentials.google_key().is_some();
    let has_groq = credentials.groq_key().is_some();

    match requested {
        ProviderKind::Groq if !has_groq && has_google => ProviderKind::Gemini,
        ProviderKind::Gemini if !has_google && has_groq => ProviderKind::Groq,
        other => other,
    }
}

/// Create a provider for one role from the request's runtime configuration.
pub fn create_provider(
    role: &str,
    config: &RuntimeConfig,
) -> LlmResult<Arc<dyn LlmProvider>> {
    let model_config = config.model_config(role);
    let requested = model_config.provider.unwrap_or_default();

    match resolve_provider(requested, &config.credentials) {
        ProviderKind::Gemini => {
            let api_key = config.credentials.google_key().ok_or_else(|| {
                LlmError::Authentication(
                    "No Google API key in request or GOOGLE_API_KEY environment".to_string(),
                )
            })?;
            let model = model_config
                .model
                .clone()
                .unwrap_or_else(|| config.gemini_default_model.clone());
            Ok(Arc::new(GeminiProvider::new(api_key, model, model_config.temperature)))
        }
        ProviderKind::Groq => {
            let api_key = config.credentials.groq_key().ok_or_else(|| {
                LlmError::Authentication(
                    "No Groq API key in request or GROQ_API_KEY environment".to_string(),
                )
            })?;
            let model = model_config
                .model
                .clone()
                .unwrap_or_else(|| config.groq_default_model.clone());
            Ok(Arc::new(GroqProvider::new(api_key, model, model_config.temperature)))
        }
    }
}

/// Default factory backed by [`create_provider`]
pub struct RuntimeLlmFactory;

impl LlmFactory for RuntimeLlmFactory {
    fn provider(&self, role: &str, config: &RuntimeConfig) -> LlmResult<Arc<dyn LlmProvider>> {
        create_provider(role, config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials(google: bool, groq: bool) -> Credentials {
        Credentials {
            google_api_key: google.then(|| "gk".to_string()),
            groq_api_key: groq.then(|| "qk".to_string()),
            exa_api_key: None,
        }
    }

    #[test]
    fn resolve_provider_falls_back_to_available_key() {
        let only_google = credentials(true, false);
        assert_eq!(
            resolve_provider(ProviderKind::Groq, &only_google),
            ProviderKind::Gemini
        );

        let only_groq = credentials(false, true);
        assert_eq!(
            resolve_provider(ProviderKind::Gemini, &only_groq),
            ProviderKind::Groq
        );
    }

    #[test]
    fn resolve_provider_honors_request_when_key_present() {
        let both = credentials(true, true);
        assert_eq!(
            resolve_provider(ProviderKind::Groq, &both),
            ProviderKind::Groq
        );
        assert_eq!(
            resolve_provider(ProviderKind::Gemini, &both),
            ProviderKind::Gemini
        );
    }
}
