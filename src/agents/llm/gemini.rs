//! Google Gemini LLM provider

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{CompletionRequest, CompletionResponse, LlmProvider, Message, Role};
use crate::agents::error::{LlmError, LlmResult};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Google Gemini provider
pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    default_temperature: Option<f32>,
}

impl GeminiProvider {
    /// Create a new Gemini provider
    pub fn new(api_key: String, model: String, temperature: Option<f32>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            model,
            default_temperature: temperature,
        }
    }

    /// Override the API base URL (tests point this at a local server)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Build the request body for the generateContent API
    fn build_request_body(&self, request: &CompletionRequest) -> Value {
        let mut body = json!({
            "contents": convert_messages(&request.messages),
        });

        if let Some(temp) = request.temperature.or(self.default_temperature) {
            body["generationConfig"] = json!({ "temperature": temp });
        }

        body
    }
}

/// Convert internal messages to Gemini format.
///
/// Gemini has no system role; system content is folded into the first user
/// turn as a bracketed instruction block.
fn convert_messages(messages: &[Message]) -> Vec<Value> {
    let mut contents = Vec::new();
    let mut system_instruction: Option<String> = None;

    for m in messages {
        match m.role {
            Role::System => {
                system_instruction = Some(m.content.clone());
            }
            Role::User => {
                let mut parts = vec![json!({ "text": m.content })];
                if let Some(sys) = system_instruction.take() {
                    parts.insert(
                        0,
                        json!({ "text": format!("[System Instructions]\n{}\n\n", sys) }),
                    );
                }
                contents.push(json!({ "role": "user", "parts": parts }));
            }
            Role::Assistant => {
                if !m.content.is_empty() {
                    contents.push(json!({
                        "role": "model",
                        "parts": [{ "text": m.content }]
                    }));
                }
            }
        }
    }

    contents
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: CompletionRequest) -> LlmResult<CompletionResponse> {
        let body = self.build_request_body(&request);
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                message: error_text,
            });
        }

        let gemini_response: GeminiResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Parse(format!("Failed to parse response: {}", e)))?;

        let candidate = gemini_response
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::Parse("No candidates in response".to_string()))?;

        let mut content = String::new();
        if let Some(parts) = candidate.content.parts {
            for part in parts {
                if let Some(text) = part.text {
                    content.push_str(&text);
                }
            }
        }

        Ok(CompletionResponse {
            content: Value::String(content),
        })
    }
}

// Gemini API response types

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: GeminiContent,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    parts: Option<Vec<GeminiPart>>,
}

#[derive(Debug, Deserialize)]
struct GeminiPart {
    text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_prompt_folds_into_first_user_turn() {
        let contents = convert_messages(&[
            Message::system("be terse"),
            Message::user("hello"),
        ]);
        assert_eq!(contents.len(), 1);
        let parts = contents[0]["parts"].as_array().unwrap();
        assert_eq!(parts.len(), 2);
        assert!(parts[0]["text"]
            .as_str()
            .unwrap()
            .starts_with("[System Instructions]"));
        assert_eq!(parts[1]["text"], "hello");
    }

    #[test]
    fn temperature_lands_in_generation_config() {
        let provider = GeminiProvider::new("k".to_string(), "m".to_string(), Some(0.3));
        let body = provider.build_request_body(&CompletionRequest {
            messages: vec![Message::user("x")],
            temperature: None,
        });
        assert_eq!(body["generationConfig"]["temperature"], 0.3);
    }
}
