//! Gemini image generation adapter
//!
//! Production `ImagePort` using the image-capable Gemini model. The reply's
//! inline image data is returned as a data URI that LaTeX toolchains with
//! data-URI support (or the editor front end) can resolve.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::domain::ImagePort;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const IMAGE_MODEL: &str = "gemini-2.0-flash-exp";

pub struct GeminiImageGen {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
}

impl GeminiImageGen {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: GEMINI_BASE_URL.to_string(),
        }
    }
}

#[async_trait]
impl ImagePort for GeminiImageGen {
    async fn generate(&self, description: &str) -> anyhow::Result<String> {
        let Some(api_key) = &self.api_key else {
            anyhow::bail!("no Google API key available for image generation");
        };

        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, IMAGE_MODEL, api_key
        );

        let body = json!({
            "contents": [{
                "role": "user",
                "parts": [{"text": format!("Generate an image: {description}")}]
            }],
            "generationConfig": {
                "responseModalities": ["TEXT", "IMAGE"]
            }
        });

        let response = self.client.post(&url).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("image generation returned status {status}");
        }

        let payload: Value = response.json().await?;
        extract_data_uri(&payload)
            .ok_or_else(|| anyhow::anyhow!("image generation response had no inline image"))
    }
}

/// Find the first inline image part in a generateContent response and
/// render it as a data URI.
fn extract_data_uri(payload: &Value) -> Option<String> {
    let parts = payload
        .get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .as_array()?;

    parts.iter().find_map(|part| {
        let inline = part.get("inlineData")?;
        let mime = inline.get("mimeType").and_then(Value::as_str)?;
        let data = inline.get("data").and_then(Value::as_str)?;
        Some(format!("data:{mime};base64,{data}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_first_inline_image() {
        let payload = json!({
            "candidates": [{
                "content": {
                    "parts": [
                        {"text": "Here is your figure."},
                        {"inlineData": {"mimeType": "image/png", "data": "QUJD"}}
                    ]
                }
            }]
        });
        assert_eq!(
            extract_data_uri(&payload).unwrap(),
            "data:image/png;base64,QUJD"
        );
    }

    #[test]
    fn text_only_response_yields_none() {
        let payload = json!({
            "candidates": [{"content": {"parts": [{"text": "no image"}]}}]
        });
        assert!(extract_data_uri(&payload).is_none());
    }

    #[tokio::test]
    async fn missing_key_is_an_error() {
        let images = GeminiImageGen::new(None);
        assert!(images.generate("a cat").await.is_err());
    }
}
