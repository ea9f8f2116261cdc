//! Exa web search adapter
//!
//! Production `SearchPort` backed by the Exa `/search` endpoint. A missing
//! key or an API failure degrades to zero hits so a plan can always finish.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::domain::{SearchHit, SearchPort};

const EXA_SEARCH_URL: &str = "https://api.exa.ai/search";
const RESULTS_PER_QUERY: u32 = 5;
const SNIPPET_CHARS: usize = 220;

pub struct ExaSearch {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExaRequest<'a> {
    query: &'a str,
    num_results: u32,
    #[serde(rename = "type")]
    search_type: &'a str,
    contents: ExaContents,
}

#[derive(Serialize)]
struct ExaContents {
    text: bool,
}

impl ExaSearch {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: EXA_SEARCH_URL.to_string(),
        }
    }
}

#[async_trait]
impl SearchPort for ExaSearch {
    async fn search(&self, query: &str) -> anyhow::Result<Vec<SearchHit>> {
        let Some(api_key) = &self.api_key else {
            tracing::debug!("No Exa API key, returning zero hits");
            return Ok(Vec::new());
        };

        let body = ExaRequest {
            query,
            num_results: RESULTS_PER_QUERY,
            search_type: "neural",
            contents: ExaContents { text: true },
        };

        let response = self
            .client
            .post(&self.base_url)
            .header("x-api-key", api_key)
            .json(&body)
            .send()
            .await;

        let response = match response {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("Exa search request failed: {}", e);
                return Ok(Vec::new());
            }
        };

        if !response.status().is_success() {
            tracing::warn!("Exa search returned status {}", response.status());
            return Ok(Vec::new());
        }

        let payload: Value = match response.json().await {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!("Exa search response unparseable: {}", e);
                return Ok(Vec::new());
            }
        };

        Ok(parse_results(&payload))
    }
}

/// Extract hits from the Exa response body. Hits without a url are dropped;
/// the snippet is the page text truncated to a preview length.
fn parse_results(payload: &Value) -> Vec<SearchHit> {
    payload
        .get("results")
        .and_then(Value::as_array)
        .map(|results| {
            results
                .iter()
                .filter_map(|result| {
                    let url = result.get("url").and_then(Value::as_str)?;
                    if url.is_empty() {
                        return None;
                    }
                    let title = result
                        .get("title")
                        .and_then(Value::as_str)
                        .unwrap_or("Untitled")
                        .to_string();
                    let snippet = result
                        .get("text")
                        .and_then(Value::as_str)
                        .map(|text| text.chars().take(SNIPPET_CHARS).collect())
                        .unwrap_or_default();
                    Some(SearchHit {
                        title,
                        url: url.to_string(),
                        snippet,
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}
