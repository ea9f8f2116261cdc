//! Ports the orchestration core depends on.
//!
//! Adapters in `crate::adapters` supply production implementations; tests
//! substitute in-memory fakes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One web search result
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

/// Web search backend used by the programmatic sandbox's `search_web` tool.
#[async_trait]
pub trait SearchPort: Send + Sync {
    async fn search(&self, query: &str) -> anyhow::Result<Vec<SearchHit>>;
}

/// Image generation backend for `[gen:...]` placeholders. Returns a data
/// URI (or other resolvable image reference) for the description.
#[async_trait]
pub trait ImagePort: Send + Sync {
    async fn generate(&self, description: &str) -> anyhow::Result<String>;
}
