//! Per-request orchestration configuration
//!
//! Everything that used to live in the original editor's global settings
//! store is threaded explicitly through these types instead: the core keeps
//! no ambient mutable state.

use std::collections::HashMap;
use std::env;

use serde::{Deserialize, Serialize};

use super::domain::AgentId;

/// Which orchestration pipeline handles the request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    #[default]
    Agentic,
    Programmatic,
}

/// LLM backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Gemini,
    Groq,
}

/// Per-role model override supplied by the caller
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default)]
    pub provider: Option<ProviderKind>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub temperature: Option<f32>,
}

/// Provider API keys for one request. Header values win; environment
/// variables are the fallback so a server-side key works without the caller
/// sending one.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub google_api_key: Option<String>,
    pub groq_api_key: Option<String>,
    pub exa_api_key: Option<String>,
}

impl Credentials {
    pub fn google_key(&self) -> Option<String> {
        self.google_api_key
            .clone()
            .or_else(|| env::var("GOOGLE_API_KEY").ok())
            .filter(|k| !k.is_empty())
    }

    pub fn groq_key(&self) -> Option<String> {
        self.groq_api_key
            .clone()
            .or_else(|| env::var("GROQ_API_KEY").ok())
            .filter(|k| !k.is_empty())
    }

    pub fn exa_key(&self) -> Option<String> {
        self.exa_api_key
            .clone()
            .or_else(|| env::var("EXA_API_KEY").ok())
            .filter(|k| !k.is_empty())
    }
}

/// A prior conversation turn, passed through for context display only
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: String,
    pub content: String,
}

/// Resolved per-request configuration threaded into every orchestration call
#[derive(Debug, Clone, Default)]
pub struct RuntimeConfig {
    /// Per-role system prompt overrides, keyed by role name ("writer",
    /// "router", "aggregator", ...)
    pub prompt_overrides: HashMap<String, String>,
    /// Per-role model overrides, same keys
    pub model_configs: HashMap<String, ModelConfig>,
    pub credentials: Credentials,
    /// Model used when a gemini role has no explicit override
    pub gemini_default_model: String,
    /// Model used when a groq role has no explicit override
    pub groq_default_model: String,
}

impl RuntimeConfig {
    /// System prompt for a role: caller override or the built-in default.
    pub fn system_prompt<'a>(&'a self, role: &str, default: &'a str) -> &'a str {
        self.prompt_overrides
            .get(role)
            .map(String::as_str)
            .filter(|p| !p.is_empty())
            .unwrap_or(default)
    }

    /// Model override for a role, empty config when the caller sent none.
    pub fn model_config(&self, role: &str) -> ModelConfig {
        self.model_configs.get(role).cloned().unwrap_or_default()
    }
}

/// Immutable top-level input for one orchestration call
#[derive(Debug, Clone)]
pub struct OrchestrationRequest {
    pub document: String,
    pub instruction: String,
    pub forced_agents: Vec<AgentId>,
    pub max_hops: u32,
    pub execution_mode: ExecutionMode,
    /// Prior turns, informational only
    pub messages: Vec<ChatTurn>,
}

impl OrchestrationRequest {
    /// Hop budget clamped to the supported range regardless of caller input.
    pub fn effective_max_hops(&self) -> u32 {
        self.max_hops.clamp(1, 5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(max_hops: u32) -> OrchestrationRequest {
        OrchestrationRequest {
            document: String::new(),
            instruction: String::new(),
            forced_agents: Vec::new(),
            max_hops,
            execution_mode: ExecutionMode::Agentic,
            messages: Vec::new(),
        }
    }

    #[test]
    fn max_hops_clamped_to_bounds() {
        assert_eq!(request(0).effective_max_hops(), 1);
        assert_eq!(request(3).effective_max_hops(), 3);
        assert_eq!(request(99).effective_max_hops(), 5);
    }

    #[test]
    fn empty_prompt_override_falls_back_to_default() {
        let mut config = RuntimeConfig::default();
        config
            .prompt_overrides
            .insert("writer".to_string(), String::new());
        assert_eq!(config.system_prompt("writer", "default"), "default");

        config
            .prompt_overrides
            .insert("writer".to_string(), "custom".to_string());
        assert_eq!(config.system_prompt("writer", "default"), "custom");
    }
}
