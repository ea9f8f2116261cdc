//! Instruction-classification router
//!
//! Selects which specialists run this hop. A non-empty forced set bypasses
//! the model call entirely and is returned verbatim.

use std::sync::Arc;

use serde_json::Value;

use super::config::RuntimeConfig;
use super::domain::{AgentId, RouterDecision};
use super::llm::{CompletionRequest, LlmProvider, Message};
use super::normalize::{extract_text, parse_json};
use super::prompts;

/// Context the router sees when deciding
pub struct RouterContext<'a> {
    pub document: &'a str,
    pub instruction: &'a str,
    pub hop_index: u32,
    /// Agents that produced output on the previous hop
    pub previous_agents: Vec<AgentId>,
    /// Previous hop's followup summary
    pub previous_summary: &'a str,
    pub forced_agents: &'a [AgentId],
}

/// Decide the active agent set for one hop.
///
/// On any parse or call failure the decision is exactly
/// `{[Writer], continue: false}`: the system always does something useful
/// with a request.
pub async fn decide(
    llm: Arc<dyn LlmProvider>,
    config: &RuntimeConfig,
    ctx: RouterContext<'_>,
) -> RouterDecision {
    if !ctx.forced_agents.is_empty() {
        return RouterDecision {
            active_agents: ctx.forced_agents.to_vec(),
            continue_reasoning: false,
        };
    }

    let system_prompt = config.system_prompt("router", prompts::ROUTER_PROMPT);
    let temperature = config.model_config("router").temperature.unwrap_or(0.0);

    let hop_context = if ctx.hop_index > 1 {
        let previous: Vec<&str> = ctx.previous_agents.iter().map(|a| a.as_str()).collect();
        format!(
            "\nPrevious hop agents: {}\nPrevious summary: {}",
            previous.join(", "),
            ctx.previous_summary
        )
    } else {
        String::new()
    };

    let user_content = format!(
        "Current document length: {} chars\nHop: {}\nUser instruction: {}{}",
        ctx.document.len(),
        ctx.hop_index,
        ctx.instruction,
        hop_context
    );

    let request = CompletionRequest {
        messages: vec![Message::system(system_prompt), Message::user(user_content)],
        temperature: Some(temperature),
    };

    let fallback = RouterDecision {
        active_agents: vec![AgentId::Writer],
        continue_reasoning: false,
    };

    let response = match llm.complete(request).await {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!("Router call failed, defaulting to writer: {}", e);
            return fallback;
        }
    };

    let text = extract_text(&response.content);
    match parse_json(&text) {
        Ok(value) => decision_from_json(&value),
        Err(e) => {
            tracing::warn!("Router output unparseable, defaulting to writer: {}", e);
            fallback
        }
    }
}

fn decision_from_json(value: &Value) -> RouterDecision {
    let mut active_agents: Vec<AgentId> = Vec::new();
    if let Some(items) = value.get("activeAgents").and_then(Value::as_array) {
        for id in items.iter().filter_map(Value::as_str).filter_map(AgentId::parse) {
            // Each agent runs at most once per hop, whatever order the
            // model listed them in.
            if !active_agents.contains(&id) {
                active_agents.push(id);
            }
        }
    }

    if active_agents.is_empty() {
        active_agents.push(AgentId::Writer);
    }

    RouterDecision {
        active_agents,
        continue_reasoning: value
            .get("continueReasoning")
            .and_then(Value::as_bool)
            .unwrap_or(false),
    }
}
