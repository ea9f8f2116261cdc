//! HTTP surface for orchestration runs
//!
//! `POST /api/agent` takes the document and instruction, pulls per-request
//! credentials and overrides out of headers, and answers with an SSE stream
//! of orchestration events.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use base64::Engine as _;
use futures::stream::Stream;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::agents::config::{
    ChatTurn, Credentials, ExecutionMode, OrchestrationRequest, RuntimeConfig,
};
use crate::agents::domain::AgentId;
use crate::agents::hop::Orchestrator;
use crate::agents::llm::RuntimeLlmFactory;
use crate::adapters::exa_search::ExaSearch;
use crate::adapters::image_gen::GeminiImageGen;
use crate::config::Settings;

#[derive(Clone)]
pub struct AgentApiState {
    pub settings: Arc<Settings>,
}

/// Request body, camelCase per the streamed protocol
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentRequestBody {
    #[serde(default)]
    pub latex_document: String,
    #[serde(default)]
    pub user_instruction: String,
    #[serde(default)]
    pub messages: Vec<ChatTurn>,
    #[serde(default)]
    pub forced_agents: Vec<String>,
    #[serde(default)]
    pub max_hops: Option<u32>,
    #[serde(default)]
    pub execution_mode: Option<ExecutionMode>,
}

/// Start an orchestration run and stream its events
pub async fn handle_agent_request(
    State(state): State<AgentApiState>,
    headers: HeaderMap,
    Json(body): Json<AgentRequestBody>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let config = runtime_config_from(&headers, &state.settings);
    let google_key = config.credentials.google_key();
    let exa_key = config.credentials.exa_key();

    let orchestration = &state.settings.orchestration;
    let max_hops = body
        .max_hops
        .unwrap_or(orchestration.default_max_hops)
        .min(orchestration.hop_cap.max(1));

    let forced_agents = parse_forced_agents(&body.forced_agents);

    let request = OrchestrationRequest {
        document: body.latex_document,
        instruction: body.user_instruction,
        forced_agents,
        max_hops,
        execution_mode: body.execution_mode.unwrap_or_default(),
        messages: body.messages,
    };

    tracing::info!(
        mode = ?request.execution_mode,
        max_hops = request.effective_max_hops(),
        "Starting orchestration run"
    );

    let orchestrator = Arc::new(Orchestrator::new(
        Arc::new(RuntimeLlmFactory),
        Arc::new(ExaSearch::new(exa_key)),
        Arc::new(GeminiImageGen::new(google_key)),
        Duration::from_secs(orchestration.sandbox_timeout_secs),
        orchestration.max_generated_images,
    ));

    let stream = orchestrator.run(request, config).map(|event| {
        let data = serde_json::to_string(&event).unwrap_or_else(|e| {
            tracing::error!("Event serialization failed: {}", e);
            r#"{"type":"error","error":"event serialization failed"}"#.to_string()
        });
        Ok::<Event, Infallible>(Event::default().data(data))
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// Parse the request's forced-agent names, dropping unknown names and
/// repeats so each forced agent dispatches once.
fn parse_forced_agents(names: &[String]) -> Vec<AgentId> {
    let mut agents: Vec<AgentId> = Vec::new();
    for id in names.iter().filter_map(|name| AgentId::parse(name)) {
        if !agents.contains(&id) {
            agents.push(id);
        }
    }
    agents
}

pub async fn health() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

/// Assemble the per-request runtime configuration from headers plus server
/// defaults. Malformed override headers degrade to empty maps.
fn runtime_config_from(headers: &HeaderMap, settings: &Settings) -> RuntimeConfig {
    RuntimeConfig {
        prompt_overrides: decode_base64_json(headers, "x-custom-prompts"),
        model_configs: decode_base64_json(headers, "x-model-configs"),
        credentials: Credentials {
            google_api_key: header_string(headers, "x-api-key"),
            groq_api_key: header_string(headers, "x-groq-key"),
            exa_api_key: header_string(headers, "x-exa-key"),
        },
        gemini_default_model: settings.models.gemini_default.clone(),
        groq_default_model: settings.models.groq_default.clone(),
    }
}

fn header_string(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
        .filter(|value| !value.is_empty())
}

fn decode_base64_json<T: DeserializeOwned + Default>(headers: &HeaderMap, name: &str) -> T {
    let Some(raw) = header_string(headers, name) else {
        return T::default();
    };
    let bytes = match base64::engine::general_purpose::STANDARD.decode(raw.as_bytes()) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!("Header '{}' is not valid base64: {}", name, e);
            return T::default();
        }
    };
    match serde_json::from_slice(&bytes) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!("Header '{}' is not valid JSON: {}", name, e);
            T::default()
        }
    }
}
