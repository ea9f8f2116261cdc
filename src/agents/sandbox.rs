//! Sandboxed execution of planner-generated scripts
//!
//! Plans run as Rhai scripts in a throwaway engine with exactly one host
//! function (`search_web`) and a read-only `input` map. A shared deadline
//! bounds both script evaluation and any search calls the script makes.

use std::sync::Arc;
use std::time::{Duration, Instant};

use rhai::{Dynamic, Engine, Scope};
use serde_json::Value;

use super::domain::{Citation, ToolResult};
use super::error::{AgentError, AgentResult};
use crate::domain::SearchPort;

const SEARCH_RESULT_CAP: usize = 8;

/// One-shot sandbox for a single plan execution
pub struct PlanSandbox {
    search: Arc<dyn SearchPort>,
    timeout: Duration,
}

impl PlanSandbox {
    pub fn new(search: Arc<dyn SearchPort>, timeout: Duration) -> Self {
        Self { search, timeout }
    }

    /// Evaluate the plan script and coerce its final expression into a
    /// `ToolResult`. Fails (never hangs) on syntax errors, runtime errors,
    /// and deadline overrun.
    pub async fn execute(
        &self,
        code: &str,
        document: &str,
        instruction: &str,
    ) -> AgentResult<ToolResult> {
        let search = Arc::clone(&self.search);
        let handle = tokio::runtime::Handle::current();
        let deadline = Instant::now() + self.timeout;
        let code = code.to_string();
        let document = document.to_string();
        let instruction = instruction.to_string();

        let task = tokio::task::spawn_blocking(move || -> AgentResult<Value> {
            let mut engine = Engine::new();

            engine.on_progress(move |_| {
                if Instant::now() > deadline {
                    Some(Dynamic::from("plan execution deadline exceeded"))
                } else {
                    None
                }
            });

            engine.register_fn("search_web", move |query: &str| -> rhai::Array {
                let remaining = deadline.saturating_duration_since(Instant::now());
                let hits = handle
                    .block_on(tokio::time::timeout(remaining, search.search(query)))
                    .unwrap_or_else(|_| Ok(Vec::new()))
                    .unwrap_or_else(|e| {
                        tracing::warn!("search_web('{}') failed: {}", query, e);
                        Vec::new()
                    });

                hits.into_iter()
                    .take(SEARCH_RESULT_CAP)
                    .map(|hit| {
                        let mut entry = rhai::Map::new();
                        entry.insert("title".into(), hit.title.into());
                        entry.insert("url".into(), hit.url.into());
                        entry.insert("snippet".into(), hit.snippet.into());
                        Dynamic::from_map(entry)
                    })
                    .collect()
            });

            let mut input = rhai::Map::new();
            input.insert("instruction".into(), instruction.into());
            input.insert("document".into(), document.into());

            let mut scope = Scope::new();
            scope.push_constant("input", input);

            let result = engine
                .eval_with_scope::<Dynamic>(&mut scope, &code)
                .map_err(|e| AgentError::Sandbox(e.to_string()))?;

            serde_json::to_value(&result).map_err(|e| AgentError::Sandbox(e.to_string()))
        });

        // The blocking task cannot be aborted; on overrun it is cut short
        // from the inside by the progress hook. The outer timeout carries a
        // small grace period so the hook's error normally arrives first.
        let outcome = tokio::time::timeout(self.timeout + Duration::from_millis(500), task).await;

        let value = match outcome {
            Ok(Ok(result)) => result?,
            Ok(Err(join_err)) => {
                return Err(AgentError::Sandbox(format!(
                    "plan task panicked: {join_err}"
                )))
            }
            Err(_) => {
                return Err(AgentError::Sandbox(
                    "plan execution deadline exceeded".to_string(),
                ))
            }
        };

        Ok(coerce_tool_result(value))
    }
}

/// Lenient coercion of the script's final value. Wrong-typed fields are
/// dropped individually instead of discarding the whole result.
fn coerce_tool_result(value: Value) -> ToolResult {
    let Value::Object(map) = value else {
        return ToolResult::default();
    };

    let queries = map
        .get("queries")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let findings = map
        .get("findings")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .map(|v| match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect()
        })
        .unwrap_or_default();

    let citations = map
        .get("citations")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|v| serde_json::from_value::<Citation>(v.clone()).ok())
                .filter(|c| !c.url.is_empty())
                .collect()
        })
        .unwrap_or_default();

    let notes = map
        .get("notes")
        .map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .unwrap_or_default();

    ToolResult {
        queries,
        findings,
        citations,
        notes,
    }
}
