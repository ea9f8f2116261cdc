//! Programmatic orchestration: plan, execute, synthesize
//!
//! Instead of routing to specialists, this pipeline asks a planner model for
//! an executable tool-use script, runs it in the sandbox, and hands the
//! collected material to a single synthesis call.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use super::config::RuntimeConfig;
use super::domain::{Plan, StreamEvent, ToolResult};
use super::error::AgentResult;
use super::llm::{CompletionRequest, LlmFactory, LlmProvider, Message};
use super::normalize::{extract_text, parse_json, strip_code_fences};
use super::prompts;
use super::sandbox::PlanSandbox;
use super::stream::EventSender;
use crate::domain::SearchPort;

/// Structurally-fixed plan used whenever the planner's output cannot be
/// parsed: one search over the raw instruction, hits become citations.
const FALLBACK_PLAN_CODE: &str = r#"
let hits = search_web(input.instruction);
let citations = [];
for hit in hits {
    citations.push(#{ title: hit.title, url: hit.url, snippet: hit.snippet });
}
#{
    queries: [input.instruction],
    citations: citations,
    findings: [],
    notes: "Fallback plan: searched the raw instruction."
}
"#;

fn fallback_plan() -> Plan {
    Plan {
        code: FALLBACK_PLAN_CODE.to_string(),
        summary: "Search the web for the user's instruction and collect sources.".to_string(),
    }
}

/// Run the full programmatic pipeline, emitting progress and the final
/// document over `events`. The terminal `done`/`error` event is the
/// caller's responsibility.
pub async fn run(
    document: &str,
    instruction: &str,
    config: &RuntimeConfig,
    llm_factory: &Arc<dyn LlmFactory>,
    search: Arc<dyn SearchPort>,
    sandbox_timeout: Duration,
    events: &EventSender,
) -> AgentResult<String> {
    events
        .send(StreamEvent::Followup {
            followup_content: "Planning tool calls...".to_string(),
        })
        .await;

    let planner = llm_factory.provider("router", config)?;
    let plan = make_plan(planner, config, document, instruction).await;

    events
        .send(StreamEvent::Followup {
            followup_content: format!("Executing plan: {}", plan.summary),
        })
        .await;

    let sandbox = PlanSandbox::new(search, sandbox_timeout);
    let tool_result = match sandbox.execute(&plan.code, document, instruction).await {
        Ok(result) => result,
        Err(e) => {
            tracing::warn!("Plan execution failed, synthesizing without tool output: {}", e);
            ToolResult::default()
        }
    };

    events
        .send(StreamEvent::Followup {
            followup_content: "Synthesizing document...".to_string(),
        })
        .await;

    let synthesizer = llm_factory.provider("writer", config)?;
    let updated = synthesize(synthesizer, config, document, instruction, &tool_result).await?;

    events
        .send(StreamEvent::LatexUpdate {
            partial_latex: updated.clone(),
            agent_name: None,
        })
        .await;

    let queries = tool_result.queries.len();
    let sources = tool_result.citations.len();
    let mut followup = format!(
        "Programmatic orchestration complete. Executed {} search {} and collected {} {}.",
        queries,
        if queries == 1 { "query" } else { "queries" },
        sources,
        if sources == 1 { "source" } else { "sources" },
    );
    if !plan.summary.is_empty() {
        followup.push(' ');
        followup.push_str(&plan.summary);
    }
    events
        .send(StreamEvent::Followup {
            followup_content: followup,
        })
        .await;

    Ok(updated)
}

/// Ask the planner for a script. Anything that does not parse into an
/// object with a string `code` field yields the fallback plan.
async fn make_plan(
    llm: Arc<dyn LlmProvider>,
    config: &RuntimeConfig,
    document: &str,
    instruction: &str,
) -> Plan {
    let system_prompt = config.system_prompt("router", prompts::PLANNER_PROMPT);
    let temperature = config.model_config("router").temperature.unwrap_or(0.0);

    let user_content = format!(
        "User instruction: {}\n\nCurrent document ({} chars):\n{}",
        instruction,
        document.len(),
        document.chars().take(2000).collect::<String>()
    );

    let request = CompletionRequest {
        messages: vec![Message::system(system_prompt), Message::user(user_content)],
        temperature: Some(temperature),
    };

    let response = match llm.complete(request).await {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!("Planner call failed, using fallback plan: {}", e);
            return fallback_plan();
        }
    };

    let text = extract_text(&response.content);
    match parse_json(&text) {
        Ok(Value::Object(map)) => match map.get("code").and_then(Value::as_str) {
            Some(code) if !code.trim().is_empty() => Plan {
                code: code.to_string(),
                summary: map
                    .get("summary")
                    .and_then(Value::as_str)
                    .unwrap_or("")
                    .to_string(),
            },
            _ => {
                tracing::warn!("Planner output lacked a code field, using fallback plan");
                fallback_plan()
            }
        },
        _ => {
            tracing::warn!("Planner output unparseable, using fallback plan");
            fallback_plan()
        }
    }
}

async fn synthesize(
    llm: Arc<dyn LlmProvider>,
    config: &RuntimeConfig,
    document: &str,
    instruction: &str,
    tool_result: &ToolResult,
) -> AgentResult<String> {
    let system_prompt = config.system_prompt("writer", prompts::SYNTHESIS_PROMPT);
    let temperature = config.model_config("writer").temperature.unwrap_or(0.7);

    let tool_json = serde_json::to_string_pretty(tool_result)?;
    let user_content = format!(
        "Current LaTeX document:\n{}\n\nUser instruction: {}\n\nTool output (JSON):\n{}",
        document, instruction, tool_json
    );

    let request = CompletionRequest {
        messages: vec![Message::system(system_prompt), Message::user(user_content)],
        temperature: Some(temperature),
    };

    let response = llm.complete(request).await?;
    let text = strip_code_fences(&extract_text(&response.content));
    if text.trim().is_empty() {
        Ok(document.to_string())
    } else {
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::error::LlmResult;
    use crate::agents::llm::CompletionResponse;
    use crate::agents::stream::EventStream;
    use crate::domain::SearchHit;
    use async_trait::async_trait;

    /// Factory answering the planner role with one canned text and the
    /// writer role with another.
    struct ScriptedFactory {
        plan_text: String,
        synthesis_text: String,
    }

    struct CannedProvider {
        text: String,
    }

    #[async_trait]
    impl LlmProvider for CannedProvider {
        fn name(&self) -> &str {
            "canned"
        }

        fn model(&self) -> &str {
            "canned-1"
        }

        async fn complete(&self, _request: CompletionRequest) -> LlmResult<CompletionResponse> {
            Ok(CompletionResponse {
                content: Value::String(self.text.clone()),
            })
        }
    }

    impl LlmFactory for ScriptedFactory {
        fn provider(
            &self,
            role: &str,
            _config: &RuntimeConfig,
        ) -> LlmResult<Arc<dyn LlmProvider>> {
            let text = match role {
                "router" => self.plan_text.clone(),
                _ => self.synthesis_text.clone(),
            };
            Ok(Arc::new(CannedProvider { text }))
        }
    }

    struct FixedSearch;

    #[async_trait]
    impl SearchPort for FixedSearch {
        async fn search(&self, query: &str) -> anyhow::Result<Vec<SearchHit>> {
            Ok(vec![SearchHit {
                title: format!("Paper about {query}"),
                url: "https://example.org/1".to_string(),
                snippet: "snippet".to_string(),
            }])
        }
    }

    fn factory(plan_text: &str, synthesis_text: &str) -> Arc<dyn LlmFactory> {
        Arc::new(ScriptedFactory {
            plan_text: plan_text.to_string(),
            synthesis_text: synthesis_text.to_string(),
        })
    }

    const VALID_PLAN: &str = r##"{"code": "#{ queries: [\"q1\", \"q2\"], citations: search_web(\"q1\").map(|h| #{ title: h.title, url: h.url, snippet: h.snippet }), findings: [], notes: \"\" }", "summary": "Two searches."}"##;

    #[tokio::test(flavor = "multi_thread")]
    async fn happy_path_streams_update_and_counts() {
        let factory = factory(VALID_PLAN, "\\documentclass{article}\\begin{document}New\\end{document}");
        let (tx, stream) = EventStream::channel(64);

        let updated = run(
            "\\documentclass{article}\\begin{document}Old\\end{document}",
            "add sources",
            &RuntimeConfig::default(),
            &factory,
            Arc::new(FixedSearch),
            Duration::from_secs(2),
            &tx,
        )
        .await
        .unwrap();
        drop(tx);

        assert!(updated.contains("New"));

        let events = stream.collect().await;
        assert!(events.iter().any(|e| matches!(
            e,
            StreamEvent::LatexUpdate { agent_name: None, .. }
        )));
        let followups: Vec<&String> = events
            .iter()
            .filter_map(|e| match e {
                StreamEvent::Followup { followup_content } => Some(followup_content),
                _ => None,
            })
            .collect();
        let last = followups.last().unwrap();
        assert!(last.contains("2 search queries"));
        assert!(last.contains("1 source."));
        assert!(last.contains("Two searches."));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn unparseable_plan_falls_back_to_instruction_search() {
        let factory = factory("I cannot produce JSON today.", "DOC");
        let (tx, stream) = EventStream::channel(64);

        run(
            "old",
            "quantum topology",
            &RuntimeConfig::default(),
            &factory,
            Arc::new(FixedSearch),
            Duration::from_secs(2),
            &tx,
        )
        .await
        .unwrap();
        drop(tx);

        let events = stream.collect().await;
        let last = events
            .iter()
            .rev()
            .find_map(|e| match e {
                StreamEvent::Followup { followup_content } => Some(followup_content),
                _ => None,
            })
            .unwrap();
        // Fallback plan runs exactly one search over the raw instruction.
        assert!(last.contains("1 search query"));
        assert!(last.contains("1 source."));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn sandbox_timeout_still_synthesizes() {
        let plan = r#"{"code": "let i = 0; loop { i += 1; }", "summary": "Spin."}"#;
        let factory = factory(plan, "SYNTHESIZED");
        let (tx, stream) = EventStream::channel(64);

        let updated = run(
            "old",
            "go",
            &RuntimeConfig::default(),
            &factory,
            Arc::new(FixedSearch),
            Duration::from_millis(100),
            &tx,
        )
        .await
        .unwrap();
        drop(tx);

        assert_eq!(updated, "SYNTHESIZED");
        let events = stream.collect().await;
        let last = events
            .iter()
            .rev()
            .find_map(|e| match e {
                StreamEvent::Followup { followup_content } => Some(followup_content),
                _ => None,
            })
            .unwrap();
        assert!(last.contains("0 search queries"));
        assert!(last.contains("0 sources"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn empty_synthesis_keeps_input_document() {
        let plan = r##"{"code": "#{ queries: [], citations: [], findings: [], notes: \"\" }", "summary": "Nothing."}"##;
        let factory = factory(plan, "```latex\n```");
        let (tx, _stream) = EventStream::channel(64);

        let updated = run(
            "ORIGINAL DOCUMENT",
            "go",
            &RuntimeConfig::default(),
            &factory,
            Arc::new(FixedSearch),
            Duration::from_secs(2),
            &tx,
        )
        .await
        .unwrap();

        assert_eq!(updated, "ORIGINAL DOCUMENT");
    }
}
