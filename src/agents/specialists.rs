//! Specialist agents: writer, reviewer, formatter, research
//!
//! Each issues exactly one LLM call and shapes the response into an
//! [`AgentOutput`]. Malformed model output never fails an agent - every
//! parse path has a documented degradation. Call-level failures (auth,
//! network) propagate; the fan-out stage isolates them per agent.

use std::sync::Arc;

use serde_json::Value;

use super::config::RuntimeConfig;
use super::domain::{AgentId, AgentOutput, Citation, Severity, Suggestion};
use super::error::AgentResult;
use super::llm::{CompletionRequest, LlmProvider, Message};
use super::normalize::{extract_text, parse_json, strip_code_fences};
use super::prompts;

/// Default sampling temperature per specialist
pub fn default_temperature(id: AgentId) -> f32 {
    match id {
        AgentId::Writer => 0.7,
        AgentId::Reviewer => 0.3,
        AgentId::Formatter => 0.3,
        AgentId::Research => 0.5,
    }
}

/// Built-in system prompt per specialist
pub fn default_prompt(id: AgentId) -> &'static str {
    match id {
        AgentId::Writer => prompts::WRITER_PROMPT,
        AgentId::Reviewer => prompts::REVIEWER_PROMPT,
        AgentId::Formatter => prompts::FORMATTER_PROMPT,
        AgentId::Research => prompts::RESEARCH_PROMPT,
    }
}

/// Run one specialist against a document/instruction snapshot.
pub async fn run_specialist(
    id: AgentId,
    llm: Arc<dyn LlmProvider>,
    config: &RuntimeConfig,
    document: &str,
    instruction: &str,
) -> AgentResult<AgentOutput> {
    let system_prompt = config.system_prompt(id.as_str(), default_prompt(id));
    let temperature = config
        .model_config(id.as_str())
        .temperature
        .unwrap_or_else(|| default_temperature(id));

    let user_content = match id {
        AgentId::Writer | AgentId::Formatter => format!(
            "CURRENT DOCUMENT:\n{}\n\nINSTRUCTION:\n{}",
            document, instruction
        ),
        AgentId::Reviewer => format!(
            "DOCUMENT TO REVIEW:\n{}\n\nCONTEXT:\n{}",
            document, instruction
        ),
        AgentId::Research => {
            let preview: String = document.chars().take(2000).collect();
            format!(
                "DOCUMENT TOPIC/CONTEXT:\n{}\n\nRESEARCH REQUEST:\n{}",
                preview, instruction
            )
        }
    };

    let request = CompletionRequest {
        messages: vec![Message::system(system_prompt), Message::user(user_content)],
        temperature: Some(temperature),
    };

    let response = llm.complete(request).await?;
    let text = extract_text(&response.content);

    Ok(match id {
        AgentId::Writer => document_rewrite_output(
            AgentId::Writer,
            &text,
            document,
            "Generated/updated LaTeX content based on user instruction.",
        ),
        AgentId::Formatter => document_rewrite_output(
            AgentId::Formatter,
            &text,
            document,
            "Reformatted the document structure and styling.",
        ),
        AgentId::Reviewer => reviewer_output(&text),
        AgentId::Research => research_output(&text),
    })
}

/// Writer/formatter shaping: fence-strip the replacement document; an empty
/// result falls back to the input document unchanged (never emit an empty
/// document).
fn document_rewrite_output(
    id: AgentId,
    text: &str,
    document: &str,
    reasoning: &str,
) -> AgentOutput {
    let latex = strip_code_fences(text);
    let mut output = AgentOutput::new(id, reasoning);
    output.updated_latex = Some(if latex.is_empty() {
        document.to_string()
    } else {
        latex
    });
    output
}

fn reviewer_output(text: &str) -> AgentOutput {
    let suggestions = match parse_json(text) {
        Ok(value) => {
            // Accept either a bare array or {"suggestions": [...]}.
            let records = match value {
                Value::Array(items) => items,
                Value::Object(mut map) => match map.remove("suggestions") {
                    Some(Value::Array(items)) => items,
                    _ => Vec::new(),
                },
                _ => Vec::new(),
            };
            records.iter().filter_map(coerce_suggestion).collect()
        }
        Err(_) => {
            let truncated: String = text.chars().take(500).collect();
            vec![Suggestion {
                location: "General".to_string(),
                issue: "Could not parse review".to_string(),
                suggestion: truncated,
                severity: Severity::Info,
            }]
        }
    };

    let mut output = AgentOutput::new(
        AgentId::Reviewer,
        "Reviewed the document for grammar, clarity, and structure.",
    );
    output.suggestions = suggestions;
    output
}

/// Each record is individually validated and defaulted rather than rejecting
/// the whole batch on one bad entry.
fn coerce_suggestion(value: &Value) -> Option<Suggestion> {
    let record = value.as_object()?;

    let field = |name: &str, default: &str| -> String {
        record
            .get(name)
            .and_then(Value::as_str)
            .unwrap_or(default)
            .to_string()
    };

    let severity = match record.get("severity").and_then(Value::as_str) {
        Some("warning") => Severity::Warning,
        Some("error") => Severity::Error,
        // Unknown or missing severities are coerced, not rejected.
        _ => Severity::Info,
    };

    Some(Suggestion {
        location: field("location", "General"),
        issue: field("issue", "Needs review"),
        suggestion: field("suggestion", ""),
        severity,
    })
}

fn research_output(text: &str) -> AgentOutput {
    let (citations, insert) = match parse_json(text) {
        Ok(Value::Object(map)) => {
            let citations: Vec<Citation> = match map.get("citations") {
                Some(Value::Array(items)) => items
                    .iter()
                    .filter_map(|item| serde_json::from_value(item.clone()).ok())
                    .collect(),
                _ => Vec::new(),
            };
            let insert = map
                .get("suggestedLatexInsert")
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_string();
            (citations, insert)
        }
        _ => (Vec::new(), String::new()),
    };

    // Reasoning reports the post-defaulting count, so 0 on parse failure.
    let mut output = AgentOutput::new(
        AgentId::Research,
        format!("Found {} relevant citations.", citations.len()),
    );
    output.citations = citations;
    output.updated_latex = if insert.is_empty() { None } else { Some(insert) };
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::error::{LlmError, LlmResult};
    use crate::agents::llm::CompletionResponse;
    use async_trait::async_trait;
    use serde_json::json;

    /// Provider that returns one canned response (or error) per call
    struct CannedProvider {
        response: Result<Value, String>,
    }

    impl CannedProvider {
        fn text(text: &str) -> Arc<dyn LlmProvider> {
            Arc::new(Self {
                response: Ok(Value::String(text.to_string())),
            })
        }

        fn failing() -> Arc<dyn LlmProvider> {
            Arc::new(Self {
                response: Err("connection refused".to_string()),
            })
        }
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
            match &self.response {
                Ok(content) => Ok(CompletionResponse {
                    content: content.clone(),
                }),
                Err(message) => Err(LlmError::Network(message.clone())),
            }
        }
    }

    #[tokio::test]
    async fn writer_strips_fences() {
        let llm = CannedProvider::text("```latex\n\\documentclass{article}\n```");
        let output = run_specialist(
            AgentId::Writer,
            llm,
            &RuntimeConfig::default(),
            "old",
            "rewrite",
        )
        .await
        .unwrap();
        assert_eq!(output.updated_latex.as_deref(), Some("\\documentclass{article}"));
    }

    #[tokio::test]
    async fn writer_empty_response_falls_back_to_input_document() {
        let llm = CannedProvider::text("```latex\n```");
        let document = "\\documentclass{article}\\begin{document}x\\end{document}";
        let output = run_specialist(
            AgentId::Writer,
            llm,
            &RuntimeConfig::default(),
            document,
            "noop",
        )
        .await
        .unwrap();
        // Byte-for-byte the input document.
        assert_eq!(output.updated_latex.as_deref(), Some(document));
    }

    #[tokio::test]
    async fn formatter_empty_response_falls_back_too() {
        let llm = CannedProvider::text("   ");
        let output = run_specialist(
            AgentId::Formatter,
            llm,
            &RuntimeConfig::default(),
            "doc",
            "format",
        )
        .await
        .unwrap();
        assert_eq!(output.updated_latex.as_deref(), Some("doc"));
    }

    #[tokio::test]
    async fn reviewer_defaults_missing_suggestion_fields() {
        let llm = CannedProvider::text("[{\"location\":\"X\"}]");
        let output = run_specialist(
            AgentId::Reviewer,
            llm,
            &RuntimeConfig::default(),
            "doc",
            "review",
        )
        .await
        .unwrap();
        assert_eq!(output.suggestions.len(), 1);
        let s = &output.suggestions[0];
        assert_eq!(s.location, "X");
        assert_eq!(s.issue, "Needs review");
        assert_eq!(s.suggestion, "");
        assert_eq!(s.severity, Severity::Info);
    }

    #[tokio::test]
    async fn reviewer_accepts_wrapped_suggestions_object() {
        let llm = CannedProvider::text(
            "{\"suggestions\":[{\"location\":\"A\",\"issue\":\"i\",\"suggestion\":\"s\",\"severity\":\"error\"}]}",
        );
        let output = run_specialist(
            AgentId::Reviewer,
            llm,
            &RuntimeConfig::default(),
            "doc",
            "review",
        )
        .await
        .unwrap();
        assert_eq!(output.suggestions.len(), 1);
        assert_eq!(output.suggestions[0].severity, Severity::Error);
    }

    #[tokio::test]
    async fn reviewer_coerces_unknown_severity_to_info() {
        let llm = CannedProvider::text(
            "[{\"location\":\"A\",\"issue\":\"i\",\"suggestion\":\"s\",\"severity\":\"critical\"}]",
        );
        let output = run_specialist(
            AgentId::Reviewer,
            llm,
            &RuntimeConfig::default(),
            "doc",
            "review",
        )
        .await
        .unwrap();
        assert_eq!(output.suggestions[0].severity, Severity::Info);
    }

    #[tokio::test]
    async fn reviewer_unparseable_emits_synthetic_suggestion() {
        let llm = CannedProvider::text("the document looks fine to me");
        let output = run_specialist(
            AgentId::Reviewer,
            llm,
            &RuntimeConfig::default(),
            "doc",
            "review",
        )
        .await
        .unwrap();
        assert_eq!(output.suggestions.len(), 1);
        assert_eq!(output.suggestions[0].issue, "Could not parse review");
        assert!(output.suggestions[0]
            .suggestion
            .contains("the document looks fine"));
    }

    #[tokio::test]
    async fn research_counts_citations_after_defaulting() {
        let body = json!({
            "citations": [
                { "title": "T", "url": "https://doi.org/x", "snippet": "s",
                  "bibtexKey": "t1", "bibtexEntry": "@article{t1}" },
                { "title": "U" }
            ],
            "suggestedLatexInsert": "\\cite{t1}"
        });
        let llm = CannedProvider::text(&body.to_string());
        let output = run_specialist(
            AgentId::Research,
            llm,
            &RuntimeConfig::default(),
            "doc",
            "find sources",
        )
        .await
        .unwrap();
        assert_eq!(output.citations.len(), 2);
        assert_eq!(output.reasoning, "Found 2 relevant citations.");
        assert_eq!(output.updated_latex.as_deref(), Some("\\cite{t1}"));
        // Missing fields defaulted, not rejected.
        assert_eq!(output.citations[1].bibtex_key, "");
    }

    #[tokio::test]
    async fn research_parse_failure_defaults_to_zero_citations() {
        let llm = CannedProvider::text("no structured output here");
        let output = run_specialist(
            AgentId::Research,
            llm,
            &RuntimeConfig::default(),
            "doc",
            "find sources",
        )
        .await
        .unwrap();
        assert!(output.citations.is_empty());
        assert_eq!(output.reasoning, "Found 0 relevant citations.");
        assert!(output.updated_latex.is_none());
    }

    #[tokio::test]
    async fn call_failure_propagates() {
        let llm = CannedProvider::failing();
        let result = run_specialist(
            AgentId::Writer,
            llm,
            &RuntimeConfig::default(),
            "doc",
            "rewrite",
        )
        .await;
        assert!(result.is_err());
    }
}
