//! Aggregation stage: merge agent outputs and decide continuation
//!
//! Document resolution is deterministic (writer > formatter > unchanged);
//! only the human-readable summary and the continuation heuristic come from
//! a model call.

use std::sync::Arc;

use serde_json::Value;

use super::config::RuntimeConfig;
use super::domain::{AgentId, HopState};
use super::llm::{CompletionRequest, LlmProvider, Message};
use super::normalize::extract_text;
use super::prompts;

const BIB_BEGIN: &str = "\\begin{thebibliography}";
const BIB_END: &str = "\\end{thebibliography}";
const DOC_END: &str = "\\end{document}";

/// Result of closing out one hop
#[derive(Debug, Clone)]
pub struct AggregateResult {
    pub merged_document: String,
    pub followup_summary: String,
    pub continue_reasoning: bool,
}

/// Merge the hop's outputs into one document and produce the hop summary.
pub async fn merge(
    llm: Arc<dyn LlmProvider>,
    config: &RuntimeConfig,
    hop: &HopState,
    instruction: &str,
) -> AggregateResult {
    let merged_document = resolve_document(hop);
    let (followup_summary, continue_reasoning) =
        summarize(llm, config, hop, instruction).await;

    AggregateResult {
        merged_document,
        followup_summary,
        continue_reasoning,
    }
}

/// Writer output wins; formatter only applies when the writer is absent;
/// otherwise the document passes through unchanged. Research's bibliography
/// is spliced in independently.
fn resolve_document(hop: &HopState) -> String {
    let writer_latex = hop
        .outputs
        .get(&AgentId::Writer)
        .and_then(|o| o.updated_latex.as_deref());

    let mut document = if let Some(latex) = writer_latex {
        latex.to_string()
    } else if let Some(latex) = hop
        .outputs
        .get(&AgentId::Formatter)
        .and_then(|o| o.updated_latex.as_deref())
    {
        latex.to_string()
    } else {
        hop.merged_document.clone()
    };

    if let Some(research) = hop.outputs.get(&AgentId::Research) {
        if !research.citations.is_empty() {
            if let Some(insert) = research.updated_latex.as_deref() {
                document = splice_bibliography(&document, insert);
            }
        }
    }

    document
}

/// Splice the research fragment's bibliography block in before the final
/// `\end{document}` when the document has none of its own. Known fragility:
/// a document without that exact terminal marker skips the splice silently.
fn splice_bibliography(document: &str, insert: &str) -> String {
    if document.contains(BIB_BEGIN) {
        return document.to_string();
    }
    let Some(bib_start) = insert.find(BIB_BEGIN) else {
        return document.to_string();
    };
    let Some(bib_end) = insert[bib_start..].find(BIB_END) else {
        return document.to_string();
    };
    let block = &insert[bib_start..bib_start + bib_end + BIB_END.len()];

    let Some(end_idx) = document.rfind(DOC_END) else {
        return document.to_string();
    };

    format!(
        "{}\n{}\n\n{}",
        &document[..end_idx],
        block,
        &document[end_idx..]
    )
}

/// One model call producing the hop summary plus the continuation signal on
/// its last line. Every failure path degrades to a generic summary with
/// `continue = false`.
async fn summarize(
    llm: Arc<dyn LlmProvider>,
    config: &RuntimeConfig,
    hop: &HopState,
    instruction: &str,
) -> (String, bool) {
    let agent_names: Vec<&str> = hop.outputs.keys().map(|a| a.as_str()).collect();
    let fallback = format!(
        "Done! {} agent(s) processed your request.",
        agent_names.join(", ")
    );

    let system_prompt = config.system_prompt("aggregator", prompts::AGGREGATOR_PROMPT);
    let temperature = config.model_config("aggregator").temperature.unwrap_or(0.5);

    let mut summary_parts: Vec<String> = Vec::new();
    if hop.outputs.contains_key(&AgentId::Writer) {
        summary_parts.push("Writer agent updated the document content.".to_string());
    }
    let reviewer = hop.outputs.get(&AgentId::Reviewer);
    if let Some(reviewer) = reviewer {
        if !reviewer.suggestions.is_empty() {
            summary_parts.push(format!(
                "Reviewer found {} suggestions.",
                reviewer.suggestions.len()
            ));
        }
    }
    if hop.outputs.contains_key(&AgentId::Formatter) {
        summary_parts.push("Formatter improved the document structure.".to_string());
    }
    let research = hop.outputs.get(&AgentId::Research);
    if let Some(research) = research {
        if !research.citations.is_empty() {
            summary_parts.push(format!(
                "Research agent found {} citations.",
                research.citations.len()
            ));
        }
    }

    let mut user_content = format!(
        "User instruction: {}\nHop: {}\nAgents that ran: {}\nSummary: {}",
        instruction,
        hop.hop_index,
        agent_names.join(", "),
        summary_parts.join(" ")
    );
    if let Some(reviewer) = reviewer {
        if !reviewer.suggestions.is_empty() {
            let top: Vec<_> = reviewer.suggestions.iter().take(3).collect();
            user_content.push_str(&format!(
                "\nReviewer suggestions: {}",
                serde_json::to_string(&top).unwrap_or_default()
            ));
        }
    }
    if let Some(research) = research {
        if !research.citations.is_empty() {
            user_content.push_str(&format!(
                "\nCitations found: {} (writer has{} run this hop)",
                research.citations.len(),
                if hop.outputs.contains_key(&AgentId::Writer) {
                    ""
                } else {
                    " NOT"
                }
            ));
        }
    }

    let request = CompletionRequest {
        messages: vec![Message::system(system_prompt), Message::user(user_content)],
        temperature: Some(temperature),
    };

    match llm.complete(request).await {
        Ok(response) => {
            let text = extract_text(&response.content);
            split_continue_signal(&text)
        }
        Err(e) => {
            tracing::warn!("Aggregator summary call failed: {}", e);
            (fallback, false)
        }
    }
}

/// The summary's last line may be `{"continueReasoning": bool}`; when it is,
/// adopt the flag and strip the line. Otherwise the whole response is the
/// summary and continuation defaults to false.
fn split_continue_signal(text: &str) -> (String, bool) {
    let trimmed = text.trim();
    let lines: Vec<&str> = trimmed.lines().collect();
    let Some(last) = lines.last() else {
        return (String::new(), false);
    };

    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(last.trim()) {
        if let Some(Value::Bool(flag)) = map.get("continueReasoning") {
            let summary = lines[..lines.len() - 1].join("\n").trim().to_string();
            return (summary, *flag);
        }
    }

    (trimmed.to_string(), false)
}
