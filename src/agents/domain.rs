//! Domain types for the orchestration core
//!
//! Wire names are camelCase and event tags kebab-case: the streamed protocol
//! predates this crate and editor clients already speak it.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Dispatchable specialist agents.
///
/// Router and aggregator are orchestration-internal roles, not members of
/// this enum: they can never appear in a fan-out set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentId {
    Writer,
    Reviewer,
    Formatter,
    Research,
}

impl AgentId {
    /// All specialists, in display order.
    pub const ALL: [AgentId; 4] = [
        AgentId::Writer,
        AgentId::Reviewer,
        AgentId::Formatter,
        AgentId::Research,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentId::Writer => "writer",
            AgentId::Reviewer => "reviewer",
            AgentId::Formatter => "formatter",
            AgentId::Research => "research",
        }
    }

    /// Parse an identifier the router produced. Unknown names yield `None`
    /// and are filtered out rather than failing the decision.
    pub fn parse(name: &str) -> Option<AgentId> {
        match name.trim().to_ascii_lowercase().as_str() {
            "writer" => Some(AgentId::Writer),
            "reviewer" => Some(AgentId::Reviewer),
            "formatter" => Some(AgentId::Formatter),
            "research" => Some(AgentId::Research),
            _ => None,
        }
    }
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity of a reviewer suggestion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// A single reviewer finding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Suggestion {
    pub location: String,
    pub issue: String,
    pub suggestion: String,
    pub severity: Severity,
}

/// A research citation. Fields the model omitted default to empty; a
/// citation with no resolvable bibtex key is still counted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Citation {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub snippet: String,
    #[serde(default)]
    pub bibtex_key: String,
    #[serde(default)]
    pub bibtex_entry: String,
}

/// Structured output of one specialist invocation. Produced once per agent
/// per hop and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentOutput {
    pub agent_name: AgentId,
    /// Full replacement document (writer/formatter) or suggested insert
    /// fragment (research).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_latex: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<Suggestion>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub citations: Vec<Citation>,
    pub reasoning: String,
}

impl AgentOutput {
    pub fn new(agent_name: AgentId, reasoning: impl Into<String>) -> Self {
        Self {
            agent_name,
            updated_latex: None,
            suggestions: Vec::new(),
            citations: Vec::new(),
            reasoning: reasoning.into(),
        }
    }
}

/// Per-hop mutable record. Created at hop start with empty outputs,
/// populated by the fan-out stage, consumed by the aggregator. Never
/// persisted past the request.
#[derive(Debug, Clone)]
pub struct HopState {
    pub hop_index: u32,
    pub active_agents: Vec<AgentId>,
    pub outputs: HashMap<AgentId, AgentOutput>,
    pub merged_document: String,
    pub followup_summary: String,
    pub continue_reasoning: bool,
}

impl HopState {
    pub fn new(hop_index: u32, document: String) -> Self {
        Self {
            hop_index,
            active_agents: Vec::new(),
            outputs: HashMap::new(),
            merged_document: document,
            followup_summary: String::new(),
            continue_reasoning: false,
        }
    }
}

/// Router decision for one hop
#[derive(Debug, Clone)]
pub struct RouterDecision {
    pub active_agents: Vec<AgentId>,
    pub continue_reasoning: bool,
}

/// Planner output in programmatic mode: an executable Rhai snippet plus a
/// one-line human summary.
#[derive(Debug, Clone)]
pub struct Plan {
    pub code: String,
    pub summary: String,
}

/// Coerced result of sandboxed plan execution
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolResult {
    #[serde(default)]
    pub queries: Vec<String>,
    #[serde(default)]
    pub findings: Vec<String>,
    #[serde(default)]
    pub citations: Vec<Citation>,
    #[serde(default)]
    pub notes: String,
}

/// Discrete progress events streamed to the caller.
///
/// Each serializes as one independently-parseable JSON object; `error` and
/// `done` are terminal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum StreamEvent {
    HopStart {
        hop_number: u32,
        total_hops: u32,
        hop_reason: String,
    },
    AgentStart {
        agent_name: AgentId,
    },
    /// A new full-document snapshot; consumers treat each as a replacement,
    /// not a diff.
    LatexUpdate {
        partial_latex: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        agent_name: Option<AgentId>,
    },
    AgentOutput {
        agent_name: AgentId,
        agent_outputs: HashMap<AgentId, AgentOutput>,
    },
    HopComplete {
        hop_number: u32,
        total_hops: u32,
    },
    Followup {
        followup_content: String,
    },
    Error {
        error: String,
    },
    Done {},
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_id_parses_known_names_case_insensitively() {
        assert_eq!(AgentId::parse("writer"), Some(AgentId::Writer));
        assert_eq!(AgentId::parse(" Reviewer "), Some(AgentId::Reviewer));
        assert_eq!(AgentId::parse("FORMATTER"), Some(AgentId::Formatter));
        assert_eq!(AgentId::parse("aggregator"), None);
        assert_eq!(AgentId::parse(""), None);
    }

    #[test]
    fn events_use_wire_names() {
        let event = StreamEvent::HopStart {
            hop_number: 1,
            total_hops: 2,
            hop_reason: "Starting initial agent pass".to_string(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "hop-start");
        assert_eq!(json["hopNumber"], 1);
        assert_eq!(json["totalHops"], 2);

        let update = StreamEvent::LatexUpdate {
            partial_latex: "\\documentclass{article}".to_string(),
            agent_name: Some(AgentId::Writer),
        };
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json["type"], "latex-update");
        assert_eq!(json["agentName"], "writer");
        assert!(json.get("partialLatex").is_some());
    }

    #[test]
    fn latex_update_omits_absent_agent_name() {
        let update = StreamEvent::LatexUpdate {
            partial_latex: "x".to_string(),
            agent_name: None,
        };
        let json = serde_json::to_value(&update).unwrap();
        assert!(json.get("agentName").is_none());
    }

    #[test]
    fn agent_output_serializes_camel_case() {
        let mut output = AgentOutput::new(AgentId::Writer, "r");
        output.updated_latex = Some("doc".to_string());
        let json = serde_json::to_value(&output).unwrap();
        assert_eq!(json["agentName"], "writer");
        assert_eq!(json["updatedLatex"], "doc");
        assert!(json.get("suggestions").is_none());
    }
}
