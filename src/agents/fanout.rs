//! Fan-out executor: concurrent specialist dispatch
//!
//! Every active agent is launched against the same immutable snapshot of
//! the hop's document and instruction; completions are consumed in whatever
//! order they settle. The returned map is the barrier - callers only see it
//! once every launched agent has settled.

use std::collections::HashMap;
use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};

use super::config::RuntimeConfig;
use super::domain::{AgentId, AgentOutput, StreamEvent};
use super::llm::LlmFactory;
use super::specialists::run_specialist;
use super::stream::EventSender;

/// Invoke all active agents concurrently and collect their outputs.
///
/// A single agent's call failure is recorded as a missing entry, never
/// propagated: siblings' outputs survive and the aggregator tolerates the
/// partial map.
pub async fn execute(
    active_agents: &[AgentId],
    llm_factory: &Arc<dyn LlmFactory>,
    config: &RuntimeConfig,
    document: &str,
    instruction: &str,
    events: &EventSender,
) -> HashMap<AgentId, AgentOutput> {
    let mut in_flight = FuturesUnordered::new();

    for &id in active_agents {
        let provider = match llm_factory.provider(id.as_str(), config) {
            Ok(provider) => provider,
            Err(e) => {
                tracing::warn!("No provider for agent '{}': {}", id, e);
                continue;
            }
        };
        let document = document.to_string();
        let instruction = instruction.to_string();
        let config = config.clone();

        in_flight.push(async move {
            let result = run_specialist(id, provider, &config, &document, &instruction).await;
            (id, result)
        });
    }

    let mut outputs: HashMap<AgentId, AgentOutput> = HashMap::new();

    while let Some((id, result)) = in_flight.next().await {
        match result {
            Ok(output) => {
                // Writer/formatter snapshots stream out as they land so the
                // editor can show progress before the merge.
                if matches!(id, AgentId::Writer | AgentId::Formatter) {
                    if let Some(latex) = &output.updated_latex {
                        events
                            .send(StreamEvent::LatexUpdate {
                                partial_latex: latex.clone(),
                                agent_name: Some(id),
                            })
                            .await;
                    }
                }

                let mut single = HashMap::new();
                single.insert(id, output.clone());
                events
                    .send(StreamEvent::AgentOutput {
                        agent_name: id,
                        agent_outputs: single,
                    })
                    .await;

                outputs.insert(id, output);
            }
            Err(e) => {
                tracing::warn!("Agent '{}' failed this hop: {}", id, e);
            }
        }
    }

    outputs
}
