//! Hop controller: the multi-hop orchestration loop
//!
//! Each hop is route, fan out, aggregate. The loop continues only while the
//! aggregator asks for another pass and the hop budget allows one. After the
//! loop a post-pass resolves generated-image placeholders.

use std::sync::Arc;
use std::time::Duration;

use super::config::{ExecutionMode, OrchestrationRequest, RuntimeConfig};
use super::domain::{AgentId, HopState, StreamEvent};
use super::error::AgentResult;
use super::llm::LlmFactory;
use super::router::RouterContext;
use super::stream::{EventSender, EventStream};
use super::{aggregator, fanout, postprocess, programmatic, router};
use crate::domain::{ImagePort, SearchPort};

/// Request-independent orchestration wiring. Cheap to clone behind an `Arc`
/// and shared across all in-flight requests.
pub struct Orchestrator {
    llm_factory: Arc<dyn LlmFactory>,
    search: Arc<dyn SearchPort>,
    images: Arc<dyn ImagePort>,
    sandbox_timeout: Duration,
    max_generated_images: usize,
}

impl Orchestrator {
    pub fn new(
        llm_factory: Arc<dyn LlmFactory>,
        search: Arc<dyn SearchPort>,
        images: Arc<dyn ImagePort>,
        sandbox_timeout: Duration,
        max_generated_images: usize,
    ) -> Self {
        Self {
            llm_factory,
            search,
            images,
            sandbox_timeout,
            max_generated_images,
        }
    }

    /// Start an orchestration run and hand back its event stream. The run
    /// itself proceeds on a spawned task; dropping the stream stops event
    /// delivery but lets in-flight model calls finish.
    pub fn run(self: Arc<Self>, request: OrchestrationRequest, config: RuntimeConfig) -> EventStream {
        let (events, stream) = EventStream::channel(64);

        tokio::spawn(async move {
            let outcome = match request.execution_mode {
                ExecutionMode::Agentic => self.run_agentic(&request, &config, &events).await,
                ExecutionMode::Programmatic => {
                    programmatic::run(
                        &request.document,
                        &request.instruction,
                        &config,
                        &self.llm_factory,
                        Arc::clone(&self.search),
                        self.sandbox_timeout,
                        &events,
                    )
                    .await
                    .map(|_| ())
                }
            };

            match outcome {
                Ok(()) => events.send(StreamEvent::Done {}).await,
                Err(e) => {
                    tracing::error!("Orchestration failed: {}", e);
                    events
                        .send(StreamEvent::Error {
                            error: e.to_string(),
                        })
                        .await;
                }
            }
        });

        stream
    }

    async fn run_agentic(
        &self,
        request: &OrchestrationRequest,
        config: &RuntimeConfig,
        events: &EventSender,
    ) -> AgentResult<()> {
        let max_hops = request.effective_max_hops();
        let mut document = request.document.clone();
        let mut previous_agents: Vec<AgentId> = Vec::new();
        let mut previous_summary = String::new();
        let mut last_summary = String::new();

        for hop_number in 1..=max_hops {
            // A dropped receiver means the caller aborted; stop between
            // hops rather than issuing more model calls nobody will see.
            if events.is_closed() {
                tracing::debug!("Client gone, stopping before hop {}", hop_number);
                return Ok(());
            }

            let hop_reason = if hop_number == 1 {
                "Starting initial agent pass".to_string()
            } else {
                format!("Continuing: {}", truncate(&previous_summary, 100))
            };
            events
                .send(StreamEvent::HopStart {
                    hop_number,
                    total_hops: max_hops,
                    hop_reason,
                })
                .await;

            // Forced agents apply to the first hop only; later hops are
            // always the router's call.
            let forced: &[AgentId] = if hop_number == 1 {
                &request.forced_agents
            } else {
                &[]
            };

            let router_llm = self.llm_factory.provider("router", config)?;
            let decision = router::decide(
                router_llm,
                config,
                RouterContext {
                    document: &document,
                    instruction: &request.instruction,
                    hop_index: hop_number,
                    previous_agents: previous_agents.clone(),
                    previous_summary: &previous_summary,
                    forced_agents: forced,
                },
            )
            .await;

            for &agent in &decision.active_agents {
                events
                    .send(StreamEvent::AgentStart { agent_name: agent })
                    .await;
            }

            let outputs = fanout::execute(
                &decision.active_agents,
                &self.llm_factory,
                config,
                &document,
                &request.instruction,
                events,
            )
            .await;

            let mut state = HopState::new(hop_number, document.clone());
            state.active_agents = decision.active_agents;
            state.outputs = outputs;

            let aggregator_llm = self.llm_factory.provider("aggregator", config)?;
            let aggregated =
                aggregator::merge(aggregator_llm, config, &state, &request.instruction).await;

            events
                .send(StreamEvent::LatexUpdate {
                    partial_latex: aggregated.merged_document.clone(),
                    agent_name: None,
                })
                .await;

            events
                .send(StreamEvent::HopComplete {
                    hop_number,
                    total_hops: max_hops,
                })
                .await;

            document = aggregated.merged_document;
            last_summary = aggregated.followup_summary.clone();

            if !aggregated.continue_reasoning {
                break;
            }
            previous_agents = state.outputs.keys().copied().collect();
            previous_summary = aggregated.followup_summary;
        }

        let with_images = postprocess::resolve_image_placeholders(
            &document,
            &self.images,
            self.max_generated_images,
            events,
        )
        .await;
        if with_images != document {
            events
                .send(StreamEvent::LatexUpdate {
                    partial_latex: with_images,
                    agent_name: None,
                })
                .await;
        }

        events
            .send(StreamEvent::Followup {
                followup_content: last_summary,
            })
            .await;

        Ok(())
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        text.chars().take(max_chars).collect()
    }
}
