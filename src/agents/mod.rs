//! Multi-agent LaTeX orchestration
//!
//! The core pipeline: a router picks specialists for a hop, the fan-out
//! executor runs them concurrently against one document snapshot, and the
//! aggregator merges their outputs and decides whether another hop is worth
//! taking. A second, programmatic pipeline plans tool calls as a script and
//! executes it in a sandbox instead.
//!
//! ## Architecture
//!
//! - `domain` - Core types (AgentId, AgentOutput, StreamEvent)
//! - `llm/` - Provider implementations and the per-role factory
//! - `specialists` - The four specialist invocations
//! - `router` / `fanout` / `aggregator` / `hop` - The agentic loop
//! - `programmatic` / `sandbox` - The plan-and-execute pipeline
//! - `stream` - Channel-backed event stream

pub mod aggregator;
pub mod config;
pub mod domain;
pub mod error;
pub mod fanout;
pub mod hop;
pub mod llm;
pub mod normalize;
pub mod postprocess;
pub mod programmatic;
pub mod prompts;
pub mod router;
pub mod sandbox;
pub mod specialists;
pub mod stream;

pub use config::*;
pub use domain::*;
pub use error::*;
pub use hop::Orchestrator;
pub use stream::{EventSender, EventStream};
