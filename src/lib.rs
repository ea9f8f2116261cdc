//! # TeXWeave - Multi-Agent LaTeX Orchestration Server
//!
//! TeXWeave turns a single editing instruction into a coordinated pass of
//! specialist LLM agents over a LaTeX document. A router picks the agents,
//! they run concurrently, and an aggregator merges their work and decides
//! whether to take another hop. Progress streams back over SSE.
//!
//! ## Features
//!
//! - **4 Specialists**: writer, reviewer, formatter, research
//! - **Multi-hop loop**: bounded, aggregator-driven continuation
//! - **Programmatic mode**: planner-generated scripts in a Rhai sandbox
//! - **Providers**: Gemini and Groq, per-role overrides per request
//! - **Streaming**: typed SSE events for every orchestration step
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use texweave::config::Settings;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // Load configuration
//!     let settings = Settings::new()?;
//!
//!     // Server will start on configured host:port
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - **Domain**: ports the core depends on (search, image generation)
//! - **Agents**: routing, fan-out, aggregation, the hop loop, the sandbox
//! - **Adapters**: HTTP surface, Exa search, Gemini image generation
//! - **Config**: file + CLI settings

pub mod adapters;
pub mod agents;
pub mod cli;
pub mod config;
pub mod domain;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

use crate::adapters::agent_api::{self, AgentApiState};
use crate::config::Settings;

/// Creates the Axum application router with all endpoints configured.
pub fn create_app(settings: Arc<Settings>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/agent", post(agent_api::handle_agent_request))
        .route("/health", get(agent_api::health))
        .layer(cors)
        .with_state(AgentApiState { settings })
}
