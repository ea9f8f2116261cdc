pub mod agent_api;
pub mod exa_search;
pub mod image_gen;
