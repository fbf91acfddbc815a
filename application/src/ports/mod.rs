//! Port definitions (interfaces for external adapters)
//!
//! Ports define the contracts that infrastructure adapters must implement.

pub mod detector;
pub mod documentation;
pub mod llm_gateway;
pub mod progress;
pub mod tool_store;
