//! Integration tests for the LLM metering gateway
//!
//! This crate exercises the admission pipeline and the cost estimators
//! end to end against the in-memory collaborators:
//! - Authorization across provider, route and custom-provider paths
//! - Limit validation ordering and thresholds
//! - Provider-setting management with encryption at rest
//! - Cost estimation and streamed usage accounting

pub mod fixtures;
pub mod helpers;

// Re-export commonly used items
pub use fixtures::*;
pub use helpers::*;

#[cfg(test)]
mod cost_tests;
#[cfg(test)]
mod limit_tests;
#[cfg(test)]
mod pipeline_tests;
#[cfg(test)]
mod settings_tests;
