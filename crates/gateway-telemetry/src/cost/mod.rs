//! Cost estimation for upstream LLM calls.
//!
//! Estimators price vendor-reported or locally counted usage against a
//! [`PriceTable`]. Unknown models surface as
//! [`GatewayError::ModelNotSupported`](gateway_core::GatewayError::ModelNotSupported),
//! never as a silent zero.

pub mod anthropic;
pub mod openai;
pub mod pricing;

pub use anthropic::AnthropicCostEstimator;
pub use openai::OpenAiCostEstimator;
pub use pricing::{category, PriceTable};
