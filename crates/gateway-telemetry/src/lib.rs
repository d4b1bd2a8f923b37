//! # Gateway Telemetry
//!
//! Usage metering and logging for the metering gateway.
//!
//! ## Features
//!
//! - **Cost Estimation**: OpenAI and Anthropic price tables and estimators
//! - **Token Counting**: Pluggable tokenizers, BPE behind the `tiktoken` feature
//! - **Streaming**: Cost accrual for streamed Responses API calls
//! - **Logging**: `tracing-subscriber` setup with text or JSON output

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cost;
pub mod streaming;
pub mod tokens;
pub mod tracing_setup;

pub use cost::{AnthropicCostEstimator, OpenAiCostEstimator, PriceTable};
pub use streaming::{ResponsesStreamAccumulator, StreamUsage};
#[cfg(feature = "tiktoken")]
pub use tokens::TiktokenCounter;
pub use tokens::{FixedTokenCounter, TokenCounter, WhitespaceTokenCounter};
pub use tracing_setup::{init_tracing, LogFormat, TracingConfig, TracingError};
