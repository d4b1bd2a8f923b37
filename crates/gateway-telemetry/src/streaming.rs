//! Cost accounting for streamed Responses API calls.
//!
//! The forwarding loop hands every upstream SSE line (or raw chunk) to a
//! [`ResponsesStreamAccumulator`]. Text deltas are collected for logging and
//! the cost is computed once, from the usage attached to the terminal
//! `response.completed` event.
//!
//! ```text
//! event: response.output_text.delta
//! data: {"type":"response.output_text.delta","delta":"Hel"}
//!
//! event: response.completed
//! data: {"type":"response.completed","response":{"status":"completed","usage":{...}}}
//! ```
//!
//! Nothing here returns an error to the caller: a malformed event or a
//! pricing failure is logged and the bytes keep flowing.

use std::sync::Arc;

use gateway_core::{ResponseObject, ResponseRequest, ResponseStreamEvent};
use tracing::{debug, trace, warn};

use crate::cost::OpenAiCostEstimator;

const DATA_PREFIX: &str = "data:";
const DONE_MARKER: &str = "[DONE]";

/// Usage totals of a finished stream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamUsage {
    /// Concatenated output text
    pub content: String,
    /// Cost in USD, zero until the stream completed
    pub cost_in_usd: f64,
    /// Input tokens reported by the vendor
    pub prompt_tokens: u64,
    /// Output tokens reported by the vendor
    pub completion_tokens: u64,
    /// Whether a completed response was seen
    pub completed: bool,
}

/// Accumulates text and cost while a Responses API stream is forwarded.
#[derive(Debug)]
pub struct ResponsesStreamAccumulator {
    estimator: Arc<OpenAiCostEstimator>,
    model: String,
    request: Option<ResponseRequest>,
    usage: StreamUsage,
    done: bool,
    line_buffer: String,
}

impl ResponsesStreamAccumulator {
    /// Create an accumulator for a stream served by `model`.
    #[must_use]
    pub fn new(estimator: Arc<OpenAiCostEstimator>, model: impl Into<String>) -> Self {
        Self {
            estimator,
            model: model.into(),
            request: None,
            usage: StreamUsage::default(),
            done: false,
            line_buffer: String::new(),
        }
    }

    /// Attach the originating request so container creation is billed.
    #[must_use]
    pub fn with_request(mut self, request: ResponseRequest) -> Self {
        self.request = Some(request);
        self
    }

    /// Feed a raw body chunk; lines split across chunks are reassembled.
    ///
    /// Returns `false` once the `[DONE]` marker was seen.
    pub fn feed_chunk(&mut self, chunk: &[u8]) -> bool {
        self.line_buffer.push_str(&String::from_utf8_lossy(chunk));

        while let Some(newline) = self.line_buffer.find('\n') {
            let line: String = self.line_buffer.drain(..=newline).collect();
            if !self.feed_line(&line) {
                self.line_buffer.clear();
                return false;
            }
        }
        !self.done
    }

    /// Feed a single SSE line.
    ///
    /// Returns `false` once the `[DONE]` marker was seen.
    pub fn feed_line(&mut self, line: &str) -> bool {
        if self.done {
            return false;
        }

        let Some(data) = line.trim().strip_prefix(DATA_PREFIX) else {
            return true;
        };
        let data = data.trim_start();

        if data == DONE_MARKER {
            self.done = true;
            return false;
        }

        let event: ResponseStreamEvent = match serde_json::from_str(data) {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, "Failed to parse responses stream event");
                return true;
            }
        };

        if let Some(delta) = event.text_delta() {
            self.usage.content.push_str(delta);
        }

        if let Some(response) = event.completed_response() {
            self.account(response);
        }

        true
    }

    fn account(&mut self, response: &ResponseObject) {
        let mut cost = 0.0;

        match self
            .estimator
            .estimate_response_api_total_cost(&self.model, &response.usage)
        {
            Ok(tokens_cost) => cost += tokens_cost,
            Err(e) => warn!(model = %self.model, error = %e, "Failed to estimate responses token cost"),
        }

        if let Some(request) = &self.request {
            match self.estimator.estimate_response_api_container_cost(request) {
                Ok(container_cost) => cost += container_cost,
                Err(e) => warn!(model = %self.model, error = %e, "Failed to estimate container cost"),
            }
        }

        match self
            .estimator
            .estimate_response_api_tool_calls_cost(&response.tools, &self.model)
        {
            Ok(tools_cost) => cost += tools_cost,
            Err(e) => warn!(model = %self.model, error = %e, "Failed to estimate tool calls cost"),
        }

        self.usage.cost_in_usd = cost;
        self.usage.prompt_tokens = response.usage.input_tokens;
        self.usage.completion_tokens = response.usage.output_tokens;
        self.usage.completed = true;

        debug!(
            model = %self.model,
            cost_in_usd = cost,
            prompt_tokens = self.usage.prompt_tokens,
            completion_tokens = self.usage.completion_tokens,
            "Responses stream completed"
        );
    }

    /// Output text seen so far.
    #[must_use]
    pub fn content(&self) -> &str {
        &self.usage.content
    }

    /// Cost in USD computed from the completed event, zero before it.
    #[must_use]
    pub fn cost_in_usd(&self) -> f64 {
        self.usage.cost_in_usd
    }

    /// Whether the `[DONE]` marker was seen.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Consume the accumulator.
    #[must_use]
    pub fn finish(self) -> StreamUsage {
        trace!(model = %self.model, done = self.done, "Finishing responses stream");
        self.usage
    }
}
