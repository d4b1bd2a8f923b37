//! Anthropic cost estimation.
//!
//! Rates are USD per 1,000,000 tokens. Dated model ids collapse to a family
//! bucket, and Bedrock cross-region ids (`us.anthropic.<model>`) are unwrapped
//! before the lookup.

use std::sync::Arc;

use gateway_core::{ChatMessage, GatewayError, GatewayResult};

use super::pricing::{category, PriceTable};
use crate::tokens::TokenCounter;

/// Tokens framing each message, and the conversation as a whole.
const MESSAGE_OVERHEAD_TOKENS: usize = 4;

/// Family buckets in match order; earlier prefixes shadow later ones.
const MODEL_FAMILIES: &[(&[&str], &str)] = &[
    (&["claude-sonnet-4.5", "claude-sonnet-4-5"], "claude-sonnet-4.5"),
    (&["claude-sonnet-4"], "claude-sonnet-4"),
    (&["claude-3.7-sonnet", "claude-3-7-sonnet"], "claude-3.7-sonnet"),
    (&["claude-opus-4.1", "claude-opus-4-1"], "claude-opus-4.1"),
    (&["claude-opus-4"], "claude-opus-4"),
    (&["claude-3.5-haiku", "claude-3-5-haiku"], "claude-3.5-haiku"),
    (&["claude-3-haiku"], "claude-3-haiku"),
    (&["claude-3.5-sonnet", "claude-3-5-sonnet"], "claude-3.5-sonnet"),
    (&["claude-3-opus"], "claude-3-opus"),
];

/// Family bucket of an Anthropic model id.
#[must_use]
pub fn select_model(model: &str) -> Option<&'static str> {
    MODEL_FAMILIES
        .iter()
        .find(|(prefixes, _)| prefixes.iter().any(|p| model.starts_with(p)))
        .map(|(_, family)| *family)
}

/// Bucket for any model id, including Bedrock `us.` cross-region aliases.
#[must_use]
pub fn price_bucket(model: &str) -> Option<String> {
    if model.starts_with("us") {
        let parts: Vec<&str> = model.split('.').collect();
        if parts.len() < 3 {
            return Some(model.to_string());
        }
        return select_model(parts[2]).map(str::to_string);
    }
    select_model(model).map(str::to_string)
}

/// Cost estimator for Anthropic models.
#[derive(Debug, Clone)]
pub struct AnthropicCostEstimator {
    prices: PriceTable,
    counter: Arc<dyn TokenCounter>,
}

impl AnthropicCostEstimator {
    /// Create an estimator using the built-in price table
    #[must_use]
    pub fn new(counter: Arc<dyn TokenCounter>) -> Self {
        Self::with_prices(PriceTable::anthropic(), counter)
    }

    /// Create an estimator with a custom price table
    #[must_use]
    pub fn with_prices(prices: PriceTable, counter: Arc<dyn TokenCounter>) -> Self {
        Self { prices, counter }
    }

    fn rate(&self, category: &str, model: &str) -> GatewayResult<f64> {
        price_bucket(model)
            .and_then(|bucket| self.prices.rate(category, &bucket))
            .ok_or_else(|| GatewayError::model_not_supported(model, category))
    }

    /// Cost of `tokens` input tokens.
    pub fn estimate_prompt_cost(&self, model: &str, tokens: u64) -> GatewayResult<f64> {
        Ok(per_million(tokens, self.rate(category::PROMPT, model)?))
    }

    /// Cost of `tokens` output tokens.
    pub fn estimate_completion_cost(&self, model: &str, tokens: u64) -> GatewayResult<f64> {
        Ok(per_million(tokens, self.rate(category::COMPLETION, model)?))
    }

    /// Prompt plus completion cost.
    pub fn estimate_total_cost(
        &self,
        model: &str,
        prompt_tokens: u64,
        completion_tokens: u64,
    ) -> GatewayResult<f64> {
        let prompt = self.estimate_prompt_cost(model, prompt_tokens)?;
        let completion = self.estimate_completion_cost(model, completion_tokens)?;
        Ok(prompt + completion)
    }

    /// Tokens in `text`.
    pub fn count(&self, model: &str, text: &str) -> GatewayResult<usize> {
        self.counter.count(model, text)
    }

    /// Prompt tokens of a message list.
    pub fn count_messages_tokens(
        &self,
        model: &str,
        messages: &[ChatMessage],
    ) -> GatewayResult<usize> {
        let mut tokens = MESSAGE_OVERHEAD_TOKENS;
        for message in messages {
            tokens += self.count(model, &message.text())? + MESSAGE_OVERHEAD_TOKENS;
        }
        Ok(tokens)
    }
}

fn per_million(tokens: u64, rate: f64) -> f64 {
    tokens as f64 / 1_000_000.0 * rate
}
