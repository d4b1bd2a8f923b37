//! Token counters used by the cost estimators.
//!
//! The estimators never tokenize on their own; they ask an injected
//! [`TokenCounter`] so tests can pin exact token arithmetic and production
//! can plug in a real BPE.

use std::collections::HashMap;

use gateway_core::GatewayResult;

/// Counts tokens for a model.
pub trait TokenCounter: Send + Sync + std::fmt::Debug {
    /// Number of tokens `text` occupies for `model`.
    ///
    /// # Errors
    /// Returns error if the tokenizer cannot be loaded for the model
    fn count(&self, model: &str, text: &str) -> GatewayResult<usize>;
}

/// Counts whitespace-separated words.
#[derive(Debug, Default, Clone, Copy)]
pub struct WhitespaceTokenCounter;

impl TokenCounter for WhitespaceTokenCounter {
    fn count(&self, _model: &str, text: &str) -> GatewayResult<usize> {
        Ok(text.split_whitespace().count())
    }
}

/// Returns fixed counts for known strings and falls back to word counting.
#[derive(Debug, Default, Clone)]
pub struct FixedTokenCounter {
    counts: HashMap<String, usize>,
}

impl FixedTokenCounter {
    /// Create an empty counter
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin the count for `text`
    #[must_use]
    pub fn with(mut self, text: impl Into<String>, tokens: usize) -> Self {
        self.counts.insert(text.into(), tokens);
        self
    }
}

impl TokenCounter for FixedTokenCounter {
    fn count(&self, model: &str, text: &str) -> GatewayResult<usize> {
        match self.counts.get(text) {
            Some(tokens) => Ok(*tokens),
            None => WhitespaceTokenCounter.count(model, text),
        }
    }
}

#[cfg(feature = "tiktoken")]
pub use self::bpe::TiktokenCounter;

#[cfg(feature = "tiktoken")]
mod bpe {
    use tiktoken_rs::{tokenizer, CoreBPE};

    use super::TokenCounter;
    use gateway_core::GatewayResult;

    /// BPE counter picking the encoding registered for the model, `cl100k_base` otherwise.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct TiktokenCounter;

    fn bpe_for_model(model: &str) -> &'static CoreBPE {
        let encoding = tokenizer::get_tokenizer(model).unwrap_or(tokenizer::Tokenizer::Cl100kBase);
        match encoding {
            tokenizer::Tokenizer::O200kHarmony => tiktoken_rs::o200k_harmony_singleton(),
            tokenizer::Tokenizer::O200kBase => tiktoken_rs::o200k_base_singleton(),
            tokenizer::Tokenizer::Cl100kBase => tiktoken_rs::cl100k_base_singleton(),
            tokenizer::Tokenizer::P50kBase => tiktoken_rs::p50k_base_singleton(),
            tokenizer::Tokenizer::P50kEdit => tiktoken_rs::p50k_edit_singleton(),
            tokenizer::Tokenizer::R50kBase | tokenizer::Tokenizer::Gpt2 => {
                tiktoken_rs::r50k_base_singleton()
            }
        }
    }

    impl TokenCounter for TiktokenCounter {
        fn count(&self, model: &str, text: &str) -> GatewayResult<usize> {
            Ok(bpe_for_model(model).encode_with_special_tokens(text).len())
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_counts_with_fallback_encoding() {
            let counter = TiktokenCounter;
            let known = counter.count("gpt-4", "hello world").expect("count");
            let unknown = counter.count("not-a-model", "hello world").expect("count");
            assert_eq!(known, unknown);
            assert!(known > 0);
        }
    }
}
