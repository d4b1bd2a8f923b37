//! Static price tables.
//!
//! A [`PriceTable`] maps a cost category to per-model rates. OpenAI rates
//! are USD per 1,000 tokens, Anthropic rates USD per 1,000,000 tokens.
//! Images, tools and containers are priced per unit, audio per minute
//! (transcription) or per 1,000 characters (speech).

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Category names.
pub mod category {
    /// Input tokens
    pub const PROMPT: &str = "prompt";
    /// Output tokens
    pub const COMPLETION: &str = "completion";
    /// Input tokens served from the prompt cache
    pub const CACHED_PROMPT: &str = "cached-prompt";
    /// Embedding input tokens
    pub const EMBEDDINGS: &str = "embeddings";
    /// Transcription minutes and speech characters
    pub const AUDIO: &str = "audio";
    /// Generated images
    pub const IMAGES: &str = "images";
    /// Fine-tuning training tokens
    pub const FINETUNE: &str = "finetune";
    /// Hosted tool calls, per 1,000 calls
    pub const TOOLS: &str = "tools";
    /// Code interpreter containers by memory limit
    pub const CONTAINERS: &str = "containers";
}

/// Category → model → rate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PriceTable {
    categories: HashMap<String, HashMap<String, f64>>,
}

impl PriceTable {
    /// Create an empty table
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Built-in OpenAI rates.
    #[must_use]
    pub fn openai() -> Self {
        OPENAI_PRICES.clone()
    }

    /// Built-in Anthropic rates.
    #[must_use]
    pub fn anthropic() -> Self {
        ANTHROPIC_PRICES.clone()
    }

    /// Set a single rate
    #[must_use]
    pub fn with_rate(mut self, category: &str, model: &str, rate: f64) -> Self {
        self.set_rate(category, model, rate);
        self
    }

    /// Set a single rate in place.
    pub fn set_rate(&mut self, category: &str, model: &str, rate: f64) {
        self.categories
            .entry(category.to_string())
            .or_default()
            .insert(model.to_string(), rate);
    }

    /// Rates of one category.
    #[must_use]
    pub fn category(&self, category: &str) -> Option<&HashMap<String, f64>> {
        self.categories.get(category)
    }

    /// Rate for `model` in `category`.
    #[must_use]
    pub fn rate(&self, category: &str, model: &str) -> Option<f64> {
        self.categories.get(category)?.get(model).copied()
    }

    /// Overlay `overrides` onto this table; overridden rates replace existing ones.
    pub fn merge(&mut self, overrides: &Self) {
        for (category, rates) in &overrides.categories {
            let target = self.categories.entry(category.clone()).or_default();
            for (model, rate) in rates {
                target.insert(model.clone(), *rate);
            }
        }
    }

    /// Every rate in the table.
    pub fn rates(&self) -> impl Iterator<Item = f64> + '_ {
        self.categories.values().flat_map(|rates| rates.values().copied())
    }

    /// Whether the table has no rates at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.categories.values().all(HashMap::is_empty)
    }

    fn from_categories(categories: &[(&str, &[(&str, f64)])]) -> Self {
        let mut table = Self::new();
        for (category, rates) in categories {
            for (model, rate) in *rates {
                table.set_rate(category, model, *rate);
            }
        }
        table
    }
}

const OPENAI_PROMPT: &[(&str, f64)] = &[
    ("gpt-5", 0.001_25),
    ("gpt-5-mini", 0.000_25),
    ("gpt-5-nano", 0.000_05),
    ("gpt-5-chat-latest", 0.001_25),
    ("gpt-5-codex", 0.001_25),
    ("gpt-5-pro", 0.015),
    ("gpt-4.1", 0.002),
    ("gpt-4.1-mini", 0.000_4),
    ("gpt-4.1-nano", 0.000_1),
    ("gpt-4o", 0.002_5),
    ("gpt-4o-2024-05-13", 0.005),
    ("gpt-4o-mini", 0.000_15),
    ("gpt-realtime", 0.004),
    ("gpt-realtime-mini", 0.000_6),
    ("gpt-4o-realtime-preview", 0.005),
    ("gpt-4o-mini-realtime-preview", 0.000_6),
    ("gpt-audio", 0.002_5),
    ("gpt-audio-mini", 0.000_6),
    ("gpt-4o-audio-preview", 0.002_5),
    ("gpt-4o-mini-audio-preview", 0.000_15),
    ("o1", 0.015),
    ("o1-pro", 0.15),
    ("o3-pro", 0.02),
    ("o3", 0.002),
    ("o3-deep-research", 0.01),
    ("o4-mini", 0.001_1),
    ("o4-mini-deep-research", 0.002),
    ("o3-mini", 0.001_1),
    ("o1-mini", 0.001_1),
    ("codex-mini-latest", 0.001_5),
    ("gpt-4o-mini-search-preview", 0.000_15),
    ("gpt-4o-search-preview", 0.002_5),
    ("computer-use-preview", 0.003),
    ("chatgpt-4o-latest", 0.005),
    ("gpt-4-turbo-2024-04-09", 0.01),
    ("gpt-4-0125-preview", 0.01),
    ("gpt-4-1106-preview", 0.01),
    ("gpt-4-1106-vision-preview", 0.01),
    ("gpt-4-0613", 0.03),
    ("gpt-4-0314", 0.03),
    ("gpt-4-32k", 0.06),
    ("gpt-3.5-turbo", 0.000_5),
    ("gpt-3.5-turbo-0125", 0.000_5),
    ("gpt-3.5-turbo-1106", 0.001),
    ("gpt-3.5-turbo-0613", 0.001_5),
    ("gpt-3.5-0301", 0.001_5),
    ("gpt-3.5-turbo-instruct", 0.001_5),
    ("gpt-3.5-turbo-16k-0613", 0.003),
    ("davinci-002", 0.002),
    ("babbage-002", 0.000_4),
    // fine-tuned model usage
    ("finetune-gpt-4-0613", 0.045),
    ("finetune-gpt-3.5-turbo-0125", 0.003),
    ("finetune-gpt-3.5-turbo-1106", 0.003),
    ("finetune-gpt-3.5-turbo-0613", 0.003),
    ("finetune-davinci-002", 0.012),
    ("finetune-babbage-002", 0.001_6),
];

const OPENAI_COMPLETION: &[(&str, f64)] = &[
    ("gpt-5", 0.01),
    ("gpt-5-mini", 0.002),
    ("gpt-5-nano", 0.000_4),
    ("gpt-5-chat-latest", 0.01),
    ("gpt-5-codex", 0.01),
    ("gpt-5-pro", 0.12),
    ("gpt-4.1", 0.008),
    ("gpt-4.1-mini", 0.001_6),
    ("gpt-4.1-nano", 0.000_4),
    ("gpt-4o", 0.01),
    ("gpt-4o-2024-05-13", 0.015),
    ("gpt-4o-mini", 0.000_6),
    ("gpt-realtime", 0.016),
    ("gpt-realtime-mini", 0.002_4),
    ("gpt-4o-realtime-preview", 0.02),
    ("gpt-4o-mini-realtime-preview", 0.002_4),
    ("gpt-audio", 0.01),
    ("gpt-audio-mini", 0.002_4),
    ("gpt-4o-audio-preview", 0.01),
    ("gpt-4o-mini-audio-preview", 0.000_6),
    ("o1", 0.06),
    ("o1-pro", 0.6),
    ("o3-pro", 0.08),
    ("o3", 0.008),
    ("o3-deep-research", 0.04),
    ("o4-mini", 0.004_4),
    ("o4-mini-deep-research", 0.008),
    ("o3-mini", 0.004_4),
    ("o1-mini", 0.004_4),
    ("codex-mini-latest", 0.006),
    ("gpt-4o-mini-search-preview", 0.000_6),
    ("gpt-4o-search-preview", 0.01),
    ("computer-use-preview", 0.012),
    ("chatgpt-4o-latest", 0.015),
    ("gpt-4-turbo-2024-04-09", 0.03),
    ("gpt-4-0125-preview", 0.03),
    ("gpt-4-1106-preview", 0.03),
    ("gpt-4-1106-vision-preview", 0.03),
    ("gpt-4-0613", 0.06),
    ("gpt-4-0314", 0.06),
    ("gpt-4-32k", 0.12),
    ("gpt-3.5-turbo", 0.001_5),
    ("gpt-3.5-turbo-0125", 0.001_5),
    ("gpt-3.5-turbo-1106", 0.002),
    ("gpt-3.5-turbo-0613", 0.002),
    ("gpt-3.5-0301", 0.002),
    ("gpt-3.5-turbo-instruct", 0.002),
    ("gpt-3.5-turbo-16k-0613", 0.004),
    ("davinci-002", 0.002),
    ("babbage-002", 0.000_4),
    ("finetune-gpt-4-0613", 0.09),
    ("finetune-gpt-3.5-turbo-0125", 0.006),
    ("finetune-gpt-3.5-turbo-1106", 0.006),
    ("finetune-gpt-3.5-turbo-0613", 0.006),
    ("finetune-davinci-002", 0.012),
    ("finetune-babbage-002", 0.001_6),
];

const OPENAI_CACHED_PROMPT: &[(&str, f64)] = &[
    ("gpt-5", 0.000_125),
    ("gpt-5-mini", 0.000_025),
    ("gpt-5-nano", 0.000_005),
    ("gpt-5-chat-latest", 0.000_125),
    ("gpt-5-codex", 0.000_125),
    ("gpt-4.1", 0.000_5),
    ("gpt-4.1-mini", 0.000_1),
    ("gpt-4.1-nano", 0.000_025),
    ("gpt-4o", 0.001_25),
    ("gpt-4o-mini", 0.000_075),
    ("gpt-realtime", 0.000_4),
    ("gpt-realtime-mini", 0.000_06),
    ("gpt-4o-realtime-preview", 0.002_5),
    ("gpt-4o-mini-realtime-preview", 0.000_3),
    ("o1", 0.007_5),
    ("o3", 0.000_5),
    ("o3-deep-research", 0.002_5),
    ("o4-mini", 0.000_275),
    ("o4-mini-deep-research", 0.000_5),
    ("o3-mini", 0.000_55),
    ("o1-mini", 0.000_55),
    ("codex-mini-latest", 0.000_375),
];

const OPENAI_FINETUNE: &[(&str, f64)] = &[
    ("gpt-4-0613", 0.09),
    ("gpt-3.5-turbo-0125", 0.008),
    ("gpt-3.5-turbo-1106", 0.008),
    ("gpt-3.5-turbo-0613", 0.008),
    ("babbage-002", 0.000_4),
    ("davinci-002", 0.006),
];

const OPENAI_EMBEDDINGS: &[(&str, f64)] = &[
    ("text-embedding-ada-002", 0.000_1),
    ("text-embedding-3-small", 0.000_02),
    ("text-embedding-3-large", 0.000_13),
];

const OPENAI_AUDIO: &[(&str, f64)] = &[
    ("whisper-1", 0.006),
    ("tts-1", 0.015),
    ("tts-1-hd", 0.03),
];

// "standart" is the persisted spelling of the standard quality tier.
const OPENAI_IMAGES: &[(&str, f64)] = &[
    ("dall-e-2", 0.02),
    ("dall-e-2-256", 0.016),
    ("dall-e-2-512", 0.018),
    ("dall-e-2-1024", 0.02),
    ("dall-e-3", 0.04),
    ("dall-e-3-1024-standart", 0.04),
    ("dall-e-3-1792-standart", 0.08),
    ("dall-e-3-1024-hd", 0.08),
    ("dall-e-3-1792-hd", 0.12),
];

const OPENAI_TOOLS: &[(&str, f64)] = &[
    ("web_search", 10.0),
    ("web_search_preview", 25.0),
    ("web_search_preview_reasoning", 10.0),
];

const OPENAI_CONTAINERS: &[(&str, f64)] = &[
    ("1g", 0.03),
    ("4g", 0.12),
    ("16g", 0.48),
    ("64g", 1.92),
];

const ANTHROPIC_PROMPT: &[(&str, f64)] = &[
    ("claude-sonnet-4.5", 3.0),
    ("claude-sonnet-4", 3.0),
    ("claude-3.7-sonnet", 3.0),
    ("claude-opus-4.1", 15.0),
    ("claude-opus-4", 15.0),
    ("claude-3.5-haiku", 0.8),
    ("claude-3-haiku", 0.25),
    ("claude-3.5-sonnet", 3.0),
    ("claude-3-opus", 15.0),
];

const ANTHROPIC_COMPLETION: &[(&str, f64)] = &[
    ("claude-sonnet-4.5", 15.0),
    ("claude-sonnet-4", 15.0),
    ("claude-3.7-sonnet", 15.0),
    ("claude-opus-4.1", 75.0),
    ("claude-opus-4", 75.0),
    ("claude-3.5-haiku", 4.0),
    ("claude-3-haiku", 1.25),
    ("claude-3.5-sonnet", 15.0),
    ("claude-3-opus", 75.0),
];

static OPENAI_PRICES: Lazy<PriceTable> = Lazy::new(|| {
    PriceTable::from_categories(&[
        (category::PROMPT, OPENAI_PROMPT),
        (category::COMPLETION, OPENAI_COMPLETION),
        (category::CACHED_PROMPT, OPENAI_CACHED_PROMPT),
        (category::FINETUNE, OPENAI_FINETUNE),
        (category::EMBEDDINGS, OPENAI_EMBEDDINGS),
        (category::AUDIO, OPENAI_AUDIO),
        (category::IMAGES, OPENAI_IMAGES),
        (category::TOOLS, OPENAI_TOOLS),
        (category::CONTAINERS, OPENAI_CONTAINERS),
    ])
});

static ANTHROPIC_PRICES: Lazy<PriceTable> = Lazy::new(|| {
    PriceTable::from_categories(&[
        (category::PROMPT, ANTHROPIC_PROMPT),
        (category::COMPLETION, ANTHROPIC_COMPLETION),
    ])
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_rates() {
        let openai = PriceTable::openai();
        assert_eq!(openai.rate(category::PROMPT, "gpt-4o"), Some(0.002_5));
        assert_eq!(openai.rate(category::IMAGES, "dall-e-3-1792-hd"), Some(0.12));
        assert_eq!(openai.rate(category::PROMPT, "gpt-unknown"), None);
        assert_eq!(openai.rate("nope", "gpt-4o"), None);

        let anthropic = PriceTable::anthropic();
        assert_eq!(anthropic.rate(category::COMPLETION, "claude-3-haiku"), Some(1.25));
    }

    #[test]
    fn test_merge_overrides() {
        let mut table = PriceTable::openai();
        let overrides = PriceTable::new()
            .with_rate(category::PROMPT, "gpt-4o", 1.0)
            .with_rate(category::PROMPT, "my-model", 2.0);
        table.merge(&overrides);

        assert_eq!(table.rate(category::PROMPT, "gpt-4o"), Some(1.0));
        assert_eq!(table.rate(category::PROMPT, "my-model"), Some(2.0));
        assert_eq!(table.rate(category::COMPLETION, "gpt-4o"), Some(0.01));
    }

    #[test]
    fn test_deserialize_overrides() {
        let table: PriceTable =
            serde_json::from_str(r#"{"prompt": {"local-llm": 0.0001}}"#).expect("deserialize");
        assert_eq!(table.rate(category::PROMPT, "local-llm"), Some(0.0001));
        assert!(!table.is_empty());
        assert!(PriceTable::new().is_empty());
    }
}
