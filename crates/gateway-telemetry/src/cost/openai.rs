//! OpenAI cost estimation.
//!
//! Token rates are USD per 1,000 tokens. Chat prompt tokens are counted the
//! way OpenAI bills them: a per-request primer, per-message framing and a
//! TypeScript-like rendering of function definitions.

use std::sync::Arc;

use gateway_core::{
    ChatCompletionRequest, EmbeddingRequest, FunctionDefinition, GatewayError, GatewayResult,
    MessageRole, ResponseRequest, ResponseTool, ResponseUsage, TextInput,
};
use serde_json::Value;
use tracing::debug;

use super::pricing::{category, PriceTable};
use crate::tokens::TokenCounter;

/// Tokens added once per chat request.
const REQUEST_PRIMER_TOKENS: i64 = 3;
/// Tokens framing every chat message.
const MESSAGE_OVERHEAD_TOKENS: i64 = 3;
/// Tokens wrapping the rendered function definitions.
const FUNCTION_DEFINITION_OVERHEAD_TOKENS: i64 = 9;
/// Primer correction when functions and a system message are both present.
const FUNCTIONS_WITH_SYSTEM_CORRECTION: i64 = 4;

/// Model prefixes billed at the reasoning rate for web search preview.
const REASONING_MODEL_PREFIXES: &[&str] = &["gpt-5", "o1", "o2", "o3"];

const DALL_E_2: &str = "dall-e-2";
const DALL_E_3: &str = "dall-e-3";
const DALL_E_2_RESOLUTIONS: &[&str] = &["256", "512", "1024"];
const DALL_E_3_RESOLUTIONS: &[&str] = &["1024", "1792"];
const DALL_E_3_QUALITIES: &[&str] = &["standart", "hd"];
const DALL_E_3_DEFAULT_QUALITY: &str = "standart";

const CODE_INTERPRETER: &str = "code_interpreter";
const AUTO_CONTAINER: &str = "auto";

/// Cost estimator for OpenAI models.
#[derive(Debug, Clone)]
pub struct OpenAiCostEstimator {
    prices: PriceTable,
    counter: Arc<dyn TokenCounter>,
}

impl OpenAiCostEstimator {
    /// Create an estimator using the built-in price table
    #[must_use]
    pub fn new(counter: Arc<dyn TokenCounter>) -> Self {
        Self::with_prices(PriceTable::openai(), counter)
    }

    /// Create an estimator with a custom price table
    #[must_use]
    pub fn with_prices(prices: PriceTable, counter: Arc<dyn TokenCounter>) -> Self {
        Self { prices, counter }
    }

    /// Price table in use.
    #[must_use]
    pub fn prices(&self) -> &PriceTable {
        &self.prices
    }

    fn rate(&self, category: &str, model: &str) -> GatewayResult<f64> {
        self.prices
            .rate(category, model)
            .ok_or_else(|| GatewayError::model_not_supported(model, category))
    }

    fn count(&self, model: &str, text: &str) -> GatewayResult<usize> {
        self.counter.count(model, text)
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

    /// Cost of `tokens` input tokens; fine-tuned models use their base model's fine-tune bucket.
    pub fn estimate_prompt_cost(&self, model: &str, tokens: u64) -> GatewayResult<f64> {
        let rate = self
            .prices
            .rate(category::PROMPT, &finetune_bucket(model))
            .ok_or_else(|| GatewayError::model_not_supported(model, category::PROMPT))?;
        Ok(per_thousand(tokens, rate))
    }

    /// Cost of `tokens` output tokens.
    pub fn estimate_completion_cost(&self, model: &str, tokens: u64) -> GatewayResult<f64> {
        let rate = self
            .prices
            .rate(category::COMPLETION, &finetune_bucket(model))
            .ok_or_else(|| GatewayError::model_not_supported(model, category::COMPLETION))?;
        Ok(per_thousand(tokens, rate))
    }

    /// Cost of `tokens` embedding input tokens.
    pub fn estimate_embeddings_input_cost(&self, model: &str, tokens: u64) -> GatewayResult<f64> {
        Ok(per_thousand(tokens, self.rate(category::EMBEDDINGS, model)?))
    }

    /// Count and price an embeddings request.
    pub fn estimate_embeddings_cost(&self, request: &EmbeddingRequest) -> GatewayResult<f64> {
        require_model(&request.model)?;
        let tokens = self.count(&request.model, &request.input.joined())?;
        self.estimate_embeddings_input_cost(&request.model, tokens as u64)
    }

    /// Prompt tokens of a chat request as OpenAI bills them.
    pub fn count_chat_completion_prompt_tokens(
        &self,
        request: &ChatCompletionRequest,
    ) -> GatewayResult<usize> {
        let model = request.model.as_str();
        let mut tokens = REQUEST_PRIMER_TOKENS;

        if request.has_functions() {
            let definitions: Vec<&FunctionDefinition> = request.function_definitions().collect();
            let rendered = format_function_definitions(&definitions);
            tokens += self.count(model, &rendered)? as i64 + FUNCTION_DEFINITION_OVERHEAD_TOKENS;

            if request.messages.iter().any(|m| m.role == MessageRole::System) {
                tokens -= FUNCTIONS_WITH_SYSTEM_CORRECTION;
            }
        }

        let mut padded_system = false;
        for message in &request.messages {
            let mut content = message.text();
            if message.role == MessageRole::System && !padded_system {
                content.push('\n');
                padded_system = true;
            }
            let name = message.name.as_deref().unwrap_or_default();

            tokens += self.count(model, &content)? as i64;
            tokens += self.count(model, message.role.as_str())? as i64;
            tokens += self.count(model, name)? as i64;
            tokens += MESSAGE_OVERHEAD_TOKENS;

            if !name.is_empty() {
                tokens += 1;
            }
            if message.role == MessageRole::Function {
                tokens -= 2;
            }
            if message.function_call.is_some() {
                tokens += 3;
            }
        }

        Ok(usize::try_from(tokens).unwrap_or_default())
    }

    /// Prompt token count and cost of a chat request.
    pub fn estimate_chat_completion_prompt_cost_with_token_counts(
        &self,
        request: &ChatCompletionRequest,
    ) -> GatewayResult<(usize, f64)> {
        require_model(&request.model)?;
        let tokens = self.count_chat_completion_prompt_tokens(request)?;
        let cost = self.estimate_prompt_cost(&request.model, tokens as u64)?;
        debug!(model = %request.model, tokens, cost, "Estimated chat prompt cost");
        Ok((tokens, cost))
    }

    /// Completion token count and cost of streamed chat content.
    pub fn estimate_chat_completion_stream_cost_with_token_counts(
        &self,
        model: &str,
        content: &str,
    ) -> GatewayResult<(usize, f64)> {
        self.completion_cost_of_text(model, content)
    }

    /// Prompt token count and cost of a legacy completions request.
    pub fn estimate_completions_request_cost_with_token_counts(
        &self,
        model: &str,
        prompt: &TextInput,
    ) -> GatewayResult<(usize, f64)> {
        require_model(model)?;
        let tokens = self.count(model, &prompt.joined())?;
        let cost = self.estimate_prompt_cost(model, tokens as u64)?;
        Ok((tokens, cost))
    }

    /// Completion token count and cost of streamed legacy completions content.
    pub fn estimate_completions_stream_cost_with_token_counts(
        &self,
        model: &str,
        content: &str,
    ) -> GatewayResult<(usize, f64)> {
        self.completion_cost_of_text(model, content)
    }

    fn completion_cost_of_text(&self, model: &str, content: &str) -> GatewayResult<(usize, f64)> {
        require_model(model)?;
        let tokens = self.count(model, content)?;
        let cost = self.estimate_completion_cost(model, tokens as u64)?;
        Ok((tokens, cost))
    }

    /// Price of one generated image.
    ///
    /// Empty `quality` and `resolution` select the model's base rate; anything
    /// outside the allowed sizes or qualities is rejected.
    pub fn estimate_images_cost(
        &self,
        model: &str,
        quality: &str,
        resolution: &str,
    ) -> GatewayResult<f64> {
        let resolution = simplify_resolution(resolution)?;
        let bucket = match model {
            DALL_E_2 => dall_e_2_bucket(resolution)?,
            DALL_E_3 => dall_e_3_bucket(quality, resolution)?,
            _ => return Err(GatewayError::model_not_supported(model, category::IMAGES)),
        };
        self.prices
            .rate(category::IMAGES, &bucket)
            .ok_or_else(|| GatewayError::model_not_supported(model, category::IMAGES))
    }

    /// Transcription cost; whole seconds billed per minute.
    pub fn estimate_transcription_cost(&self, seconds: f64, model: &str) -> GatewayResult<f64> {
        Ok(seconds.trunc() / 60.0 * self.rate(category::AUDIO, model)?)
    }

    /// Speech synthesis cost per 1,000 input characters.
    pub fn estimate_speech_cost(&self, input: &str, model: &str) -> GatewayResult<f64> {
        let rate = self.rate(category::AUDIO, model)?;
        Ok(input.chars().count() as f64 / 1000.0 * rate)
    }

    /// Fine-tuning cost of `tokens` trained tokens.
    pub fn estimate_finetuning_cost(&self, tokens: u64, model: &str) -> GatewayResult<f64> {
        Ok(self.rate(category::FINETUNE, model)? * tokens as f64)
    }

    /// Token cost of a Responses API call.
    ///
    /// Cached input tokens are billed at the cached rate when the model has
    /// one; otherwise every input token is billed at the prompt rate.
    pub fn estimate_response_api_total_cost(
        &self,
        model: &str,
        usage: &ResponseUsage,
    ) -> GatewayResult<f64> {
        require_model(model)?;

        let (cached_tokens, cached_cost) = match self.prices.rate(category::CACHED_PROMPT, model) {
            Some(rate) => {
                let cached = usage.input_tokens_details.cached_tokens;
                (cached, per_thousand(cached, rate))
            }
            None => (0, 0.0),
        };

        let input_tokens = usage.input_tokens.saturating_sub(cached_tokens);
        let input_cost = per_thousand(input_tokens, self.rate(category::PROMPT, model)?);
        let output_cost = per_thousand(usage.output_tokens, self.rate(category::COMPLETION, model)?);

        Ok(input_cost + cached_cost + output_cost)
    }

    /// Cost of hosted tool calls listed on a response.
    pub fn estimate_response_api_tool_calls_cost(
        &self,
        tools: &[ResponseTool],
        model: &str,
    ) -> GatewayResult<f64> {
        let mut per_thousand_calls = 0.0;
        for tool in tools {
            let tool_type = billed_tool_type(&tool.tool_type, model);
            per_thousand_calls += self
                .prices
                .rate(category::TOOLS, tool_type)
                .ok_or_else(|| GatewayError::model_not_supported(&tool.tool_type, category::TOOLS))?;
        }
        Ok(per_thousand_calls / 1000.0)
    }

    /// Cost of code interpreter containers the request asks to create.
    pub fn estimate_response_api_container_cost(
        &self,
        request: &ResponseRequest,
    ) -> GatewayResult<f64> {
        let mut cost = 0.0;
        for tool in request.tools.iter().filter(|t| t.tool_type == CODE_INTERPRETER) {
            let Some(container) = tool.container_spec() else {
                continue;
            };
            if container.container_type != AUTO_CONTAINER {
                continue;
            }
            let limit = container.memory_limit();
            cost += self.prices.rate(category::CONTAINERS, limit).ok_or_else(|| {
                GatewayError::validation(format!("container memory limit {limit} is not valid"))
            })?;
        }
        Ok(cost)
    }
}

fn per_thousand(tokens: u64, rate: f64) -> f64 {
    tokens as f64 / 1000.0 * rate
}

fn require_model(model: &str) -> GatewayResult<()> {
    if model.is_empty() {
        return Err(GatewayError::validation("model is not provided"));
    }
    Ok(())
}

/// Price bucket of a model: `ft:<base>:<org>...` maps to `finetune-<base>`.
#[must_use]
pub fn finetune_bucket(model: &str) -> String {
    if model.starts_with("ft:") {
        let parts: Vec<&str> = model.split(':').collect();
        if parts.len() > 2 {
            return format!("finetune-{}", parts[1]);
        }
    }
    model.to_string()
}

fn billed_tool_type<'a>(tool_type: &'a str, model: &str) -> &'a str {
    if tool_type == "web_search_preview"
        && REASONING_MODEL_PREFIXES.iter().any(|p| model.starts_with(p))
    {
        return "web_search_preview_reasoning";
    }
    tool_type
}

fn simplify_resolution(resolution: &str) -> GatewayResult<&'static str> {
    if resolution.is_empty() {
        return Ok("");
    }
    ["1792", "1024", "512", "256"]
        .into_iter()
        .find(|size| resolution.contains(size))
        .ok_or_else(|| GatewayError::validation("resolution is not valid"))
}

fn dall_e_2_bucket(resolution: &str) -> GatewayResult<String> {
    if resolution.is_empty() {
        return Ok(DALL_E_2.to_string());
    }
    if DALL_E_2_RESOLUTIONS.contains(&resolution) {
        return Ok(format!("{DALL_E_2}-{resolution}"));
    }
    Err(GatewayError::validation("resolution is not valid"))
}

fn dall_e_3_bucket(quality: &str, resolution: &str) -> GatewayResult<String> {
    if !quality.is_empty() && !DALL_E_3_QUALITIES.contains(&quality) {
        return Err(GatewayError::validation("quality is not valid"));
    }
    if quality.is_empty() && resolution.is_empty() {
        return Ok(DALL_E_3.to_string());
    }
    let quality = if quality.is_empty() {
        DALL_E_3_DEFAULT_QUALITY
    } else {
        quality
    };
    let resolution = if resolution.is_empty() { "1024" } else { resolution };
    if DALL_E_3_RESOLUTIONS.contains(&resolution) {
        return Ok(format!("{DALL_E_3}-{resolution}-{quality}"));
    }
    Err(GatewayError::validation("resolution is not valid"))
}

/// Render function definitions as the pseudo-TypeScript block OpenAI injects into the prompt.
#[must_use]
pub fn format_function_definitions(functions: &[&FunctionDefinition]) -> String {
    let mut lines = vec!["namespace functions {".to_string(), String::new()];

    for function in functions {
        if let Some(description) = function.description.as_deref().filter(|d| !d.is_empty()) {
            lines.push(format!("// {description}"));
        }

        match &function.parameters {
            Some(parameters) => {
                lines.push(format!("type {} = (_: {{", function.name));
                lines.push(format_object_properties(parameters, 0));
                lines.push("}) => any;".to_string());
            }
            None => lines.push(format!("type {} = () => any;", function.name)),
        }

        lines.push(String::new());
    }

    lines.push("} // namespace functions".to_string());
    lines.join("\n")
}

fn format_object_properties(schema: &Value, indent: usize) -> String {
    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
        return String::new();
    };
    let required: Vec<&str> = schema
        .get("required")
        .and_then(Value::as_array)
        .map(|r| r.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    let mut lines = Vec::new();
    for (name, property) in properties {
        if indent < 2 {
            if let Some(description) = property.get("description").and_then(Value::as_str) {
                lines.push(format!("// {description}"));
            }
        }
        let optional = if required.contains(&name.as_str()) { "" } else { "?" };
        lines.push(format!("{name}{optional}: {},", format_type(property, indent)));
    }

    let padding = " ".repeat(indent);
    lines
        .iter()
        .map(|line| format!("{padding}{line}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_type(property: &Value, indent: usize) -> String {
    let enum_values = || {
        property.get("enum").and_then(Value::as_array).map(|values| {
            values
                .iter()
                .map(|v| match v {
                    Value::String(s) => format!("\"{s}\""),
                    other => other.to_string(),
                })
                .collect::<Vec<_>>()
                .join(" | ")
        })
    };

    match property.get("type").and_then(Value::as_str) {
        Some("string") => enum_values().unwrap_or_else(|| "string".to_string()),
        Some("number" | "integer") => enum_values().unwrap_or_else(|| "number".to_string()),
        Some("boolean") => "boolean".to_string(),
        Some("null") => "null".to_string(),
        Some("object") => format!("{{\n{}\n}}", format_object_properties(property, indent + 2)),
        Some("array") => match property.get("items") {
            Some(items) => format!("{}[]", format_type(items, indent)),
            None => "any[]".to_string(),
        },
        _ => String::new(),
    }
}
