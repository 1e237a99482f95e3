//! The LLM Gateway itself (C3): one call interface over attempt retries,
//! schema enforcement, cost accounting, and the function-calling loop
//! (spec §4.3).

use std::time::Duration;

use eduviz_core::CostStore;
use eduviz_models::CostRecord;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{GatewayError, GatewayResult};
use crate::function_calling::{ToolDispatcher, MAX_ITERATIONS};
use crate::provider::{ContentPart, ProviderClient, ToolDeclaration, Turn, Usage};
use crate::schema_cache::{looks_like_schema_incompatibility, SchemaCompatibilityCache};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    Text,
    Json,
}

/// Per-call configuration (spec §4.3 `config`).
#[derive(Debug, Clone)]
pub struct GenerateConfig {
    pub temperature: f32,
    pub timeout: Duration,
    pub max_output_tokens: Option<u32>,
    pub enable_thinking: bool,
    pub response_format: ResponseFormat,
    pub response_schema: Option<Value>,
    pub max_retries: u32,
    pub require_json_valid: bool,
}

impl Default for GenerateConfig {
    fn default() -> Self {
        Self {
            temperature: 0.4,
            timeout: Duration::from_secs(60),
            max_output_tokens: None,
            enable_thinking: false,
            response_format: ResponseFormat::Text,
            response_schema: None,
            max_retries: 2,
            require_json_valid: false,
        }
    }
}

/// Per-call extras (spec §4.3 `opts`).
#[derive(Debug, Clone, Default)]
pub struct GenerateOpts {
    pub system_prompt: Option<String>,
    pub contents: Option<Vec<Turn>>,
    pub tools: Option<Vec<ToolDeclaration>>,
}

/// Uniform result of a gateway call (spec §4.3 `Result`).
#[derive(Debug, Clone, Default)]
pub struct GenerateResult {
    pub success: bool,
    pub response: String,
    pub parsed_json: Option<Value>,
    pub function_calls: Vec<crate::provider::FunctionCall>,
    pub error: Option<String>,
    pub error_reason: Option<String>,
    pub usage: Option<Usage>,
}

/// Increment applied to temperature on each retry to diversify attempts.
const RETRY_TEMPERATURE_STEP: f32 = 0.15;

pub struct Gateway {
    provider: ProviderClient,
    cost_store: CostStore,
    schema_cache: SchemaCompatibilityCache,
    model: String,
}

impl Gateway {
    pub fn new(provider: ProviderClient, cost_store: CostStore, model: impl Into<String>) -> Self {
        Self {
            provider,
            cost_store,
            schema_cache: SchemaCompatibilityCache::new(),
            model: model.into(),
        }
    }

    /// The cost ledger backing this gateway, for callers that need a
    /// per-job summary after the job completes (spec §4.7 step 9).
    pub fn cost_store(&self) -> &CostStore {
        &self.cost_store
    }

    fn record_usage(&self, job_id: &str, usage: Usage) {
        let record = CostRecord {
            model: self.model.clone(),
            input_tokens: usage.input_tokens,
            output_tokens: usage.output_tokens,
            dollars: estimate_dollars(&self.model, usage),
        };
        let cost_store = self.cost_store.clone();
        let job_id = job_id.to_string();
        tokio::spawn(async move {
            cost_store.record(&job_id, record).await;
        });
    }

    /// The single-turn entry point used by C4 and translation. No tools;
    /// see [`Gateway::generate_with_tools`] for the C5 loop.
    pub async fn generate(
        &self,
        job_id: &str,
        prompt: &str,
        config: &GenerateConfig,
        opts: &GenerateOpts,
    ) -> GenerateResult {
        let contents = opts
            .contents
            .clone()
            .unwrap_or_else(|| vec![Turn::user(prompt)]);

        let mut use_schema = config.response_schema.is_some() && !self.schema_cache.is_known_incompatible(&self.model);
        let mut last_error: Option<GatewayError> = None;
        let mut attempt = 0u32;

        loop {
            let temperature = config.temperature + RETRY_TEMPERATURE_STEP * attempt as f32;
            let json_mode = config.response_format == ResponseFormat::Json;

            let call = tokio::time::timeout(
                config.timeout,
                self.provider.call(
                    &self.model,
                    opts.system_prompt.as_deref(),
                    &contents,
                    opts.tools.as_deref(),
                    temperature,
                    config.max_output_tokens,
                    json_mode,
                    config.response_schema.as_ref(),
                    use_schema,
                ),
            )
            .await;

            let response = match call {
                Err(_) => Err(GatewayError::Timeout(config.timeout)),
                Ok(r) => r,
            };

            match response {
                Ok(resp) => {
                    self.record_usage(job_id, resp.usage);

                    if !json_mode {
                        return GenerateResult {
                            success: true,
                            response: resp.text,
                            usage: Some(resp.usage),
                            function_calls: resp.function_calls,
                            ..Default::default()
                        };
                    }

                    match parse_json_response(&resp.text) {
                        Ok(value) => {
                            return GenerateResult {
                                success: true,
                                response: resp.text,
                                parsed_json: Some(value),
                                usage: Some(resp.usage),
                                function_calls: resp.function_calls,
                                ..Default::default()
                            };
                        }
                        Err(e) => {
                            warn!("attempt {} produced invalid JSON: {}", attempt, e);
                            last_error = Some(GatewayError::InvalidJson(e.to_string()));
                        }
                    }
                }
                Err(e) => {
                    if use_schema {
                        if let GatewayError::ProviderStatus { body, .. } = &e {
                            if looks_like_schema_incompatibility(body) {
                                warn!("model {} rejected response_schema, falling back", self.model);
                                self.schema_cache.mark_incompatible(&self.model);
                                use_schema = false;
                                // Reissue immediately without consuming an attempt.
                                continue;
                            }
                        }
                    }
                    debug!("attempt {} failed: {}", attempt, e);
                    last_error = Some(e);
                }
            }

            if attempt >= config.max_retries {
                break;
            }
            attempt += 1;
        }

        let error = last_error.unwrap_or(GatewayError::Empty);
        let error_reason = if config.require_json_valid {
            Some(error.reason_code().to_string())
        } else {
            None
        };

        GenerateResult {
            success: false,
            error: Some(error.to_string()),
            error_reason,
            ..Default::default()
        }
    }

    /// Multi-turn function-calling loop consumed only by C5 (spec §4.3).
    /// `dispatcher` routes function calls to host handlers; the loop stops
    /// when the model returns a turn with no function call, or at
    /// `MAX_ITERATIONS`.
    pub async fn generate_with_tools(
        &self,
        job_id: &str,
        prompt: &str,
        config: &GenerateConfig,
        opts: &GenerateOpts,
        dispatcher: &mut dyn ToolDispatcher,
    ) -> GenerateResult {
        let mut history = opts
            .contents
            .clone()
            .unwrap_or_else(|| vec![Turn::user(prompt)]);
        let tools = opts.tools.as_deref();

        for iteration in 0..MAX_ITERATIONS {
            let call = tokio::time::timeout(
                config.timeout,
                self.provider.call(
                    &self.model,
                    opts.system_prompt.as_deref(),
                    &history,
                    tools,
                    config.temperature,
                    config.max_output_tokens,
                    false,
                    None,
                    false,
                ),
            )
            .await;

            let resp = match call {
                Err(_) => {
                    return GenerateResult {
                        success: false,
                        error: Some(GatewayError::Timeout(config.timeout).to_string()),
                        error_reason: Some("timeout".to_string()),
                        ..Default::default()
                    }
                }
                Ok(Err(e)) => {
                    return GenerateResult {
                        success: false,
                        error: Some(e.to_string()),
                        error_reason: Some(e.reason_code().to_string()),
                        ..Default::default()
                    }
                }
                Ok(Ok(r)) => r,
            };

            self.record_usage(job_id, resp.usage);

            if resp.function_calls.is_empty() {
                return GenerateResult {
                    success: true,
                    response: resp.text,
                    usage: Some(resp.usage),
                    ..Default::default()
                };
            }

            history.push(Turn {
                role: "model".to_string(),
                parts: resp
                    .function_calls
                    .iter()
                    .map(|_| ContentPart::Text(resp.text.clone()))
                    .collect(),
            });

            for call in &resp.function_calls {
                let tool_response = dispatcher.dispatch(call);
                history.push(Turn {
                    role: "function".to_string(),
                    parts: vec![ContentPart::Text(tool_response.response.to_string())],
                });
            }

            debug!("function-calling iteration {} dispatched {} calls", iteration, resp.function_calls.len());
        }

        GenerateResult {
            success: false,
            error: Some(GatewayError::IterationCapExceeded(MAX_ITERATIONS).to_string()),
            error_reason: Some("iteration_cap".to_string()),
            ..Default::default()
        }
    }
}

fn parse_json_response(text: &str) -> GatewayResult<Value> {
    let trimmed = text.trim();
    let trimmed = trimmed.strip_prefix("```json").unwrap_or(trimmed);
    let trimmed = trimmed.strip_prefix("```").unwrap_or(trimmed);
    let trimmed = trimmed.strip_suffix("```").unwrap_or(trimmed);
    serde_json::from_str(trimmed.trim()).map_err(|e| GatewayError::InvalidJson(e.to_string()))
}

/// Rough per-model $/1M-token rates, intentionally approximate (spec §4.3
/// only requires monotonic accounting, not billing accuracy).
fn estimate_dollars(model: &str, usage: Usage) -> f64 {
    let (input_rate, output_rate) = if model.contains("pro") {
        (1.25, 5.0)
    } else if model.contains("lite") {
        (0.05, 0.20)
    } else {
        (0.10, 0.40)
    };
    (usage.input_tokens as f64 / 1_000_000.0) * input_rate
        + (usage.output_tokens as f64 / 1_000_000.0) * output_rate
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_markdown_fences_before_parsing() {
        let text = "```json\n{\"a\": 1}\n```";
        let value = parse_json_response(text).unwrap();
        assert_eq!(value["a"], 1);
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(parse_json_response("not json").is_err());
    }

    #[test]
    fn dollar_estimate_scales_with_tokens() {
        let usage = Usage { input_tokens: 1_000_000, output_tokens: 1_000_000 };
        let cheap = estimate_dollars("gemini-2.5-flash-lite", usage);
        let pro = estimate_dollars("gemini-2.5-pro", usage);
        assert!(pro > cheap);
    }
}
