//! Wire-level client for the configured model provider (spec §4.3).
//!
//! Mirrors a single provider call: one HTTP request in, one parsed
//! response out. Retries, schema validation, and the function-calling
//! loop live one layer up in [`crate::gateway`].

use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{GatewayError, GatewayResult};

/// A single inline content part: plain text or binary (PDF/image) bytes
/// with a MIME type.
#[derive(Debug, Clone)]
pub enum ContentPart {
    Text(String),
    Binary { mime_type: String, data: Vec<u8> },
}

/// One turn of the conversation sent to the provider. `role` is either
/// `"user"`, `"model"`, or `"function"`.
#[derive(Debug, Clone)]
pub struct Turn {
    pub role: String,
    pub parts: Vec<ContentPart>,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            parts: vec![ContentPart::Text(text.into())],
        }
    }
}

/// A function declaration offered to the model (spec §4.3 function-calling).
#[derive(Debug, Clone, Serialize)]
pub struct ToolDeclaration {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// A function call the model requested.
#[derive(Debug, Clone, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    pub args: Value,
}

/// Token accounting for a single provider call.
#[derive(Debug, Clone, Copy, Default)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// Parsed result of one provider turn, before gateway-level retry/schema
/// logic is applied.
#[derive(Debug, Clone, Default)]
pub struct ProviderResponse {
    pub text: String,
    pub function_calls: Vec<FunctionCall>,
    pub usage: Usage,
}

#[derive(Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<WireContent>,
    #[serde(rename = "systemInstruction", skip_serializing_if = "Option::is_none")]
    system_instruction: Option<WireContent>,
    #[serde(rename = "generationConfig")]
    generation_config: WireGenerationConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<WireTool<'a>>>,
}

#[derive(Serialize)]
struct WireTool<'a> {
    #[serde(rename = "functionDeclarations")]
    function_declarations: &'a [ToolDeclaration],
}

#[derive(Serialize)]
struct WireContent {
    role: Option<String>,
    parts: Vec<WirePart>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum WirePart {
    Text { text: String },
    InlineData { #[serde(rename = "inlineData")] inline_data: WireInlineData },
    FunctionResponse {
        #[serde(rename = "functionResponse")]
        function_response: WireFunctionResponse,
    },
}

#[derive(Serialize)]
struct WireInlineData {
    #[serde(rename = "mimeType")]
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
struct WireFunctionResponse {
    name: String,
    response: Value,
}

#[derive(Serialize)]
struct WireGenerationConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens", skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(rename = "responseMimeType", skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
    #[serde(rename = "responseSchema", skip_serializing_if = "Option::is_none")]
    response_schema: Option<Value>,
}

#[derive(Deserialize)]
struct WireGenerateResponse {
    candidates: Vec<WireCandidate>,
    #[serde(rename = "usageMetadata", default)]
    usage_metadata: Option<WireUsage>,
}

#[derive(Deserialize)]
struct WireCandidate {
    content: WireResponseContent,
}

#[derive(Deserialize)]
struct WireResponseContent {
    #[serde(default)]
    parts: Vec<WireResponsePart>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireResponsePart {
    Text { text: String },
    FunctionCall {
        #[serde(rename = "functionCall")]
        function_call: FunctionCall,
    },
    Other(Value),
}

#[derive(Deserialize, Default)]
struct WireUsage {
    #[serde(rename = "promptTokenCount", default)]
    prompt_token_count: u64,
    #[serde(rename = "candidatesTokenCount", default)]
    candidates_token_count: u64,
}

/// A single provider turn-call. One instance is shared across every
/// gateway invocation; it holds no per-job state (spec §3 Ownership).
pub struct ProviderClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl ProviderClient {
    pub fn from_env() -> GatewayResult<Self> {
        let api_key = std::env::var("GEMINI_API_KEY").map_err(|_| GatewayError::MissingApiKey)?;
        Ok(Self {
            client: Client::new(),
            api_key,
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
        })
    }

    #[cfg(test)]
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: base_url.into(),
        }
    }

    /// One single-turn provider call. `use_schema=false` sends the request
    /// without `responseSchema` even if one was configured, for the
    /// schema-compatibility fallback (spec §4.3).
    pub async fn call(
        &self,
        model: &str,
        system_prompt: Option<&str>,
        contents: &[Turn],
        tools: Option<&[ToolDeclaration]>,
        temperature: f32,
        max_output_tokens: Option<u32>,
        json_mode: bool,
        response_schema: Option<&Value>,
        use_schema: bool,
    ) -> GatewayResult<ProviderResponse> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, model, self.api_key
        );

        let request = GenerateContentRequest {
            contents: contents.iter().map(to_wire_content).collect(),
            system_instruction: system_prompt.map(|s| WireContent {
                role: None,
                parts: vec![WirePart::Text { text: s.to_string() }],
            }),
            generation_config: WireGenerationConfig {
                temperature,
                max_output_tokens,
                response_mime_type: json_mode.then(|| "application/json".to_string()),
                response_schema: use_schema.then(|| response_schema.cloned()).flatten(),
            },
            tools: tools.map(|t| vec![WireTool { function_declarations: t }]),
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::ProviderStatus { status, body });
        }

        let parsed: WireGenerateResponse = response.json().await?;
        let candidate = parsed
            .candidates
            .into_iter()
            .next()
            .ok_or(GatewayError::Empty)?;

        let mut text = String::new();
        let mut function_calls = Vec::new();
        for part in candidate.content.parts {
            match part {
                WireResponsePart::Text { text: t } => text.push_str(&t),
                WireResponsePart::FunctionCall { function_call } => function_calls.push(function_call),
                WireResponsePart::Other(_) => {}
            }
        }

        let usage = parsed
            .usage_metadata
            .map(|u| Usage {
                input_tokens: u.prompt_token_count,
                output_tokens: u.candidates_token_count,
            })
            .unwrap_or_default();

        Ok(ProviderResponse {
            text,
            function_calls,
            usage,
        })
    }
}

fn to_wire_content(turn: &Turn) -> WireContent {
    WireContent {
        role: Some(turn.role.clone()),
        parts: turn
            .parts
            .iter()
            .map(|p| match p {
                ContentPart::Text(t) => WirePart::Text { text: t.clone() },
                ContentPart::Binary { mime_type, data } => WirePart::InlineData {
                    inline_data: WireInlineData {
                        mime_type: mime_type.clone(),
                        data: base64::engine::general_purpose::STANDARD.encode(data),
                    },
                },
            })
            .collect(),
    }
}
