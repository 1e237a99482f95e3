//! Stage B — Language detection (spec §4.4): one short gateway call
//! returning a 2-letter code, defaulting to `en` on any failure.

use eduviz_gateway::{ContentPart, Gateway, GenerateConfig, GenerateOpts, ResponseFormat, Turn};
use eduviz_models::{is_supported_language, DEFAULT_LANGUAGE};
use tracing::warn;

const DETECTION_PROMPT: &str = "Identify the primary language of the following material. \
Respond with only its ISO 639-1 two-letter code, nothing else.";

pub async fn detect_language(gateway: &Gateway, job_id: &str, sample: &ContentPart) -> String {
    let config = GenerateConfig {
        max_retries: 1,
        response_format: ResponseFormat::Text,
        ..Default::default()
    };
    let opts = GenerateOpts {
        contents: Some(vec![Turn {
            role: "user".to_string(),
            parts: vec![ContentPart::Text(DETECTION_PROMPT.to_string()), sample.clone()],
        }]),
        ..Default::default()
    };

    let result = gateway.generate(job_id, DETECTION_PROMPT, &config, &opts).await;
    if !result.success {
        warn!("language detection failed, defaulting to {}: {:?}", DEFAULT_LANGUAGE, result.error);
        return DEFAULT_LANGUAGE.to_string();
    }

    let code = result.response.trim().to_lowercase();
    let code: String = code.chars().take(2).collect();
    if is_supported_language(&code) {
        code
    } else {
        warn!("detected unsupported language code '{}', defaulting to {}", code, DEFAULT_LANGUAGE);
        DEFAULT_LANGUAGE.to_string()
    }
}
