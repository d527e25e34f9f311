// src/provider/google.rs — Google Generative AI (Gemini) provider

use async_trait::async_trait;
use serde_json::json;

use super::{
    parse_error, status_error, transport_error, FinishReason, GenerateRequest, GenerateResponse,
    ModelProvider, TokenUsage,
};
use crate::infra::errors::DataScribeError;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

pub struct GoogleProvider {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl GoogleProvider {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_BASE_URL.into(),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

/// Build the `generateContent` request body.
pub fn build_request_body(request: &GenerateRequest) -> serde_json::Value {
    let mut body = json!({
        "contents": [{
            "role": "user",
            "parts": [{ "text": request.prompt }],
        }],
    });

    if let Some(ref system) = request.system {
        body["system_instruction"] = json!({
            "parts": [{ "text": system }],
        });
    }

    let mut gen_config = json!({});
    if let Some(max_tokens) = request.max_tokens {
        gen_config["maxOutputTokens"] = json!(max_tokens);
    }
    if let Some(temp) = request.temperature {
        gen_config["temperature"] = json!(temp);
    }
    if gen_config != json!({}) {
        body["generationConfig"] = gen_config;
    }

    body
}

/// Concatenate the text parts of the first candidate.
pub fn parse_response(resp: &serde_json::Value) -> Result<GenerateResponse, DataScribeError> {
    let candidate = &resp["candidates"][0];
    if candidate.is_null() {
        let reason = resp["promptFeedback"]["blockReason"]
            .as_str()
            .unwrap_or("no candidates returned");
        return Err(DataScribeError::Provider {
            provider: "google".into(),
            message: format!("prompt blocked: {reason}"),
            retriable: false,
        });
    }

    let content = candidate["content"]["parts"]
        .as_array()
        .map(|parts| {
            parts
                .iter()
                .filter_map(|p| p["text"].as_str())
                .collect::<String>()
        })
        .unwrap_or_default();

    let usage = TokenUsage {
        input_tokens: resp["usageMetadata"]["promptTokenCount"]
            .as_u64()
            .unwrap_or(0) as u32,
        output_tokens: resp["usageMetadata"]["candidatesTokenCount"]
            .as_u64()
            .unwrap_or(0) as u32,
    };

    let finish_reason = match candidate["finishReason"].as_str() {
        Some("STOP") => FinishReason::Stop,
        Some("MAX_TOKENS") => FinishReason::MaxTokens,
        Some("SAFETY") | Some("RECITATION") | Some("BLOCKLIST") => FinishReason::Blocked,
        _ => FinishReason::Unknown,
    };

    Ok(GenerateResponse {
        content,
        usage,
        finish_reason,
    })
}

#[async_trait]
impl ModelProvider for GoogleProvider {
    fn id(&self) -> &str {
        "google"
    }

    fn name(&self) -> &str {
        "Google"
    }

    fn default_model(&self) -> &str {
        "gemini-1.5-flash"
    }

    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse, DataScribeError> {
        let body = build_request_body(&request);

        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, request.model, self.api_key,
        );

        tracing::info!(model = %request.model, "Calling Gemini generateContent");

        let response = self
            .client
            .post(&url)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error("google", e.without_url()))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(status_error("google", status, &error_body));
        }

        let resp: serde_json::Value = response
            .json()
            .await
            .map_err(|e| parse_error("google", e))?;

        let parsed = parse_response(&resp)?;
        tracing::debug!(
            input_tokens = parsed.usage.input_tokens,
            output_tokens = parsed.usage.output_tokens,
            "Gemini response received"
        );
        Ok(parsed)
    }
}
