// src/provider/openai_compat.rs — OpenAI-compatible chat completions provider
//
// Covers OpenAI itself and any endpoint speaking the same protocol
// (Groq, DeepSeek, Together, OpenRouter, local gateways).

use async_trait::async_trait;
use serde_json::json;

use super::{
    parse_error, status_error, transport_error, FinishReason, GenerateRequest, GenerateResponse,
    ModelProvider, TokenUsage,
};
use crate::infra::errors::DataScribeError;

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

pub struct OpenAICompatProvider {
    id_str: String,
    name_str: String,
    api_key: String,
    base_url: String,
    default_model: String,
    client: reqwest::Client,
}

impl OpenAICompatProvider {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        api_key: String,
        base_url: String,
        default_model: String,
    ) -> Self {
        Self {
            id_str: id.into(),
            name_str: name.into(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            default_model,
            client: reqwest::Client::new(),
        }
    }

    /// OpenAI proper.
    pub fn openai(api_key: String) -> Self {
        Self::new(
            "openai",
            "OpenAI",
            api_key,
            OPENAI_BASE_URL.into(),
            "gpt-4o-mini".into(),
        )
    }
}

pub fn build_request_body(request: &GenerateRequest) -> serde_json::Value {
    let mut messages = Vec::new();
    if let Some(system) = &request.system {
        messages.push(json!({ "role": "system", "content": system }));
    }
    messages.push(json!({ "role": "user", "content": request.prompt }));

    let mut body = json!({
        "model": request.model,
        "messages": messages,
    });
    if let Some(max_tokens) = request.max_tokens {
        body["max_tokens"] = json!(max_tokens);
    }
    if let Some(temp) = request.temperature {
        body["temperature"] = json!(temp);
    }
    body
}

pub fn parse_response(resp: &serde_json::Value) -> GenerateResponse {
    let choice = &resp["choices"][0];
    let content = choice["message"]["content"]
        .as_str()
        .unwrap_or("")
        .to_string();

    let usage = TokenUsage {
        input_tokens: resp["usage"]["prompt_tokens"].as_u64().unwrap_or(0) as u32,
        output_tokens: resp["usage"]["completion_tokens"].as_u64().unwrap_or(0) as u32,
    };

    let finish_reason = match choice["finish_reason"].as_str() {
        Some("stop") => FinishReason::Stop,
        Some("length") => FinishReason::MaxTokens,
        Some("content_filter") => FinishReason::Blocked,
        _ => FinishReason::Unknown,
    };

    GenerateResponse {
        content,
        usage,
        finish_reason,
    }
}

#[async_trait]
impl ModelProvider for OpenAICompatProvider {
    fn id(&self) -> &str {
        &self.id_str
    }

    fn name(&self) -> &str {
        &self.name_str
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }

    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse, DataScribeError> {
        let body = build_request_body(&request);

        tracing::info!(provider = %self.id_str, model = %request.model, "Calling chat completions");

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header(
                "User-Agent",
                format!("datascribe/{}", env!("CARGO_PKG_VERSION")),
            )
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(&self.id_str, e))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(status_error(&self.id_str, status, &error_body));
        }

        let resp: serde_json::Value = response
            .json()
            .await
            .map_err(|e| parse_error(&self.id_str, e))?;

        Ok(parse_response(&resp))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_body_messages() {
        let req = GenerateRequest {
            system: Some("sys".into()),
            temperature: Some(0.0),
            ..GenerateRequest::new("gpt-4o-mini", "analyze")
        };
        let body = build_request_body(&req);
        assert_eq!(
            body,
            json!({
                "model": "gpt-4o-mini",
                "messages": [
                    { "role": "system", "content": "sys" },
                    { "role": "user", "content": "analyze" }
                ],
                "temperature": 0.0
            })
        );
    }

    #[test]
    fn test_parse_response() {
        let resp = json!({
            "choices": [{
                "message": { "role": "assistant", "content": "```rhai\nst.write(1);\n```" },
                "finish_reason": "length"
            }],
            "usage": { "prompt_tokens": 3, "completion_tokens": 4 }
        });
        let parsed = parse_response(&resp);
        assert_eq!(parsed.content, "```rhai\nst.write(1);\n```");
        assert_eq!(parsed.finish_reason, FinishReason::MaxTokens);
        assert_eq!(parsed.usage.total(), 7);
    }

    #[test]
    fn test_parse_response_empty() {
        let parsed = parse_response(&json!({}));
        assert_eq!(parsed.content, "");
        assert_eq!(parsed.finish_reason, FinishReason::Unknown);
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let p = OpenAICompatProvider::new(
            "groq",
            "Groq",
            "k".into(),
            "https://api.groq.com/openai/v1/".into(),
            "llama".into(),
        );
        assert_eq!(p.base_url, "https://api.groq.com/openai/v1");
        assert_eq!(p.default_model(), "llama");
    }
}
