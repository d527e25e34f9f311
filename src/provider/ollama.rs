// src/provider/ollama.rs — Local Ollama provider

use async_trait::async_trait;
use serde_json::json;

use super::{
    parse_error, status_error, transport_error, FinishReason, GenerateRequest, GenerateResponse,
    ModelProvider, TokenUsage,
};
use crate::infra::errors::DataScribeError;

pub struct OllamaProvider {
    base_url: String,
    client: reqwest::Client,
}

impl OllamaProvider {
    pub fn new(base_url: Option<String>) -> Self {
        Self {
            base_url: base_url
                .unwrap_or_else(|| "http://localhost:11434".into())
                .trim_end_matches('/')
                .to_string(),
            client: reqwest::Client::new(),
        }
    }
}

impl Default for OllamaProvider {
    fn default() -> Self {
        Self::new(None)
    }
}

pub fn build_request_body(request: &GenerateRequest) -> serde_json::Value {
    let mut body = json!({
        "model": request.model,
        "prompt": request.prompt,
        "stream": false,
    });
    if let Some(ref system) = request.system {
        body["system"] = json!(system);
    }

    let mut options = json!({});
    if let Some(temp) = request.temperature {
        options["temperature"] = json!(temp);
    }
    if let Some(max_tokens) = request.max_tokens {
        options["num_predict"] = json!(max_tokens);
    }
    if options != json!({}) {
        body["options"] = options;
    }
    body
}

pub fn parse_response(resp: &serde_json::Value) -> GenerateResponse {
    GenerateResponse {
        content: resp["response"].as_str().unwrap_or("").to_string(),
        usage: TokenUsage {
            input_tokens: resp["prompt_eval_count"].as_u64().unwrap_or(0) as u32,
            output_tokens: resp["eval_count"].as_u64().unwrap_or(0) as u32,
        },
        finish_reason: match resp["done_reason"].as_str() {
            Some("stop") => FinishReason::Stop,
            Some("length") => FinishReason::MaxTokens,
            _ => FinishReason::Unknown,
        },
    }
}

#[async_trait]
impl ModelProvider for OllamaProvider {
    fn id(&self) -> &str {
        "ollama"
    }

    fn name(&self) -> &str {
        "Ollama"
    }

    fn default_model(&self) -> &str {
        "llama3.1"
    }

    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse, DataScribeError> {
        let body = build_request_body(&request);

        tracing::info!(model = %request.model, "Calling Ollama generate");

        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error("ollama", e))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(status_error("ollama", status, &error_body));
        }

        let resp: serde_json::Value = response
            .json()
            .await
            .map_err(|e| parse_error("ollama", e))?;

        Ok(parse_response(&resp))
    }
}
