// src/pipeline/mod.rs — Query to runnable code: prompt, model call, extraction, sanitizing
//
// The four pre-execution steps, each callable on its own. Execution lives
// behind `sandbox::Executor`; `session::Session` strings the two together.

pub mod extract;
pub mod prompt;
pub mod sanitize;
pub mod session;

use std::sync::Arc;
use std::time::Duration;

use crate::dataset::Dataset;
use crate::infra::config::Config;
use crate::infra::errors::DataScribeError;
use crate::provider::{GenerateRequest, ModelProvider};
use crate::util::log_line;
use extract::CodeExtractor;
use prompt::{AnalysisRequest, PromptBuilder};
use sanitize::{SanitizedCode, Sanitizer};

pub struct Pipeline {
    provider: Arc<dyn ModelProvider>,
    model: String,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    model_timeout: Duration,
    preview_rows: usize,
    prompts: PromptBuilder,
    extractor: CodeExtractor,
    sanitizer: Sanitizer,
}

impl Pipeline {
    pub fn new(config: &Config, provider: Arc<dyn ModelProvider>) -> Result<Self, DataScribeError> {
        let model = if config.model.model.trim().is_empty() {
            provider.default_model().to_string()
        } else {
            config.model.model.clone()
        };
        Ok(Self {
            provider,
            model,
            temperature: config.model.temperature,
            max_tokens: config.model.max_tokens,
            model_timeout: Duration::from_secs(config.model.timeout_seconds),
            preview_rows: config.prompt.preview_rows,
            prompts: PromptBuilder::from_config(config),
            extractor: CodeExtractor::new(&config.prompt.accepted_tags)?,
            sanitizer: Sanitizer::from_config(config)?,
        })
    }

    pub fn provider(&self) -> &dyn ModelProvider {
        self.provider.as_ref()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn build_prompt(&self, query: &str, dataset: &Dataset) -> String {
        let request = AnalysisRequest::from_dataset(query, dataset, self.preview_rows);
        self.prompts.build(&request)
    }

    /// Send one prompt and return the raw response text. Bounded by
    /// `model.timeout_seconds`; never retried.
    pub async fn request_code(&self, prompt: &str) -> Result<String, DataScribeError> {
        let request = GenerateRequest {
            model: self.model.clone(),
            prompt: prompt.to_string(),
            system: None,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        tracing::debug!(
            provider = self.provider.id(),
            prompt_chars = prompt.len(),
            "Requesting code"
        );

        let response = tokio::time::timeout(self.model_timeout, self.provider.generate(request))
            .await
            .map_err(|_| DataScribeError::ModelTimeout {
                provider: self.provider.id().to_string(),
                seconds: self.model_timeout.as_secs(),
            })??;

        tracing::debug!(
            finish_reason = ?response.finish_reason,
            "Model responded: {}",
            log_line(&response.content, 200)
        );
        Ok(response.content)
    }

    pub fn extract<'a>(&self, response: &'a str) -> Result<&'a str, DataScribeError> {
        self.extractor.extract(response)
    }

    pub fn rewrite(&self, code: &str) -> String {
        self.sanitizer.rewrite(code)
    }

    pub fn sanitize(&self, code: &str) -> Result<SanitizedCode, DataScribeError> {
        self.sanitizer.sanitize(code)
    }
}
