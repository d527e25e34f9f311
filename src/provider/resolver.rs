// src/provider/resolver.rs — Build the configured provider

use std::sync::Arc;

use super::google::GoogleProvider;
use super::ollama::OllamaProvider;
use super::openai_compat::{OpenAICompatProvider, OPENAI_BASE_URL};
use super::{ModelProvider, ModelRef};
use crate::infra::config::Config;
use crate::infra::errors::DataScribeError;

/// Apply a `--model` flag: either `provider/model` or just a model name
/// for the configured provider.
pub fn apply_model_override(config: &mut Config, spec: &str) -> Result<(), DataScribeError> {
    let spec = spec.trim();
    if spec.is_empty() {
        return Err(DataScribeError::Config("--model must not be empty".into()));
    }
    match ModelRef::parse(spec) {
        Some(r) => {
            config.model.provider = r.provider;
            config.model.model = r.model;
        }
        None if spec.contains('/') => {
            return Err(DataScribeError::Config(format!(
                "invalid model '{spec}', expected provider/model"
            )));
        }
        None => config.model.model = spec.to_string(),
    }
    Ok(())
}

/// The provider named by `model.provider`, with its API key resolved.
pub fn build_provider(config: &Config) -> Result<Arc<dyn ModelProvider>, DataScribeError> {
    let model = &config.model;
    let require_key = || {
        config.resolve_api_key().ok_or_else(|| DataScribeError::NoApiKey {
            env_var: model.api_key_env.clone(),
        })
    };

    let provider: Arc<dyn ModelProvider> = match model.provider.as_str() {
        "google" | "gemini" => {
            let mut p = GoogleProvider::new(require_key()?);
            if let Some(ref url) = model.base_url {
                p = p.with_base_url(url.clone());
            }
            Arc::new(p)
        }
        "openai" => {
            let url = model
                .base_url
                .clone()
                .unwrap_or_else(|| OPENAI_BASE_URL.into());
            Arc::new(OpenAICompatProvider::new(
                "openai",
                "OpenAI",
                require_key()?,
                url,
                "gpt-4o-mini".into(),
            ))
        }
        "ollama" => Arc::new(OllamaProvider::new(model.base_url.clone())),
        other => match model.base_url {
            // any other id is an OpenAI-compatible endpoint; the key is optional
            Some(ref url) => Arc::new(OpenAICompatProvider::new(
                other,
                other,
                config.resolve_api_key().unwrap_or_default(),
                url.clone(),
                model.model.clone(),
            )),
            None => {
                return Err(DataScribeError::Config(format!(
                    "unknown provider '{other}': use google, openai, ollama, or set model.base_url for an OpenAI-compatible endpoint"
                )))
            }
        },
    };

    tracing::debug!(provider = provider.id(), model = %model.model, "Provider resolved");
    Ok(provider)
}
