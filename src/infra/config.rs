// src/infra/config.rs — Configuration loading (TOML)

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::infra::errors::DataScribeError;
use crate::infra::paths;
use crate::viz::LabelMode;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub model: ModelConfig,

    #[serde(default)]
    pub prompt: PromptConfig,

    #[serde(default)]
    pub bindings: BindingsConfig,

    #[serde(default)]
    pub execution: ExecutionConfig,

    #[serde(default)]
    pub safety: SafetyConfig,

    #[serde(default)]
    pub display: DisplayConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// `google`, `openai` or `ollama`.
    pub provider: String,
    pub model: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// Override the provider's default endpoint.
    pub base_url: Option<String>,
    pub timeout_seconds: u64,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: "google".into(),
            model: "gemini-1.5-flash".into(),
            api_key_env: "API_KEY".into(),
            base_url: None,
            timeout_seconds: 60,
            temperature: None,
            max_tokens: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    /// Rows of the dataset shown to the model.
    pub preview_rows: usize,
    /// Fence tag the model is asked to use.
    pub language_tag: String,
    /// Fence tags accepted by the extractor.
    pub accepted_tags: Vec<String>,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            preview_rows: 5,
            language_tag: "rhai".into(),
            accepted_tags: vec!["rhai".into()],
        }
    }
}

/// Identifiers bound into the executed script. The prompt names the same
/// identifiers, so both sides always read them from here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BindingsConfig {
    pub dataset: String,
    pub display: String,
    pub plot: String,
    /// Never bound; only used to strip re-created upload widgets.
    pub upload_widget: String,
}

impl Default for BindingsConfig {
    fn default() -> Self {
        Self {
            dataset: "data".into(),
            display: "st".into(),
            plot: "plt".into(),
            upload_widget: "uploaded_file".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    pub timeout_seconds: u64,
    pub max_operations: u64,
    pub max_string_size: usize,
    pub max_array_size: usize,
    pub max_map_size: usize,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            max_operations: 5_000_000,
            max_string_size: 1_048_576,
            max_array_size: 1_000_000,
            max_map_size: 100_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyConfig {
    /// Substring -> reason shown when the generated code is refused.
    #[serde(default = "default_denylist")]
    pub denylist: BTreeMap<String, String>,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            denylist: default_denylist(),
        }
    }
}

fn default_denylist() -> BTreeMap<String, String> {
    [
        ("os.system", "OS command execution"),
        ("subprocess", "subprocess spawning"),
        ("eval", "nested dynamic evaluation"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub max_table_rows: usize,
    pub chart_width: usize,
    pub chart_height: usize,
    /// How crowded x-axis labels are shown: `thin`, `shrink` or `auto`.
    pub label_mode: LabelMode,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            max_table_rows: 20,
            chart_width: 50,
            chart_height: 12,
            label_mode: LabelMode::Auto,
        }
    }
}

impl Config {
    /// Load config from file, falling back to defaults.
    pub fn load() -> Result<Self, DataScribeError> {
        match paths::config_file_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, DataScribeError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| DataScribeError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), DataScribeError> {
        let b = &self.bindings;
        for (what, name) in [
            ("bindings.dataset", &b.dataset),
            ("bindings.display", &b.display),
            ("bindings.plot", &b.plot),
            ("bindings.upload_widget", &b.upload_widget),
        ] {
            if !is_identifier(name) {
                return Err(DataScribeError::Config(format!(
                    "{what} must be a plain identifier, got '{name}'"
                )));
            }
        }
        if b.dataset == b.display || b.dataset == b.plot || b.display == b.plot {
            return Err(DataScribeError::Config(
                "bindings.dataset, bindings.display and bindings.plot must differ".into(),
            ));
        }
        if self.prompt.accepted_tags.is_empty() {
            return Err(DataScribeError::Config(
                "prompt.accepted_tags must not be empty".into(),
            ));
        }
        if self.safety.denylist.keys().any(|k| k.is_empty()) {
            return Err(DataScribeError::Config(
                "safety.denylist entries must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// API key for the configured provider: `model.api_key_env` first,
    /// then the provider's conventional variable.
    pub fn resolve_api_key(&self) -> Option<String> {
        let fallbacks: &[&str] = match self.model.provider.as_str() {
            "google" => &["GEMINI_API_KEY", "GOOGLE_API_KEY"],
            "openai" => &["OPENAI_API_KEY"],
            _ => &[],
        };
        std::iter::once(self.model.api_key_env.as_str())
            .chain(fallbacks.iter().copied())
            .filter_map(|var| std::env::var(var).ok())
            .find(|key| !key.trim().is_empty())
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
