//! Completion settings and per-file overrides.

use filechat_format::Config;
use serde::{Deserialize, Serialize};

use crate::{CompletionError, CompletionResult};

/// Default number of extra attempts after a failed request.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Everything needed to make a completion request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionSettings {
    /// Model name, e.g. `gpt-4o`
    pub model: Option<String>,
    /// Sampling temperature
    pub temperature: Option<f64>,
    /// Upper bound on generated tokens
    pub max_tokens: Option<u32>,
    /// Extra attempts after a failed request
    pub max_retries: u32,
    /// Bearer token for the API
    pub api_key: Option<String>,
    /// API base URL (defaults to OpenAI)
    pub base_url: Option<String>,
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            model: None,
            temperature: None,
            max_tokens: None,
            max_retries: DEFAULT_MAX_RETRIES,
            api_key: None,
            base_url: None,
        }
    }
}

/// The subset of front matter keys that adjust completion settings.
#[derive(Debug, Default, Deserialize)]
struct SettingsOverrides {
    model: Option<String>,
    temperature: Option<f64>,
    max_tokens: Option<u32>,
    max_retries: Option<u32>,
    api_key: Option<String>,
    base_url: Option<String>,
}

impl CompletionSettings {
    /// Apply front matter overrides. Keys that aren't settings are ignored.
    pub fn with_overrides(&self, config: &Config) -> CompletionResult<Self> {
        let value = serde_yaml::to_value(config).map_err(CompletionError::InvalidSettings)?;
        let overrides: SettingsOverrides =
            serde_yaml::from_value(value).map_err(CompletionError::InvalidSettings)?;

        let mut settings = self.clone();
        if overrides.model.is_some() {
            settings.model = overrides.model;
        }
        if overrides.temperature.is_some() {
            settings.temperature = overrides.temperature;
        }
        if overrides.max_tokens.is_some() {
            settings.max_tokens = overrides.max_tokens;
        }
        if let Some(max_retries) = overrides.max_retries {
            settings.max_retries = max_retries;
        }
        if overrides.api_key.is_some() {
            settings.api_key = overrides.api_key;
        }
        if overrides.base_url.is_some() {
            settings.base_url = overrides.base_url;
        }
        Ok(settings)
    }

    /// A copy safe to print: the API key is masked.
    pub fn redacted(&self) -> Self {
        let mut settings = self.clone();
        settings.api_key = self.api_key.as_deref().map(mask_key);
        settings
    }
}

fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return "****".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("****{tail}")
}
