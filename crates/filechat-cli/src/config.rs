//! Application configuration loaded from `config.yaml`.

use anyhow::{Context, Result};
use filechat_client::{CompletionSettings, DEFAULT_MAX_RETRIES};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::commands::chat::SessionOptions;

/// Name of the configuration file looked up in the working directory and
/// the user config directory.
pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// Settings read once at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
    pub max_retries: u32,
    /// Echo streamed tokens to stdout
    pub print_response: bool,
    /// Write tokens into the file as they arrive instead of once at the end
    pub stream_for_file: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: None,
            model: None,
            temperature: None,
            max_tokens: None,
            max_retries: DEFAULT_MAX_RETRIES,
            print_response: true,
            stream_for_file: true,
        }
    }
}

impl AppConfig {
    /// Load configuration.
    ///
    /// An explicit path must exist. Otherwise `./config.yaml` is tried, then
    /// `config.yaml` in the user config directory, then defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_path(path);
        }

        match default_locations().into_iter().find(|path| path.is_file()) {
            Some(path) => Self::from_path(&path),
            None => {
                tracing::debug!("No config file found; using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Read a configuration file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        tracing::debug!(path = %path.display(), "Loaded config");
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&text)
            .with_context(|| format!("Invalid config file: {}", path.display()))
    }

    /// Apply values given on the command line (or through the environment).
    pub fn apply_overrides(
        &mut self,
        model: Option<String>,
        api_key: Option<String>,
        base_url: Option<String>,
    ) {
        if model.is_some() {
            self.model = model;
        }
        if api_key.is_some() {
            self.api_key = api_key;
        }
        if base_url.is_some() {
            self.base_url = base_url;
        }
    }

    /// Completion settings before any per-file overrides.
    pub fn completion_settings(&self) -> CompletionSettings {
        CompletionSettings {
            model: self.model.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            max_retries: self.max_retries,
            api_key: self.api_key.clone(),
            base_url: self.base_url.clone(),
        }
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            print_response: self.print_response,
            stream_for_file: self.stream_for_file,
        }
    }
}

fn default_locations() -> Vec<PathBuf> {
    let mut locations = vec![PathBuf::from(CONFIG_FILE_NAME)];
    if let Some(dir) = dirs::config_dir() {
        locations.push(dir.join("filechat").join(CONFIG_FILE_NAME));
    }
    locations
}
