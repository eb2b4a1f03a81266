use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{PlaygroundError, PlaygroundResult};
use crate::llm::types::SamplingConfig;

const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub llm: LlmConfig,
    /// Sampling defaults for a freshly created column.
    #[serde(default)]
    pub sampling: SamplingConfig,
    #[serde(default)]
    pub compare: CompareConfig,
    #[serde(default)]
    pub generator: GeneratorConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        let mut providers = HashMap::new();
        providers.insert(
            "openai".to_string(),
            ProviderEntry {
                display_name: "OpenAI".to_string(),
                api_base: "https://api.openai.com/v1".to_string(),
                api_key: None,
                timeout_secs: default_timeout_secs(),
            },
        );
        Self {
            llm: LlmConfig {
                active_provider: "openai".to_string(),
                providers,
            },
            sampling: SamplingConfig::default(),
            compare: CompareConfig::default(),
            generator: GeneratorConfig::default(),
            session: SessionConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LlmConfig {
    pub active_provider: String,
    pub providers: HashMap<String, ProviderEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderEntry {
    pub display_name: String,
    /// Base URL up to and including the version segment, e.g. `https://api.openai.com/v1`.
    pub api_base: String,
    /// Optional API key stored in config.toml (env var PLAYGROUND_<ID>_API_KEY wins).
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    120
}

/// Initial models for the two compare columns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompareConfig {
    #[serde(default = "default_compare_model")]
    pub left_model: String,
    #[serde(default = "default_compare_model")]
    pub right_model: String,
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            left_model: default_compare_model(),
            right_model: default_compare_model(),
        }
    }
}

fn default_compare_model() -> String {
    "gpt-4".to_string()
}

/// Model settings used by the system-message and function-definition generators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    pub model: String,
    pub temperature: f64,
    pub system_message_max_tokens: u32,
    pub function_max_tokens: u32,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            model: "gpt-3.5-turbo".to_string(),
            temperature: 0.7,
            system_message_max_tokens: 150,
            function_max_tokens: 200,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_system_message")]
    pub system_message: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            system_message: default_system_message(),
        }
    }
}

fn default_system_message() -> String {
    "You are a helpful assistant.".to_string()
}

fn resolve_config_path() -> PlaygroundResult<PathBuf> {
    if let Ok(exe) = std::env::current_exe() {
        if let Some(parent) = exe.parent() {
            let candidate = parent.join(CONFIG_FILE);
            if candidate.exists() {
                tracing::debug!(path = %candidate.display(), "config found next to executable");
                return Ok(candidate);
            }
        }
    }

    let cwd = std::env::current_dir()?;
    let candidate = cwd.join(CONFIG_FILE);
    if candidate.exists() {
        tracing::debug!(path = %candidate.display(), "config found in working directory");
        return Ok(candidate);
    }

    if let Some(dir) = dirs::config_dir() {
        let candidate = dir.join("playground").join(CONFIG_FILE);
        if candidate.exists() {
            tracing::debug!(path = %candidate.display(), "config found in user config directory");
            return Ok(candidate);
        }
    }

    Err(PlaygroundError::Config(
        "config.toml not found next to executable, in working directory or user config directory"
            .into(),
    ))
}

pub fn load_config() -> PlaygroundResult<AppConfig> {
    let path = resolve_config_path()?;
    load_config_from(&path)
}

pub fn load_config_from(path: &Path) -> PlaygroundResult<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: AppConfig = toml::from_str(&content)?;
    if !config.llm.providers.contains_key(&config.llm.active_provider) {
        return Err(PlaygroundError::Config(format!(
            "active provider '{}' has no [llm.providers.{}] entry",
            config.llm.active_provider, config.llm.active_provider
        )));
    }
    tracing::info!(path = %path.display(), provider = %config.llm.active_provider, "config loaded");
    Ok(config)
}

pub fn save_config(config: &AppConfig) -> PlaygroundResult<()> {
    let path = resolve_config_path()?;
    save_config_to(config, &path)
}

pub fn save_config_to(config: &AppConfig, path: &Path) -> PlaygroundResult<()> {
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    tracing::info!(path = %path.display(), "config saved");
    Ok(())
}
