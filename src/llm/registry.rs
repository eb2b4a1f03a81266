use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::config::AppConfig;
use crate::errors::{PlaygroundError, PlaygroundResult};
use crate::llm::provider::LlmProvider;
use crate::llm::providers::openai_compatible::OpenAiCompatibleProvider;

/// Registry of all available completion endpoints, keyed by their config.toml identifier.
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn LlmProvider>>,
    active: String,
}

impl ProviderRegistry {
    pub fn new(active: String) -> Self {
        Self {
            providers: HashMap::new(),
            active,
        }
    }

    pub fn register(&mut self, provider: Arc<dyn LlmProvider>) {
        self.providers.insert(provider.name().to_string(), provider);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn LlmProvider>> {
        self.providers.get(name).cloned()
    }

    pub fn get_active(&self) -> PlaygroundResult<Arc<dyn LlmProvider>> {
        self.get(&self.active)
            .ok_or_else(|| PlaygroundError::Config(format!("Active provider '{}' not found in registry", self.active)))
    }

    pub fn active_name(&self) -> &str {
        &self.active
    }

    pub fn set_active(&mut self, name: String) -> PlaygroundResult<()> {
        if self.providers.contains_key(&name) {
            tracing::info!(provider = %name, "active provider changed");
            self.active = name;
            Ok(())
        } else {
            Err(PlaygroundError::Config(format!("Provider '{name}' not registered")))
        }
    }

    pub fn list_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.providers.keys().cloned().collect();
        names.sort();
        names
    }

    /// Build a registry from the loaded app config.
    /// API keys are read from environment variables named `PLAYGROUND_<ID>_API_KEY`,
    /// falling back to the `api_key` stored in config.toml.
    pub fn from_config(config: &AppConfig) -> PlaygroundResult<Self> {
        let mut registry = Self::new(config.llm.active_provider.clone());
        for (id, entry) in &config.llm.providers {
            let api_key = std::env::var(api_key_var(id))
                .ok()
                .filter(|k| !k.is_empty())
                .unwrap_or_else(|| entry.api_key.clone().unwrap_or_default());
            if api_key.is_empty() {
                tracing::warn!(provider = %id, "no API key configured");
            }
            let provider = OpenAiCompatibleProvider::new(
                id.clone(),
                entry.api_base.clone(),
                api_key,
                Duration::from_secs(entry.timeout_secs),
            )?;
            tracing::debug!(provider = %id, api_base = %entry.api_base, "provider registered");
            registry.register(Arc::new(provider));
        }
        Ok(registry)
    }
}

fn api_key_var(id: &str) -> String {
    format!("PLAYGROUND_{}_API_KEY", id.to_uppercase().replace('-', "_"))
}
