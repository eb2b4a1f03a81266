pub mod config;
pub mod conversation;
pub mod errors;
pub mod llm;
pub mod session;

use std::sync::Arc;

use crate::config::AppConfig;
use crate::errors::PlaygroundResult;
use crate::llm::registry::ProviderRegistry;
use crate::session::PlaygroundSession;

/// Installs the global fmt subscriber. `RUST_LOG` wins; default level is `info`.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Everything the front-end needs to start.
pub struct Playground {
    pub config: AppConfig,
    pub registry: ProviderRegistry,
    pub session: PlaygroundSession,
}

/// Loads `.env` and the config file, builds the provider registry and opens a
/// session on the active provider. A missing or broken config file falls back
/// to the built-in defaults.
pub fn bootstrap() -> PlaygroundResult<Playground> {
    // Load .env file if present (ignore error if not found)
    let _ = dotenvy::dotenv();

    let config = match config::load_config() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load config; using defaults");
            AppConfig::default()
        }
    };

    let registry = ProviderRegistry::from_config(&config)?;
    let provider = registry.get_active()?;
    let session = PlaygroundSession::new(Arc::clone(&provider), &config);
    Ok(Playground {
        config,
        registry,
        session,
    })
}
