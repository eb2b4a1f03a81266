use async_trait::async_trait;

use crate::errors::PlaygroundResult;
use crate::llm::types::{Completion, CompletionRequest, ModelList};

/// Unified chat-completion endpoint. All providers implement this trait.
/// New providers only need to implement this trait and register in config.toml.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Returns the provider's identifier (matches config.toml key).
    fn name(&self) -> &str;

    /// Sends one completion request. Never retries: a transport failure or a
    /// non-2xx status comes back as an error on the first attempt.
    async fn create_chat_completion(&self, request: &CompletionRequest) -> PlaygroundResult<Completion>;

    /// Lists the models the endpoint serves.
    async fn list_models(&self) -> PlaygroundResult<ModelList>;
}
