use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::errors::{PlaygroundError, PlaygroundResult};
use crate::llm::provider::LlmProvider;
use crate::llm::types::{Completion, CompletionRequest, CompletionResponse, ModelList};

pub struct OpenAiCompatibleProvider {
    id: String,
    api_base: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiCompatibleProvider {
    pub fn new(id: String, api_base: String, api_key: String, timeout: Duration) -> PlaygroundResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PlaygroundError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            id,
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key,
            client,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_base, path)
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if self.api_key.is_empty() {
            builder
        } else {
            builder.bearer_auth(&self.api_key)
        }
    }
}

/// Maps a non-2xx response to `HttpStatus`, keeping whatever body the server sent.
async fn reject_status(response: reqwest::Response) -> PlaygroundError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    PlaygroundError::HttpStatus {
        status: status.as_u16(),
        reason: status.canonical_reason().unwrap_or("").to_string(),
        body,
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        &self.id
    }

    async fn create_chat_completion(&self, request: &CompletionRequest) -> PlaygroundResult<Completion> {
        tracing::debug!(
            provider = %self.id,
            model = %request.model,
            messages = request.messages.len(),
            "sending completion request"
        );
        tracing::debug!(
            body = %serde_json::to_string(request).unwrap_or_default(),
            "request body"
        );

        let started = Instant::now();
        let response = self
            .authorize(self.client.post(self.endpoint("chat/completions")))
            .json(request)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(provider = %self.id, error = %e, "completion request failed in transit");
                PlaygroundError::Transport(e.to_string())
            })?;

        if !response.status().is_success() {
            let err = reject_status(response).await;
            tracing::warn!(provider = %self.id, error = %err, "completion request rejected");
            return Err(err);
        }

        let bytes = response.bytes().await?;
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        let parsed: CompletionResponse =
            serde_json::from_slice(&bytes).map_err(|e| PlaygroundError::Decode(e.to_string()))?;

        tracing::info!(
            provider = %self.id,
            model = %request.model,
            elapsed_ms,
            request_id = %parsed.id,
            choices = parsed.choices.len(),
            "completion received"
        );

        Ok(Completion {
            response: parsed,
            elapsed_ms,
        })
    }

    async fn list_models(&self) -> PlaygroundResult<ModelList> {
        let response = self
            .authorize(self.client.get(self.endpoint("models")))
            .send()
            .await
            .map_err(|e| PlaygroundError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(reject_status(response).await);
        }

        let list: ModelList = response.json().await?;
        tracing::info!(provider = %self.id, models = list.data.len(), "model list received");
        Ok(list)
    }
}
