//! Scripted `LlmProvider` used by the session tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::errors::{PlaygroundError, PlaygroundResult};
use crate::llm::provider::LlmProvider;
use crate::llm::types::{
    Choice, Completion, CompletionRequest, CompletionResponse, ModelInfo, ModelList, ResponseMessage, Role, Usage,
};

#[derive(Debug, Clone)]
enum Outcome {
    Reply(String),
    HttpError(u16),
    Transport,
}

/// Answers from a queue, or from a per-model rule when one matches.
/// An exhausted queue answers "ok".
#[derive(Default)]
pub struct ScriptedProvider {
    queue: Mutex<VecDeque<Outcome>>,
    by_model: Mutex<HashMap<String, (Outcome, Duration)>>,
    requests: Mutex<Vec<CompletionRequest>>,
    models: Vec<String>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, text: &str) -> Self {
        self.push(Outcome::Reply(text.to_string()))
    }

    pub fn http_error(self, status: u16) -> Self {
        self.push(Outcome::HttpError(status))
    }

    pub fn transport_error(self) -> Self {
        self.push(Outcome::Transport)
    }

    /// Every request for `model` answers `text` after `delay`.
    pub fn reply_for(self, model: &str, text: &str, delay: Duration) -> Self {
        self.rule(model, Outcome::Reply(text.to_string()), delay)
    }

    pub fn http_error_for(self, model: &str, status: u16) -> Self {
        self.rule(model, Outcome::HttpError(status), Duration::ZERO)
    }

    pub fn with_models(mut self, ids: &[&str]) -> Self {
        self.models = ids.iter().map(|id| id.to_string()).collect();
        self
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn push(self, outcome: Outcome) -> Self {
        self.queue.lock().unwrap().push_back(outcome);
        self
    }

    fn next_outcome(&self, model: &str) -> (Outcome, Duration) {
        if let Some(rule) = self.by_model.lock().unwrap().get(model) {
            return rule.clone();
        }
        let queued = self.queue.lock().unwrap().pop_front();
        (queued.unwrap_or_else(|| Outcome::Reply("ok".to_string())), Duration::ZERO)
    }

    fn rule(self, model: &str, outcome: Outcome, delay: Duration) -> Self {
        self.by_model.lock().unwrap().insert(model.to_string(), (outcome, delay));
        self
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn create_chat_completion(&self, request: &CompletionRequest) -> PlaygroundResult<Completion> {
        self.requests.lock().unwrap().push(request.clone());
        let (outcome, delay) = self.next_outcome(&request.model);
        tokio::time::sleep(delay).await;

        match outcome {
            Outcome::Reply(text) => Ok(Completion {
                response: CompletionResponse {
                    id: "chatcmpl-test".to_string(),
                    model: request.model.clone(),
                    choices: vec![Choice {
                        index: 0,
                        finish_reason: Some("stop".to_string()),
                        message: ResponseMessage {
                            role: Some(Role::Assistant),
                            content: Some(text),
                        },
                    }],
                    usage: Some(Usage {
                        prompt_tokens: 10,
                        completion_tokens: 5,
                        total_tokens: 15,
                    }),
                },
                elapsed_ms: 3,
            }),
            Outcome::HttpError(status) => Err(PlaygroundError::HttpStatus {
                status,
                reason: reqwest::StatusCode::from_u16(status)
                    .ok()
                    .and_then(|s| s.canonical_reason())
                    .unwrap_or("")
                    .to_string(),
                body: String::new(),
            }),
            Outcome::Transport => Err(PlaygroundError::Transport("connection refused".to_string())),
        }
    }

    async fn list_models(&self) -> PlaygroundResult<ModelList> {
        Ok(ModelList {
            data: self
                .models
                .iter()
                .map(|id| ModelInfo {
                    id: id.clone(),
                    object: "model".to_string(),
                })
                .collect(),
        })
    }
}
