//! One chat column: a conversation plus everything a send needs.
//!
//! A turn runs in three steps so that no borrow of the column is held while
//! the network call is in flight:
//!
//! 1. `begin_*` appends the outgoing message and snapshots a [`PendingCall`].
//! 2. [`PendingCall::execute`] talks to the provider.
//! 3. [`Column::complete`] appends the answer or the error text, unless the
//!    conversation was cleared or replaced in between.

use serde::Serialize;

use crate::conversation::{Conversation, ConversationTicket, Message, MessageId};
use crate::errors::{PlaygroundError, PlaygroundResult};
use crate::llm::models::is_capability_model;
use crate::llm::provider::LlmProvider;
use crate::llm::request::{self, build_request, PendingTurn};
use crate::llm::types::{ChatMessage, Completion, CompletionRequest, ResponseFormat, SamplingConfig, UsageSummary};
use crate::session::compare::Side;
use crate::session::functions::FunctionLibrary;

/// Shown when the server answered without any text.
pub const EMPTY_RESPONSE_TEXT: &str = "(no response)";

#[derive(Debug, Clone)]
pub struct Column {
    pub conversation: Conversation,
    pub sampling: SamplingConfig,
    pub functions: FunctionLibrary,
    pub system_message: String,
    pub last_usage: Option<UsageSummary>,
    side: Option<Side>,
}

/// A completion call that has been prepared but not yet applied.
#[derive(Debug, Clone)]
pub struct PendingCall {
    ticket: ConversationTicket,
    request: CompletionRequest,
}

impl PendingCall {
    /// Issues the call. Capability-only models fail here without touching the network.
    pub async fn execute(&self, provider: &dyn LlmProvider) -> PlaygroundResult<Completion> {
        if is_capability_model(&self.request.model) {
            return Err(PlaygroundError::UnsupportedModel(self.request.model.clone()));
        }
        provider.create_chat_completion(&self.request).await
    }
}

impl Column {
    pub fn new(sampling: SamplingConfig, system_message: impl Into<String>) -> Self {
        Self {
            conversation: Conversation::new(),
            sampling,
            functions: FunctionLibrary::new(),
            system_message: system_message.into(),
            last_usage: None,
            side: None,
        }
    }

    /// A compare-mode column seeded with copies of `messages`.
    pub fn for_side(side: Side, sampling: SamplingConfig, system_message: impl Into<String>, messages: &[Message]) -> Self {
        Self {
            conversation: Conversation::from_messages(messages),
            side: Some(side),
            ..Self::new(sampling, system_message)
        }
    }

    pub fn side(&self) -> Option<Side> {
        self.side
    }

    /// Appends the user turn and prepares its completion call.
    /// Blank input is ignored and returns `None`.
    pub fn begin_user_turn(&mut self, text: &str) -> Option<PendingCall> {
        if text.trim().is_empty() {
            tracing::debug!(side = ?self.side, "ignoring blank input");
            return None;
        }
        let user = Message::user(text);
        Some(self.begin_with_user(user))
    }

    /// Same as [`Column::begin_user_turn`] for a message built by the caller,
    /// so one user message can be shared across columns.
    pub fn begin_with_user(&mut self, user: Message) -> PendingCall {
        let request = build_request(
            Some(self.system_message.as_str()),
            self.conversation.messages(),
            &self.sampling,
            PendingTurn::User(&user.original_content),
        );
        self.conversation.append(user);
        self.pending(request)
    }

    /// Appends the synthetic function message for the assistant turn `id` and
    /// prepares the call that reports it. `None` when `id` is unknown or has
    /// no function attached.
    pub fn begin_function_result(&mut self, id: MessageId) -> Option<PendingCall> {
        let (function_json, function_response) = {
            let message = self.conversation.get(id)?;
            (message.function_json()?.to_string(), message.function_response()?.to_string())
        };
        if function_json.trim().is_empty() {
            tracing::debug!(message = %id, "no function attached");
            return None;
        }

        let request = build_request(
            Some(self.system_message.as_str()),
            self.conversation.messages(),
            &self.sampling,
            PendingTurn::FunctionResult {
                function_json: &function_json,
                function_response: &function_response,
            },
        );
        self.conversation.append(Message::function(
            request::function_name(&function_json),
            request::function_result_content(&function_response),
        ));
        Some(self.pending(request))
    }

    fn pending(&self, request: CompletionRequest) -> PendingCall {
        PendingCall {
            ticket: self.conversation.ticket(),
            request,
        }
    }

    /// Applies the outcome of `call`. Failures become an assistant message
    /// carrying the error text. Returns the appended message, or `None` when
    /// the conversation moved on since the call was issued.
    pub fn complete(&mut self, call: &PendingCall, outcome: PlaygroundResult<Completion>) -> Option<Message> {
        let reply = match outcome {
            Ok(completion) => {
                let usage = completion.usage_summary();
                tracing::info!(
                    side = ?self.side,
                    model = %call.request.model,
                    elapsed_ms = usage.elapsed_ms,
                    prompt_tokens = usage.prompt_tokens,
                    completion_tokens = usage.completion_tokens,
                    "turn completed"
                );
                let text = completion.content().unwrap_or(EMPTY_RESPONSE_TEXT).to_string();
                if self.conversation.is_current(call.ticket) {
                    self.last_usage = Some(usage);
                }
                Message::assistant(text)
            }
            Err(err) => {
                tracing::warn!(side = ?self.side, model = %call.request.model, error = %err, "turn failed");
                Message::assistant(format!("{}{err}", error_prefix(self.side)))
            }
        };

        if self.conversation.append_if_current(call.ticket, reply.clone()) {
            Some(reply)
        } else {
            None
        }
    }

    /// Sends `text` and waits for the answer.
    pub async fn send(&mut self, provider: &dyn LlmProvider, text: &str) -> Option<Message> {
        let call = self.begin_user_turn(text)?;
        let outcome = call.execute(provider).await;
        self.complete(&call, outcome)
    }

    /// Reports the function result attached to assistant turn `id` and waits for the answer.
    pub async fn send_function_result(&mut self, provider: &dyn LlmProvider, id: MessageId) -> Option<Message> {
        let call = self.begin_function_result(id)?;
        let outcome = call.execute(provider).await;
        self.complete(&call, outcome)
    }

    /// Empties the transcript; responses still in flight are dropped.
    pub fn clear(&mut self) {
        self.conversation.clear();
        self.last_usage = None;
    }

    /// Payload shown by "view code" for this column.
    pub fn code_snapshot(&self) -> serde_json::Value {
        let snapshot = CodeSnapshot {
            side: self.side,
            model: &self.sampling.model,
            response_format: self.sampling.response_format,
            config: SnapshotConfig {
                temperature: self.sampling.temperature.unwrap_or(request::DEFAULT_TEMPERATURE),
                max_tokens: self.sampling.max_tokens,
                top_p: self.sampling.top_p.unwrap_or(request::DEFAULT_TOP_P),
                frequency_penalty: self.sampling.frequency_penalty.unwrap_or(request::DEFAULT_PENALTY),
                presence_penalty: self.sampling.presence_penalty.unwrap_or(request::DEFAULT_PENALTY),
            },
            functions: self
                .functions
                .iter()
                .map(|f| SnapshotFunction {
                    name: &f.name,
                    definition: &f.json_definition,
                })
                .collect(),
            messages: self.conversation.messages().iter().map(request::to_wire).collect(),
        };
        serde_json::to_value(snapshot).unwrap_or(serde_json::Value::Null)
    }
}

fn error_prefix(side: Option<Side>) -> String {
    match side {
        Some(side) => format!("Error ({side}): "),
        None => "Error: ".to_string(),
    }
}

#[derive(Serialize)]
struct CodeSnapshot<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    side: Option<Side>,
    model: &'a str,
    response_format: ResponseFormat,
    config: SnapshotConfig,
    functions: Vec<SnapshotFunction<'a>>,
    messages: Vec<ChatMessage>,
}

#[derive(Serialize)]
struct SnapshotConfig {
    temperature: f64,
    max_tokens: Option<u32>,
    top_p: f64,
    frequency_penalty: f64,
    presence_penalty: f64,
}

#[derive(Serialize)]
struct SnapshotFunction<'a> {
    name: &'a str,
    definition: &'a str,
}
