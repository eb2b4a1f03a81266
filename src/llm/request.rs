//! Turns a conversation plus sampling settings into a completion request.

use crate::conversation::{Message, MessageBody};
use crate::llm::types::{
    ChatMessage, CompletionRequest, ResponseFormat, ResponseFormatParam, Role, SamplingConfig,
    TokenLimit,
};

/// Model-name fragments of the families that still take `max_tokens`.
pub const LEGACY_TOKEN_LIMIT_MARKERS: [&str; 2] = ["gpt-3.5", "gpt-4"];

pub const DEFAULT_TEMPERATURE: f64 = 1.0;
pub const DEFAULT_TOP_P: f64 = 1.0;
pub const DEFAULT_PENALTY: f64 = 0.0;

/// Name given to a function definition without a usable `name`.
pub const UNNAMED_FUNCTION: &str = "Unnamed Function";
/// Function result sent when the user left the response blank.
pub const EMPTY_FUNCTION_RESPONSE: &str = "{}";

/// The turn being sent on top of the existing history.
#[derive(Debug, Clone, Copy)]
pub enum PendingTurn<'a> {
    /// History already ends with the turn to answer.
    None,
    User(&'a str),
    FunctionResult {
        function_json: &'a str,
        function_response: &'a str,
    },
}

pub fn token_limit_for(model: &str, max_tokens: Option<u32>) -> Option<TokenLimit> {
    let limit = max_tokens?;
    if LEGACY_TOKEN_LIMIT_MARKERS.iter().any(|marker| model.contains(marker)) {
        Some(TokenLimit::MaxTokens(limit))
    } else {
        Some(TokenLimit::MaxCompletionTokens(limit))
    }
}

/// Trimmed `name` of a parsed function definition, or [`UNNAMED_FUNCTION`]
/// when it has no non-empty string `name`.
pub fn declared_name(definition: &serde_json::Value) -> &str {
    definition
        .get("name")
        .and_then(|n| n.as_str())
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(UNNAMED_FUNCTION)
}

/// Name sent with the function turn. Matches [`declared_name`] except that
/// the placeholder is spelled as an identifier (`unnamed_function`).
pub fn function_name(function_json: &str) -> String {
    let name = serde_json::from_str::<serde_json::Value>(function_json)
        .map(|v| declared_name(&v).to_string())
        .unwrap_or_else(|_| UNNAMED_FUNCTION.to_string());
    if name == UNNAMED_FUNCTION {
        name.to_lowercase().replace(' ', "_")
    } else {
        name
    }
}

/// Trimmed function response, `{}` when blank.
pub fn function_result_content(function_response: &str) -> String {
    let trimmed = function_response.trim();
    if trimmed.is_empty() {
        EMPTY_FUNCTION_RESPONSE.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Wire projection of a stored message: role and canonical text only.
pub fn to_wire(message: &Message) -> ChatMessage {
    match &message.body {
        MessageBody::Function { name } => ChatMessage::function(name.clone(), message.original_content.clone()),
        body => ChatMessage::new(body.role(), message.original_content.clone()),
    }
}

pub fn build_request(
    system_message: Option<&str>,
    history: &[Message],
    sampling: &SamplingConfig,
    pending: PendingTurn<'_>,
) -> CompletionRequest {
    let mut messages = Vec::with_capacity(history.len() + 2);

    if let Some(system) = system_message.filter(|s| !s.trim().is_empty()) {
        messages.push(ChatMessage::new(Role::System, system));
    }
    messages.extend(history.iter().map(to_wire));

    match pending {
        PendingTurn::None => {}
        PendingTurn::User(text) => messages.push(ChatMessage::new(Role::User, text)),
        PendingTurn::FunctionResult {
            function_json,
            function_response,
        } => messages.push(ChatMessage::function(
            function_name(function_json),
            function_result_content(function_response),
        )),
    }

    let response_format = match sampling.response_format {
        ResponseFormat::Text => None,
        ResponseFormat::JsonObject => Some(ResponseFormatParam {
            format_type: "json_object",
        }),
    };

    CompletionRequest {
        model: sampling.model.clone(),
        messages,
        temperature: sampling.temperature.unwrap_or(DEFAULT_TEMPERATURE),
        token_limit: token_limit_for(&sampling.model, sampling.max_tokens),
        top_p: sampling.top_p.unwrap_or(DEFAULT_TOP_P),
        frequency_penalty: sampling.frequency_penalty.unwrap_or(DEFAULT_PENALTY),
        presence_penalty: sampling.presence_penalty.unwrap_or(DEFAULT_PENALTY),
        response_format,
    }
}
