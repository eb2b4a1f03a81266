use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::llm::types::Role;

static LAST_ID: AtomicU64 = AtomicU64::new(0);

/// Timestamp-derived message id, strictly increasing within the process.
/// Two ids minted in the same millisecond still differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(u64);

impl MessageId {
    pub fn next() -> Self {
        let now = u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0);
        let mut prev = LAST_ID.load(Ordering::Relaxed);
        loop {
            let candidate = now.max(prev + 1);
            match LAST_ID.compare_exchange_weak(prev, candidate, Ordering::Relaxed, Ordering::Relaxed) {
                Ok(_) => return Self(candidate),
                Err(actual) => prev = actual,
            }
        }
    }

}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for MessageId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

/// Function call being drafted on an assistant turn.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCallDraft {
    pub function_json: String,
    pub function_response: String,
}

/// Role plus the fields only that role carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum MessageBody {
    User,
    System,
    Assistant {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        function: Option<FunctionCallDraft>,
    },
    Function {
        name: String,
    },
}

impl MessageBody {
    pub fn role(&self) -> Role {
        match self {
            Self::User => Role::User,
            Self::System => Role::System,
            Self::Assistant { .. } => Role::Assistant,
            Self::Function { .. } => Role::Function,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    #[serde(flatten)]
    pub body: MessageBody,
    /// What is currently displayed: either `original_content` or its JSON view.
    pub content: String,
    /// Canonical text, fixed at creation.
    pub original_content: String,
    #[serde(default)]
    pub is_disliked: bool,
    #[serde(default)]
    pub is_json: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl Message {
    fn with_body(body: MessageBody, text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            id: MessageId::next(),
            body,
            content: text.clone(),
            original_content: text,
            is_disliked: false,
            is_json: false,
            created_at: chrono::Utc::now(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::with_body(MessageBody::User, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::with_body(MessageBody::Assistant { function: None }, text)
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::with_body(MessageBody::System, text)
    }

    pub fn function(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self::with_body(MessageBody::Function { name: name.into() }, text)
    }

    pub fn role(&self) -> Role {
        self.body.role()
    }

    /// Same message under a freshly minted id.
    pub fn renumbered(&self) -> Self {
        Self {
            id: MessageId::next(),
            ..self.clone()
        }
    }

    pub fn function_json(&self) -> Option<&str> {
        match &self.body {
            MessageBody::Assistant { function: Some(draft) } => Some(draft.function_json.as_str()),
            _ => None,
        }
    }

    pub fn function_response(&self) -> Option<&str> {
        match &self.body {
            MessageBody::Assistant { function: Some(draft) } => Some(draft.function_response.as_str()),
            _ => None,
        }
    }

    /// Draft slot of an assistant turn, created empty on first use.
    /// `None` for every other role.
    pub(crate) fn function_draft_mut(&mut self) -> Option<&mut FunctionCallDraft> {
        match &mut self.body {
            MessageBody::Assistant { function } => Some(function.get_or_insert_with(Default::default)),
            _ => None,
        }
    }

    /// Pretty-printed `{role, content: original_content}` shown by the JSON view.
    pub fn json_view(&self) -> String {
        let view = JsonView {
            role: self.role(),
            content: &self.original_content,
        };
        serde_json::to_string_pretty(&view).unwrap_or_else(|_| self.original_content.clone())
    }
}

#[derive(Serialize)]
struct JsonView<'a> {
    role: Role,
    content: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique_when_minted_together() {
        let ids: Vec<MessageId> = (0..1000).map(|_| MessageId::next()).collect();
        for pair in ids.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn ids_parse_back_from_their_display_form() {
        let id = MessageId::next();
        assert_eq!(id.to_string().parse::<MessageId>().unwrap(), id);
        assert!("abc".parse::<MessageId>().is_err());
    }

    #[test]
    fn json_view_uses_two_space_indent() {
        let msg = Message::user("Hello");
        assert_eq!(
            msg.json_view(),
            "{\n  \"role\": \"user\",\n  \"content\": \"Hello\"\n}"
        );
    }

    #[test]
    fn function_fields_only_on_assistant() {
        let mut user = Message::user("hi");
        assert!(user.function_draft_mut().is_none());
        assert_eq!(user.function_json(), None);

        let mut assistant = Message::assistant("ok");
        assert_eq!(assistant.function_json(), None);
        assistant.function_draft_mut().unwrap().function_json = "{}".into();
        assert_eq!(assistant.function_json(), Some("{}"));
        assert_eq!(assistant.function_response(), Some(""));
    }

    #[test]
    fn serializes_role_tag_inline() {
        let msg = Message::function("get_weather", "{\"temp\": 20}");
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["role"], "function");
        assert_eq!(value["name"], "get_weather");

        let back: Message = serde_json::from_value(value).unwrap();
        assert_eq!(back, msg);
    }

    #[test]
    fn renumbered_keeps_everything_but_id() {
        let msg = Message::assistant("answer");
        let copy = msg.renumbered();
        assert_ne!(copy.id, msg.id);
        assert_eq!(copy.content, msg.content);
        assert_eq!(copy.body, msg.body);
    }
}
