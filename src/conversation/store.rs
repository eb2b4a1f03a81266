//! Ordered message list for one chat thread.
//!
//! Every mutation addressed by id is a no-op when the id is unknown: the UI may
//! hold a stale reference and must never be blocked by it.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::message::{Message, MessageId};

/// Identity of a conversation at the moment a completion call was issued.
/// A response is only appended if the conversation has not been cleared or
/// replaced since.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConversationTicket {
    conversation: Uuid,
    generation: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    id: Uuid,
    #[serde(skip)]
    generation: u64,
    messages: Vec<Message>,
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

impl Conversation {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            generation: 0,
            messages: Vec::new(),
        }
    }

    /// A new conversation holding renumbered copies of `messages`.
    pub fn from_messages(messages: &[Message]) -> Self {
        Self {
            id: Uuid::new_v4(),
            generation: 0,
            messages: messages.iter().map(Message::renumbered).collect(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn get(&self, id: MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    pub fn ids(&self) -> Vec<MessageId> {
        self.messages.iter().map(|m| m.id).collect()
    }

    pub fn ticket(&self) -> ConversationTicket {
        ConversationTicket {
            conversation: self.id,
            generation: self.generation,
        }
    }

    pub fn is_current(&self, ticket: ConversationTicket) -> bool {
        self.ticket() == ticket
    }

    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Appends only if nothing invalidated `ticket` in the meantime.
    /// Returns whether the message was kept.
    pub fn append_if_current(&mut self, ticket: ConversationTicket, message: Message) -> bool {
        if !self.is_current(ticket) {
            tracing::debug!(
                conversation = %self.id,
                message = %message.id,
                "dropping late response for a cleared conversation"
            );
            return false;
        }
        self.messages.push(message);
        true
    }

    pub fn remove(&mut self, id: MessageId) -> bool {
        match self.messages.iter().position(|m| m.id == id) {
            Some(idx) => {
                self.messages.remove(idx);
                true
            }
            None => false,
        }
    }

    pub fn toggle_dislike(&mut self, id: MessageId) -> bool {
        self.update(id, |m| m.is_disliked = !m.is_disliked)
    }

    /// Flips between `original_content` and its JSON view. Applying it twice
    /// restores the previous `content`.
    pub fn toggle_json_view(&mut self, id: MessageId) -> bool {
        self.update(id, |m| {
            if m.is_json {
                m.content = m.original_content.clone();
                m.is_json = false;
            } else {
                m.content = m.json_view();
                m.is_json = true;
            }
        })
    }

    /// Attaches a function definition to an assistant turn and resets its
    /// response. Other roles are left untouched.
    pub fn attach_function(&mut self, id: MessageId, function_json: &str) -> bool {
        self.update_draft(id, |draft| {
            draft.function_json = function_json.to_string();
            draft.function_response.clear();
        })
    }

    pub fn update_function_json(&mut self, id: MessageId, text: &str) -> bool {
        self.update_draft(id, |draft| draft.function_json = text.to_string())
    }

    pub fn update_function_response(&mut self, id: MessageId, text: &str) -> bool {
        self.update_draft(id, |draft| draft.function_response = text.to_string())
    }

    /// Empties the list and invalidates every outstanding ticket.
    pub fn clear(&mut self) {
        self.messages.clear();
        self.generation += 1;
    }

    /// Replaces the whole list with renumbered copies of `messages`.
    pub fn replace_with_copies(&mut self, messages: &[Message]) {
        self.messages = messages.iter().map(Message::renumbered).collect();
        self.generation += 1;
    }

    /// Appends renumbered copies of `messages`.
    pub fn extend_with_copies(&mut self, messages: &[Message]) {
        self.messages.extend(messages.iter().map(Message::renumbered));
    }

    /// Removes and returns every message; invalidates outstanding tickets.
    pub fn take_all(&mut self) -> Vec<Message> {
        self.generation += 1;
        std::mem::take(&mut self.messages)
    }

    fn update(&mut self, id: MessageId, f: impl FnOnce(&mut Message)) -> bool {
        match self.messages.iter_mut().find(|m| m.id == id) {
            Some(message) => {
                f(message);
                true
            }
            None => {
                tracing::debug!(conversation = %self.id, message = %id, "message not found");
                false
            }
        }
    }

    fn update_draft(&mut self, id: MessageId, f: impl FnOnce(&mut super::message::FunctionCallDraft)) -> bool {
        let mut applied = false;
        self.update(id, |m| {
            if let Some(draft) = m.function_draft_mut() {
                f(draft);
                applied = true;
            }
        });
        applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Conversation {
        let mut conv = Conversation::new();
        conv.append(Message::user("What's the weather?"));
        conv.append(Message::assistant("Let me check."));
        conv
    }

    #[test]
    fn append_then_remove_restores_list() {
        let mut conv = sample();
        let before = conv.ids();
        let msg = Message::user("extra");
        let id = msg.id;
        conv.append(msg);
        assert_eq!(conv.len(), 3);
        assert!(conv.remove(id));
        assert_eq!(conv.ids(), before);
    }

    #[test]
    fn unknown_ids_are_noops() {
        let mut conv = sample();
        let stranger = Message::user("elsewhere").id;
        assert!(!conv.remove(stranger));
        assert!(!conv.toggle_dislike(stranger));
        assert!(!conv.toggle_json_view(stranger));
        assert!(!conv.attach_function(stranger, "{}"));
        assert_eq!(conv.len(), 2);
    }

    #[test]
    fn json_toggle_round_trips() {
        let mut conv = sample();
        let id = conv.messages()[1].id;

        assert!(conv.toggle_json_view(id));
        let shown = conv.get(id).unwrap();
        assert!(shown.is_json);
        assert_eq!(
            shown.content,
            "{\n  \"role\": \"assistant\",\n  \"content\": \"Let me check.\"\n}"
        );
        assert_eq!(shown.original_content, "Let me check.");

        assert!(conv.toggle_json_view(id));
        let restored = conv.get(id).unwrap();
        assert!(!restored.is_json);
        assert_eq!(restored.content, "Let me check.");
    }

    #[test]
    fn dislike_does_not_touch_content() {
        let mut conv = sample();
        let id = conv.messages()[0].id;
        assert!(conv.toggle_dislike(id));
        assert!(conv.get(id).unwrap().is_disliked);
        assert_eq!(conv.get(id).unwrap().content, "What's the weather?");
        conv.toggle_dislike(id);
        assert!(!conv.get(id).unwrap().is_disliked);
    }

    #[test]
    fn attach_function_resets_response() {
        let mut conv = sample();
        let id = conv.messages()[1].id;
        conv.update_function_response(id, "{\"temp\": 20}");
        assert_eq!(conv.get(id).unwrap().function_response(), Some("{\"temp\": 20}"));

        assert!(conv.attach_function(id, "{\"name\": \"get_weather\"}"));
        let msg = conv.get(id).unwrap();
        assert_eq!(msg.function_json(), Some("{\"name\": \"get_weather\"}"));
        assert_eq!(msg.function_response(), Some(""));
    }

    #[test]
    fn attach_function_ignores_user_turns() {
        let mut conv = sample();
        let id = conv.messages()[0].id;
        assert!(!conv.attach_function(id, "{}"));
        assert_eq!(conv.get(id).unwrap().function_json(), None);
    }

    #[test]
    fn function_edits_are_free_text() {
        let mut conv = sample();
        let id = conv.messages()[1].id;
        assert!(conv.update_function_json(id, "not json at all"));
        assert!(conv.update_function_response(id, "  "));
        let msg = conv.get(id).unwrap();
        assert_eq!(msg.function_json(), Some("not json at all"));
        assert_eq!(msg.function_response(), Some("  "));
    }

    #[test]
    fn clear_invalidates_tickets() {
        let mut conv = sample();
        let ticket = conv.ticket();
        conv.clear();
        assert!(conv.is_empty());
        assert!(!conv.append_if_current(ticket, Message::assistant("late")));
        assert!(conv.is_empty());

        let fresh = conv.ticket();
        assert!(conv.append_if_current(fresh, Message::assistant("on time")));
        assert_eq!(conv.len(), 1);
    }

    #[test]
    fn copies_get_fresh_ids() {
        let source = sample();
        let mut target = Conversation::new();
        target.replace_with_copies(source.messages());

        let source_ids = source.ids();
        assert!(target.ids().iter().all(|id| !source_ids.contains(id)));
        let contents: Vec<&str> = target.messages().iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["What's the weather?", "Let me check."]);
    }
}
