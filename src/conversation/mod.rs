pub mod message;
pub mod store;

pub use message::{FunctionCallDraft, Message, MessageBody, MessageId};
pub use store::{Conversation, ConversationTicket};
