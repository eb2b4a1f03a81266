use futures_util::stream::{FuturesUnordered, StreamExt};
use serde::{Deserialize, Serialize};

use crate::conversation::{Conversation, Message};
use crate::errors::PlaygroundResult;
use crate::llm::provider::LlmProvider;
use crate::llm::types::{Completion, SamplingConfig};
use crate::session::column::{Column, PendingCall};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
        }
    }

    pub fn other(&self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Side {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "left" | "l" => Ok(Self::Left),
            "right" | "r" => Ok(Self::Right),
            other => Err(format!("unknown side '{other}', expected left or right")),
        }
    }
}

/// Replies applied by one compare-mode send. A side is `None` when its
/// conversation was cleared or replaced before the answer arrived.
#[derive(Debug, Clone, Default)]
pub struct CompareReplies {
    pub left: Option<Message>,
    pub right: Option<Message>,
}

/// Two independent columns fed from one input box.
#[derive(Debug, Clone)]
pub struct CompareCoordinator {
    left: Column,
    right: Column,
}

impl CompareCoordinator {
    /// Both sides start as copies of `main`.
    pub fn enter(
        main: &Conversation,
        left_sampling: SamplingConfig,
        right_sampling: SamplingConfig,
        system_message: &str,
    ) -> Self {
        tracing::info!(
            messages = main.len(),
            left_model = %left_sampling.model,
            right_model = %right_sampling.model,
            "entering compare mode"
        );
        Self {
            left: Column::for_side(Side::Left, left_sampling, system_message, main.messages()),
            right: Column::for_side(Side::Right, right_sampling, system_message, main.messages()),
        }
    }

    pub fn column(&self, side: Side) -> &Column {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }

    pub fn column_mut(&mut self, side: Side) -> &mut Column {
        match side {
            Side::Left => &mut self.left,
            Side::Right => &mut self.right,
        }
    }

    pub fn left(&self) -> &Column {
        &self.left
    }

    pub fn right(&self) -> &Column {
        &self.right
    }

    /// `(target, source)` where source is the side opposite `target`.
    fn pair_mut(&mut self, target: Side) -> (&mut Column, &mut Column) {
        match target {
            Side::Left => (&mut self.left, &mut self.right),
            Side::Right => (&mut self.right, &mut self.left),
        }
    }

    /// Appends one user message to `main` and both sides, then runs both
    /// completion calls concurrently. Each answer (or error) lands on its own
    /// side and is mirrored into `main` in arrival order.
    pub async fn send(
        &mut self,
        main: &mut Conversation,
        provider: &dyn LlmProvider,
        text: &str,
    ) -> Option<CompareReplies> {
        if text.trim().is_empty() {
            tracing::debug!("ignoring blank compare input");
            return None;
        }

        let user = Message::user(text);
        main.append(user.clone());
        let main_ticket = main.ticket();
        let left_call = self.left.begin_with_user(user.clone());
        let right_call = self.right.begin_with_user(user);

        let mut in_flight: FuturesUnordered<_> = [(Side::Left, &left_call), (Side::Right, &right_call)]
            .into_iter()
            .map(|(side, call)| run_side(side, call, provider))
            .collect();

        let mut replies = CompareReplies::default();
        while let Some((side, call, outcome)) = in_flight.next().await {
            tracing::debug!(side = %side, ok = outcome.is_ok(), "compare side resolved");
            let reply = self.column_mut(side).complete(call, outcome);
            if let Some(message) = &reply {
                main.append_if_current(main_ticket, message.clone());
            }
            match side {
                Side::Left => replies.left = reply,
                Side::Right => replies.right = reply,
            }
        }
        Some(replies)
    }

    /// Replaces `target` with fresh-id copies of the opposite side.
    pub fn sync(&mut self, target: Side) {
        let (target_col, source_col) = self.pair_mut(target);
        target_col.conversation.replace_with_copies(source_col.conversation.messages());
        tracing::info!(target = %target, messages = target_col.conversation.len(), "side synchronised");
    }

    pub fn sync_left_from_right(&mut self) {
        self.sync(Side::Left);
    }

    pub fn sync_right_from_left(&mut self) {
        self.sync(Side::Right);
    }

    /// Appends fresh-id copies of `from` onto the opposite side, then empties `from`.
    pub fn move_from(&mut self, from: Side) {
        let (dest, source) = self.pair_mut(from.other());
        let moved = source.conversation.take_all();
        dest.conversation.extend_with_copies(&moved);
        tracing::info!(from = %from, messages = moved.len(), "messages moved");
    }

    pub fn move_left_to_right(&mut self) {
        self.move_from(Side::Left);
    }

    pub fn move_right_to_left(&mut self) {
        self.move_from(Side::Right);
    }

    /// Empties one side; the other side and main are untouched.
    pub fn clear(&mut self, side: Side) {
        self.column_mut(side).clear();
    }
}

async fn run_side<'a>(
    side: Side,
    call: &'a PendingCall,
    provider: &dyn LlmProvider,
) -> (Side, &'a PendingCall, PlaygroundResult<Completion>) {
    let outcome = call.execute(provider).await;
    (side, call, outcome)
}
