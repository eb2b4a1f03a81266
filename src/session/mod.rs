pub mod column;
pub mod compare;
pub mod functions;
pub mod generate;
pub mod history;
pub mod playground;

#[cfg(test)]
pub(crate) mod testing;

pub use column::{Column, PendingCall};
pub use compare::{CompareCoordinator, CompareReplies, Side};
pub use functions::{FunctionDefinition, FunctionLibrary};
pub use history::{HistoryEntry, HistoryLog};
pub use playground::{PlaygroundSession, TurnOutcome};
