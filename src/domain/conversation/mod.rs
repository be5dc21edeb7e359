//! Conversation domain module.
//!
//! The transcript, its messages, and the lifecycle of a single turn.

mod conversation;
mod message;
mod turn;

pub use conversation::{Conversation, ConversationError, TurnSlot};
pub use message::{Message, Role};
pub use turn::{
    failure_content, FailureContent, TurnPhase, MID_STREAM_FAILURE_NOTICE,
    REQUEST_FAILURE_NOTICE,
};
