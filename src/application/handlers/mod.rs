//! Application handlers.
//!
//! Command handlers that orchestrate the conversation store and the
//! assistant client.

pub mod submit_message;

pub use submit_message::{SubmitError, SubmitMessageCommand, SubmitMessageHandler, TurnOutcome};
