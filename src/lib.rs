//! Fixit Client - conversational client core.
//!
//! Streams assistant replies from a remote endpoint and folds them into an
//! ordered, observable transcript:
//!
//! - [`application::ConversationStore`] holds the transcript and publishes changes
//! - [`application::StreamingFetcher`] drives one reply exchange into a chunk sink
//! - [`application::SubmitMessageHandler`] runs one turn end to end
//! - [`application::ChatSession`] is the session-scoped handle for front-ends

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
pub mod telemetry;
