//! Domain layer containing the transcript model.
//!
//! # Module Organization
//!
//! - `foundation` - Shared primitives (ids, timestamps, state machine, errors)
//! - `conversation` - Messages, the transcript aggregate, and turn phases

pub mod conversation;
pub mod foundation;
