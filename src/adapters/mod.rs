//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the conversation core to external systems:
//! - `assistant` - Remote assistant transport (HTTP) and its test double

pub mod assistant;

pub use assistant::{HttpAssistantClient, HttpAssistantConfig, MockAssistantClient};
