//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between the
//! conversation core and the outside world. Adapters implement these ports.
//!
//! - `AssistantClient` - Streaming exchange with the remote assistant
//! - `CancelSignal` / `CancelHandle` - Abandoning an in-flight reply

mod assistant_client;
mod cancellation;

pub use assistant_client::{AssistantClient, AssistantError, ReplyRequest, ReplyStream, StoreData};
pub use cancellation::{CancelHandle, CancelSignal};
