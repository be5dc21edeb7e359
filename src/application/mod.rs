//! Application layer - store, fetcher, and handlers.
//!
//! This layer owns the shared transcript and orchestrates turns between it
//! and the assistant port.

pub mod conversation_store;
pub mod handlers;
pub mod session;
pub mod streaming_fetcher;

pub use conversation_store::{ConversationEvent, ConversationSnapshot, ConversationStore, TurnTicket};
pub use handlers::{SubmitError, SubmitMessageCommand, SubmitMessageHandler, TurnOutcome};
pub use session::ChatSession;
pub use streaming_fetcher::{FetchError, FetchSummary, StreamingFetcher};
