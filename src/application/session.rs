//! Chat session - the session-scoped handle presentation code talks to.
//!
//! One session owns one [`ConversationStore`] and the handler that feeds it.
//! Everything a view needs (submit, clear, read, observe) goes through here,
//! so consumers share the same transcript without threading the store
//! through every call. Dropping the session abandons any reply in flight.

use std::sync::Arc;
use tokio::sync::{broadcast, watch};

use super::conversation_store::{ConversationEvent, ConversationSnapshot, ConversationStore};
use super::handlers::{SubmitError, SubmitMessageCommand, SubmitMessageHandler, TurnOutcome};
use crate::config::SessionConfig;
use crate::domain::foundation::UserId;
use crate::ports::AssistantClient;

/// Session-scoped conversation handle.
pub struct ChatSession<C: AssistantClient + ?Sized> {
    store: Arc<ConversationStore>,
    handler: SubmitMessageHandler<C>,
    user_id: Option<UserId>,
}

impl<C: AssistantClient + ?Sized> ChatSession<C> {
    /// Starts a session with an empty transcript.
    pub fn new(client: Arc<C>, config: &SessionConfig) -> Self {
        let store = Arc::new(ConversationStore::new());
        let handler = SubmitMessageHandler::new(Arc::clone(&store), client);

        Self {
            store,
            handler,
            user_id: config.user_id(),
        }
    }

    /// Submits a message and waits for its turn to settle.
    ///
    /// # Errors
    ///
    /// See [`SubmitMessageHandler::handle`].
    pub async fn submit(&self, text: impl Into<String>) -> Result<TurnOutcome, SubmitError> {
        let cmd = SubmitMessageCommand::new(text).with_user_id(self.user_id.clone());
        self.handler.handle(cmd).await
    }

    /// Clears the transcript and abandons any reply in flight.
    pub fn clear(&self) {
        self.store.clear();
    }

    /// Returns the current transcript.
    pub fn snapshot(&self) -> ConversationSnapshot {
        self.store.snapshot()
    }

    /// Subscribes to transcript snapshots.
    pub fn subscribe(&self) -> watch::Receiver<ConversationSnapshot> {
        self.store.subscribe()
    }

    /// Subscribes to change events.
    pub fn events(&self) -> broadcast::Receiver<ConversationEvent> {
        self.store.events()
    }

    /// Returns true while a reply is streaming.
    pub fn is_streaming(&self) -> bool {
        self.store.is_streaming()
    }

    /// The user this session submits as.
    pub fn user_id(&self) -> Option<&UserId> {
        self.user_id.as_ref()
    }

    /// The shared store, for consumers that outlive a single call.
    pub fn store(&self) -> &Arc<ConversationStore> {
        &self.store
    }
}

impl<C: AssistantClient + ?Sized> Drop for ChatSession<C> {
    fn drop(&mut self) {
        if self.store.cancel_in_flight() {
            tracing::debug!("Session closed with a reply in flight");
        }
    }
}
