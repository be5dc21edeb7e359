//! SubmitMessage command handler.
//!
//! Runs one conversational turn: validate the input, open the turn in the
//! store, stream the reply into the placeholder, settle.
//!
//! Transport failures never escape this handler. They are written into the
//! transcript as a notice and reported as [`TurnOutcome::Failed`]; only the
//! synchronous rejections come back as [`SubmitError`].

use std::sync::Arc;
use thiserror::Error;

use crate::application::conversation_store::{ConversationStore, TurnTicket};
use crate::application::streaming_fetcher::{FetchError, FetchSummary, StreamingFetcher};
use crate::domain::conversation::{failure_content, ConversationError};
use crate::domain::foundation::{MessageId, UserId, ValidationError};
use crate::ports::{AssistantClient, ReplyRequest};

/// Command to submit a user message.
#[derive(Debug, Clone)]
pub struct SubmitMessageCommand {
    /// The message as typed; sent untrimmed.
    pub text: String,
    /// Signed-in user, forwarded to the assistant.
    pub user_id: Option<UserId>,
}

impl SubmitMessageCommand {
    /// Creates a command without a user.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            user_id: None,
        }
    }

    /// Sets the user id.
    pub fn with_user_id(mut self, user_id: Option<UserId>) -> Self {
        self.user_id = user_id;
        self
    }
}

/// Synchronous rejections. The transcript is untouched when these occur.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    /// Message text is empty or whitespace only.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A reply is already streaming.
    #[error("An assistant reply is already streaming")]
    ReplyInFlight,
}

impl From<ConversationError> for SubmitError {
    fn from(err: ConversationError) -> Self {
        match err {
            ConversationError::ReplyInFlight => SubmitError::ReplyInFlight,
        }
    }
}

/// How an accepted turn ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The reply streamed to the end.
    Completed {
        user_message_id: MessageId,
        assistant_message_id: MessageId,
        chunks: usize,
    },
    /// The exchange failed; the placeholder now carries a notice.
    Failed {
        user_message_id: MessageId,
        assistant_message_id: MessageId,
        /// True if streamed text was kept ahead of the notice.
        partial_retained: bool,
    },
    /// The reply was cancelled, usually by a clear, before it settled.
    Abandoned {
        user_message_id: MessageId,
        assistant_message_id: MessageId,
    },
}

impl TurnOutcome {
    /// Id of the turn's assistant message.
    pub fn assistant_message_id(&self) -> MessageId {
        match self {
            Self::Completed {
                assistant_message_id,
                ..
            }
            | Self::Failed {
                assistant_message_id,
                ..
            }
            | Self::Abandoned {
                assistant_message_id,
                ..
            } => *assistant_message_id,
        }
    }

    /// Returns true if the reply streamed to the end.
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

/// Handler for user submissions.
pub struct SubmitMessageHandler<C: AssistantClient + ?Sized> {
    store: Arc<ConversationStore>,
    fetcher: StreamingFetcher<C>,
}

impl<C: AssistantClient + ?Sized> SubmitMessageHandler<C> {
    /// Creates a new handler with the given dependencies.
    pub fn new(store: Arc<ConversationStore>, client: Arc<C>) -> Self {
        Self {
            store,
            fetcher: StreamingFetcher::new(client),
        }
    }

    /// Handles a submit command.
    ///
    /// # Errors
    ///
    /// - `Validation` if the text is empty or whitespace only
    /// - `ReplyInFlight` if another turn is still streaming
    pub async fn handle(&self, cmd: SubmitMessageCommand) -> Result<TurnOutcome, SubmitError> {
        // 1. Entry guard
        if cmd.text.trim().is_empty() {
            tracing::warn!("Rejected empty submission");
            return Err(ValidationError::empty_field("message").into());
        }

        // 2. Open the turn: user message, placeholder, streaming flag
        let ticket = self.store.begin_turn(cmd.text.as_str()).map_err(|e| {
            tracing::warn!("Rejected submission while a reply is streaming");
            SubmitError::from(e)
        })?;

        tracing::info!(
            user_message_id = %ticket.user_message_id(),
            assistant_message_id = %ticket.assistant_message_id(),
            endpoint = %self.fetcher.endpoint(),
            "Turn started"
        );

        // 3. Stream, folding the cumulative text into the placeholder
        let request = ReplyRequest::new(cmd.text).with_user_id(cmd.user_id);
        let mut buffer = String::new();
        let result = self
            .fetcher
            .fetch(request, ticket.cancel_signal(), |chunk| {
                buffer.push_str(chunk);
                self.store.amend_turn(&ticket, buffer.as_str());
            })
            .await;

        // 4. Settle
        Ok(self.settle(&ticket, result, &buffer))
    }

    fn settle(
        &self,
        ticket: &TurnTicket,
        result: Result<FetchSummary, FetchError>,
        buffer: &str,
    ) -> TurnOutcome {
        let user_message_id = ticket.user_message_id();
        let assistant_message_id = ticket.assistant_message_id();

        match result {
            Ok(summary) => {
                let settled = self.store.settle_turn(ticket, None);
                if !settled || summary.cancelled {
                    tracing::debug!(%assistant_message_id, "Turn abandoned");
                    return TurnOutcome::Abandoned {
                        user_message_id,
                        assistant_message_id,
                    };
                }
                tracing::info!(
                    %assistant_message_id,
                    chunks = summary.chunks,
                    chars = summary.chars,
                    "Turn completed"
                );
                TurnOutcome::Completed {
                    user_message_id,
                    assistant_message_id,
                    chunks: summary.chunks,
                }
            }
            Err(err) => {
                let failure = failure_content(buffer);
                if !self.store.settle_turn(ticket, Some(failure.content)) {
                    tracing::debug!(%assistant_message_id, "Turn abandoned");
                    return TurnOutcome::Abandoned {
                        user_message_id,
                        assistant_message_id,
                    };
                }
                tracing::warn!(
                    %assistant_message_id,
                    error = %err,
                    request_failure = err.is_request_failure(),
                    chunks_delivered = err.chunks_delivered(),
                    "Turn failed"
                );
                TurnOutcome::Failed {
                    user_message_id,
                    assistant_message_id,
                    partial_retained: failure.partial_retained,
                }
            }
        }
    }
}
