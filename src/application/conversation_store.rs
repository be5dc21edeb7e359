//! Conversation store - the single source of truth for the transcript.
//!
//! Wraps the [`Conversation`] aggregate with one mutex and publishes every
//! effective change twice:
//!
//! - a full [`ConversationSnapshot`] on a `watch` channel, for renderers that
//!   only care about the latest state
//! - a [`ConversationEvent`] on a `broadcast` channel, for consumers that
//!   want deltas (streaming output, logs)
//!
//! Both are published while the lock is held, so observers see mutations in
//! the order they were applied. Mutations that change nothing publish nothing.
//!
//! Only the turn the store is tracking may write into the transcript. Its
//! ticket is checked against the in-flight record and its [`TurnPhase`] on
//! every amend and settle.

use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{broadcast, watch};

use crate::domain::conversation::{
    Conversation, ConversationError, Message, Role, TurnPhase, TurnSlot,
};
use crate::domain::foundation::{MessageId, StateMachine};
use crate::ports::{CancelHandle, CancelSignal};

const EVENT_CAPACITY: usize = 256;

/// Immutable read view of the transcript.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSnapshot {
    /// Messages in display order, shared with the store.
    pub entries: Vec<Arc<Message>>,
    /// True while an assistant reply is streaming.
    pub is_streaming: bool,
    /// Increases by one per published change.
    pub revision: u64,
}

impl ConversationSnapshot {
    /// Returns the most recent message.
    pub fn last(&self) -> Option<&Message> {
        self.entries.last().map(Arc::as_ref)
    }

    /// Returns the number of messages.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no messages.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Change notification, one per effective mutation step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConversationEvent {
    /// A message was added to the end of the transcript.
    MessageAppended { message: Message },
    /// The trailing assistant message was rewritten.
    MessageAmended { id: MessageId, content: String },
    /// The streaming flag flipped.
    StreamingChanged { is_streaming: bool },
    /// The transcript was emptied.
    Cleared,
}

/// Proof that a turn was opened, handed to the controller.
#[derive(Debug, Clone)]
pub struct TurnTicket {
    slot: TurnSlot,
    cancel: CancelSignal,
}

impl TurnTicket {
    /// Id of the user message this turn appended.
    pub fn user_message_id(&self) -> MessageId {
        self.slot.user_message_id
    }

    /// Id of the assistant placeholder this turn appended.
    pub fn assistant_message_id(&self) -> MessageId {
        self.slot.assistant_message_id
    }

    /// Signal that fires when the turn is abandoned by a clear.
    pub fn cancel_signal(&self) -> CancelSignal {
        self.cancel.clone()
    }

    /// Returns true once the turn has been abandoned.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

struct InFlight {
    slot: TurnSlot,
    phase: TurnPhase,
    cancel: CancelHandle,
}

impl InFlight {
    fn owned_by(&self, ticket: &TurnTicket) -> bool {
        self.slot == ticket.slot
    }
}

struct StoreInner {
    conversation: Conversation,
    in_flight: Option<InFlight>,
    revision: u64,
}

/// Shared, observable transcript.
pub struct ConversationStore {
    inner: Mutex<StoreInner>,
    snapshots: watch::Sender<ConversationSnapshot>,
    events: broadcast::Sender<ConversationEvent>,
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        let (snapshots, _) = watch::channel(ConversationSnapshot::default());
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            inner: Mutex::new(StoreInner {
                conversation: Conversation::new(),
                in_flight: None,
                revision: 0,
            }),
            snapshots,
            events,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Primitive operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Appends a message and returns its id.
    pub fn append(&self, role: Role, content: impl Into<String>) -> MessageId {
        let mut inner = self.lock();
        let id = inner.conversation.append(role, content);
        let event = appended_event(&inner.conversation, id);
        self.publish(&mut inner, event.into_iter().collect());
        id
    }

    /// Rewrites the trailing assistant message.
    ///
    /// Returns false, and publishes nothing, when the transcript is empty or
    /// ends in a user message.
    pub fn amend_last(&self, content: impl Into<String>) -> bool {
        let mut inner = self.lock();
        if !inner.conversation.amend_last(content) {
            return false;
        }
        let events = amended_event(&inner.conversation).into_iter().collect();
        self.publish(&mut inner, events);
        true
    }

    /// Sets the streaming flag.
    pub fn set_streaming(&self, streaming: bool) {
        let mut inner = self.lock();
        if inner.conversation.set_streaming(streaming) {
            self.publish(
                &mut inner,
                vec![ConversationEvent::StreamingChanged {
                    is_streaming: streaming,
                }],
            );
        }
    }

    /// Empties the transcript, lowers the streaming flag, and abandons the
    /// turn in flight, if any.
    pub fn clear(&self) {
        let mut inner = self.lock();
        let had_content = !inner.conversation.is_empty() || inner.conversation.is_streaming();

        inner.conversation.clear();
        if let Some(in_flight) = inner.in_flight.take() {
            tracing::debug!(
                assistant_message_id = %in_flight.slot.assistant_message_id,
                "Abandoning in-flight reply"
            );
            in_flight.cancel.cancel();
        }

        if had_content {
            self.publish(&mut inner, vec![ConversationEvent::Cleared]);
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Turn operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Opens a turn: user message, empty assistant placeholder, streaming on.
    ///
    /// # Errors
    ///
    /// - `ReplyInFlight` if a reply is already streaming
    pub fn begin_turn(&self, user_text: impl Into<String>) -> Result<TurnTicket, ConversationError> {
        let mut inner = self.lock();
        let slot = inner.conversation.begin_turn(user_text)?;

        // The flag was lowered under a live turn; that turn loses its slot.
        if let Some(superseded) = inner.in_flight.take() {
            tracing::warn!(
                assistant_message_id = %superseded.slot.assistant_message_id,
                "Superseding a turn that never settled"
            );
            superseded.cancel.cancel();
        }

        let (handle, signal) = CancelSignal::pair();
        inner.in_flight = Some(InFlight {
            slot,
            phase: TurnPhase::Submitting,
            cancel: handle,
        });

        let mut events = Vec::with_capacity(3);
        events.extend(appended_event(&inner.conversation, slot.user_message_id));
        events.extend(appended_event(&inner.conversation, slot.assistant_message_id));
        events.push(ConversationEvent::StreamingChanged { is_streaming: true });
        self.publish(&mut inner, events);

        Ok(TurnTicket {
            slot,
            cancel: signal,
        })
    }

    /// Rewrites the placeholder of the turn in flight.
    ///
    /// Returns false, and publishes nothing, when the ticket's turn was
    /// abandoned, superseded, or already settled.
    pub fn amend_turn(&self, ticket: &TurnTicket, content: impl Into<String>) -> bool {
        let mut inner = self.lock();
        let next = match &inner.in_flight {
            Some(in_flight) if in_flight.owned_by(ticket) => {
                match in_flight.phase.transition_to(TurnPhase::Streaming) {
                    Ok(next) => next,
                    Err(_) => return false,
                }
            }
            _ => return false,
        };
        if !inner.conversation.amend_turn(&ticket.slot, content) {
            return false;
        }
        if let Some(in_flight) = inner.in_flight.as_mut() {
            in_flight.phase = next;
        }

        let events = amended_event(&inner.conversation).into_iter().collect();
        self.publish(&mut inner, events);
        true
    }

    /// Ends the turn in flight, optionally writing final content into the
    /// placeholder.
    ///
    /// Returns false when the ticket's turn was abandoned, superseded, or
    /// already settled. If the turn is still tracked but its placeholder was
    /// displaced by a direct append, the turn is released and the streaming
    /// flag lowered, but no content is written and false is returned.
    pub fn settle_turn(&self, ticket: &TurnTicket, final_content: Option<String>) -> bool {
        let mut inner = self.lock();
        let settles = inner.in_flight.as_ref().is_some_and(|in_flight| {
            in_flight.owned_by(ticket) && in_flight.phase.can_transition_to(&TurnPhase::Idle)
        });
        if !settles {
            return false;
        }
        inner.in_flight = None;

        let was_streaming = inner.conversation.is_streaming();
        let rewrites = final_content.is_some();

        if !inner.conversation.settle_turn(&ticket.slot, final_content) {
            tracing::warn!(
                assistant_message_id = %ticket.slot.assistant_message_id,
                "Placeholder displaced before the turn settled"
            );
            if inner.conversation.set_streaming(false) {
                self.publish(
                    &mut inner,
                    vec![ConversationEvent::StreamingChanged { is_streaming: false }],
                );
            }
            return false;
        }

        let mut events = Vec::with_capacity(2);
        if rewrites {
            events.extend(amended_event(&inner.conversation));
        }
        if was_streaming {
            events.push(ConversationEvent::StreamingChanged { is_streaming: false });
        }
        if !events.is_empty() {
            self.publish(&mut inner, events);
        }
        true
    }

    /// Fires the cancel signal of the turn in flight without touching the
    /// transcript. Returns true if there was one.
    pub fn cancel_in_flight(&self) -> bool {
        let inner = self.lock();
        match &inner.in_flight {
            Some(in_flight) => {
                in_flight.cancel.cancel();
                true
            }
            None => false,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Read side
    // ─────────────────────────────────────────────────────────────────────────

    /// Returns the latest published snapshot.
    pub fn snapshot(&self) -> ConversationSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Subscribes to snapshots; the receiver starts at the current state.
    pub fn subscribe(&self) -> watch::Receiver<ConversationSnapshot> {
        self.snapshots.subscribe()
    }

    /// Subscribes to change events published from now on.
    pub fn events(&self) -> broadcast::Receiver<ConversationEvent> {
        self.events.subscribe()
    }

    /// Returns true while an assistant reply is streaming.
    pub fn is_streaming(&self) -> bool {
        self.lock().conversation.is_streaming()
    }

    /// Phase of the turn in flight, `Idle` when there is none.
    pub fn turn_phase(&self) -> TurnPhase {
        self.lock()
            .in_flight
            .as_ref()
            .map_or(TurnPhase::Idle, |in_flight| in_flight.phase)
    }

    /// Returns the number of messages.
    pub fn len(&self) -> usize {
        self.lock().conversation.len()
    }

    /// Returns true if there are no messages.
    pub fn is_empty(&self) -> bool {
        self.lock().conversation.is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, StoreInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshots share message allocations with the conversation, so
    /// publishing copies pointers rather than text.
    fn publish(&self, inner: &mut StoreInner, events: Vec<ConversationEvent>) {
        inner.revision += 1;
        self.snapshots.send_replace(ConversationSnapshot {
            entries: inner.conversation.entries().to_vec(),
            is_streaming: inner.conversation.is_streaming(),
            revision: inner.revision,
        });
        for event in events {
            // No receivers is fine.
            let _ = self.events.send(event);
        }
    }
}

fn appended_event(conversation: &Conversation, id: MessageId) -> Option<ConversationEvent> {
    conversation
        .get(id)
        .map(|message| ConversationEvent::MessageAppended {
            message: message.clone(),
        })
}

fn amended_event(conversation: &Conversation) -> Option<ConversationEvent> {
    conversation.last().map(|message| ConversationEvent::MessageAmended {
        id: message.id(),
        content: message.content().to_string(),
    })
}
