//! Conversation aggregate - the ordered transcript.
//!
//! Pure in-memory state: no locking, no notification, no I/O. The
//! application-layer store wraps it with a single lock and publishes changes.
//!
//! # Turn bookkeeping
//!
//! Every `clear()` bumps a generation counter. A turn remembers the
//! generation it was opened in and the placeholder it appended. Its
//! amend/settle calls are ignored once the generation has moved on or once
//! its placeholder is no longer the trailing entry, so an abandoned reply
//! never writes into a later turn's placeholder.
//!
//! Messages are held behind `Arc` so snapshots share them; amending the
//! trailing message copies only that message if a snapshot still holds it.

use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

use super::message::{Message, Role};
use crate::domain::foundation::MessageId;

/// Errors raised when opening a turn.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversationError {
    #[error("An assistant reply is already streaming")]
    ReplyInFlight,
}

/// Handle on the two messages a turn created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnSlot {
    /// The user's message for this turn.
    pub user_message_id: MessageId,
    /// The assistant placeholder amended while the reply streams.
    pub assistant_message_id: MessageId,
    /// Conversation generation when the turn opened.
    pub generation: u64,
}

/// Ordered transcript plus the streaming flag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    entries: Vec<Arc<Message>>,
    is_streaming: bool,
    #[serde(skip)]
    generation: u64,
}

impl Conversation {
    /// Creates an empty conversation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a new message and returns its id.
    pub fn append(&mut self, role: Role, content: impl Into<String>) -> MessageId {
        let message = Message::new(role, content);
        let id = message.id();
        self.entries.push(Arc::new(message));
        id
    }

    /// Replaces the content of the trailing assistant message.
    ///
    /// Returns false (and changes nothing) when the transcript is empty or
    /// ends in a user message.
    pub fn amend_last(&mut self, content: impl Into<String>) -> bool {
        match self.entries.last_mut() {
            Some(last) if last.role().is_amendable() => Arc::make_mut(last).replace_content(content),
            _ => false,
        }
    }

    /// Sets the streaming flag. Returns true if the value changed.
    pub fn set_streaming(&mut self, streaming: bool) -> bool {
        let changed = self.is_streaming != streaming;
        self.is_streaming = streaming;
        changed
    }

    /// Empties the transcript and resets the streaming flag.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.is_streaming = false;
        self.generation += 1;
    }

    /// Opens a turn: user message, empty assistant placeholder, streaming on.
    ///
    /// # Errors
    ///
    /// - `ReplyInFlight` if a reply is already streaming
    pub fn begin_turn(&mut self, user_text: impl Into<String>) -> Result<TurnSlot, ConversationError> {
        if self.is_streaming {
            return Err(ConversationError::ReplyInFlight);
        }

        let user_message_id = self.append(Role::User, user_text);
        let assistant_message_id = self.append(Role::Assistant, "");
        self.is_streaming = true;

        Ok(TurnSlot {
            user_message_id,
            assistant_message_id,
            generation: self.generation,
        })
    }

    /// Returns true if the turn has not been invalidated by a clear and its
    /// placeholder is still the trailing entry.
    pub fn is_current(&self, slot: &TurnSlot) -> bool {
        slot.generation == self.generation
            && self.last().map(|m| m.id()) == Some(slot.assistant_message_id)
    }

    /// Amends the placeholder of a still-current turn.
    pub fn amend_turn(&mut self, slot: &TurnSlot, content: impl Into<String>) -> bool {
        self.is_current(slot) && self.amend_last(content)
    }

    /// Settles a still-current turn, optionally rewriting the placeholder.
    ///
    /// Returns false when the turn is no longer current.
    pub fn settle_turn(&mut self, slot: &TurnSlot, final_content: Option<String>) -> bool {
        if !self.is_current(slot) {
            return false;
        }
        if let Some(content) = final_content {
            self.amend_last(content);
        }
        self.is_streaming = false;
        true
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    /// Returns the messages in display order.
    pub fn entries(&self) -> &[Arc<Message>] {
        &self.entries
    }

    /// Returns the most recent message.
    pub fn last(&self) -> Option<&Message> {
        self.entries.last().map(Arc::as_ref)
    }

    /// Looks up a message by id.
    pub fn get(&self, id: MessageId) -> Option<&Message> {
        self.entries.iter().map(Arc::as_ref).find(|m| m.id() == id)
    }

    /// Returns the number of messages.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no messages.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns true while an assistant reply is streaming.
    pub fn is_streaming(&self) -> bool {
        self.is_streaming
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    mod append {
        use super::*;

        #[test]
        fn appends_in_insertion_order() {
            let mut conversation = Conversation::new();
            let first = conversation.append(Role::User, "one");
            let second = conversation.append(Role::Assistant, "two");

            let ids: Vec<_> = conversation.entries().iter().map(|m| m.id()).collect();
            assert_eq!(ids, vec![first, second]);
        }

        #[test]
        fn never_reuses_ids_across_clears() {
            let mut conversation = Conversation::new();
            let before = conversation.append(Role::User, "a");
            conversation.clear();
            let after = conversation.append(Role::User, "a");
            assert_ne!(before, after);
        }
    }

    mod amend_last {
        use super::*;

        #[test]
        fn replaces_trailing_assistant_content() {
            let mut conversation = Conversation::new();
            conversation.append(Role::User, "hi");
            let id = conversation.append(Role::Assistant, "");

            assert!(conversation.amend_last("Hello"));
            assert!(conversation.amend_last("Hello world"));

            let last = conversation.last().unwrap();
            assert_eq!(last.id(), id);
            assert_eq!(last.content(), "Hello world");
            assert_eq!(conversation.len(), 2);
        }

        #[test]
        fn is_noop_when_last_is_user() {
            let mut conversation = Conversation::new();
            conversation.append(Role::Assistant, "earlier");
            conversation.append(Role::User, "question");
            let before = conversation.clone();

            assert!(!conversation.amend_last("x"));
            assert_eq!(conversation, before);
        }

        #[test]
        fn is_noop_when_empty() {
            let mut conversation = Conversation::new();
            assert!(!conversation.amend_last("x"));
            assert!(conversation.is_empty());
        }
    }

    mod clear {
        use super::*;

        #[test]
        fn empties_and_resets_streaming() {
            let mut conversation = Conversation::new();
            conversation.begin_turn("hi").unwrap();
            assert!(conversation.is_streaming());

            conversation.clear();
            assert!(conversation.is_empty());
            assert!(!conversation.is_streaming());
        }

        #[test]
        fn is_idempotent() {
            let mut once = Conversation::new();
            once.append(Role::User, "hi");
            once.clear();

            let mut twice = once.clone();
            twice.clear();

            assert_eq!(once.entries(), twice.entries());
            assert_eq!(once.is_streaming(), twice.is_streaming());
        }
    }

    mod turns {
        use super::*;

        #[test]
        fn begin_turn_appends_user_then_placeholder() {
            let mut conversation = Conversation::new();
            let slot = conversation.begin_turn("Fix my homepage SEO basics").unwrap();

            assert_eq!(conversation.len(), 2);
            assert_eq!(conversation.entries()[0].id(), slot.user_message_id);
            assert_eq!(conversation.entries()[0].content(), "Fix my homepage SEO basics");
            assert_eq!(conversation.entries()[1].id(), slot.assistant_message_id);
            assert!(conversation.entries()[1].is_assistant());
            assert_eq!(conversation.entries()[1].content(), "");
            assert!(conversation.is_streaming());
        }

        #[test]
        fn begin_turn_rejects_while_streaming() {
            let mut conversation = Conversation::new();
            conversation.begin_turn("first").unwrap();

            let result = conversation.begin_turn("second");
            assert_eq!(result, Err(ConversationError::ReplyInFlight));
            assert_eq!(conversation.len(), 2);
        }

        #[test]
        fn stale_turn_cannot_touch_a_newer_turn() {
            let mut conversation = Conversation::new();
            let stale = conversation.begin_turn("first").unwrap();
            conversation.clear();
            let fresh = conversation.begin_turn("second").unwrap();

            assert!(!conversation.amend_turn(&stale, "old chunk"));
            assert!(!conversation.settle_turn(&stale, Some("old error".into())));

            assert_eq!(conversation.get(fresh.assistant_message_id).unwrap().content(), "");
            assert!(conversation.is_streaming());
        }

        #[test]
        fn superseded_turn_cannot_touch_the_next_placeholder() {
            let mut conversation = Conversation::new();
            let first = conversation.begin_turn("first").unwrap();
            conversation.set_streaming(false);
            let second = conversation.begin_turn("second").unwrap();

            assert!(!conversation.is_current(&first));
            assert!(!conversation.amend_turn(&first, "stale text"));
            assert!(!conversation.settle_turn(&first, None));

            assert_eq!(conversation.get(first.assistant_message_id).unwrap().content(), "");
            assert_eq!(conversation.get(second.assistant_message_id).unwrap().content(), "");
            assert!(conversation.is_streaming());
            assert!(conversation.is_current(&second));
        }

        #[test]
        fn amending_does_not_alter_shared_copies() {
            let mut conversation = Conversation::new();
            let slot = conversation.begin_turn("hi").unwrap();
            let shared = conversation.entries().to_vec();

            conversation.amend_turn(&slot, "I can help.");

            assert_eq!(shared[1].content(), "");
            assert_eq!(conversation.last().unwrap().content(), "I can help.");
            assert!(Arc::ptr_eq(&shared[0], &conversation.entries()[0]));
        }

        #[test]
        fn settle_turn_rewrites_and_stops_streaming() {
            let mut conversation = Conversation::new();
            let slot = conversation.begin_turn("hi").unwrap();
            conversation.amend_turn(&slot, "partial");

            assert!(conversation.settle_turn(&slot, Some("final".into())));
            assert_eq!(conversation.last().unwrap().content(), "final");
            assert!(!conversation.is_streaming());
        }

        #[test]
        fn settle_turn_without_content_keeps_streamed_text() {
            let mut conversation = Conversation::new();
            let slot = conversation.begin_turn("hi").unwrap();
            conversation.amend_turn(&slot, "I can help.");

            assert!(conversation.settle_turn(&slot, None));
            assert_eq!(conversation.last().unwrap().content(), "I can help.");
        }
    }

    #[derive(Debug, Clone)]
    enum Op {
        Append(bool, String),
        Amend(String),
        Clear,
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (any::<bool>(), ".{0,8}").prop_map(|(user, s)| Op::Append(user, s)),
            ".{0,8}".prop_map(Op::Amend),
            Just(Op::Clear),
        ]
    }

    proptest! {
        #[test]
        fn length_is_non_decreasing_until_clear(ops in proptest::collection::vec(op_strategy(), 0..40)) {
            let mut conversation = Conversation::new();
            for op in ops {
                let before = conversation.len();
                match op {
                    Op::Append(user, text) => {
                        let role = if user { Role::User } else { Role::Assistant };
                        conversation.append(role, text);
                        prop_assert_eq!(conversation.len(), before + 1);
                    }
                    Op::Amend(text) => {
                        conversation.amend_last(text);
                        prop_assert_eq!(conversation.len(), before);
                    }
                    Op::Clear => {
                        conversation.clear();
                        prop_assert_eq!(conversation.len(), 0);
                    }
                }
            }
        }

        #[test]
        fn amend_never_touches_user_messages(texts in proptest::collection::vec(".{0,8}", 1..10)) {
            let mut conversation = Conversation::new();
            conversation.append(Role::User, "fixed");
            for text in texts {
                conversation.amend_last(text);
            }
            prop_assert_eq!(conversation.last().unwrap().content(), "fixed");
        }
    }
}
