//! Message entity for the transcript.
//!
//! A message is created once by the conversation and keeps its id, role, and
//! timestamp for its whole lifetime. Only assistant content is rewritable,
//! and only through the owning [`Conversation`](super::Conversation).

use crate::domain::foundation::{MessageId, Timestamp};
use serde::{Deserialize, Serialize};

/// Author of a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Text typed by the person using the client.
    User,
    /// Text produced by the remote assistant service.
    Assistant,
}

impl Role {
    /// Returns true if content of this role may be amended after creation.
    pub fn is_amendable(&self) -> bool {
        matches!(self, Self::Assistant)
    }
}

/// One transcript entry.
///
/// # Invariants
///
/// - `id` is unique and never changes
/// - `role` never changes
/// - `content` changes only for assistant messages
/// - `created_at` is display metadata, never an ordering key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    id: MessageId,
    role: Role,
    content: String,
    created_at: Timestamp,
}

impl Message {
    /// Creates a message with a fresh id and the current time.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            role,
            content: content.into(),
            created_at: Timestamp::now(),
        }
    }

    /// Creates a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Creates an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    /// Returns the message ID.
    pub fn id(&self) -> MessageId {
        self.id
    }

    /// Returns the role.
    pub fn role(&self) -> Role {
        self.role
    }

    /// Returns the content.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Returns when the message was created.
    pub fn created_at(&self) -> &Timestamp {
        &self.created_at
    }

    /// Returns true if this message is from the user.
    pub fn is_user(&self) -> bool {
        self.role == Role::User
    }

    /// Returns true if this message is from the assistant.
    pub fn is_assistant(&self) -> bool {
        self.role == Role::Assistant
    }

    /// Replaces the content in place. Refused for non-amendable roles.
    pub(crate) fn replace_content(&mut self, content: impl Into<String>) -> bool {
        if !self.role.is_amendable() {
            return false;
        }
        self.content = content.into();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_user_message() {
        let msg = Message::user("Hello");
        assert_eq!(msg.role(), Role::User);
        assert_eq!(msg.content(), "Hello");
        assert!(msg.is_user());
    }

    #[test]
    fn assistant_placeholder_may_be_empty() {
        let msg = Message::assistant("");
        assert!(msg.is_assistant());
        assert!(msg.content().is_empty());
    }

    #[test]
    fn replace_content_keeps_identity() {
        let mut msg = Message::assistant("");
        let id = msg.id();
        let created_at = *msg.created_at();

        assert!(msg.replace_content("I can help."));
        assert_eq!(msg.content(), "I can help.");
        assert_eq!(msg.id(), id);
        assert_eq!(msg.created_at(), &created_at);
    }

    #[test]
    fn replace_content_refuses_user_messages() {
        let mut msg = Message::user("original");
        assert!(!msg.replace_content("edited"));
        assert_eq!(msg.content(), "original");
    }

    #[test]
    fn serializes_with_presentation_field_names() {
        let msg = Message::user("Hi");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "user");
        assert_eq!(json["content"], "Hi");
        assert!(json.get("createdAt").is_some());
        assert!(json.get("id").is_some());
    }
}
