//! Assistant Client Port - Interface to the remote reply service.
//!
//! The remote service is an opaque producer of an ordered sequence of text
//! increments terminated by end-of-stream. This port hides the transport and
//! hands the application a pull-based stream of decoded text.
//!
//! # Contract
//!
//! - An initial failure (connection refused, non-2xx status) is the outer
//!   `Err` of [`AssistantClient::stream_reply`]; no increments are produced.
//! - Each `Ok(text)` item is one non-empty increment, in arrival order.
//! - A transport failure after the exchange opened is a single `Err` item,
//!   after which the stream ends.
//! - When the [`CancelSignal`] fires the stream ends promptly, without a
//!   final flush, and releases the transport.
//!
//! # Example
//!
//! ```ignore
//! let mut stream = client.stream_reply(request, CancelSignal::never()).await?;
//! while let Some(increment) = stream.next().await {
//!     print!("{}", increment?);
//! }
//! ```

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

use super::CancelSignal;
use crate::domain::foundation::UserId;

/// Ordered, finite stream of decoded text increments.
pub type ReplyStream = Pin<Box<dyn Stream<Item = Result<String, AssistantError>> + Send>>;

/// Port for the streaming reply exchange.
#[async_trait]
pub trait AssistantClient: Send + Sync {
    /// Opens one request/response exchange for the given user message.
    async fn stream_reply(
        &self,
        request: ReplyRequest,
        cancel: CancelSignal,
    ) -> Result<ReplyStream, AssistantError>;

    /// Human-readable destination, for logs.
    fn endpoint(&self) -> &str;
}

/// What the client sends to the assistant for one turn.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplyRequest {
    /// The user's message, exactly as typed.
    pub message: String,
    /// Connected external accounts the assistant may consult.
    pub store_data: StoreData,
    /// Signed-in user, if any.
    pub user_id: Option<UserId>,
}

impl ReplyRequest {
    /// Creates a request with no connected accounts and no user.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            store_data: StoreData::default(),
            user_id: None,
        }
    }

    /// Sets the user identifier.
    pub fn with_user_id(mut self, user_id: Option<UserId>) -> Self {
        self.user_id = user_id;
        self
    }
}

/// Connected external accounts, forwarded opaquely.
///
/// Serializes as `{"connections": [...]}`; empty by default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreData {
    /// One opaque object per connected account.
    pub connections: Vec<serde_json::Value>,
}

/// Assistant exchange errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssistantError {
    /// The service answered with a non-success status.
    #[error("assistant request failed with status {status}")]
    RequestFailed {
        /// HTTP status code.
        status: u16,
    },

    /// Could not reach the service.
    #[error("connection error: {0}")]
    Connection(String),

    /// The transport gave up waiting.
    #[error("request timed out")]
    Timeout,

    /// The body broke off after the exchange opened.
    #[error("stream interrupted: {0}")]
    Stream(String),

    /// The client could not be set up or the request could not be built.
    #[error("invalid client configuration: {0}")]
    Configuration(String),
}

impl AssistantError {
    /// Creates a connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    /// Creates a mid-stream error.
    pub fn stream(message: impl Into<String>) -> Self {
        Self::Stream(message.into())
    }

    /// Returns the HTTP status for status failures.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::RequestFailed { status } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_request_defaults_to_empty_connections() {
        let request = ReplyRequest::new("Hello");
        assert_eq!(request.message, "Hello");
        assert!(request.store_data.connections.is_empty());
        assert!(request.user_id.is_none());
    }

    #[test]
    fn reply_request_builder_sets_user() {
        let user = UserId::new("user-1").unwrap();
        let request = ReplyRequest::new("Hello").with_user_id(Some(user.clone()));
        assert_eq!(request.user_id, Some(user));
    }

    #[test]
    fn store_data_serializes_as_connections_object() {
        let json = serde_json::to_value(StoreData::default()).unwrap();
        assert_eq!(json, serde_json::json!({ "connections": [] }));
    }

    #[test]
    fn status_is_exposed_only_for_status_failures() {
        assert_eq!(AssistantError::RequestFailed { status: 502 }.status(), Some(502));
        assert_eq!(AssistantError::Timeout.status(), None);
    }

    #[test]
    fn errors_display_readably() {
        assert_eq!(
            AssistantError::RequestFailed { status: 500 }.to_string(),
            "assistant request failed with status 500"
        );
        assert_eq!(
            AssistantError::stream("reset").to_string(),
            "stream interrupted: reset"
        );
    }
}
