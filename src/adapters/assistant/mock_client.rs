//! Mock Assistant Client for testing.
//!
//! Scripted implementation of the AssistantClient port so that the store,
//! fetcher, and controller can be exercised without a network.
//!
//! # Features
//!
//! - Pre-configured replies, consumed in order
//! - Request failures and failures after N increments
//! - Live replies fed from a channel, for mid-stream interleavings
//! - Per-increment delay
//! - Call tracking for verification
//!
//! # Example
//!
//! ```ignore
//! let client = MockAssistantClient::new()
//!     .with_chunks(["I ", "can ", "help."])
//!     .with_request_failure(503);
//! ```

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::ports::{AssistantClient, AssistantError, CancelSignal, ReplyRequest, ReplyStream};

/// A configured mock reply.
#[derive(Debug)]
pub enum MockReply {
    /// Deliver these increments, then end normally.
    Chunks(Vec<String>),
    /// Fail before any increment.
    RequestFailure(AssistantError),
    /// Deliver these increments, then fail mid-stream.
    FailAfter {
        chunks: Vec<String>,
        error: AssistantError,
    },
    /// Deliver whatever the test pushes; ends when the sender is dropped.
    Live(mpsc::UnboundedReceiver<Result<String, AssistantError>>),
}

/// Test-side handle for a [`MockReply::Live`] reply.
#[derive(Debug, Clone)]
pub struct LiveReply {
    tx: mpsc::UnboundedSender<Result<String, AssistantError>>,
}

impl LiveReply {
    /// Pushes one increment. Returns false once the stream was dropped.
    pub fn send(&self, text: impl Into<String>) -> bool {
        self.tx.send(Ok(text.into())).is_ok()
    }

    /// Pushes a mid-stream failure.
    pub fn fail(&self, error: AssistantError) -> bool {
        self.tx.send(Err(error)).is_ok()
    }

    /// Returns true once the consuming stream has gone away.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Mock assistant client.
#[derive(Debug, Clone)]
pub struct MockAssistantClient {
    replies: Arc<Mutex<VecDeque<MockReply>>>,
    delay: Duration,
    calls: Arc<Mutex<Vec<ReplyRequest>>>,
}

impl Default for MockAssistantClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockAssistantClient {
    /// Creates a mock with an empty script.
    pub fn new() -> Self {
        Self {
            replies: Arc::new(Mutex::new(VecDeque::new())),
            delay: Duration::ZERO,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Queues a successful reply delivered as the given increments.
    pub fn with_chunks<I, S>(self, chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.push(MockReply::Chunks(chunks.into_iter().map(Into::into).collect()));
        self
    }

    /// Queues a non-success status.
    pub fn with_request_failure(self, status: u16) -> Self {
        self.push(MockReply::RequestFailure(AssistantError::RequestFailed { status }));
        self
    }

    /// Queues an arbitrary failure before any increment.
    pub fn with_error(self, error: AssistantError) -> Self {
        self.push(MockReply::RequestFailure(error));
        self
    }

    /// Queues increments followed by a mid-stream failure.
    pub fn with_failure_after<I, S>(self, chunks: I, error: AssistantError) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.push(MockReply::FailAfter {
            chunks: chunks.into_iter().map(Into::into).collect(),
            error,
        });
        self
    }

    /// Queues a live reply and returns the handle that feeds it.
    pub fn live_reply(&self) -> LiveReply {
        let (tx, rx) = mpsc::unbounded_channel();
        self.push(MockReply::Live(rx));
        LiveReply { tx }
    }

    /// Sets a delay before each scripted increment.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Returns the number of exchanges opened.
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Returns all recorded requests.
    pub fn get_calls(&self) -> Vec<ReplyRequest> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn push(&self, reply: MockReply) {
        self.replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(reply);
    }

    fn next_reply(&self) -> MockReply {
        self.replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or_else(|| MockReply::Chunks(vec!["Mock reply".to_string()]))
    }

    fn scripted(&self, items: Vec<Result<String, AssistantError>>) -> ReplyStream {
        let delay = self.delay;
        Box::pin(stream::iter(items).then(move |item| async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            item
        }))
    }
}

/// Ends `stream` as soon as `cancel` fires, mirroring the HTTP adapter.
fn until_cancelled(stream: ReplyStream, cancel: CancelSignal) -> ReplyStream {
    Box::pin(stream::unfold(
        (stream, cancel),
        |(mut stream, mut cancel)| async move {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                item = stream.next() => item.map(|item| (item, (stream, cancel))),
            }
        },
    ))
}

#[async_trait]
impl AssistantClient for MockAssistantClient {
    async fn stream_reply(
        &self,
        request: ReplyRequest,
        cancel: CancelSignal,
    ) -> Result<ReplyStream, AssistantError> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request);

        let stream = match self.next_reply() {
            MockReply::Chunks(chunks) => self.scripted(chunks.into_iter().map(Ok).collect()),
            MockReply::RequestFailure(error) => return Err(error),
            MockReply::FailAfter { chunks, error } => {
                let mut items: Vec<_> = chunks.into_iter().map(Ok).collect();
                items.push(Err(error));
                self.scripted(items)
            }
            MockReply::Live(mut rx) => {
                Box::pin(stream::poll_fn(move |cx| rx.poll_recv(cx))) as ReplyStream
            }
        };

        Ok(until_cancelled(stream, cancel))
    }

    fn endpoint(&self) -> &str {
        "mock://assistant"
    }
}
