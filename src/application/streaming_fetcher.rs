//! Streaming fetcher - drives one reply exchange into a chunk sink.
//!
//! The port hands out a pull-based [`ReplyStream`](crate::ports::ReplyStream);
//! this wrapper turns it into the push contract the controller folds on:
//! `on_chunk` runs once per increment, in arrival order, and the result tells
//! a request failure apart from a failure part-way through the body.

use futures::StreamExt;
use std::sync::Arc;
use thiserror::Error;

use crate::ports::{AssistantClient, AssistantError, CancelSignal, ReplyRequest};

/// What a finished exchange delivered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchSummary {
    /// Number of `on_chunk` calls.
    pub chunks: usize,
    /// Characters delivered across all chunks.
    pub chars: usize,
    /// True if the stream ended because the turn was abandoned.
    pub cancelled: bool,
}

/// Why an exchange failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The exchange never opened; no chunk was delivered.
    #[error("request failed: {0}")]
    Request(AssistantError),

    /// The body broke off after some chunks were delivered.
    #[error("reply interrupted after {chunks_delivered} chunk(s): {source}")]
    MidStream {
        source: AssistantError,
        chunks_delivered: usize,
    },
}

impl FetchError {
    /// Returns true if the failure happened before any chunk.
    pub fn is_request_failure(&self) -> bool {
        matches!(self, Self::Request(_))
    }

    /// Number of chunks delivered before the failure.
    pub fn chunks_delivered(&self) -> usize {
        match self {
            Self::Request(_) => 0,
            Self::MidStream {
                chunks_delivered, ..
            } => *chunks_delivered,
        }
    }

    /// The underlying transport error.
    pub fn assistant_error(&self) -> &AssistantError {
        match self {
            Self::Request(source) | Self::MidStream { source, .. } => source,
        }
    }
}

/// Stateless driver around an [`AssistantClient`].
pub struct StreamingFetcher<C: AssistantClient + ?Sized> {
    client: Arc<C>,
}

impl<C: AssistantClient + ?Sized> Clone for StreamingFetcher<C> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
        }
    }
}

impl<C: AssistantClient + ?Sized> StreamingFetcher<C> {
    /// Creates a fetcher over the given client.
    pub fn new(client: Arc<C>) -> Self {
        Self { client }
    }

    /// Destination of the exchanges, for logs.
    pub fn endpoint(&self) -> &str {
        self.client.endpoint()
    }

    /// Performs one exchange, calling `on_chunk` for every increment.
    ///
    /// # Errors
    ///
    /// - `Request` if the exchange could not be opened
    /// - `MidStream` if the body failed after opening; the chunks already
    ///   passed to `on_chunk` stand
    pub async fn fetch<F>(
        &self,
        request: ReplyRequest,
        cancel: CancelSignal,
        mut on_chunk: F,
    ) -> Result<FetchSummary, FetchError>
    where
        F: FnMut(&str),
    {
        let probe = cancel.clone();
        let mut stream = self
            .client
            .stream_reply(request, cancel)
            .await
            .map_err(FetchError::Request)?;

        let mut summary = FetchSummary::default();
        while let Some(item) = stream.next().await {
            match item {
                Ok(text) => {
                    summary.chunks += 1;
                    summary.chars += text.chars().count();
                    tracing::trace!(chunk = summary.chunks, len = text.len(), "Reply chunk");
                    on_chunk(&text);
                }
                Err(source) if summary.chunks == 0 => {
                    // Nothing reached the user; indistinguishable from a failed request.
                    return Err(FetchError::Request(source));
                }
                Err(source) => {
                    return Err(FetchError::MidStream {
                        source,
                        chunks_delivered: summary.chunks,
                    });
                }
            }
        }

        summary.cancelled = probe.is_cancelled();
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::assistant::MockAssistantClient;

    fn fetcher(client: MockAssistantClient) -> StreamingFetcher<MockAssistantClient> {
        StreamingFetcher::new(Arc::new(client))
    }

    #[tokio::test]
    async fn delivers_each_chunk_once_in_order() {
        let fetcher = fetcher(MockAssistantClient::new().with_chunks(["I ", "can ", "help."]));
        let mut seen = Vec::new();

        let summary = fetcher
            .fetch(ReplyRequest::new("hi"), CancelSignal::never(), |chunk| {
                seen.push(chunk.to_string())
            })
            .await
            .unwrap();

        assert_eq!(seen, vec!["I ", "can ", "help."]);
        assert_eq!(summary.chunks, 3);
        assert_eq!(summary.chars, 11);
        assert!(!summary.cancelled);
    }

    #[tokio::test]
    async fn request_failure_calls_no_chunk() {
        let fetcher = fetcher(MockAssistantClient::new().with_request_failure(500));
        let mut calls = 0;

        let err = fetcher
            .fetch(ReplyRequest::new("hi"), CancelSignal::never(), |_| calls += 1)
            .await
            .unwrap_err();

        assert_eq!(calls, 0);
        assert!(err.is_request_failure());
        assert_eq!(err.assistant_error().status(), Some(500));
    }

    #[tokio::test]
    async fn mid_stream_failure_keeps_delivered_chunks() {
        let fetcher = fetcher(
            MockAssistantClient::new()
                .with_failure_after(["Hello", " wor"], AssistantError::stream("reset")),
        );
        let mut seen = String::new();

        let err = fetcher
            .fetch(ReplyRequest::new("hi"), CancelSignal::never(), |chunk| {
                seen.push_str(chunk)
            })
            .await
            .unwrap_err();

        assert_eq!(seen, "Hello wor");
        assert!(!err.is_request_failure());
        assert_eq!(err.chunks_delivered(), 2);
    }

    #[tokio::test]
    async fn body_error_before_first_chunk_counts_as_request_failure() {
        let fetcher = fetcher(
            MockAssistantClient::new()
                .with_failure_after(Vec::<String>::new(), AssistantError::stream("reset")),
        );

        let err = fetcher
            .fetch(ReplyRequest::new("hi"), CancelSignal::never(), |_| {})
            .await
            .unwrap_err();

        assert!(err.is_request_failure());
    }

    #[tokio::test]
    async fn cancelled_exchange_reports_cancelled() {
        let client = MockAssistantClient::new();
        let live = client.live_reply();
        let fetcher = fetcher(client);
        let (handle, signal) = CancelSignal::pair();

        live.send("partial");
        let task = tokio::spawn(async move {
            let mut seen = Vec::new();
            let summary = fetcher
                .fetch(ReplyRequest::new("hi"), signal, |chunk| seen.push(chunk.to_string()))
                .await;
            (summary, seen)
        });

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        handle.cancel();

        let (summary, seen) = task.await.unwrap();
        let summary = summary.unwrap();
        assert!(summary.cancelled);
        assert_eq!(seen, vec!["partial"]);
    }

    #[tokio::test]
    async fn fetcher_is_reusable_in_sequence() {
        let fetcher = fetcher(MockAssistantClient::new().with_chunks(["a"]).with_chunks(["b"]));

        let mut first = String::new();
        fetcher
            .fetch(ReplyRequest::new("1"), CancelSignal::never(), |c| first.push_str(c))
            .await
            .unwrap();
        let mut second = String::new();
        fetcher
            .fetch(ReplyRequest::new("2"), CancelSignal::never(), |c| second.push_str(c))
            .await
            .unwrap();

        assert_eq!((first.as_str(), second.as_str()), ("a", "b"));
    }
}
