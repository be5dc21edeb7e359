//! Turns a raw byte stream into a [`ReplyStream`] of text increments.

use futures::stream::{self, Stream, StreamExt};
use std::fmt::Display;
use std::pin::Pin;

use super::utf8_decoder::Utf8StreamDecoder;
use crate::ports::{AssistantError, CancelSignal, ReplyStream};

type ByteStream<B, E> = Pin<Box<dyn Stream<Item = Result<B, E>> + Send>>;

struct BodyState<B, E> {
    body: ByteStream<B, E>,
    decoder: Utf8StreamDecoder,
    cancel: CancelSignal,
    done: bool,
}

/// Decodes a chunked body into ordered text increments.
///
/// - one increment per chunk that yields text; chunks that only extend a
///   carried partial character produce nothing
/// - at end of body, any carried bytes are flushed as one last increment
/// - a transport error becomes a single `Err` item and ends the stream
/// - a fired cancel signal ends the stream at the next read boundary and
///   drops the body
pub fn decode_body<S, B, E>(body: S, cancel: CancelSignal) -> ReplyStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    let state = BodyState {
        body: Box::pin(body),
        decoder: Utf8StreamDecoder::new(),
        cancel,
        done: false,
    };

    let increments = stream::unfold(state, |mut state| async move {
        loop {
            if state.done {
                return None;
            }

            let next = tokio::select! {
                biased;
                _ = state.cancel.cancelled() => {
                    tracing::debug!("Reply stream cancelled between reads");
                    return None;
                }
                next = state.body.next() => next,
            };

            match next {
                Some(Ok(bytes)) => {
                    let text = state.decoder.decode(bytes.as_ref());
                    if text.is_empty() {
                        continue;
                    }
                    tracing::trace!(len = text.len(), "Decoded reply increment");
                    return Some((Ok(text), state));
                }
                Some(Err(e)) => {
                    state.done = true;
                    tracing::warn!("Reply body interrupted: {}", e);
                    return Some((Err(AssistantError::stream(e.to_string())), state));
                }
                None => {
                    state.done = true;
                    let rest = state.decoder.finish();
                    if rest.is_empty() {
                        return None;
                    }
                    return Some((Ok(rest), state));
                }
            }
        }
    });

    Box::pin(increments)
}
