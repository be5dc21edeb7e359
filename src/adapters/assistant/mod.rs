//! Assistant adapters - implementations of the AssistantClient port.
//!
//! - `HttpAssistantClient` - reqwest client streaming the chat endpoint
//! - `MockAssistantClient` - scripted replies for tests
//!
//! The HTTP body is decoded by [`decode_body`], which both the transport and
//! its tests share.

mod body_stream;
mod http_client;
mod mock_client;
mod utf8_decoder;

pub use body_stream::decode_body;
pub use http_client::{HttpAssistantClient, HttpAssistantConfig};
pub use mock_client::{LiveReply, MockAssistantClient, MockReply};
pub use utf8_decoder::Utf8StreamDecoder;
