//! HTTP Assistant Client - reqwest implementation of the AssistantClient port.
//!
//! # Configuration
//!
//! ```ignore
//! let config = HttpAssistantConfig::new("https://fixit-ai-agent.vercel.app")
//!     .with_chat_path("/api/chat")
//!     .with_connect_timeout(Duration::from_secs(10));
//!
//! let client = HttpAssistantClient::new(config)?;
//! ```
//!
//! # Wire format
//!
//! `POST {base_url}{chat_path}` with a JSON body:
//!
//! ```text
//! { "message": "...", "storeData": { "connections": [] }, "userId": "..." }
//! ```
//!
//! `userId` is omitted when there is no signed-in user. A 2xx response body
//! is raw UTF-8 text with no framing; every decoded chunk is one increment.

use async_trait::async_trait;
use reqwest::{header, Client, Response};
use serde::Serialize;
use std::time::Duration;

use super::body_stream::decode_body;
use crate::config::AssistantConfig;
use crate::ports::{
    AssistantClient, AssistantError, CancelSignal, ReplyRequest, ReplyStream, StoreData,
};

const ACCEPT_TEXT: &str = "text/plain, text/markdown, */*";

/// Configuration for the HTTP assistant client.
#[derive(Debug, Clone)]
pub struct HttpAssistantConfig {
    /// Scheme and host, without a trailing slash.
    pub base_url: String,
    /// Path of the chat endpoint, starting with `/`.
    pub chat_path: String,
    /// Connect timeout; transport default when unset.
    pub connect_timeout: Option<Duration>,
    /// Whole-exchange timeout; transport default when unset.
    pub request_timeout: Option<Duration>,
}

impl HttpAssistantConfig {
    /// Creates a configuration for the given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            chat_path: "/api/chat".to_string(),
            connect_timeout: None,
            request_timeout: None,
        }
    }

    /// Sets the chat endpoint path.
    pub fn with_chat_path(mut self, path: impl Into<String>) -> Self {
        self.chat_path = path.into();
        self
    }

    /// Sets the connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Sets the whole-exchange timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Full URL of the chat endpoint.
    pub fn chat_url(&self) -> String {
        format!("{}{}", self.base_url, self.chat_path)
    }
}

impl From<&AssistantConfig> for HttpAssistantConfig {
    fn from(config: &AssistantConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            chat_path: config.chat_path.clone(),
            connect_timeout: config.connect_timeout(),
            request_timeout: config.request_timeout(),
        }
    }
}

/// Streaming client for the assistant's chat endpoint.
#[derive(Debug, Clone)]
pub struct HttpAssistantClient {
    client: Client,
    url: String,
}

impl HttpAssistantClient {
    /// Creates a client with the given configuration.
    ///
    /// # Errors
    ///
    /// - `Configuration` if the underlying HTTP client cannot be built
    pub fn new(config: HttpAssistantConfig) -> Result<Self, AssistantError> {
        let mut builder = Client::builder().user_agent(concat!(
            env!("CARGO_PKG_NAME"),
            "/",
            env!("CARGO_PKG_VERSION")
        ));
        if let Some(timeout) = config.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }

        let client = builder
            .build()
            .map_err(|e| AssistantError::Configuration(e.to_string()))?;

        Ok(Self {
            client,
            url: config.chat_url(),
        })
    }

    /// Sends the request and waits for the status line and headers.
    async fn send(&self, request: &ReplyRequest) -> Result<Response, AssistantError> {
        let body = ChatRequestBody::from(request);

        self.client
            .post(&self.url)
            .header(header::ACCEPT, ACCEPT_TEXT)
            .json(&body)
            .send()
            .await
            .map_err(map_send_error)
    }
}

fn map_send_error(e: reqwest::Error) -> AssistantError {
    if e.is_timeout() {
        AssistantError::Timeout
    } else if e.is_connect() {
        AssistantError::connection(format!("Connection failed: {}", e))
    } else if e.is_builder() {
        AssistantError::Configuration(e.to_string())
    } else {
        AssistantError::connection(e.to_string())
    }
}

#[async_trait]
impl AssistantClient for HttpAssistantClient {
    async fn stream_reply(
        &self,
        request: ReplyRequest,
        cancel: CancelSignal,
    ) -> Result<ReplyStream, AssistantError> {
        tracing::debug!(url = %self.url, "Opening assistant exchange");

        let response = self.send(&request).await?;
        let status = response.status();
        if !status.is_success() {
            tracing::warn!(url = %self.url, status = status.as_u16(), "Assistant request failed");
            return Err(AssistantError::RequestFailed {
                status: status.as_u16(),
            });
        }

        Ok(decode_body(response.bytes_stream(), cancel))
    }

    fn endpoint(&self) -> &str {
        &self.url
    }
}

/// JSON body of the chat request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ChatRequestBody<'a> {
    message: &'a str,
    store_data: &'a StoreData,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_id: Option<&'a str>,
}

impl<'a> From<&'a ReplyRequest> for ChatRequestBody<'a> {
    fn from(request: &'a ReplyRequest) -> Self {
        Self {
            message: &request.message,
            store_data: &request.store_data,
            user_id: request.user_id.as_ref().map(|id| id.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::UserId;

    #[test]
    fn chat_url_joins_base_and_path() {
        let config = HttpAssistantConfig::new("https://example.test/").with_chat_path("/api/chat");
        assert_eq!(config.chat_url(), "https://example.test/api/chat");
    }

    #[test]
    fn builds_from_app_config() {
        let app = AssistantConfig {
            base_url: "http://localhost:3000/".to_string(),
            chat_path: "/v2/chat".to_string(),
            connect_timeout_secs: Some(5),
            request_timeout_secs: None,
        };
        let config = HttpAssistantConfig::from(&app);
        assert_eq!(config.chat_url(), "http://localhost:3000/v2/chat");
        assert_eq!(config.connect_timeout, Some(Duration::from_secs(5)));
        assert_eq!(config.request_timeout, None);
    }

    #[test]
    fn client_reports_its_endpoint() {
        let client = HttpAssistantClient::new(HttpAssistantConfig::new("http://127.0.0.1:9")).unwrap();
        assert_eq!(client.endpoint(), "http://127.0.0.1:9/api/chat");
    }

    #[test]
    fn body_includes_user_id_when_present() {
        let request = ReplyRequest::new("Fix my homepage SEO basics")
            .with_user_id(Some(UserId::new("user-7").unwrap()));
        let json = serde_json::to_value(ChatRequestBody::from(&request)).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "message": "Fix my homepage SEO basics",
                "storeData": { "connections": [] },
                "userId": "user-7",
            })
        );
    }

    #[test]
    fn body_omits_user_id_when_absent() {
        let request = ReplyRequest::new("Hi");
        let json = serde_json::to_value(ChatRequestBody::from(&request)).unwrap();
        assert!(json.get("userId").is_none());
    }
}
