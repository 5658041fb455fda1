//! HTTP client for the agent's streaming chat endpoint

use std::time::Duration;

use reqwest::header::ACCEPT;
use reqwest::{Client, StatusCode};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};
use url::Url;

use crate::error::{KxaClientError, Result};
use crate::streaming::{ChatStream, FramingMode, StreamError, StreamResult};
use crate::types::{ChatMessage, ChatRequest};

/// Default connection timeout
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Path segment appended to the base address to reach the stream endpoint
pub const DEFAULT_STREAM_PATH: &str = "stream";
/// Longest error body excerpt kept in a setup error
const ERROR_BODY_LIMIT: usize = 512;
/// How long to wait for an error body before giving up on it
const ERROR_BODY_TIMEOUT: Duration = Duration::from_secs(2);

/// Client configuration
///
/// There is no overall request timeout: it would cut off long streams.
/// Derive a cancellation token from a timer if a deadline is needed.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// TCP/TLS connect timeout
    pub connect_timeout: Duration,
    /// Frame delimiting used by the server
    pub framing: FramingMode,
    /// Path appended to the base address (may contain `/`)
    pub stream_path: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            framing: FramingMode::default(),
            stream_path: DEFAULT_STREAM_PATH.to_string(),
        }
    }
}

/// Knowledge-extraction agent client
#[derive(Debug, Clone)]
pub struct KxaClient {
    client: Client,
    base_url: Url,
    config: ClientConfig,
}

impl KxaClient {
    /// Create a new client
    ///
    /// # Arguments
    /// * `base_url` - Base address of the agent API (e.g., "http://localhost:8000/api")
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_config(base_url, ClientConfig::default())
    }

    /// Create a new client with custom configuration
    pub fn with_config(base_url: &str, config: ClientConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()?;

        let base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(KxaClientError::InvalidBaseUrl(base_url.to_string()));
        }

        Ok(Self {
            client,
            base_url,
            config,
        })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Get the client configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// URL of the stream endpoint
    ///
    /// The stream path is appended to the base address, keeping its existing
    /// path segments: `http://host/api` becomes `http://host/api/stream`.
    pub fn stream_url(&self) -> Url {
        let mut url = self.base_url.clone();
        // Cannot fail: base URLs are checked in the constructor
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty();
            for segment in self.config.stream_path.split('/').filter(|s| !s.is_empty()) {
                segments.push(segment);
            }
        }
        url
    }

    // =========================================================================
    // Streaming
    // =========================================================================

    /// Send a conversation and stream the agent's answer
    ///
    /// Setup failures (non-success status, empty body) are returned here,
    /// before any event. `cancel` is observed during setup and for the whole
    /// life of the returned stream; the caller keeps ownership of signalling it.
    #[instrument(skip(self, messages, cancel), fields(message_count = messages.len()))]
    pub async fn chat_stream(
        &self,
        messages: Vec<ChatMessage>,
        cancel: CancellationToken,
    ) -> StreamResult<ChatStream> {
        let url = self.stream_url();
        debug!("Opening chat stream: {}", url);

        let request = self
            .client
            .post(url)
            .header(ACCEPT, "text/event-stream")
            .json(&ChatRequest::new(messages));

        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(StreamError::Cancelled),
            response = request.send() => response?,
        };

        let status = response.status();

        if !status.is_success() {
            let body = tokio::select! {
                _ = cancel.cancelled() => return Err(StreamError::Cancelled),
                body = error_body(response) => body,
            };
            let message = if body.is_empty() {
                status.to_string()
            } else {
                format!("{}: {}", status, body)
            };
            return Err(StreamError::Setup {
                status: status.as_u16(),
                message,
            });
        }

        if status == StatusCode::NO_CONTENT || response.content_length() == Some(0) {
            return Err(StreamError::Setup {
                status: status.as_u16(),
                message: format!("{}: response has no body", status),
            });
        }

        debug!("Chat stream open ({})", status);

        Ok(ChatStream::new(
            response.bytes_stream(),
            self.config.framing,
            cancel,
        ))
    }
}

/// Best-effort error body excerpt
///
/// Any failure reading the body yields an empty string so the status error
/// is still reported.
async fn error_body(response: reqwest::Response) -> String {
    match tokio::time::timeout(ERROR_BODY_TIMEOUT, response.text()).await {
        Ok(Ok(text)) => truncate(text.trim(), ERROR_BODY_LIMIT),
        Ok(Err(e)) => {
            debug!("Failed to read error body: {}", e);
            String::new()
        }
        Err(_) => {
            debug!("Timed out reading error body");
            String::new()
        }
    }
}

fn truncate(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
