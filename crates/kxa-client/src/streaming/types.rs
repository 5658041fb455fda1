//! Types for streamed chat responses

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One decoded event from the response stream
///
/// All fields are optional. Unknown fields on the wire are ignored, so an
/// event with nothing recognized is still valid (and empty).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DecodedEvent {
    /// Incremental text fragment
    #[serde(default, alias = "text", skip_serializing_if = "Option::is_none")]
    pub delta: Option<String>,

    /// Rich structured attachment (e.g. a card)
    #[serde(default, alias = "card", skip_serializing_if = "Option::is_none")]
    pub attachment: Option<serde_json::Value>,

    /// Context / metadata object
    #[serde(default, alias = "metadata", skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Value>,
}

impl DecodedEvent {
    /// Create an event carrying only a text fragment
    pub fn delta(text: impl Into<String>) -> Self {
        Self {
            delta: Some(text.into()),
            ..Self::default()
        }
    }

    /// True if no field was recognized
    pub fn is_empty(&self) -> bool {
        self.delta.is_none() && self.attachment.is_none() && self.context.is_none()
    }
}

/// How a stream session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamOutcome {
    /// Transport signalled end-of-stream
    Completed,
    /// Termination sentinel received
    Done,
    /// Caller cancelled the session
    Cancelled,
    /// Transport failed mid-stream
    Failed,
}

impl StreamOutcome {
    /// True for the two clean endings
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed | Self::Done)
    }
}

/// A fully drained response
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChatResponse {
    /// All text deltas concatenated in arrival order
    pub text: String,
    /// Attachments in arrival order
    pub attachments: Vec<serde_json::Value>,
    /// Most recent context object
    pub context: Option<serde_json::Value>,
    /// How the stream ended (`None` only if nothing was drained)
    pub outcome: Option<StreamOutcome>,
}

impl ChatResponse {
    /// Fold one event into the response
    pub fn push(&mut self, event: DecodedEvent) {
        if let Some(delta) = event.delta {
            self.text.push_str(&delta);
        }
        if let Some(attachment) = event.attachment {
            self.attachments.push(attachment);
        }
        if event.context.is_some() {
            self.context = event.context;
        }
    }
}

/// Errors that can occur while streaming
#[derive(Debug, Error)]
pub enum StreamError {
    /// Server refused the stream (non-success status or no body)
    #[error("Stream setup failed ({status}): {message}")]
    Setup { status: u16, message: String },

    /// Request could not be sent
    #[error("Connection error: {0}")]
    Connection(#[from] reqwest::Error),

    /// Reading the response body failed mid-stream
    #[error("Stream read failed: {0}")]
    Read(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Session was cancelled by the caller
    #[error("Stream cancelled")]
    Cancelled,
}

impl StreamError {
    /// True if this is the cancelled outcome rather than a failure
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// HTTP status for setup failures
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Setup { status, .. } => Some(*status),
            Self::Connection(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Result type for streaming operations
pub type StreamResult<T> = std::result::Result<T, StreamError>;
