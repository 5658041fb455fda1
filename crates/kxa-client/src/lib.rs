//! KXA Client Library
//!
//! Streams answers from the knowledge-extraction agent. A conversation is
//! posted to the agent's stream endpoint and the response body is decoded
//! into events while the transfer is still in progress.
//!
//! # Example
//!
//! ```rust,no_run
//! use kxa_client::{CancellationToken, ChatMessage, KxaClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = KxaClient::new("http://localhost:8000/api")?;
//!
//!     let stream = client
//!         .chat_stream(vec![ChatMessage::user("Who owns the billing service?")], CancellationToken::new())
//!         .await?;
//!
//!     let response = stream.collect_response().await?;
//!     println!("{}", response.text);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Framing
//!
//! Servers delimit `data:` frames either by single newlines
//! ([`FramingMode::Line`]) or by blank lines ([`FramingMode::Block`], the
//! default). The mode is configured through [`ClientConfig`]; it is never
//! guessed from the stream.
//!
//! # Testing
//!
//! The `testing` module serves an axum router on an ephemeral port:
//!
//! ```rust,ignore
//! use kxa_client::testing::TestServer;
//!
//! let server = TestServer::start(router).await?;
//! let stream = server.client.chat_stream(messages, cancel).await?;
//! ```

mod client;
mod error;
pub mod streaming;
pub mod testing;
mod types;

pub use client::{ClientConfig, KxaClient, DEFAULT_STREAM_PATH};
pub use error::{KxaClientError, Result};
pub use types::*;

// Re-export streaming types for convenience
pub use streaming::{
    ChatResponse, ChatStream, DecodedEvent, FramingMode, StreamError, StreamObserver,
    StreamOutcome, StreamResult,
};

// Callers need the token type to build and signal cancellation
pub use tokio_util::sync::CancellationToken;
