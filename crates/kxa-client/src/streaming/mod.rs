//! Incremental decoding of streamed chat responses
//!
//! The response body arrives in chunks of arbitrary size. Bytes are decoded
//! to text, text is cut into `data:` frames, and each frame's payload is
//! parsed into a [`DecodedEvent`]. [`ChatStream`] ties these together and
//! yields events as a `Stream`.
//!
//! # Example
//!
//! ```no_run
//! use kxa_client::{CancellationToken, ChatMessage, KxaClient, StreamError};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = KxaClient::new("http://localhost:8000/api")?;
//! let cancel = CancellationToken::new();
//!
//! let mut stream = client
//!     .chat_stream(vec![ChatMessage::user("Summarize the onboarding guide")], cancel.clone())
//!     .await?;
//!
//! while let Some(event) = stream.next().await {
//!     match event {
//!         Ok(event) => {
//!             if let Some(delta) = event.delta {
//!                 print!("{}", delta);
//!             }
//!         }
//!         Err(StreamError::Cancelled) => break,
//!         Err(e) => return Err(e.into()),
//!     }
//! }
//! # Ok(())
//! # }
//! ```

mod frame;
mod observer;
mod payload;
mod session;
mod types;
mod utf8;

pub use frame::{Frame, FrameDecoder, FramingMode, DATA_MARKER};
pub use observer::{StreamObserver, TracingObserver};
pub use payload::{decode_payload, Payload, PayloadError, DONE_SENTINEL};
pub use session::ChatStream;
pub use types::{ChatResponse, DecodedEvent, StreamError, StreamOutcome, StreamResult};
pub use utf8::Utf8Decoder;
