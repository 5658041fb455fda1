//! Stream session: pulls chunks, reassembles frames, yields decoded events

use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::future::BoxFuture;
use futures::stream::{self, BoxStream, Stream, StreamExt, TryStreamExt};
use futures::FutureExt;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::frame::{Frame, FrameDecoder, FramingMode};
use super::observer::{StreamObserver, TracingObserver};
use super::payload::{decode_payload, Payload};
use super::types::{ChatResponse, DecodedEvent, StreamError, StreamOutcome, StreamResult};
use super::utf8::Utf8Decoder;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A single streaming response
///
/// Implements `Stream<Item = Result<DecodedEvent, StreamError>>`. Work only
/// happens while the consumer polls: each poll reads at most until one event
/// can be returned.
///
/// # Termination
///
/// - Sentinel payload or transport end-of-stream: the stream returns `None`.
/// - Transport read failure: one `Err(StreamError::Read)`, then `None`.
/// - Cancellation: one `Err(StreamError::Cancelled)`, then `None`.
///
/// [`outcome`](Self::outcome) tells which of these happened.
pub struct ChatStream {
    /// Response body; replaced with an empty stream once finished
    byte_stream: BoxStream<'static, Result<Bytes, BoxError>>,

    /// Resolves when the caller cancels
    cancelled: BoxFuture<'static, ()>,

    /// Caller's token, observed only
    token: CancellationToken,

    utf8: Utf8Decoder,
    frames: FrameDecoder,

    /// Complete frames not yet decoded
    pending: VecDeque<Frame>,

    observer: Arc<dyn StreamObserver>,

    outcome: Option<StreamOutcome>,
}

/// What to do with one frame
enum Step {
    Yield(DecodedEvent),
    Skip,
    Done,
}

impl ChatStream {
    /// Wrap a body byte stream
    pub fn new<S, E>(byte_stream: S, framing: FramingMode, token: CancellationToken) -> Self
    where
        S: Stream<Item = Result<Bytes, E>> + Send + 'static,
        E: Into<BoxError> + 'static,
    {
        let watched = token.clone();
        let byte_stream: BoxStream<'static, Result<Bytes, BoxError>> =
            byte_stream.map_err(Into::into).boxed();

        Self {
            byte_stream,
            cancelled: async move { watched.cancelled().await }.boxed(),
            token,
            utf8: Utf8Decoder::new(),
            frames: FrameDecoder::new(framing),
            pending: VecDeque::new(),
            observer: Arc::new(TracingObserver),
            outcome: None,
        }
    }

    /// Replace the default tracing observer
    pub fn with_observer(mut self, observer: Arc<dyn StreamObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// How the stream ended, once it has
    pub fn outcome(&self) -> Option<StreamOutcome> {
        self.outcome
    }

    /// Get the next event
    ///
    /// Returns `None` once the stream has ended.
    pub async fn next(&mut self) -> Option<StreamResult<DecodedEvent>> {
        <Self as StreamExt>::next(self).await
    }

    /// Drain the stream into a single response
    ///
    /// Cancellation is not an error here; check `outcome` on the result.
    pub async fn collect_response(mut self) -> StreamResult<ChatResponse> {
        let mut response = ChatResponse::default();

        while let Some(item) = self.next().await {
            match item {
                Ok(event) => response.push(event),
                Err(StreamError::Cancelled) => break,
                Err(e) => return Err(e),
            }
        }

        response.outcome = self.outcome;
        Ok(response)
    }

    fn decode(&mut self, frame: Frame) -> Step {
        self.observer.on_frame(&frame);

        match decode_payload(&frame.payload) {
            Ok(Payload::Event(event)) => Step::Yield(event),
            Ok(Payload::Done) => {
                self.observer.on_sentinel(&frame);
                Step::Done
            }
            Err(e) => {
                self.observer.on_parse_failure(&frame, &e);
                Step::Skip
            }
        }
    }

    /// Mark the stream finished and release the connection
    fn finish(&mut self, outcome: StreamOutcome) {
        self.byte_stream = stream::empty().boxed();
        self.pending.clear();
        self.outcome = Some(outcome);

        match outcome {
            StreamOutcome::Done => {}
            StreamOutcome::Cancelled => self.observer.on_cancelled(),
            _ => self.observer.on_closed(outcome),
        }
    }
}

impl Stream for ChatStream {
    type Item = StreamResult<DecodedEvent>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;

        loop {
            if this.outcome.is_some() {
                return Poll::Ready(None);
            }

            // Checked before every frame, so nothing is delivered after cancel
            if this.token.is_cancelled() || this.cancelled.poll_unpin(cx).is_ready() {
                this.finish(StreamOutcome::Cancelled);
                return Poll::Ready(Some(Err(StreamError::Cancelled)));
            }

            if let Some(frame) = this.pending.pop_front() {
                match this.decode(frame) {
                    Step::Yield(event) => return Poll::Ready(Some(Ok(event))),
                    Step::Skip => continue,
                    Step::Done => {
                        // Anything still buffered or unread is dropped
                        this.finish(StreamOutcome::Done);
                        return Poll::Ready(None);
                    }
                }
            }

            match this.byte_stream.poll_next_unpin(cx) {
                Poll::Ready(Some(Ok(bytes))) => {
                    let text = this.utf8.decode(&bytes);
                    this.pending.extend(this.frames.feed(&text));
                }
                Poll::Ready(Some(Err(e))) => {
                    this.finish(StreamOutcome::Failed);
                    return Poll::Ready(Some(Err(StreamError::Read(e))));
                }
                Poll::Ready(None) => {
                    let tail = this.utf8.finish();
                    let unterminated = this.frames.remainder().len() + tail.len();
                    if unterminated > 0 {
                        debug!(
                            "Discarding {} bytes of unterminated frame at end of stream",
                            unterminated
                        );
                    }
                    this.finish(StreamOutcome::Completed);
                    return Poll::Ready(None);
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
