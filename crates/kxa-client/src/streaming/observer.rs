//! Observability hook for stream sessions

use tracing::{debug, trace, warn};

use super::frame::Frame;
use super::payload::PayloadError;
use super::types::StreamOutcome;

/// Receives notifications about a session's progress
///
/// All methods default to no-ops. Implementations must be cheap; they run
/// inline on the consumer's pull.
pub trait StreamObserver: Send + Sync {
    /// A complete frame was extracted
    fn on_frame(&self, _frame: &Frame) {}

    /// A frame's payload could not be decoded and was skipped
    fn on_parse_failure(&self, _frame: &Frame, _error: &PayloadError) {}

    /// The termination sentinel was received
    fn on_sentinel(&self, _frame: &Frame) {}

    /// The caller's cancellation was observed
    fn on_cancelled(&self) {}

    /// The session ended for any reason other than sentinel or cancellation
    fn on_closed(&self, _outcome: StreamOutcome) {}
}

/// Default observer that reports through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl StreamObserver for TracingObserver {
    fn on_frame(&self, frame: &Frame) {
        trace!(
            offset = frame.offset,
            len = frame.payload.len(),
            "Frame completed"
        );
    }

    fn on_parse_failure(&self, frame: &Frame, error: &PayloadError) {
        warn!(offset = frame.offset, "Skipping malformed frame: {}", error);
    }

    fn on_sentinel(&self, frame: &Frame) {
        debug!(offset = frame.offset, "Stream termination sentinel received");
    }

    fn on_cancelled(&self) {
        debug!("Stream cancelled by caller");
    }

    fn on_closed(&self, outcome: StreamOutcome) {
        debug!(?outcome, "Stream closed");
    }
}
