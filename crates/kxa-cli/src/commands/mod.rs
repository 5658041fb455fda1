//! Command implementations for kxa-cli

pub mod ask;
pub mod chat;
pub mod reply;

pub use ask::ask;
pub use chat::chat;

use std::sync::{Arc, Mutex};

use anyhow::Result;
use kxa_client::CancellationToken;

/// Routes Ctrl+C to the reply currently streaming
///
/// While a reply streams, Ctrl+C cancels it. With nothing in flight it
/// exits the process as usual.
#[derive(Clone)]
pub struct Interrupt {
    current: Arc<Mutex<Option<CancellationToken>>>,
}

impl Interrupt {
    /// Install the process-wide Ctrl+C handler
    pub fn install() -> Result<Self> {
        let current: Arc<Mutex<Option<CancellationToken>>> = Arc::new(Mutex::new(None));
        let handler = current.clone();

        ctrlc::set_handler(move || {
            let in_flight = handler.lock().ok().and_then(|mut slot| slot.take());
            match in_flight {
                Some(token) => token.cancel(),
                None => std::process::exit(130),
            }
        })?;

        Ok(Self { current })
    }

    /// Token for a new reply
    pub fn begin(&self) -> CancellationToken {
        let token = CancellationToken::new();
        if let Ok(mut slot) = self.current.lock() {
            *slot = Some(token.clone());
        }
        token
    }

    /// Reply finished; Ctrl+C exits again
    pub fn end(&self) {
        if let Ok(mut slot) = self.current.lock() {
            *slot = None;
        }
    }
}
