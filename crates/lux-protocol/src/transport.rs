//! Universe transport seam
//!
//! The bridge never performs DMX I/O itself. An external transport sends
//! whole universes and delivers received ones through callbacks; anything
//! with this shape (a network client, a USB interface, the in-process
//! simulator) can sit behind it.

use thiserror::Error;

use crate::dmx::UNIVERSE_SIZE;

/// Errors reported by a universe transport
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// A send did not complete
    #[error("DMX send to universe {universe} failed: {reason}")]
    SendFailed {
        /// Target universe
        universe: u16,
        /// Transport-provided reason
        reason: String,
    },

    /// The event loop has already been started or stopped
    #[error("transport event loop unavailable: {0}")]
    EventLoop(String),

    /// The transport connection is gone
    #[error("transport closed")]
    Closed,
}

/// Advisory completion callback for a send
pub type CompletionCallback = Box<dyn FnOnce(Result<(), TransportError>) + Send>;

/// Callback invoked once per received universe frame
pub type ReceiveCallback = Box<dyn FnMut(&[u8]) + Send>;

/// A DMX universe transport
///
/// `send_dmx` is fire-and-forget: callers must not wait on the completion
/// callback. `run_event_loop` blocks the calling thread until the transport
/// shuts down, invoking registered receive callbacks from that thread.
pub trait UniverseTransport: Send + Sync {
    /// Queue a full universe for output
    fn send_dmx(&self, universe: u16, data: &[u8; UNIVERSE_SIZE], on_complete: CompletionCallback);

    /// Register a callback for frames received on a universe
    fn register_receive(
        &self,
        universe: u16,
        callback: ReceiveCallback,
    ) -> Result<(), TransportError>;

    /// Run the receive loop on the calling thread
    fn run_event_loop(&self) -> Result<(), TransportError>;
}
