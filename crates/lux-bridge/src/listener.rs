//! Universe listener thread
//!
//! The transport's receive loop blocks, so it gets a thread of its own. The
//! thread never touches the DMX buffer: every received frame goes straight
//! into the ingest queue.

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use lux_protocol::UniverseTransport;
use tracing::{debug, error, info, warn};

use crate::ingest::UniverseIngestSender;

/// Start listening on a universe
///
/// The receive callback is registered before the thread starts, so a
/// registration failure leaves no thread behind. The thread runs until the
/// transport's event loop returns.
pub fn spawn_universe_listener(
    transport: Arc<dyn UniverseTransport>,
    universe: u16,
    sender: UniverseIngestSender,
) -> io::Result<JoinHandle<()>> {
    transport
        .register_receive(
            universe,
            Box::new(move |data: &[u8]| {
                if !sender.push(data) {
                    debug!("Ingest queue closed, dropping universe {} frame", universe);
                }
            }),
        )
        .map_err(io::Error::other)?;

    thread::Builder::new()
        .name(format!("universe-{}-listener", universe))
        .spawn(move || {
            info!("Listening on universe {}", universe);
            match transport.run_event_loop() {
                Ok(()) => info!("Universe {} listener stopped", universe),
                Err(e) => error!("Universe {} listener failed: {}", universe, e),
            }
        })
        .inspect_err(|e| warn!("Could not start universe {} listener: {}", universe, e))
}
