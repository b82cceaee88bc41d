//! Universe ingest queue
//!
//! Received universes cross from the listener thread to the buffer owner
//! through an unbounded FIFO. The listener only pushes; the owner drains
//! oldest-first and applies each snapshot to its [`DmxBuffer`], so the
//! buffer itself is never shared.

use std::collections::BTreeMap;

use lux_protocol::dmx::UNIVERSE_SIZE;
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::dmx::DmxBuffer;

/// Producer half, held by the listener
///
/// Cloneable and usable from any thread without a runtime.
#[derive(Debug, Clone)]
pub struct UniverseIngestSender {
    tx: mpsc::UnboundedSender<Vec<u8>>,
}

impl UniverseIngestSender {
    /// Queue a received universe
    ///
    /// Anything past 512 bytes is dropped. Returns false once the consumer
    /// is gone.
    pub fn push(&self, data: &[u8]) -> bool {
        let snapshot = data[..data.len().min(UNIVERSE_SIZE)].to_vec();
        trace!("Queued universe snapshot ({} bytes)", snapshot.len());
        self.tx.send(snapshot).is_ok()
    }

    /// Whether the consumer has been dropped
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Summary of one drain pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrainSummary {
    /// Snapshots applied, in arrival order
    pub snapshots: usize,
    /// Final value of every channel that changed during the pass
    pub changed: BTreeMap<usize, u8>,
}

impl DrainSummary {
    /// Whether the pass applied nothing
    pub fn is_empty(&self) -> bool {
        self.snapshots == 0
    }
}

/// Consumer half, held by the buffer owner
#[derive(Debug)]
pub struct UniverseIngestQueue {
    rx: mpsc::UnboundedReceiver<Vec<u8>>,
}

impl UniverseIngestQueue {
    /// Create a connected sender/queue pair
    pub fn channel() -> (UniverseIngestSender, UniverseIngestQueue) {
        let (tx, rx) = mpsc::unbounded_channel();
        (UniverseIngestSender { tx }, UniverseIngestQueue { rx })
    }

    /// Wait for the next snapshot
    ///
    /// Returns `None` once every sender is dropped and the queue is empty.
    pub async fn recv(&mut self) -> Option<Vec<u8>> {
        self.rx.recv().await
    }

    /// Apply every queued snapshot to the buffer, oldest first
    ///
    /// Never waits: stops as soon as the queue is empty.
    pub fn drain_into(&mut self, buffer: &mut DmxBuffer) -> DrainSummary {
        let mut summary = DrainSummary::default();
        while let Ok(snapshot) = self.rx.try_recv() {
            Self::apply(buffer, &snapshot, &mut summary);
        }
        summary
    }

    /// Apply one snapshot that was already taken with [`recv`](Self::recv),
    /// then drain whatever queued up behind it
    pub fn apply_and_drain(&mut self, buffer: &mut DmxBuffer, first: &[u8]) -> DrainSummary {
        let mut summary = DrainSummary::default();
        Self::apply(buffer, first, &mut summary);
        while let Ok(snapshot) = self.rx.try_recv() {
            Self::apply(buffer, &snapshot, &mut summary);
        }
        summary
    }

    fn apply(buffer: &mut DmxBuffer, snapshot: &[u8], summary: &mut DrainSummary) {
        summary.changed.extend(buffer.apply_snapshot(snapshot));
        summary.snapshots += 1;
        debug!("Applied universe snapshot of {} channels", snapshot.len());
    }
}
