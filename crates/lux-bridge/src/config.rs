//! Bridge configuration

use std::time::Duration;

use lux_protocol::FrameLayout;
use serde::{Deserialize, Serialize};

/// Bridge configuration
///
/// Every field has a default, so a partial settings file is enough.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// DMX universe to listen on and send to
    pub universe: u16,
    /// Drain cadence for the ingest queue (ms)
    pub drain_interval_ms: u64,
    /// Stop-bit layout for transmitted DALI frames
    pub framing: FrameLayout,
    /// Send the universe to the transport whenever a channel write changes it
    pub send_on_change: bool,
}

impl BridgeConfig {
    /// Drain cadence as a duration, never zero
    pub fn drain_interval(&self) -> Duration {
        Duration::from_millis(self.drain_interval_ms.max(1))
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            universe: 1,
            drain_interval_ms: 100,
            framing: FrameLayout::Controller,
            send_on_change: true,
        }
    }
}
