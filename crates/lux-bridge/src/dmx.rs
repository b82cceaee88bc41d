//! DMX universe buffer

use lux_protocol::dmx::{describe_channel, UNIVERSE_SIZE};
use lux_protocol::ChannelRange;

use crate::error::BridgeError;

/// The 512-channel buffer of record
///
/// Allocated once and mutated in place. DMX output is always derived from
/// this buffer, so a failed send never leaves it out of date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DmxBuffer {
    data: [u8; UNIVERSE_SIZE],
}

impl DmxBuffer {
    /// Create a buffer with every channel at 0
    pub fn new() -> Self {
        Self {
            data: [0; UNIVERSE_SIZE],
        }
    }

    /// Read one channel
    pub fn read(&self, channel: usize) -> Result<u8, BridgeError> {
        self.data
            .get(channel)
            .copied()
            .ok_or(BridgeError::ChannelOutOfRange(channel))
    }

    /// Write one channel, clamping the value to 0-255
    ///
    /// Returns whether the stored value changed.
    pub fn write(&mut self, channel: usize, value: i32) -> Result<bool, BridgeError> {
        let slot = self
            .data
            .get_mut(channel)
            .ok_or(BridgeError::ChannelOutOfRange(channel))?;
        let value = value.clamp(0, u8::MAX as i32) as u8;
        let changed = *slot != value;
        *slot = value;
        Ok(changed)
    }

    /// Overwrite channels `0..values.len()` in order
    ///
    /// Channels past the snapshot keep their values; anything beyond the
    /// universe is ignored. Returns the `(channel, value)` pairs that changed.
    pub fn apply_snapshot(&mut self, values: &[u8]) -> Vec<(usize, u8)> {
        let mut changed = Vec::new();
        for (channel, (slot, &value)) in self.data.iter_mut().zip(values).enumerate() {
            if *slot != value {
                *slot = value;
                changed.push((channel, value));
            }
        }
        changed
    }

    /// The values of a channel block
    pub fn block(&self, range: &ChannelRange) -> &[u8] {
        &self.data[range.start.min(UNIVERSE_SIZE)..range.end().min(UNIVERSE_SIZE)]
    }

    /// The whole universe
    pub fn as_array(&self) -> &[u8; UNIVERSE_SIZE] {
        &self.data
    }

    /// Bit-structure description of one channel for the activity log
    pub fn describe(&self, channel: usize) -> Result<String, BridgeError> {
        Ok(describe_channel(channel, self.read(channel)?))
    }
}

impl Default for DmxBuffer {
    fn default() -> Self {
        Self::new()
    }
}
