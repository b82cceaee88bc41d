//! DMX512 universe model
//!
//! A universe is 512 one-byte channels. The bridge hands a DMX address a
//! block of four consecutive channels:
//!
//! ```text
//! address 1   -> channels 0..4
//! address 2   -> channels 4..8
//! address 128 -> channels 508..512
//! ```
//!
//! The packet descriptions here feed the activity log only. Break and
//! mark-after-break are simulated with fixed bit patterns.

use std::fmt;
use std::ops::Range;

use crate::error::ProtocolError;

/// Channels in one universe
pub const UNIVERSE_SIZE: usize = 512;

/// Channels reserved per DMX address
pub const CHANNELS_PER_ADDRESS: usize = 4;

/// Highest DMX base address whose block fits in the universe
pub const MAX_DMX_ADDRESS: u16 = (UNIVERSE_SIZE / CHANNELS_PER_ADDRESS) as u16;

/// Simulated break: 22 low bits
pub const BREAK_BITS: &str = "0000000000000000000000";

/// Simulated mark after break
pub const MAB_BITS: &str = "11";

/// Null start code
pub const START_CODE_BITS: &str = "00000000";

/// Block of four channels reserved for a DMX address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChannelRange {
    /// The DMX address that owns the block
    pub address: u16,
    /// First channel (0-based)
    pub start: usize,
}

impl ChannelRange {
    /// Compute the channel block for a DMX base address (1-128)
    pub fn for_address(address: u16) -> Result<Self, ProtocolError> {
        if address == 0 || address > MAX_DMX_ADDRESS {
            return Err(ProtocolError::InvalidDmxAddress(address));
        }
        Ok(Self {
            address,
            start: (address as usize - 1) * CHANNELS_PER_ADDRESS,
        })
    }

    /// One past the last channel
    pub fn end(&self) -> usize {
        self.start + CHANNELS_PER_ADDRESS
    }

    /// The channel indices in the block
    pub fn channels(&self) -> Range<usize> {
        self.start..self.end()
    }

    /// Whether a channel falls inside the block
    pub fn contains(&self, channel: usize) -> bool {
        self.channels().contains(&channel)
    }
}

impl fmt::Display for ChannelRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Channels {} to {}", self.start, self.end() - 1)
    }
}

/// Describe the bit structure of a single channel update
///
/// Channel numbers are shown 1-based, as on a lighting desk.
pub fn describe_channel(channel: usize, value: u8) -> String {
    format!(
        "Channel {}:\nBreak: {}\nMAB: {}\nData: {:08b}\n",
        channel + 1,
        BREAK_BITS,
        MAB_BITS,
        value
    )
}

/// Describe the packet carrying a four-channel block
pub fn describe_block(range: &ChannelRange, values: &[u8]) -> String {
    let data = values
        .iter()
        .map(|v| format!("{:08b}", v))
        .collect::<Vec<_>>()
        .join(" ");
    format!(
        "Break, MAB: 1, Start Code: {}, {}: {}, Stop Bits: 00",
        START_CODE_BITS, range, data
    )
}
