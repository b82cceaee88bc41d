//! DALI/DMX Protocol Library
//!
//! This crate models the two lighting protocols that share the bridge's
//! address space:
//!
//! - **DALI**: addressable ballast control. Commands are a pair of bytes
//!   (address byte + command byte); the address byte selects a single
//!   device, a group, or every device on the bus.
//! - **DMX512**: a flat 512-channel intensity universe handed to an external
//!   transport as a whole buffer.
//!
//! # Architecture
//!
//! - [`address`]: resolution of raw address bytes into broadcast, group or
//!   individual targets
//! - [`command`]: the DALI command set understood by the bridge
//! - [`frame`]: the illustrative bit-level frame layout and Manchester line code
//! - [`dmx`]: universe constants and human readable packet descriptions
//! - [`transport`]: the seam to the external universe transport
//!
//! # Example
//!
//! ```rust
//! use lux_protocol::{encode_frame, AddressTarget, DaliCommand};
//!
//! // Address 1, command UP
//! let frame = encode_frame(0x02, DaliCommand::Up.code());
//! assert_eq!(frame.address_field, "000001");
//! assert_eq!(frame.bit_length, 32);
//!
//! assert!(matches!(AddressTarget::resolve(0x7E), AddressTarget::Broadcast));
//! ```

pub mod address;
pub mod command;
pub mod dmx;
pub mod error;
pub mod frame;
pub mod transport;

pub use address::{AddressTarget, DaliAddress, GroupId, SceneId, MAX_GROUPS, MAX_SCENES};
pub use command::DaliCommand;
pub use dmx::{ChannelRange, CHANNELS_PER_ADDRESS, MAX_DMX_ADDRESS, UNIVERSE_SIZE};
pub use error::ProtocolError;
pub use frame::{
    encode_frame, encode_frame_with, manchester_encode, manchester_encode_bits, Frame, FrameLayout,
};
pub use transport::{CompletionCallback, ReceiveCallback, TransportError, UniverseTransport};

/// Identifies which protocol owns an address in the shared address space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Protocol {
    /// DALI ballast (one address per device)
    Dali,
    /// DMX channel block (one address per four consecutive channels)
    Dmx,
}

impl Protocol {
    /// Returns a human-readable name for the protocol
    pub fn name(&self) -> &'static str {
        match self {
            Protocol::Dali => "DALI",
            Protocol::Dmx => "DMX",
        }
    }

    /// Returns the other protocol of the pair
    pub fn other(&self) -> Protocol {
        match self {
            Protocol::Dali => Protocol::Dmx,
            Protocol::Dmx => Protocol::Dali,
        }
    }
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_other() {
        assert_eq!(Protocol::Dali.other(), Protocol::Dmx);
        assert_eq!(Protocol::Dmx.other(), Protocol::Dali);
        assert_eq!(Protocol::Dali.to_string(), "DALI");
    }
}
