//! Error types for the bridge

use lux_protocol::{Protocol, ProtocolError};
use thiserror::Error;

/// Errors that can occur in the bridge
///
/// Every variant is recoverable: the operation that raised it performed no
/// mutation. Commands sent to absent devices or empty groups are not errors;
/// they are reported in the dispatch report instead.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BridgeError {
    /// Address already registered under the other protocol
    #[error("address {address} is already assigned to {owner}, cannot assign to {requested}")]
    AddressConflict {
        /// Contested address
        address: u16,
        /// Protocol currently holding the address
        owner: Protocol,
        /// Protocol that asked for it
        requested: Protocol,
    },

    /// Address, group or scene out of range
    #[error(transparent)]
    OutOfRange(#[from] ProtocolError),

    /// DMX channel index outside the universe
    #[error("DMX channel {0} out of range (must be 0-511)")]
    ChannelOutOfRange(usize),

    /// No DALI device at this address
    #[error("no DALI light at address {0}")]
    DeviceNotFound(u8),

    /// Address not registered under either protocol
    #[error("address {0} is not assigned to DALI or DMX")]
    NotAssigned(u16),

    /// The bridge actor is no longer running
    #[error("bridge actor unavailable")]
    ActorUnavailable,
}
