//! Error types for DALI value validation

use thiserror::Error;

/// Errors raised when a raw value does not fit the protocol's ranges
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// DALI short address outside 0-63
    #[error("invalid DALI address: {0} (must be 0-63)")]
    InvalidAddress(u16),

    /// Group number outside 0-15
    #[error("invalid group: {0} (must be 0-15)")]
    InvalidGroup(u8),

    /// Scene number outside 0-15
    #[error("invalid scene: {0} (must be 0-15)")]
    InvalidScene(u8),

    /// DMX base address outside 1-128
    #[error("invalid DMX address: {0} (must be 1-128)")]
    InvalidDmxAddress(u16),
}
