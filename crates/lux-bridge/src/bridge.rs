//! DALI-on-DMX bridging
//!
//! A DMX-registered address owns four consecutive channels. DALI commands
//! sent to such an address are translated into DMX levels one channel at a
//! time; writing all four channels is up to the caller.

use lux_protocol::{ChannelRange, DaliCommand, Protocol};
use tracing::info;

use crate::dmx::DmxBuffer;
use crate::error::BridgeError;
use crate::registry::AddressRegistry;

/// Brightness step applied by UP and DOWN on a DMX channel
pub const DMX_STEP: u8 = 25;

/// Level a DMX channel takes on MIN_LEVEL
pub const DMX_MIN_LEVEL: u8 = 26;

/// Reserve the channel block for a DMX address
///
/// Fails with `AddressConflict` when the address already belongs to DALI and
/// with `OutOfRange` when the block would fall outside the universe.
pub fn assign_dmx(
    registry: &mut AddressRegistry,
    address: u16,
) -> Result<ChannelRange, BridgeError> {
    let range = ChannelRange::for_address(address)?;
    let newly_assigned = registry.owner(address).is_none();
    registry.register(address, Protocol::Dmx)?;
    if newly_assigned {
        info!("DMX address {} assigned to {}", address, range);
    }
    Ok(range)
}

/// Translate a DALI command into a DMX level given the channel's current value
pub fn translate_command_to_level(command: DaliCommand, current: u8) -> u8 {
    match command {
        DaliCommand::Off => 0,
        DaliCommand::Up => current.saturating_add(DMX_STEP),
        DaliCommand::Down => current.saturating_sub(DMX_STEP),
        DaliCommand::MaxLevel => u8::MAX,
        DaliCommand::MinLevel => DMX_MIN_LEVEL,
        _ => current,
    }
}

/// Compute the new level of one channel for a DALI command
///
/// Reads the channel's current value; does not write it.
pub fn apply_dali_command_as_dmx(
    buffer: &DmxBuffer,
    command: DaliCommand,
    channel: usize,
) -> Result<u8, BridgeError> {
    Ok(translate_command_to_level(command, buffer.read(channel)?))
}
