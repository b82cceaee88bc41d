//! DALI addressing
//!
//! A DALI address byte selects its target in three mutually exclusive ways:
//!
//! ```text
//! 0b1111_111S        broadcast     (address_byte >> 1 == 0x3F)
//! 0b100G_GGGS        group         (0x80 <= address_byte < 0xA0)
//! 0bYAAA_AAAS        individual    (short address = address_byte >> 1)
//! ```
//!
//! The low bit (S) is the selector bit and does not take part in resolution.

use std::fmt;

use crate::error::ProtocolError;

/// Number of groups a DALI bus supports
pub const MAX_GROUPS: u8 = 16;

/// Number of scene slots stored per device
pub const MAX_SCENES: u8 = 16;

/// Highest valid DALI short address
pub const MAX_DALI_ADDRESS: u8 = 63;

/// First address byte of the group range
pub const GROUP_ADDRESS_BASE: u8 = 0x80;

/// First address byte past the group range
pub const GROUP_ADDRESS_END: u8 = 0xA0;

/// Address byte used when emitting a broadcast frame
///
/// Any byte whose upper seven bits are `0x3F` is a broadcast, which also
/// means short address 63 cannot be reached individually.
pub const BROADCAST_ADDRESS_BYTE: u8 = 0x7E;

/// A validated DALI short address (0-63)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DaliAddress(u8);

impl DaliAddress {
    /// Validate a raw address
    pub fn new(address: u16) -> Result<Self, ProtocolError> {
        if address > MAX_DALI_ADDRESS as u16 {
            return Err(ProtocolError::InvalidAddress(address));
        }
        Ok(Self(address as u8))
    }

    /// Get the raw address value
    pub fn value(&self) -> u8 {
        self.0
    }

    /// Address byte for an individually addressed frame
    pub fn address_byte(&self) -> u8 {
        self.0 << 1
    }
}

impl fmt::Display for DaliAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A validated group number (0-15)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GroupId(u8);

impl GroupId {
    /// Validate a raw group number
    pub fn new(group: u8) -> Result<Self, ProtocolError> {
        if group >= MAX_GROUPS {
            return Err(ProtocolError::InvalidGroup(group));
        }
        Ok(Self(group))
    }

    /// Get the raw group number
    pub fn value(&self) -> u8 {
        self.0
    }

    /// Index into a group table
    pub fn index(&self) -> usize {
        self.0 as usize
    }

    /// Address byte for a frame sent to this group
    pub fn address_byte(&self) -> u8 {
        GROUP_ADDRESS_BASE | (self.0 << 1)
    }

    /// Iterate over every group on the bus
    pub fn all() -> impl Iterator<Item = GroupId> {
        (0..MAX_GROUPS).map(GroupId)
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A validated scene number (0-15)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SceneId(u8);

impl SceneId {
    /// Validate a raw scene number
    pub fn new(scene: u8) -> Result<Self, ProtocolError> {
        if scene >= MAX_SCENES {
            return Err(ProtocolError::InvalidScene(scene));
        }
        Ok(Self(scene))
    }

    /// Get the raw scene number
    pub fn value(&self) -> u8 {
        self.0
    }

    /// Index into a device's scene table
    pub fn index(&self) -> usize {
        self.0 as usize
    }

    /// Scene carried in the low nibble of a scene opcode
    pub(crate) fn from_low_bits(code: u8) -> Self {
        Self(code & 0x0F)
    }
}

impl fmt::Display for SceneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Target selected by a raw DALI address byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AddressTarget {
    /// Every device on the bus
    Broadcast,
    /// Every device currently in the group
    Group(GroupId),
    /// A single short address
    ///
    /// Holds `address_byte >> 1` unvalidated: bytes above the group range
    /// resolve to short addresses no device can occupy.
    Individual(u8),
}

impl AddressTarget {
    /// Resolve a raw address byte
    ///
    /// Broadcast is checked first, then the group range, and anything else is
    /// an individual address.
    pub fn resolve(address_byte: u8) -> Self {
        if address_byte >> 1 == 0x3F {
            AddressTarget::Broadcast
        } else if (GROUP_ADDRESS_BASE..GROUP_ADDRESS_END).contains(&address_byte) {
            AddressTarget::Group(GroupId((address_byte - GROUP_ADDRESS_BASE) >> 1))
        } else {
            AddressTarget::Individual(address_byte >> 1)
        }
    }

    /// Address byte that resolves back to this target
    pub fn address_byte(&self) -> u8 {
        match self {
            AddressTarget::Broadcast => BROADCAST_ADDRESS_BYTE,
            AddressTarget::Group(group) => group.address_byte(),
            AddressTarget::Individual(address) => address << 1,
        }
    }
}

impl fmt::Display for AddressTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressTarget::Broadcast => f.write_str("broadcast"),
            AddressTarget::Group(group) => write!(f, "group {}", group),
            AddressTarget::Individual(address) => write!(f, "light {}", address),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_broadcast() {
        assert_eq!(AddressTarget::resolve(0x7E), AddressTarget::Broadcast);
        assert_eq!(AddressTarget::resolve(0x7F), AddressTarget::Broadcast);
        // Short address 63 shares the broadcast byte
        assert_eq!(
            AddressTarget::resolve(DaliAddress(63).address_byte()),
            AddressTarget::Broadcast
        );
    }

    #[test]
    fn test_resolve_group_range() {
        assert_eq!(
            AddressTarget::resolve(0x80),
            AddressTarget::Group(GroupId(0))
        );
        assert_eq!(
            AddressTarget::resolve(0x81),
            AddressTarget::Group(GroupId(0))
        );
        assert_eq!(
            AddressTarget::resolve(0x9F),
            AddressTarget::Group(GroupId(15))
        );
        // First byte past the group range is individual again
        assert_eq!(AddressTarget::resolve(0xA0), AddressTarget::Individual(0x50));
    }

    #[test]
    fn test_resolve_individual() {
        assert_eq!(AddressTarget::resolve(0x00), AddressTarget::Individual(0));
        assert_eq!(AddressTarget::resolve(0x06), AddressTarget::Individual(3));
        assert_eq!(AddressTarget::resolve(0x7C), AddressTarget::Individual(62));
        assert_eq!(AddressTarget::resolve(0xFE), AddressTarget::Individual(127));
    }

    #[test]
    fn test_address_byte_round_trip() {
        let targets = [
            AddressTarget::Broadcast,
            AddressTarget::Group(GroupId(7)),
            AddressTarget::Individual(42),
        ];
        for target in targets {
            assert_eq!(AddressTarget::resolve(target.address_byte()), target);
        }
    }

    #[test]
    fn test_validation() {
        assert!(DaliAddress::new(63).is_ok());
        assert_eq!(
            DaliAddress::new(64),
            Err(ProtocolError::InvalidAddress(64))
        );
        assert!(GroupId::new(15).is_ok());
        assert_eq!(GroupId::new(16), Err(ProtocolError::InvalidGroup(16)));
        assert!(SceneId::new(0).is_ok());
        assert_eq!(SceneId::new(16), Err(ProtocolError::InvalidScene(16)));
        assert_eq!(GroupId::all().count(), 16);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn resolve_covers_every_byte(byte in any::<u8>()) {
                match AddressTarget::resolve(byte) {
                    AddressTarget::Broadcast => prop_assert_eq!(byte >> 1, 0x3F),
                    AddressTarget::Group(group) => {
                        prop_assert!((0x80..0xA0).contains(&byte));
                        prop_assert_eq!(group.address_byte(), byte & 0xFE);
                    }
                    AddressTarget::Individual(address) => prop_assert_eq!(address, byte >> 1),
                }
            }

            #[test]
            fn valid_addresses_round_trip(address in 0u16..63) {
                let dali = DaliAddress::new(address).unwrap();
                prop_assert_eq!(
                    AddressTarget::resolve(dali.address_byte()),
                    AddressTarget::Individual(address as u8)
                );
            }
        }
    }
}
