//! Address ownership registry
//!
//! DALI short addresses and DMX base addresses share one numeric space. The
//! registry is the only gate that decides which protocol owns a number.
//! Addresses are never released once assigned.

use std::collections::BTreeMap;

use lux_protocol::Protocol;
use tracing::{debug, warn};

use crate::error::BridgeError;

/// Maps each assigned address to the protocol that owns it
#[derive(Debug, Clone, Default)]
pub struct AddressRegistry {
    owners: BTreeMap<u16, Protocol>,
}

impl AddressRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an address under a protocol
    ///
    /// Registering again under the same protocol succeeds without change.
    /// Registering under the other protocol fails and leaves the registry
    /// untouched.
    pub fn register(&mut self, address: u16, protocol: Protocol) -> Result<(), BridgeError> {
        match self.owners.get(&address) {
            Some(&owner) if owner == protocol => Ok(()),
            Some(&owner) => {
                warn!(
                    "Address {} already assigned to {}, rejecting {}",
                    address, owner, protocol
                );
                Err(BridgeError::AddressConflict {
                    address,
                    owner,
                    requested: protocol,
                })
            }
            None => {
                self.owners.insert(address, protocol);
                debug!("Address {} assigned to {}", address, protocol);
                Ok(())
            }
        }
    }

    /// Whether `protocol` may use this address
    pub fn is_free_for(&self, address: u16, protocol: Protocol) -> bool {
        !matches!(self.owners.get(&address), Some(&owner) if owner != protocol)
    }

    /// Protocol that owns an address, if any
    pub fn owner(&self, address: u16) -> Option<Protocol> {
        self.owners.get(&address).copied()
    }

    /// Addresses owned by a protocol, ascending
    pub fn addresses(&self, protocol: Protocol) -> impl Iterator<Item = u16> + '_ {
        self.owners
            .iter()
            .filter(move |(_, &owner)| owner == protocol)
            .map(|(&address, _)| address)
    }

    /// Number of assigned addresses
    pub fn len(&self) -> usize {
        self.owners.len()
    }

    /// Whether nothing is assigned yet
    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }
}
