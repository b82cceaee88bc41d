//! Unified event stream for the bridge
//!
//! Display consumers get everything through one channel: explicit
//! `(target, value)` updates for lights and channels, transmitted traffic,
//! and free-text activity lines.

use lux_protocol::{ChannelRange, Frame, GroupId};

/// Unified event enum for all bridge activity
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeEvent {
    // -------------------------------------------------------------------------
    // Assignment events
    // -------------------------------------------------------------------------
    /// A DALI light was created
    LightCreated {
        /// Short address
        address: u8,
    },

    /// A DMX address reserved its channel block
    DmxAssigned {
        /// The reserved block
        range: ChannelRange,
    },

    /// A light joined a group
    GroupAssigned {
        /// Short address
        address: u8,
        /// Group joined
        group: GroupId,
    },

    /// A light left every group
    GroupsCleared {
        /// Short address
        address: u8,
        /// Groups it left
        groups: Vec<GroupId>,
    },

    // -------------------------------------------------------------------------
    // Display updates
    // -------------------------------------------------------------------------
    /// A DALI light's brightness was set
    LightLevel {
        /// Short address
        address: u8,
        /// New brightness
        level: u8,
    },

    /// A DMX channel took a new value
    ChannelChanged {
        /// Channel index (0-511)
        channel: usize,
        /// New value
        value: u8,
    },

    // -------------------------------------------------------------------------
    // Traffic events
    // -------------------------------------------------------------------------
    /// A DALI frame was transmitted on the bus
    FrameSent {
        /// The encoded frame
        frame: Frame,
    },

    /// The universe was handed to the transport
    DmxOutput {
        /// Target universe
        universe: u16,
    },

    // -------------------------------------------------------------------------
    // Activity
    // -------------------------------------------------------------------------
    /// A line for the activity log
    Log {
        /// Log text
        message: String,
    },

    /// An error occurred
    Error {
        /// Source of the error
        source: String,
        /// Error message
        message: String,
    },
}

impl BridgeEvent {
    /// Create a log line event
    pub fn log(message: impl Into<String>) -> Self {
        BridgeEvent::Log {
            message: message.into(),
        }
    }

    /// Check if this is a display update
    pub fn is_display(&self) -> bool {
        matches!(
            self,
            BridgeEvent::LightLevel { .. } | BridgeEvent::ChannelChanged { .. }
        )
    }

    /// Check if this is a traffic event
    pub fn is_traffic(&self) -> bool {
        matches!(
            self,
            BridgeEvent::FrameSent { .. } | BridgeEvent::DmxOutput { .. }
        )
    }

    /// Check if this is an assignment event
    pub fn is_assignment(&self) -> bool {
        matches!(
            self,
            BridgeEvent::LightCreated { .. }
                | BridgeEvent::DmxAssigned { .. }
                | BridgeEvent::GroupAssigned { .. }
                | BridgeEvent::GroupsCleared { .. }
        )
    }

    /// Get the DALI address if this event concerns a single light
    pub fn light_address(&self) -> Option<u8> {
        match self {
            BridgeEvent::LightCreated { address }
            | BridgeEvent::GroupAssigned { address, .. }
            | BridgeEvent::GroupsCleared { address, .. }
            | BridgeEvent::LightLevel { address, .. } => Some(*address),
            _ => None,
        }
    }
}
