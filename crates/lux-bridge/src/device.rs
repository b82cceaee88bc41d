//! DALI device state
//!
//! A device's state is its brightness, sixteen scene slots and its group
//! memberships. There are no discrete modes beyond the brightness value.

use std::collections::BTreeSet;

use lux_protocol::command::{DALI_STEP, MAX_LEVEL};
use lux_protocol::{DaliAddress, DaliCommand, GroupId, SceneId, MAX_SCENES};
use tracing::debug;

use crate::error::BridgeError;

/// What applying a command did to one device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandEffect {
    /// Brightness was set (possibly to the same value)
    Level {
        /// Brightness before the command
        from: u8,
        /// Brightness after the command
        to: u8,
    },
    /// Current brightness reported, nothing changed
    Reported(u8),
    /// Command acknowledged, nothing changed
    Acknowledged,
    /// Unrecognized command code, nothing changed
    Unknown(u8),
}

impl CommandEffect {
    /// Brightness after the command, if it set one
    pub fn new_level(&self) -> Option<u8> {
        match self {
            CommandEffect::Level { to, .. } => Some(*to),
            _ => None,
        }
    }
}

/// A single DALI ballast
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaliDevice {
    address: DaliAddress,
    brightness: u8,
    scenes: [u8; MAX_SCENES as usize],
    groups: BTreeSet<GroupId>,
}

impl DaliDevice {
    /// Create a device at brightness 0 with empty scenes and no groups
    pub fn new(address: DaliAddress) -> Self {
        Self {
            address,
            brightness: 0,
            scenes: [0; MAX_SCENES as usize],
            groups: BTreeSet::new(),
        }
    }

    /// Short address
    pub fn address(&self) -> DaliAddress {
        self.address
    }

    /// Current arc power level
    pub fn brightness(&self) -> u8 {
        self.brightness
    }

    /// Groups this device belongs to
    pub fn groups(&self) -> &BTreeSet<GroupId> {
        &self.groups
    }

    /// Whether the device is in a group
    pub fn in_group(&self, group: GroupId) -> bool {
        self.groups.contains(&group)
    }

    /// Apply a command to this device only
    ///
    /// TERMINATE only darkens this device; the bus extends it to every
    /// device.
    pub fn apply(&mut self, command: DaliCommand) -> CommandEffect {
        let current = self.brightness;
        let effect = match command {
            DaliCommand::Off
            | DaliCommand::MinLevel
            | DaliCommand::Reset
            | DaliCommand::Terminate => self.set_level(0),
            DaliCommand::Up => self.set_level(current.saturating_add(DALI_STEP)),
            DaliCommand::Down => self.set_level(current.saturating_sub(DALI_STEP)),
            DaliCommand::MaxLevel => self.set_level(MAX_LEVEL),
            DaliCommand::GoToScene(scene) => self.recall_scene(scene),
            DaliCommand::QueryActualLevel => CommandEffect::Reported(current),
            DaliCommand::StoreToDtr => CommandEffect::Acknowledged,
            DaliCommand::Unknown(code) => CommandEffect::Unknown(code),
        };
        debug!("Light {}: {} -> {:?}", self.address, command, effect);
        effect
    }

    /// Set the brightness directly
    pub fn set_level(&mut self, level: u8) -> CommandEffect {
        let from = self.brightness;
        self.brightness = level;
        CommandEffect::Level { from, to: level }
    }

    /// Store a brightness for a scene slot
    pub fn set_scene_brightness(&mut self, scene: u8, value: u8) -> Result<(), BridgeError> {
        let scene = SceneId::new(scene)?;
        self.scenes[scene.index()] = value;
        debug!(
            "Scene {} for light {} set to brightness {}",
            scene, self.address, value
        );
        Ok(())
    }

    /// Stored brightness for a scene slot
    ///
    /// Never-set and out-of-range scenes read as 0.
    pub fn get_scene_brightness(&self, scene: u8) -> u8 {
        self.scenes.get(scene as usize).copied().unwrap_or(0)
    }

    /// Recall a scene's stored brightness
    pub fn recall_scene(&mut self, scene: SceneId) -> CommandEffect {
        let level = self.scenes[scene.index()];
        self.set_level(level)
    }

    pub(crate) fn add_to_group(&mut self, group: GroupId) -> bool {
        self.groups.insert(group)
    }

    pub(crate) fn remove_from_all_groups(&mut self) -> BTreeSet<GroupId> {
        std::mem::take(&mut self.groups)
    }
}
