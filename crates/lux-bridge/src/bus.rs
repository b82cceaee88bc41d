//! DALI bus model
//!
//! The bus owns every device and the group table, resolves address bytes
//! into targets and dispatches commands to the matching devices. The group
//! table is a reverse index of each device's own group set; the bus is the
//! only place that changes either side, so both always agree:
//!
//! ```text
//! address ∈ groups[g]  <=>  g ∈ device(address).groups
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use lux_protocol::address::BROADCAST_ADDRESS_BYTE;
use lux_protocol::{
    encode_frame_with, AddressTarget, DaliAddress, DaliCommand, Frame, FrameLayout, GroupId,
    SceneId, MAX_GROUPS,
};
use tracing::{debug, info};

use crate::device::{CommandEffect, DaliDevice};
use crate::error::BridgeError;

/// Effect of a dispatch on one device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceUpdate {
    /// Device address
    pub address: DaliAddress,
    /// What the command did
    pub effect: CommandEffect,
}

/// Result of resolving and applying a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The command reached at least one device
    Applied(Vec<DeviceUpdate>),
    /// Individual address with no device behind it
    NoDevice(u8),
    /// Group with no members
    EmptyGroup(GroupId),
    /// Broadcast on a bus with no devices
    NoDevices,
}

/// Everything a dispatch did, for the caller and the activity log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    /// Resolved target
    pub target: AddressTarget,
    /// Decoded command
    pub command: DaliCommand,
    /// Frame that was transmitted
    pub frame: Frame,
    /// Per-device outcome
    pub outcome: DispatchOutcome,
}

impl DispatchReport {
    /// Device updates, empty when nothing was addressed
    pub fn updates(&self) -> &[DeviceUpdate] {
        match &self.outcome {
            DispatchOutcome::Applied(updates) => updates,
            _ => &[],
        }
    }

    /// Whether the command reached any device
    pub fn is_applied(&self) -> bool {
        matches!(self.outcome, DispatchOutcome::Applied(_))
    }

    /// New brightness for every device whose level was set
    pub fn levels(&self) -> impl Iterator<Item = (DaliAddress, u8)> + '_ {
        self.updates()
            .iter()
            .filter_map(|u| u.effect.new_level().map(|level| (u.address, level)))
    }
}

impl fmt::Display for DispatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            DispatchOutcome::NoDevice(address) => {
                write!(f, "No DALI light found for address {}", address)
            }
            DispatchOutcome::EmptyGroup(group) => {
                write!(f, "Group {} not found or no lights in the group", group)
            }
            DispatchOutcome::NoDevices => write!(f, "No DALI lights on the bus"),
            DispatchOutcome::Applied(updates) => {
                if !self.command.is_known() {
                    return write!(
                        f,
                        "Command {} not recognized or not implemented",
                        self.command
                    );
                }
                write!(
                    f,
                    "Command {} sent to {} ({} light{})",
                    self.command,
                    self.target,
                    updates.len(),
                    if updates.len() == 1 { "" } else { "s" }
                )
            }
        }
    }
}

/// The DALI bus: device table, group table and last transmitted frame
#[derive(Debug, Clone)]
pub struct DaliBus {
    devices: BTreeMap<DaliAddress, DaliDevice>,
    groups: [BTreeSet<DaliAddress>; MAX_GROUPS as usize],
    layout: FrameLayout,
    last_frame: Option<Frame>,
}

impl DaliBus {
    /// Create an empty bus using the controller frame layout
    pub fn new() -> Self {
        Self::with_layout(FrameLayout::default())
    }

    /// Create an empty bus with a frame layout
    pub fn with_layout(layout: FrameLayout) -> Self {
        Self {
            devices: BTreeMap::new(),
            groups: std::array::from_fn(|_| BTreeSet::new()),
            layout,
            last_frame: None,
        }
    }

    /// Frame layout used for transmitted frames
    pub fn layout(&self) -> FrameLayout {
        self.layout
    }

    /// Change the frame layout
    pub fn set_layout(&mut self, layout: FrameLayout) {
        self.layout = layout;
    }

    /// Create a light, returning whether it was new
    ///
    /// Creating an existing light is a no-op.
    pub fn create_light(&mut self, address: u16) -> Result<bool, BridgeError> {
        let address = DaliAddress::new(address)?;
        if self.devices.contains_key(&address) {
            debug!("Light {} already exists", address);
            return Ok(false);
        }
        self.devices.insert(address, DaliDevice::new(address));
        info!("Light {} created", address);
        Ok(true)
    }

    /// Get a device by short address
    pub fn device(&self, address: u8) -> Option<&DaliDevice> {
        let address = DaliAddress::new(address as u16).ok()?;
        self.devices.get(&address)
    }

    fn device_mut(&mut self, address: u8) -> Result<&mut DaliDevice, BridgeError> {
        DaliAddress::new(address as u16)
            .ok()
            .and_then(|a| self.devices.get_mut(&a))
            .ok_or(BridgeError::DeviceNotFound(address))
    }

    /// Iterate over all devices in address order
    pub fn devices(&self) -> impl Iterator<Item = &DaliDevice> {
        self.devices.values()
    }

    /// Number of devices on the bus
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    /// Whether the bus has no devices
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Members of a group in address order
    pub fn lights_in_group(&self, group: GroupId) -> impl Iterator<Item = DaliAddress> + '_ {
        self.groups[group.index()].iter().copied()
    }

    /// Add a light to a group, keeping the group table in sync
    pub fn assign_light_to_group(&mut self, address: u8, group: u8) -> Result<(), BridgeError> {
        let group = GroupId::new(group)?;
        let device = self.device_mut(address)?;
        device.add_to_group(group);
        let address = device.address();
        self.groups[group.index()].insert(address);
        info!("Assigned light {} to group {}", address, group);
        Ok(())
    }

    /// Remove a light from every group, returning the groups it left
    pub fn remove_from_all_groups(&mut self, address: u8) -> Result<Vec<GroupId>, BridgeError> {
        let device = self.device_mut(address)?;
        let address = device.address();
        let left = device.remove_from_all_groups();
        for members in self.groups.iter_mut() {
            members.remove(&address);
        }
        info!("Light {} removed from all groups", address);
        Ok(left.into_iter().collect())
    }

    /// Store a scene brightness on one light
    pub fn set_scene_brightness(
        &mut self,
        address: u8,
        scene: u8,
        value: u8,
    ) -> Result<(), BridgeError> {
        self.device_mut(address)?.set_scene_brightness(scene, value)
    }

    /// Most recently transmitted frame
    pub fn last_frame(&self) -> Option<&Frame> {
        self.last_frame.as_ref()
    }

    /// Send a raw command frame
    ///
    /// Absent devices and empty groups are reported in the outcome, never as
    /// errors.
    pub fn send_command(&mut self, address_byte: u8, command_byte: u8) -> DispatchReport {
        let target = AddressTarget::resolve(address_byte);
        let command = DaliCommand::from(command_byte);
        let frame = encode_frame_with(self.layout, address_byte, command_byte);
        self.dispatch(target, command, frame)
    }

    /// Send a command to one light
    ///
    /// Targets the device directly rather than through its address byte, so
    /// light 63 is not mistaken for a broadcast.
    pub fn send_command_to_light(
        &mut self,
        address: DaliAddress,
        command: DaliCommand,
    ) -> DispatchReport {
        let frame = encode_frame_with(self.layout, address.address_byte(), command.code());
        self.dispatch(AddressTarget::Individual(address.value()), command, frame)
    }

    /// Send a command to every light in a group
    pub fn send_command_to_group(
        &mut self,
        group: u8,
        command: DaliCommand,
    ) -> Result<DispatchReport, BridgeError> {
        let group = GroupId::new(group)?;
        let frame = encode_frame_with(self.layout, group.address_byte(), command.code());
        Ok(self.dispatch(AddressTarget::Group(group), command, frame))
    }

    /// Recall a scene on every light
    ///
    /// Not filtered by group: each light takes its own stored level.
    pub fn send_scene_command(&mut self, scene: u8) -> Result<DispatchReport, BridgeError> {
        let scene = SceneId::new(scene)?;
        let command = DaliCommand::GoToScene(scene);
        let frame = encode_frame_with(self.layout, BROADCAST_ADDRESS_BYTE, command.code());
        self.last_frame = Some(frame.clone());

        let updates: Vec<DeviceUpdate> = self
            .devices
            .values_mut()
            .map(|device| DeviceUpdate {
                address: device.address(),
                effect: device.recall_scene(scene),
            })
            .collect();

        let outcome = if updates.is_empty() {
            DispatchOutcome::NoDevices
        } else {
            DispatchOutcome::Applied(updates)
        };
        let report = DispatchReport {
            target: AddressTarget::Broadcast,
            command,
            frame,
            outcome,
        };
        info!("Scene {} recalled: {}", scene, report);
        Ok(report)
    }

    fn dispatch(
        &mut self,
        target: AddressTarget,
        command: DaliCommand,
        frame: Frame,
    ) -> DispatchReport {
        debug!("DALI frame {} ({})", frame.summary(), frame.encoded_bits);
        self.last_frame = Some(frame.clone());

        let addresses: Vec<DaliAddress> = match target {
            AddressTarget::Broadcast => self.devices.keys().copied().collect(),
            AddressTarget::Group(group) => self.groups[group.index()].iter().copied().collect(),
            AddressTarget::Individual(address) => DaliAddress::new(address as u16)
                .ok()
                .filter(|a| self.devices.contains_key(a))
                .into_iter()
                .collect(),
        };

        let outcome = if addresses.is_empty() {
            match target {
                AddressTarget::Broadcast => DispatchOutcome::NoDevices,
                AddressTarget::Group(group) => DispatchOutcome::EmptyGroup(group),
                AddressTarget::Individual(address) => DispatchOutcome::NoDevice(address),
            }
        } else if command == DaliCommand::Terminate {
            // Terminate reaches every light once any light receives it
            DispatchOutcome::Applied(
                self.devices
                    .values_mut()
                    .map(|device| DeviceUpdate {
                        address: device.address(),
                        effect: device.apply(DaliCommand::Terminate),
                    })
                    .collect(),
            )
        } else {
            let mut updates = Vec::with_capacity(addresses.len());
            for address in addresses {
                if let Some(device) = self.devices.get_mut(&address) {
                    updates.push(DeviceUpdate {
                        address,
                        effect: device.apply(command),
                    });
                }
            }
            DispatchOutcome::Applied(updates)
        };

        let report = DispatchReport {
            target,
            command,
            frame,
            outcome,
        };
        info!("{}", report);
        report
    }
}

impl Default for DaliBus {
    fn default() -> Self {
        Self::new()
    }
}
