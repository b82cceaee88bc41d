//! Bridge engine
//!
//! The single owner of the address registry, the DALI bus and the DMX
//! buffer. Every operation either completes or returns an error with nothing
//! changed. Display and activity events are buffered and collected with
//! [`Bridge::drain_events`].

use lux_protocol::dmx::{describe_block, CHANNELS_PER_ADDRESS, UNIVERSE_SIZE};
use lux_protocol::{
    AddressTarget, ChannelRange, DaliAddress, DaliCommand, Frame, GroupId, Protocol,
};
use tracing::{debug, info};

use crate::bridge::{self, apply_dali_command_as_dmx};
use crate::bus::{DaliBus, DispatchReport};
use crate::config::BridgeConfig;
use crate::device::{CommandEffect, DaliDevice};
use crate::dmx::DmxBuffer;
use crate::error::BridgeError;
use crate::events::BridgeEvent;
use crate::ingest::{DrainSummary, UniverseIngestQueue};
use crate::registry::AddressRegistry;

/// Result of sending a command to an address of either protocol
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// Dispatched on the DALI bus
    Dali(DispatchReport),
    /// Translated onto a DMX channel block
    Dmx {
        /// The block that was written
        range: ChannelRange,
        /// Values written to the four channels
        values: [u8; CHANNELS_PER_ADDRESS],
    },
}

/// The bridge engine
pub struct Bridge {
    config: BridgeConfig,
    registry: AddressRegistry,
    bus: DaliBus,
    buffer: DmxBuffer,
    output_pending: bool,
    event_buffer: Vec<BridgeEvent>,
}

impl Bridge {
    /// Create a bridge with default configuration
    pub fn new() -> Self {
        Self::with_config(BridgeConfig::default())
    }

    /// Create with custom configuration
    pub fn with_config(config: BridgeConfig) -> Self {
        Self {
            bus: DaliBus::with_layout(config.framing),
            config,
            registry: AddressRegistry::new(),
            buffer: DmxBuffer::new(),
            output_pending: false,
            event_buffer: Vec::new(),
        }
    }

    /// Get the current configuration
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Address ownership
    pub fn registry(&self) -> &AddressRegistry {
        &self.registry
    }

    /// The DALI bus
    pub fn bus(&self) -> &DaliBus {
        &self.bus
    }

    /// The DMX buffer
    pub fn buffer(&self) -> &DmxBuffer {
        &self.buffer
    }

    /// Get a light by short address
    pub fn light(&self, address: u8) -> Option<&DaliDevice> {
        self.bus.device(address)
    }

    /// Most recently transmitted DALI frame
    pub fn last_frame(&self) -> Option<&Frame> {
        self.bus.last_frame()
    }

    // -------------------------------------------------------------------------
    // Assignment
    // -------------------------------------------------------------------------

    /// Create a DALI light, claiming its address for DALI
    ///
    /// Returns whether the light is new.
    pub fn create_light(&mut self, address: u16) -> Result<bool, BridgeError> {
        let dali = DaliAddress::new(address)?;
        self.registry.register(address, Protocol::Dali)?;
        let created = self.bus.create_light(address)?;
        if created {
            self.event_buffer.push(BridgeEvent::LightCreated {
                address: dali.value(),
            });
        }
        Ok(created)
    }

    /// Reserve the channel block for a DMX address
    pub fn assign_dmx(&mut self, address: u16) -> Result<ChannelRange, BridgeError> {
        let is_new = self.registry.owner(address).is_none();
        let range = bridge::assign_dmx(&mut self.registry, address)?;
        if is_new {
            self.event_buffer.push(BridgeEvent::DmxAssigned { range });
            self.event_buffer.push(BridgeEvent::log(format!(
                "DMX address {} assigned to {}",
                address, range
            )));
        }
        Ok(range)
    }

    /// Add a light to a group
    pub fn assign_light_to_group(&mut self, address: u8, group: u8) -> Result<(), BridgeError> {
        self.bus.assign_light_to_group(address, group)?;
        let group = GroupId::new(group)?;
        self.event_buffer
            .push(BridgeEvent::GroupAssigned { address, group });
        self.event_buffer.push(BridgeEvent::log(format!(
            "Assigned light {} to group {}",
            address, group
        )));
        Ok(())
    }

    /// Remove a light from every group
    pub fn remove_from_all_groups(&mut self, address: u8) -> Result<Vec<GroupId>, BridgeError> {
        let groups = self.bus.remove_from_all_groups(address)?;
        self.event_buffer.push(BridgeEvent::GroupsCleared {
            address,
            groups: groups.clone(),
        });
        self.event_buffer.push(BridgeEvent::log(format!(
            "Light {} removed from all groups",
            address
        )));
        Ok(groups)
    }

    /// Store a scene brightness on one light
    pub fn set_scene_brightness(
        &mut self,
        address: u8,
        scene: u8,
        value: u8,
    ) -> Result<(), BridgeError> {
        self.bus.set_scene_brightness(address, scene, value)?;
        self.event_buffer.push(BridgeEvent::log(format!(
            "Scene {} for light {} set to brightness {}",
            scene, address, value
        )));
        Ok(())
    }

    // -------------------------------------------------------------------------
    // DALI commands
    // -------------------------------------------------------------------------

    /// Send a raw DALI frame
    ///
    /// Individual frames aimed at a DMX-owned address are rejected before
    /// anything is transmitted.
    pub fn send_dali_command(
        &mut self,
        address_byte: u8,
        command_byte: u8,
    ) -> Result<DispatchReport, BridgeError> {
        if let AddressTarget::Individual(address) = AddressTarget::resolve(address_byte) {
            let address = address as u16;
            if !self.registry.is_free_for(address, Protocol::Dali) {
                return Err(BridgeError::AddressConflict {
                    address,
                    owner: Protocol::Dmx,
                    requested: Protocol::Dali,
                });
            }
        }
        let report = self.bus.send_command(address_byte, command_byte);
        self.record_dispatch(&report);
        Ok(report)
    }

    /// Send a command to every light in a group
    pub fn send_command_to_group(
        &mut self,
        group: u8,
        command: DaliCommand,
    ) -> Result<DispatchReport, BridgeError> {
        let report = self.bus.send_command_to_group(group, command)?;
        self.record_dispatch(&report);
        Ok(report)
    }

    /// Recall a scene on every light
    pub fn send_scene_command(&mut self, scene: u8) -> Result<DispatchReport, BridgeError> {
        let report = self.bus.send_scene_command(scene)?;
        self.record_dispatch(&report);
        Ok(report)
    }

    /// Claim an address for a protocol if needed, then send it a command
    ///
    /// DALI addresses get the light created and an individual frame sent.
    /// DMX addresses get the command translated onto each of their four
    /// channels.
    pub fn assign_and_send(
        &mut self,
        address: u16,
        protocol: Protocol,
        command: DaliCommand,
    ) -> Result<SendOutcome, BridgeError> {
        match protocol {
            Protocol::Dali => {
                let dali = DaliAddress::new(address)?;
                self.create_light(address)?;
                let report = self.bus.send_command_to_light(dali, command);
                self.record_dispatch(&report);
                Ok(SendOutcome::Dali(report))
            }
            Protocol::Dmx => {
                let range = self.assign_dmx(address)?;
                self.send_dmx_block(range, command)
            }
        }
    }

    /// Send a command to an address under whichever protocol owns it
    pub fn send_to_address(
        &mut self,
        address: u16,
        command: DaliCommand,
    ) -> Result<SendOutcome, BridgeError> {
        match self.registry.owner(address) {
            Some(protocol) => self.assign_and_send(address, protocol, command),
            None => Err(BridgeError::NotAssigned(address)),
        }
    }

    fn send_dmx_block(
        &mut self,
        range: ChannelRange,
        command: DaliCommand,
    ) -> Result<SendOutcome, BridgeError> {
        let mut values = [0u8; CHANNELS_PER_ADDRESS];
        for (slot, channel) in values.iter_mut().zip(range.channels()) {
            *slot = apply_dali_command_as_dmx(&self.buffer, command, channel)?;
        }
        for (&value, channel) in values.iter().zip(range.channels()) {
            self.write_channel(channel, value as i32)?;
        }
        debug!("{} on DMX address {}: {:?}", command, range.address, values);
        self.event_buffer.push(BridgeEvent::log(format!(
            "{} sent to DMX address {}",
            command, range.address
        )));
        self.event_buffer
            .push(BridgeEvent::log(describe_block(&range, &values)));
        Ok(SendOutcome::Dmx { range, values })
    }

    fn record_dispatch(&mut self, report: &DispatchReport) {
        self.event_buffer.push(BridgeEvent::FrameSent {
            frame: report.frame.clone(),
        });
        for update in report.updates() {
            match update.effect {
                CommandEffect::Level { to, .. } => {
                    self.event_buffer.push(BridgeEvent::LightLevel {
                        address: update.address.value(),
                        level: to,
                    });
                }
                CommandEffect::Reported(level) => {
                    self.event_buffer.push(BridgeEvent::log(format!(
                        "Light {} actual level: {}",
                        update.address, level
                    )));
                }
                CommandEffect::Acknowledged | CommandEffect::Unknown(_) => {}
            }
        }
        self.event_buffer
            .push(BridgeEvent::log(report.frame.to_string()));
        self.event_buffer.push(BridgeEvent::log(report.to_string()));
    }

    // -------------------------------------------------------------------------
    // DMX channels
    // -------------------------------------------------------------------------

    /// Read one DMX channel
    pub fn read_channel(&self, channel: usize) -> Result<u8, BridgeError> {
        self.buffer.read(channel)
    }

    /// Write one DMX channel, clamped to 0-255
    ///
    /// Returns whether the value changed.
    pub fn set_channel(&mut self, channel: usize, value: i32) -> Result<bool, BridgeError> {
        let changed = self.write_channel(channel, value)?;
        let description = self.buffer.describe(channel)?;
        self.event_buffer.push(BridgeEvent::log(description));
        Ok(changed)
    }

    fn write_channel(&mut self, channel: usize, value: i32) -> Result<bool, BridgeError> {
        let changed = self.buffer.write(channel, value)?;
        if changed {
            let value = self.buffer.read(channel)?;
            self.event_buffer
                .push(BridgeEvent::ChannelChanged { channel, value });
            if self.config.send_on_change {
                self.output_pending = true;
            }
        }
        Ok(changed)
    }

    /// Overwrite channels `0..values.len()` with a received universe
    ///
    /// Received data is never echoed back out. Returns the number of
    /// channels that changed.
    pub fn apply_snapshot(&mut self, values: &[u8]) -> usize {
        let changed = self.buffer.apply_snapshot(values);
        let count = changed.len();
        self.push_channel_changes(changed);
        count
    }

    /// Drain the ingest queue into the buffer
    pub fn ingest(&mut self, queue: &mut UniverseIngestQueue) -> DrainSummary {
        let summary = queue.drain_into(&mut self.buffer);
        self.record_ingest(&summary);
        summary
    }

    /// Apply a snapshot already taken off the queue, then drain the rest
    pub fn ingest_from(&mut self, queue: &mut UniverseIngestQueue, first: &[u8]) -> DrainSummary {
        let summary = queue.apply_and_drain(&mut self.buffer, first);
        self.record_ingest(&summary);
        summary
    }

    fn record_ingest(&mut self, summary: &DrainSummary) {
        if summary.is_empty() {
            return;
        }
        debug!(
            "Ingested {} universe snapshot(s), {} channel(s) changed",
            summary.snapshots,
            summary.changed.len()
        );
        self.push_channel_changes(summary.changed.iter().map(|(&c, &v)| (c, v)));
    }

    fn push_channel_changes(&mut self, changed: impl IntoIterator<Item = (usize, u8)>) {
        self.event_buffer.extend(
            changed
                .into_iter()
                .map(|(channel, value)| BridgeEvent::ChannelChanged { channel, value }),
        );
    }

    // -------------------------------------------------------------------------
    // Output and events
    // -------------------------------------------------------------------------

    /// Mark the universe for output regardless of `send_on_change`
    pub fn request_output(&mut self) {
        self.output_pending = true;
    }

    /// Whether a universe send is pending
    pub fn output_pending(&self) -> bool {
        self.output_pending
    }

    /// Take the universe to send, if a send is pending
    pub fn take_output(&mut self) -> Option<[u8; UNIVERSE_SIZE]> {
        if !self.output_pending {
            return None;
        }
        self.output_pending = false;
        info!("Sending universe {}", self.config.universe);
        Some(*self.buffer.as_array())
    }

    /// Drain buffered events
    pub fn drain_events(&mut self) -> Vec<BridgeEvent> {
        std::mem::take(&mut self.event_buffer)
    }
}

impl Default for Bridge {
    fn default() -> Self {
        Self::new()
    }
}
