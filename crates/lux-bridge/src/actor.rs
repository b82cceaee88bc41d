//! Bridge Actor
//!
//! This module provides the async actor that owns the [`Bridge`] engine. It
//! is the consumer side of the ingest queue: received universes are applied
//! to the DMX buffer here and nowhere else, and the registry and bus are only
//! mutated from this task.
//!
//! # Architecture
//!
//! The actor receives commands through a channel and emits events through
//! another. It wakes on three things:
//! - a control command (create light, assign DMX, send command, ...)
//! - a snapshot arriving on the ingest queue
//! - a fixed drain cadence, so nothing waits longer than one interval
//!
//! DMX output is fire-and-forget. A failed send is logged and reported as
//! [`BridgeEvent::Error`]; it is never retried and the buffer is not touched.
//!
//! # Example
//!
//! ```rust,ignore
//! use lux_bridge::actor::{run_bridge_actor, BridgeHandle};
//! use lux_bridge::{BridgeConfig, UniverseIngestQueue};
//! use tokio::sync::mpsc;
//!
//! let (cmd_tx, cmd_rx) = mpsc::channel(256);
//! let (event_tx, mut event_rx) = mpsc::channel(256);
//! let (ingest_tx, ingest) = UniverseIngestQueue::channel();
//!
//! tokio::spawn(run_bridge_actor(cmd_rx, ingest, transport, event_tx, BridgeConfig::default()));
//!
//! let bridge = BridgeHandle::new(cmd_tx);
//! bridge.create_light(3).await?;
//! ```

use std::sync::Arc;

use lux_protocol::{ChannelRange, DaliCommand, GroupId, Protocol, UniverseTransport};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::bus::DispatchReport;
use crate::config::BridgeConfig;
use crate::device::DaliDevice;
use crate::engine::{Bridge, SendOutcome};
use crate::error::BridgeError;
use crate::events::BridgeEvent;
use crate::ingest::UniverseIngestQueue;

type Reply<T> = oneshot::Sender<Result<T, BridgeError>>;

/// Snapshot of a light's state that can be sent across channels
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LightSummary {
    /// Short address
    pub address: u8,
    /// Current brightness
    pub brightness: u8,
    /// Groups the light belongs to, ascending
    pub groups: Vec<GroupId>,
}

impl LightSummary {
    /// Create from a device
    pub fn from_device(device: &DaliDevice) -> Self {
        Self {
            address: device.address().value(),
            brightness: device.brightness(),
            groups: device.groups().iter().copied().collect(),
        }
    }
}

/// Commands sent to the bridge actor
#[derive(Debug)]
pub enum BridgeActorCommand {
    /// Create a DALI light
    CreateLight {
        /// Short address (0-63)
        address: u16,
        /// Whether the light is new
        response: Reply<bool>,
    },

    /// Reserve a DMX channel block
    AssignDmx {
        /// DMX address (1-128)
        address: u16,
        /// The reserved block
        response: Reply<ChannelRange>,
    },

    /// Send a raw DALI frame
    SendDaliCommand {
        /// Raw address byte
        address_byte: u8,
        /// Raw command byte
        command_byte: u8,
        /// What the dispatch did
        response: Reply<DispatchReport>,
    },

    /// Send a command to a group
    SendGroupCommand {
        /// Group (0-15)
        group: u8,
        /// Command to send
        command: DaliCommand,
        /// What the dispatch did
        response: Reply<DispatchReport>,
    },

    /// Recall a scene on every light
    SendSceneCommand {
        /// Scene (0-15)
        scene: u8,
        /// What the dispatch did
        response: Reply<DispatchReport>,
    },

    /// Add a light to a group
    AssignLightToGroup {
        /// Short address
        address: u8,
        /// Group (0-15)
        group: u8,
        /// Completion
        response: Reply<()>,
    },

    /// Remove a light from every group
    RemoveFromAllGroups {
        /// Short address
        address: u8,
        /// Groups the light left
        response: Reply<Vec<GroupId>>,
    },

    /// Store a scene brightness on one light
    SetSceneBrightness {
        /// Short address
        address: u8,
        /// Scene (0-15)
        scene: u8,
        /// Stored brightness
        value: u8,
        /// Completion
        response: Reply<()>,
    },

    /// Claim an address for a protocol if needed and send it a command
    AssignAndSend {
        /// Shared address
        address: u16,
        /// Protocol to claim it for
        protocol: Protocol,
        /// Command to send
        command: DaliCommand,
        /// What was sent
        response: Reply<SendOutcome>,
    },

    /// Send a command under whichever protocol owns the address
    SendToAddress {
        /// Shared address
        address: u16,
        /// Command to send
        command: DaliCommand,
        /// What was sent
        response: Reply<SendOutcome>,
    },

    /// Write one DMX channel
    SetChannel {
        /// Channel (0-511)
        channel: usize,
        /// Value, clamped to 0-255
        value: i32,
        /// Whether the value changed
        response: Reply<bool>,
    },

    /// Read one DMX channel
    QueryChannel {
        /// Channel (0-511)
        channel: usize,
        /// Current value
        response: Reply<u8>,
    },

    /// Query the state of a light
    QueryLight {
        /// Short address
        address: u8,
        /// The light's state (or None if not found)
        response: oneshot::Sender<Option<LightSummary>>,
    },

    /// Send the universe now regardless of `send_on_change`
    FlushOutput,

    /// Report an error from another task (emits BridgeEvent::Error)
    ReportError {
        /// Source of the error (e.g., "Transport", "Listener")
        source: String,
        /// Error message
        message: String,
    },

    /// Shutdown the actor
    Shutdown,
}

/// Run the bridge actor
///
/// Returns when a `Shutdown` command arrives or every command sender is
/// dropped. The ingest queue closing (listener gone) does not stop the
/// actor.
pub async fn run_bridge_actor(
    mut cmd_rx: mpsc::Receiver<BridgeActorCommand>,
    mut ingest: UniverseIngestQueue,
    transport: Arc<dyn UniverseTransport>,
    event_tx: mpsc::Sender<BridgeEvent>,
    config: BridgeConfig,
) {
    let mut drain_timer = interval(config.drain_interval());
    drain_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut bridge = Bridge::with_config(config);
    let mut ingest_open = true;
    info!(
        "Bridge actor started on universe {}",
        bridge.config().universe
    );

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                let Some(cmd) = cmd else { break; };
                if matches!(cmd, BridgeActorCommand::Shutdown) {
                    info!("Bridge actor shutting down");
                    break;
                }
                handle_command(&mut bridge, &event_tx, cmd).await;
            }

            snapshot = ingest.recv(), if ingest_open => {
                match snapshot {
                    Some(first) => {
                        bridge.ingest_from(&mut ingest, &first);
                    }
                    None => {
                        debug!("Ingest queue closed");
                        ingest_open = false;
                    }
                }
            }

            _ = drain_timer.tick() => {
                bridge.ingest(&mut ingest);
            }
        }

        send_output(&mut bridge, transport.as_ref(), &event_tx).await;
        for event in bridge.drain_events() {
            let _ = event_tx.send(event).await;
        }
    }

    info!("Bridge actor stopped");
}

async fn handle_command(
    bridge: &mut Bridge,
    event_tx: &mpsc::Sender<BridgeEvent>,
    cmd: BridgeActorCommand,
) {
    match cmd {
        BridgeActorCommand::CreateLight { address, response } => {
            let _ = response.send(bridge.create_light(address));
        }

        BridgeActorCommand::AssignDmx { address, response } => {
            let _ = response.send(bridge.assign_dmx(address));
        }

        BridgeActorCommand::SendDaliCommand {
            address_byte,
            command_byte,
            response,
        } => {
            let _ = response.send(bridge.send_dali_command(address_byte, command_byte));
        }

        BridgeActorCommand::SendGroupCommand {
            group,
            command,
            response,
        } => {
            let _ = response.send(bridge.send_command_to_group(group, command));
        }

        BridgeActorCommand::SendSceneCommand { scene, response } => {
            let _ = response.send(bridge.send_scene_command(scene));
        }

        BridgeActorCommand::AssignLightToGroup {
            address,
            group,
            response,
        } => {
            let _ = response.send(bridge.assign_light_to_group(address, group));
        }

        BridgeActorCommand::RemoveFromAllGroups { address, response } => {
            let _ = response.send(bridge.remove_from_all_groups(address));
        }

        BridgeActorCommand::SetSceneBrightness {
            address,
            scene,
            value,
            response,
        } => {
            let _ = response.send(bridge.set_scene_brightness(address, scene, value));
        }

        BridgeActorCommand::AssignAndSend {
            address,
            protocol,
            command,
            response,
        } => {
            let _ = response.send(bridge.assign_and_send(address, protocol, command));
        }

        BridgeActorCommand::SendToAddress {
            address,
            command,
            response,
        } => {
            let _ = response.send(bridge.send_to_address(address, command));
        }

        BridgeActorCommand::SetChannel {
            channel,
            value,
            response,
        } => {
            let _ = response.send(bridge.set_channel(channel, value));
        }

        BridgeActorCommand::QueryChannel { channel, response } => {
            let _ = response.send(bridge.read_channel(channel));
        }

        BridgeActorCommand::QueryLight { address, response } => {
            let _ = response.send(bridge.light(address).map(LightSummary::from_device));
        }

        BridgeActorCommand::FlushOutput => bridge.request_output(),

        BridgeActorCommand::ReportError { source, message } => {
            warn!("{}: {}", source, message);
            let _ = event_tx.send(BridgeEvent::Error { source, message }).await;
        }

        BridgeActorCommand::Shutdown => {}
    }
}

/// Hand the universe to the transport if a send is pending
///
/// The completion callback runs on the transport's context, so it can only
/// log and `try_send` the failure.
async fn send_output(
    bridge: &mut Bridge,
    transport: &dyn UniverseTransport,
    event_tx: &mpsc::Sender<BridgeEvent>,
) {
    let Some(data) = bridge.take_output() else {
        return;
    };
    let universe = bridge.config().universe;
    let error_tx = event_tx.clone();

    transport.send_dmx(
        universe,
        &data,
        Box::new(move |result| match result {
            Ok(()) => debug!("Universe {} sent", universe),
            Err(e) => {
                warn!("DMX send failed: {}", e);
                let _ = error_tx.try_send(BridgeEvent::Error {
                    source: "Transport".to_string(),
                    message: e.to_string(),
                });
            }
        }),
    );

    let _ = event_tx.send(BridgeEvent::DmxOutput { universe }).await;
}

/// Cloneable client for a running bridge actor
///
/// Every call fails with [`BridgeError::ActorUnavailable`] once the actor
/// has stopped.
#[derive(Debug, Clone)]
pub struct BridgeHandle {
    cmd_tx: mpsc::Sender<BridgeActorCommand>,
}

impl BridgeHandle {
    /// Wrap the actor's command sender
    pub fn new(cmd_tx: mpsc::Sender<BridgeActorCommand>) -> Self {
        Self { cmd_tx }
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(Reply<T>) -> BridgeActorCommand,
    ) -> Result<T, BridgeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(build(tx))
            .await
            .map_err(|_| BridgeError::ActorUnavailable)?;
        rx.await.map_err(|_| BridgeError::ActorUnavailable)?
    }

    async fn notify(&self, cmd: BridgeActorCommand) -> Result<(), BridgeError> {
        self.cmd_tx
            .send(cmd)
            .await
            .map_err(|_| BridgeError::ActorUnavailable)
    }

    /// Create a DALI light
    pub async fn create_light(&self, address: u16) -> Result<bool, BridgeError> {
        self.request(|response| BridgeActorCommand::CreateLight { address, response })
            .await
    }

    /// Reserve a DMX channel block
    pub async fn assign_dmx(&self, address: u16) -> Result<ChannelRange, BridgeError> {
        self.request(|response| BridgeActorCommand::AssignDmx { address, response })
            .await
    }

    /// Send a raw DALI frame
    pub async fn send_dali_command(
        &self,
        address_byte: u8,
        command_byte: u8,
    ) -> Result<DispatchReport, BridgeError> {
        self.request(|response| BridgeActorCommand::SendDaliCommand {
            address_byte,
            command_byte,
            response,
        })
        .await
    }

    /// Send a command to a group
    pub async fn send_command_to_group(
        &self,
        group: u8,
        command: DaliCommand,
    ) -> Result<DispatchReport, BridgeError> {
        self.request(|response| BridgeActorCommand::SendGroupCommand {
            group,
            command,
            response,
        })
        .await
    }

    /// Recall a scene on every light
    pub async fn send_scene_command(&self, scene: u8) -> Result<DispatchReport, BridgeError> {
        self.request(|response| BridgeActorCommand::SendSceneCommand { scene, response })
            .await
    }

    /// Add a light to a group
    pub async fn assign_light_to_group(&self, address: u8, group: u8) -> Result<(), BridgeError> {
        self.request(|response| BridgeActorCommand::AssignLightToGroup {
            address,
            group,
            response,
        })
        .await
    }

    /// Remove a light from every group
    pub async fn remove_from_all_groups(&self, address: u8) -> Result<Vec<GroupId>, BridgeError> {
        self.request(|response| BridgeActorCommand::RemoveFromAllGroups { address, response })
            .await
    }

    /// Store a scene brightness on one light
    pub async fn set_scene_brightness(
        &self,
        address: u8,
        scene: u8,
        value: u8,
    ) -> Result<(), BridgeError> {
        self.request(|response| BridgeActorCommand::SetSceneBrightness {
            address,
            scene,
            value,
            response,
        })
        .await
    }

    /// Claim an address for a protocol if needed and send it a command
    pub async fn assign_and_send(
        &self,
        address: u16,
        protocol: Protocol,
        command: DaliCommand,
    ) -> Result<SendOutcome, BridgeError> {
        self.request(|response| BridgeActorCommand::AssignAndSend {
            address,
            protocol,
            command,
            response,
        })
        .await
    }

    /// Send a command under whichever protocol owns the address
    pub async fn send_to_address(
        &self,
        address: u16,
        command: DaliCommand,
    ) -> Result<SendOutcome, BridgeError> {
        self.request(|response| BridgeActorCommand::SendToAddress {
            address,
            command,
            response,
        })
        .await
    }

    /// Write one DMX channel
    pub async fn set_channel(&self, channel: usize, value: i32) -> Result<bool, BridgeError> {
        self.request(|response| BridgeActorCommand::SetChannel {
            channel,
            value,
            response,
        })
        .await
    }

    /// Read one DMX channel
    pub async fn read_channel(&self, channel: usize) -> Result<u8, BridgeError> {
        self.request(|response| BridgeActorCommand::QueryChannel { channel, response })
            .await
    }

    /// Query the state of a light
    pub async fn light(&self, address: u8) -> Result<Option<LightSummary>, BridgeError> {
        let (tx, rx) = oneshot::channel();
        self.notify(BridgeActorCommand::QueryLight {
            address,
            response: tx,
        })
        .await?;
        rx.await.map_err(|_| BridgeError::ActorUnavailable)
    }

    /// Send the universe now
    pub async fn flush_output(&self) -> Result<(), BridgeError> {
        self.notify(BridgeActorCommand::FlushOutput).await
    }

    /// Report an error from another task
    pub async fn report_error(
        &self,
        source: impl Into<String>,
        message: impl Into<String>,
    ) -> Result<(), BridgeError> {
        self.notify(BridgeActorCommand::ReportError {
            source: source.into(),
            message: message.into(),
        })
        .await
    }

    /// Stop the actor
    pub async fn shutdown(&self) -> Result<(), BridgeError> {
        self.notify(BridgeActorCommand::Shutdown).await
    }
}
