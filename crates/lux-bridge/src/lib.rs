//! DALI/DMX Bridge Engine
//!
//! This crate provides the core bridge logic: one shared address space in
//! which every address belongs to a DALI ballast or to a block of four DMX
//! channels, never both.
//!
//! # Architecture
//!
//! - [`AddressRegistry`] is the sole gate deciding which protocol owns an
//!   address
//! - [`DaliBus`] owns the DALI devices and group table and dispatches
//!   commands by broadcast, group or individual address
//! - [`DmxBuffer`] is the 512-channel universe of record
//! - [`Bridge`] owns all three and translates DALI commands onto DMX blocks
//!
//! # Threading
//!
//! The universe transport's receive loop runs on its own thread
//! ([`spawn_universe_listener`]) and only pushes into a
//! [`UniverseIngestQueue`]. The [`run_bridge_actor`] task owns the engine,
//! drains the queue on arrival and on a fixed cadence, and emits everything
//! through a unified [`BridgeEvent`] stream.
//!
//! # Example
//!
//! ```rust,no_run
//! use lux_bridge::Bridge;
//! use lux_protocol::{DaliCommand, Protocol};
//!
//! let mut bridge = Bridge::new();
//! bridge.create_light(3)?;
//! bridge.assign_dmx(4)?;
//!
//! // Up on a DMX address raises all four of its channels
//! bridge.send_to_address(4, DaliCommand::Up)?;
//! assert_eq!(bridge.read_channel(12)?, 25);
//!
//! // DALI never gets an address DMX already holds
//! assert!(bridge.assign_and_send(4, Protocol::Dali, DaliCommand::Up).is_err());
//! # Ok::<(), lux_bridge::BridgeError>(())
//! ```

pub mod actor;
pub mod bridge;
pub mod bus;
pub mod config;
pub mod device;
pub mod dmx;
pub mod engine;
pub mod error;
pub mod events;
pub mod ingest;
pub mod listener;
pub mod registry;

// Re-export actor types
pub use actor::{run_bridge_actor, BridgeActorCommand, BridgeHandle, LightSummary};

// Re-export event types
pub use events::BridgeEvent;

// Re-export engine types
pub use bridge::{apply_dali_command_as_dmx, assign_dmx, translate_command_to_level};
pub use bus::{DaliBus, DeviceUpdate, DispatchOutcome, DispatchReport};
pub use config::BridgeConfig;
pub use device::{CommandEffect, DaliDevice};
pub use dmx::DmxBuffer;
pub use engine::{Bridge, SendOutcome};
pub use error::BridgeError;
pub use ingest::{DrainSummary, UniverseIngestQueue, UniverseIngestSender};
pub use listener::spawn_universe_listener;
pub use registry::AddressRegistry;
