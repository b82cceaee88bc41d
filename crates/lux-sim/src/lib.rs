//! DMX Universe Simulation Library
//!
//! This crate provides a simulation layer for running the DALI/DMX bridge
//! without DMX hardware or a network. It includes:
//!
//! - **VirtualUniverse**: an in-process [`UniverseTransport`] with injectable
//!   inbound frames, recorded outbound universes and switchable send failure
//!
//! # Example
//!
//! ```rust
//! use lux_protocol::UniverseTransport;
//! use lux_sim::VirtualUniverse;
//!
//! let transport = VirtualUniverse::new("Bench");
//! transport.register_receive(1, Box::new(|data| println!("Received {:?}", data)))?;
//!
//! // Queue a frame, then let the event loop deliver it and return
//! transport.inject(1, &[255, 128, 0])?;
//! transport.close();
//! transport.run_event_loop()?;
//! # Ok::<(), lux_protocol::TransportError>(())
//! ```
//!
//! [`UniverseTransport`]: lux_protocol::UniverseTransport

pub mod universe;

pub use universe::{
    SentUniverse, UniverseInjector, VirtualUniverse, VirtualUniverseConfig, DEFAULT_SENT_HISTORY,
};
