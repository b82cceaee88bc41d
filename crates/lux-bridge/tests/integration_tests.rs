//! Integration tests for the DALI/DMX bridge
//!
//! These tests verify end-to-end behavior of the bridge including:
//! - Address ownership between DALI and DMX
//! - DALI addressing (broadcast, group, individual) and command semantics
//! - DALI commands translated onto DMX channel blocks
//! - Universe ingest from the listener thread through the actor
//! - DMX output and transport failure reporting

use lux_bridge::{
    AddressRegistry, Bridge, BridgeConfig, BridgeError, BridgeEvent, DaliBus, DispatchOutcome,
    DmxBuffer, SendOutcome, UniverseIngestQueue,
};
use lux_protocol::{encode_frame, ChannelRange, DaliCommand, GroupId, Protocol};

// ============================================================================
// Helper Functions
// ============================================================================

mod helpers {
    use super::*;

    use std::sync::Arc;
    use std::time::Duration;

    use lux_bridge::{run_bridge_actor, spawn_universe_listener, BridgeHandle};
    use lux_protocol::UniverseTransport;
    use lux_sim::VirtualUniverse;
    use tokio::sync::mpsc;
    use tokio::task::JoinHandle;

    /// Create a bus with lights at the given addresses
    pub fn bus_with_lights(addresses: &[u16]) -> DaliBus {
        let mut bus = DaliBus::new();
        for &address in addresses {
            bus.create_light(address).unwrap();
        }
        bus
    }

    /// Brightness of a light on a bus
    pub fn level(bus: &DaliBus, address: u8) -> u8 {
        bus.device(address).unwrap().brightness()
    }

    /// Check if events contain a display update for a light
    pub fn has_light_level(events: &[BridgeEvent], address: u8, level: u8) -> bool {
        events.iter().any(|e| {
            matches!(
                e,
                BridgeEvent::LightLevel { address: a, level: l } if *a == address && *l == level
            )
        })
    }

    /// A running actor wired to a virtual transport and listener thread
    pub struct Harness {
        pub bridge: BridgeHandle,
        pub events: mpsc::Receiver<BridgeEvent>,
        pub transport: Arc<VirtualUniverse>,
        pub actor: JoinHandle<()>,
        pub listener: std::thread::JoinHandle<()>,
    }

    impl Harness {
        /// Stop the actor and the listener thread
        pub async fn stop(self) {
            self.bridge.shutdown().await.unwrap();
            self.actor.await.unwrap();
            self.transport.close();
            self.listener.join().unwrap();
        }
    }

    /// Start an actor with a generous event buffer so tests never block it
    pub fn start_bridge(config: BridgeConfig) -> Harness {
        let transport = Arc::new(VirtualUniverse::new("test"));
        let dyn_transport: Arc<dyn UniverseTransport> = transport.clone();

        let (ingest_tx, ingest) = UniverseIngestQueue::channel();
        let listener =
            spawn_universe_listener(Arc::clone(&dyn_transport), config.universe, ingest_tx)
                .unwrap();

        let (cmd_tx, cmd_rx) = mpsc::channel(64);
        let (event_tx, events) = mpsc::channel(4096);
        let actor = tokio::spawn(run_bridge_actor(
            cmd_rx,
            ingest,
            dyn_transport,
            event_tx,
            config,
        ));

        Harness {
            bridge: BridgeHandle::new(cmd_tx),
            events,
            transport,
            actor,
            listener,
        }
    }

    /// Poll a channel until it holds `value`
    pub async fn wait_for_channel(bridge: &BridgeHandle, channel: usize, value: u8) {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if bridge.read_channel(channel).await.unwrap() == value {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap_or_else(|_| panic!("channel {} never reached {}", channel, value));
    }

    /// Receive events until one matches
    pub async fn wait_for_event(
        events: &mut mpsc::Receiver<BridgeEvent>,
        predicate: impl Fn(&BridgeEvent) -> bool,
    ) -> BridgeEvent {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let event = events.recv().await.expect("event channel closed");
                if predicate(&event) {
                    return event;
                }
            }
        })
        .await
        .expect("expected event never arrived")
    }
}

// ============================================================================
// Concrete Scenarios
// ============================================================================

mod scenario_tests {
    use super::*;

    #[test]
    fn dali_then_dmx_registration_conflicts() {
        let mut registry = AddressRegistry::new();
        registry.register(5, Protocol::Dali).unwrap();

        assert_eq!(
            registry.register(5, Protocol::Dmx),
            Err(BridgeError::AddressConflict {
                address: 5,
                owner: Protocol::Dali,
                requested: Protocol::Dmx,
            })
        );
    }

    #[test]
    fn up_three_times_then_down_five_times() {
        let mut bus = helpers::bus_with_lights(&[3]);
        for _ in 0..3 {
            bus.send_command(3 << 1, DaliCommand::Up.code());
        }
        assert_eq!(helpers::level(&bus, 3), 30);

        for _ in 0..5 {
            bus.send_command(3 << 1, DaliCommand::Down.code());
        }
        assert_eq!(helpers::level(&bus, 3), 0);
    }

    #[test]
    fn frame_fields_and_payload() {
        let frame = encode_frame(0x02, 0x01);

        assert_eq!(frame.address_field, "000001");
        assert_eq!(frame.command_field, "00000001");
        assert_eq!(frame.encoded_bits.len(), 32);
        assert!(frame.encoded_bits.starts_with("01"));
    }

    #[test]
    fn partial_snapshot_on_fresh_buffer() {
        let mut buffer = DmxBuffer::new();
        buffer.apply_snapshot(&[10, 20, 30]);

        assert_eq!(buffer.read(0), Ok(10));
        assert_eq!(buffer.read(1), Ok(20));
        assert_eq!(buffer.read(2), Ok(30));
        assert_eq!(buffer.read(3), Ok(0));
    }
}

// ============================================================================
// Addressing Tests
// ============================================================================

mod addressing_tests {
    use super::*;

    #[test]
    fn broadcast_reaches_every_light() {
        let mut bus = helpers::bus_with_lights(&[0, 31, 63]);
        let report = bus.send_command(0x7F, DaliCommand::MaxLevel.code());

        assert_eq!(report.updates().len(), 3);
        assert!(bus.devices().all(|d| d.brightness() == 255));
    }

    #[test]
    fn group_reaches_members_only() {
        let mut bus = helpers::bus_with_lights(&[1, 2, 3]);
        bus.assign_light_to_group(2, 15).unwrap();

        bus.send_command(0x80 | (15 << 1), DaliCommand::MaxLevel.code());

        assert_eq!(helpers::level(&bus, 1), 0);
        assert_eq!(helpers::level(&bus, 2), 255);
        assert_eq!(helpers::level(&bus, 3), 0);
    }

    #[test]
    fn removed_light_no_longer_reached_by_group() {
        let mut bus = helpers::bus_with_lights(&[4]);
        bus.assign_light_to_group(4, 0).unwrap();
        bus.remove_from_all_groups(4).unwrap();

        let report = bus.send_command_to_group(0, DaliCommand::Up).unwrap();

        assert_eq!(
            report.outcome,
            DispatchOutcome::EmptyGroup(GroupId::new(0).unwrap())
        );
        assert_eq!(helpers::level(&bus, 4), 0);
    }

    #[test]
    fn missing_light_is_a_report_not_an_error() {
        let mut bus = helpers::bus_with_lights(&[1]);
        let report = bus.send_command(20 << 1, DaliCommand::Up.code());

        assert_eq!(report.outcome, DispatchOutcome::NoDevice(20));
        assert_eq!(bus.last_frame().unwrap().address_byte, 40);
    }

    #[test]
    fn terminate_darkens_lights_outside_the_target() {
        let mut bus = helpers::bus_with_lights(&[1, 2, 3]);
        bus.send_command(0x7E, DaliCommand::MaxLevel.code());
        bus.assign_light_to_group(1, 3).unwrap();

        bus.send_command_to_group(3, DaliCommand::Terminate).unwrap();

        assert!(bus.devices().all(|d| d.brightness() == 0));
    }

    #[test]
    fn scene_recall_uses_each_lights_own_level() {
        let mut bridge = Bridge::new();
        bridge.create_light(1).unwrap();
        bridge.create_light(2).unwrap();
        bridge.set_scene_brightness(1, 0, 200).unwrap();

        bridge.send_scene_command(0).unwrap();

        assert_eq!(bridge.light(1).unwrap().brightness(), 200);
        assert_eq!(bridge.light(2).unwrap().brightness(), 0);
        let events = bridge.drain_events();
        assert!(helpers::has_light_level(&events, 1, 200));
        assert!(helpers::has_light_level(&events, 2, 0));
    }
}

// ============================================================================
// Bridging Tests
// ============================================================================

mod bridging_tests {
    use super::*;

    #[test]
    fn dmx_block_takes_translated_levels() {
        let mut bridge = Bridge::new();
        bridge.assign_dmx(1).unwrap();

        bridge.send_to_address(1, DaliCommand::MaxLevel).unwrap();
        let outcome = bridge.send_to_address(1, DaliCommand::Down).unwrap();

        assert_eq!(
            outcome,
            SendOutcome::Dmx {
                range: ChannelRange::for_address(1).unwrap(),
                values: [230; 4],
            }
        );
        bridge.send_to_address(1, DaliCommand::MinLevel).unwrap();
        assert_eq!(bridge.read_channel(0), Ok(26));
        assert_eq!(bridge.read_channel(3), Ok(26));
        assert_eq!(bridge.read_channel(4), Ok(0));
    }

    #[test]
    fn dali_cannot_touch_dmx_addresses() {
        let mut bridge = Bridge::new();
        bridge.assign_dmx(10).unwrap();

        assert!(bridge
            .assign_and_send(10, Protocol::Dali, DaliCommand::Up)
            .is_err());
        assert!(bridge
            .send_dali_command(10 << 1, DaliCommand::Up.code())
            .is_err());
        assert_eq!(bridge.registry().owner(10), Some(Protocol::Dmx));
        assert!(bridge.light(10).is_none());
    }

    #[test]
    fn last_dmx_address_fits_the_universe() {
        let mut bridge = Bridge::new();
        let range = bridge.assign_dmx(128).unwrap();

        assert_eq!(range.channels(), 508..512);
        assert!(matches!(
            bridge.assign_dmx(129),
            Err(BridgeError::OutOfRange(_))
        ));
    }

    #[test]
    fn unassigned_address_is_rejected() {
        let mut bridge = Bridge::new();
        assert_eq!(
            bridge.send_to_address(42, DaliCommand::Off),
            Err(BridgeError::NotAssigned(42))
        );
    }

    #[test]
    fn ingest_queue_feeds_the_engine() {
        let (tx, mut queue) = UniverseIngestQueue::channel();
        let mut bridge = Bridge::new();
        bridge.set_channel(5, 77).unwrap();
        bridge.take_output();

        tx.push(&[1, 2, 3]);
        tx.push(&[4]);
        let summary = bridge.ingest(&mut queue);

        assert_eq!(summary.snapshots, 2);
        assert_eq!(bridge.read_channel(0), Ok(4));
        assert_eq!(bridge.read_channel(2), Ok(3));
        assert_eq!(bridge.read_channel(5), Ok(77));
        assert!(!bridge.output_pending());
    }
}

// ============================================================================
// Actor Tests
// ============================================================================

mod actor_tests {
    use super::*;
    use lux_protocol::dmx::UNIVERSE_SIZE;

    #[tokio::test]
    async fn received_universe_reaches_buffer() {
        let harness = helpers::start_bridge(BridgeConfig::default());

        harness.transport.inject(1, &[10, 20, 30]).unwrap();
        helpers::wait_for_channel(&harness.bridge, 2, 30).await;

        assert_eq!(harness.bridge.read_channel(0).await, Ok(10));
        assert_eq!(harness.bridge.read_channel(3).await, Ok(0));
        // Received data is not echoed back out
        assert_eq!(harness.transport.sent_count(), 0);

        harness.stop().await;
    }

    #[tokio::test]
    async fn other_universes_are_ignored() {
        let harness = helpers::start_bridge(BridgeConfig::default());

        harness.transport.inject(2, &[99]).unwrap();
        harness.transport.inject(1, &[0, 5]).unwrap();
        helpers::wait_for_channel(&harness.bridge, 1, 5).await;

        assert_eq!(harness.bridge.read_channel(0).await, Ok(0));
        harness.stop().await;
    }

    #[tokio::test]
    async fn snapshots_apply_in_arrival_order() {
        let harness = helpers::start_bridge(BridgeConfig::default());

        for value in 1..=20u8 {
            harness.transport.inject(1, &[value, value]).unwrap();
        }
        harness.transport.inject(1, &[100]).unwrap();
        helpers::wait_for_channel(&harness.bridge, 0, 100).await;

        assert_eq!(harness.bridge.read_channel(1).await, Ok(20));
        harness.stop().await;
    }

    #[tokio::test]
    async fn dmx_command_is_sent_to_transport() {
        let harness = helpers::start_bridge(BridgeConfig {
            universe: 3,
            ..Default::default()
        });

        harness
            .bridge
            .assign_and_send(3, Protocol::Dmx, DaliCommand::MaxLevel)
            .await
            .unwrap();
        // Output happens before the next command is handled
        harness.bridge.read_channel(0).await.unwrap();

        let sent = harness.transport.last_sent().unwrap();
        assert_eq!(sent.universe, 3);
        assert_eq!(sent.data.len(), UNIVERSE_SIZE);
        assert_eq!(&sent.data[8..12], &[255, 255, 255, 255]);
        assert_eq!(sent.data[12], 0);

        harness.stop().await;
    }

    #[tokio::test]
    async fn failed_send_is_reported_not_retried() {
        let mut harness = helpers::start_bridge(BridgeConfig::default());
        harness.transport.set_fail_sends(true);

        harness.bridge.set_channel(0, 42).await.unwrap();
        let event = helpers::wait_for_event(&mut harness.events, |e| {
            matches!(e, BridgeEvent::Error { .. })
        })
        .await;

        match event {
            BridgeEvent::Error { source, message } => {
                assert_eq!(source, "Transport");
                assert!(message.contains("simulated failure"));
            }
            other => panic!("Expected Error event, got {:?}", other),
        }
        assert_eq!(harness.transport.sent_count(), 1);
        assert_eq!(harness.bridge.read_channel(0).await, Ok(42));

        harness.stop().await;
    }

    #[tokio::test]
    async fn flush_sends_without_changes() {
        let harness = helpers::start_bridge(BridgeConfig {
            send_on_change: false,
            ..Default::default()
        });

        harness.bridge.set_channel(7, 9).await.unwrap();
        harness.bridge.read_channel(7).await.unwrap();
        assert_eq!(harness.transport.sent_count(), 0);

        harness.bridge.flush_output().await.unwrap();
        harness.bridge.read_channel(7).await.unwrap();
        assert_eq!(harness.transport.last_sent().unwrap().data[7], 9);

        harness.stop().await;
    }

    #[tokio::test]
    async fn dali_commands_emit_display_updates() {
        let mut harness = helpers::start_bridge(BridgeConfig::default());

        assert_eq!(harness.bridge.create_light(3).await, Ok(true));
        harness.bridge.assign_light_to_group(3, 1).await.unwrap();
        harness
            .bridge
            .send_command_to_group(1, DaliCommand::Up)
            .await
            .unwrap();

        helpers::wait_for_event(&mut harness.events, |e| {
            matches!(e, BridgeEvent::LightLevel { address: 3, level: 10 })
        })
        .await;

        let light = harness.bridge.light(3).await.unwrap().unwrap();
        assert_eq!(light.brightness, 10);
        assert_eq!(light.groups, vec![GroupId::new(1).unwrap()]);

        harness.stop().await;
    }

    #[tokio::test]
    async fn conflicts_are_returned_to_the_caller() {
        let harness = helpers::start_bridge(BridgeConfig::default());

        harness.bridge.assign_dmx(5).await.unwrap();
        assert!(matches!(
            harness.bridge.create_light(5).await,
            Err(BridgeError::AddressConflict { address: 5, .. })
        ));
        assert_eq!(harness.bridge.light(5).await, Ok(None));

        harness.stop().await;
    }

    #[tokio::test]
    async fn report_error_emits_event() {
        let mut harness = helpers::start_bridge(BridgeConfig::default());

        harness
            .bridge
            .report_error("Listener", "socket closed")
            .await
            .unwrap();

        let event = helpers::wait_for_event(&mut harness.events, |e| {
            matches!(e, BridgeEvent::Error { .. })
        })
        .await;
        assert_eq!(
            event,
            BridgeEvent::Error {
                source: "Listener".to_string(),
                message: "socket closed".to_string(),
            }
        );

        harness.stop().await;
    }

    #[tokio::test]
    async fn stopped_actor_is_unavailable() {
        let harness = helpers::start_bridge(BridgeConfig::default());
        let bridge = harness.bridge.clone();

        harness.stop().await;

        assert_eq!(
            bridge.create_light(1).await,
            Err(BridgeError::ActorUnavailable)
        );
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

mod proptest_tests {
    use super::*;
    use lux_bridge::translate_command_to_level;
    use proptest::prelude::*;

    fn protocol() -> impl Strategy<Value = Protocol> {
        prop_oneof![Just(Protocol::Dali), Just(Protocol::Dmx)]
    }

    fn panel_command() -> impl Strategy<Value = DaliCommand> {
        prop_oneof![
            Just(DaliCommand::Off),
            Just(DaliCommand::Up),
            Just(DaliCommand::Down),
            Just(DaliCommand::MaxLevel),
            Just(DaliCommand::MinLevel),
        ]
    }

    proptest! {
        #[test]
        fn first_registration_wins(
            registrations in prop::collection::vec((0u16..16, protocol()), 1..64)
        ) {
            let mut registry = AddressRegistry::new();
            let mut expected = std::collections::BTreeMap::new();

            for (address, protocol) in registrations {
                let owner = *expected.entry(address).or_insert(protocol);
                let result = registry.register(address, protocol);
                prop_assert_eq!(result.is_ok(), owner == protocol);
                prop_assert_eq!(registry.owner(address), Some(owner));
            }
        }

        #[test]
        fn brightness_stays_clamped(steps in prop::collection::vec(any::<bool>(), 0..80)) {
            let mut bus = helpers::bus_with_lights(&[9]);
            let mut model: i32 = 0;

            for up in steps {
                let command = if up { DaliCommand::Up } else { DaliCommand::Down };
                bus.send_command(9 << 1, command.code());
                model = if up { (model + 10).min(255) } else { (model - 10).max(0) };
                prop_assert_eq!(helpers::level(&bus, 9) as i32, model);
            }
        }

        #[test]
        fn dmx_translation_matches_table(command in panel_command(), current in any::<u8>()) {
            let level = translate_command_to_level(command, current);
            let expected = match command {
                DaliCommand::Off => 0,
                DaliCommand::Up => current.saturating_add(25),
                DaliCommand::Down => current.saturating_sub(25),
                DaliCommand::MaxLevel => 255,
                _ => 26,
            };
            prop_assert_eq!(level, expected);
        }

        #[test]
        fn broadcast_reaches_all(addresses in prop::collection::btree_set(0u16..64, 1..20)) {
            let addresses: Vec<u16> = addresses.into_iter().collect();
            let mut bus = helpers::bus_with_lights(&addresses);

            let report = bus.send_command(0x7E, DaliCommand::MaxLevel.code());

            prop_assert_eq!(report.updates().len(), addresses.len());
            prop_assert!(bus.devices().all(|d| d.brightness() == 255));
        }

        #[test]
        fn group_table_matches_devices(
            ops in prop::collection::vec((0u8..8, 0u8..16, any::<bool>()), 0..60)
        ) {
            let mut bus = helpers::bus_with_lights(&[0, 1, 2, 3, 4, 5, 6, 7]);
            for (address, group, assign) in ops {
                if assign {
                    bus.assign_light_to_group(address, group).unwrap();
                } else {
                    bus.remove_from_all_groups(address).unwrap();
                }
            }

            for group in GroupId::all() {
                for device in bus.devices() {
                    let listed = bus.lights_in_group(group).any(|a| a == device.address());
                    prop_assert_eq!(listed, device.in_group(group));
                }
            }
        }

        #[test]
        fn payload_is_32_manchester_bits(address in any::<u8>(), command in any::<u8>()) {
            let frame = encode_frame(address, command);

            prop_assert_eq!(frame.encoded_bits.len(), 32);
            prop_assert_eq!(frame.bit_length, 32);
            for pair in frame.encoded_bits.as_bytes().chunks(2) {
                prop_assert!(pair == b"10" || pair == b"01");
            }
        }

        #[test]
        fn snapshot_overwrites_prefix_only(
            initial in any::<u8>(),
            values in prop::collection::vec(any::<u8>(), 0..600)
        ) {
            let mut buffer = DmxBuffer::new();
            for channel in 0..512 {
                buffer.write(channel, initial as i32).unwrap();
            }

            buffer.apply_snapshot(&values);

            for channel in 0..512 {
                let expected = values.get(channel).copied().unwrap_or(initial);
                prop_assert_eq!(buffer.read(channel), Ok(expected));
            }
        }
    }
}
