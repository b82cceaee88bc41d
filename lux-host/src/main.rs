//! DALI/DMX Bridge Host
//!
//! Headless host for the bridge: loads settings, wires a universe transport
//! to the listener thread and the bridge actor, applies the configured
//! start-up assignments and logs bridge activity until interrupted.

mod activity_log;
mod settings;

use std::path::PathBuf;
use std::sync::Arc;

use activity_log::{ActivityEntry, ActivityLayer, ProjectCrateFilter};
use anyhow::Context as _;
use lux_bridge::{
    run_bridge_actor, spawn_universe_listener, BridgeEvent, BridgeHandle, UniverseIngestQueue,
};
use lux_protocol::{DaliCommand, UniverseTransport};
use lux_sim::VirtualUniverse;
use settings::Settings;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tracing::level_filters::LevelFilter;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings_path = Settings::path();
    let settings = Settings::load_from(&settings_path)?;

    // Create channel for activity entries (before tracing init so we can capture all logs)
    let (activity_tx, activity_rx) = mpsc::unbounded_channel::<ActivityEntry>();
    let activity_layer = settings.activity_log.as_ref().map(|_| {
        ActivityLayer::new(activity_tx).with_filter(ProjectCrateFilter::new(LevelFilter::INFO))
    });

    // Include all our crates in the default filter
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "luxbridge=info,lux_protocol=info,lux_bridge=info,lux_sim=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(activity_layer)
        .init();

    info!("Starting luxbridge DALI/DMX bridge");
    info!("Settings: {}", settings_path.display());

    if let Some(path) = settings.activity_log.clone() {
        tokio::spawn(write_activity_log(path, activity_rx));
    }

    let universe = settings.bridge.universe;
    let transport = Arc::new(VirtualUniverse::with_config(settings.simulation.clone()));
    let dyn_transport: Arc<dyn UniverseTransport> = transport.clone();

    let (ingest_tx, ingest) = UniverseIngestQueue::channel();
    let listener = spawn_universe_listener(Arc::clone(&dyn_transport), universe, ingest_tx)
        .context("failed to start universe listener")?;

    let (cmd_tx, cmd_rx) = mpsc::channel(settings.channel_capacity());
    let (event_tx, event_rx) = mpsc::channel(settings.channel_capacity());
    let actor = tokio::spawn(run_bridge_actor(
        cmd_rx,
        ingest,
        dyn_transport,
        event_tx,
        settings.bridge.clone(),
    ));
    let events = tokio::spawn(log_events(event_rx));

    let bridge = BridgeHandle::new(cmd_tx);
    apply_startup(&bridge, &settings).await;

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;
    info!("Interrupted, shutting down");

    if bridge.shutdown().await.is_err() {
        warn!("Bridge actor already stopped");
    }
    actor.await.context("bridge actor panicked")?;
    events.await.context("event logger panicked")?;

    transport.close();
    tokio::task::spawn_blocking(move || listener.join())
        .await
        .context("listener join task failed")?
        .map_err(|_| anyhow::anyhow!("universe listener panicked"))?;

    info!("luxbridge stopped");
    Ok(())
}

/// Apply the configured assignments, groups and commands
///
/// Every failure is logged and skipped; none of them stop the host.
async fn apply_startup(bridge: &BridgeHandle, settings: &Settings) {
    for &address in &settings.dali_lights {
        if let Err(e) = bridge.create_light(address).await {
            warn!("Could not create DALI light {}: {}", address, e);
        }
    }

    for &address in &settings.dmx_addresses {
        if let Err(e) = bridge.assign_dmx(address).await {
            warn!("Could not assign DMX address {}: {}", address, e);
        }
    }

    for assignment in &settings.groups {
        if let Err(e) = bridge
            .assign_light_to_group(assignment.address, assignment.group)
            .await
        {
            warn!(
                "Could not add light {} to group {}: {}",
                assignment.address, assignment.group, e
            );
        }
    }

    for startup in &settings.startup_commands {
        let command = DaliCommand::from(startup.command);
        if let Err(e) = bridge.send_to_address(startup.address, command).await {
            warn!("Could not send {} to {}: {}", command, startup.address, e);
        }
    }
}

/// Forward bridge events to the log
async fn log_events(mut event_rx: mpsc::Receiver<BridgeEvent>) {
    while let Some(event) = event_rx.recv().await {
        match event {
            BridgeEvent::LightCreated { address } => {
                info!(source = "Bridge", "Light {} created", address)
            }
            BridgeEvent::DmxAssigned { range } => {
                info!(source = "Bridge", "DMX address {} holds {}", range.address, range)
            }
            BridgeEvent::GroupAssigned { address, group } => {
                debug!(source = "Bridge", "Light {} joined group {}", address, group)
            }
            BridgeEvent::GroupsCleared { address, groups } => {
                debug!(source = "Bridge", "Light {} left {} group(s)", address, groups.len())
            }
            BridgeEvent::LightLevel { address, level } => {
                info!(source = "Display", "Light {}: {}", address, level)
            }
            BridgeEvent::ChannelChanged { channel, value } => {
                debug!(source = "Display", "Channel {}: {}", channel, value)
            }
            BridgeEvent::FrameSent { frame } => {
                debug!(source = "DALI", "{} [{}]", frame.summary(), frame.encoded_bits)
            }
            BridgeEvent::DmxOutput { universe } => {
                debug!(source = "DMX", "Universe {} sent", universe)
            }
            BridgeEvent::Log { message } => info!(source = "Bridge", "{}", message),
            BridgeEvent::Error { source, message } => {
                warn!(source = source.as_str(), "{}", message)
            }
        }
    }
}

/// Append activity entries to a file until the channel closes
async fn write_activity_log(
    path: PathBuf,
    mut activity_rx: mpsc::UnboundedReceiver<ActivityEntry>,
) {
    let mut file = match tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .await
    {
        Ok(file) => file,
        Err(e) => {
            // Not logged through tracing: the entry would come straight back here
            eprintln!("Could not open activity log {}: {}", path.display(), e);
            return;
        }
    };

    while let Some(entry) = activity_rx.recv().await {
        let line = format!("{}\n", entry);
        if let Err(e) = file.write_all(line.as_bytes()).await {
            eprintln!("Could not write activity log {}: {}", path.display(), e);
            return;
        }
    }
    let _ = file.flush().await;
}
