//! Host settings

use std::path::{Path, PathBuf};

use lux_bridge::BridgeConfig;
use lux_sim::VirtualUniverseConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable naming the settings file
pub const SETTINGS_ENV: &str = "LUXBRIDGE_SETTINGS";

/// Settings file used when the environment variable is unset
pub const DEFAULT_SETTINGS_FILE: &str = "luxbridge.json";

/// Errors loading settings
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The file exists but could not be read
    #[error("failed to read settings from {path}: {source}")]
    Read {
        /// Settings file
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// The file is not valid settings JSON
    #[error("invalid settings in {path}: {source}")]
    Parse {
        /// Settings file
        path: PathBuf,
        /// Underlying error
        source: serde_json::Error,
    },
}

/// A light to put in a group at start-up
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct GroupAssignment {
    /// Short address
    pub address: u8,
    /// Group (0-15)
    pub group: u8,
}

/// A command to send at start-up, routed by address ownership
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct StartupCommand {
    /// Shared address
    pub address: u16,
    /// DALI command code
    pub command: u8,
}

/// Host settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Bridge configuration
    pub bridge: BridgeConfig,
    /// Capacity of the command and event channels
    pub channel_capacity: usize,
    /// DALI lights to create on start-up
    pub dali_lights: Vec<u16>,
    /// DMX addresses to assign on start-up
    pub dmx_addresses: Vec<u16>,
    /// Group memberships to set up on start-up
    pub groups: Vec<GroupAssignment>,
    /// Commands to send once everything is assigned
    pub startup_commands: Vec<StartupCommand>,
    /// Virtual transport settings
    pub simulation: VirtualUniverseConfig,
    /// Append the activity log to this file
    pub activity_log: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bridge: BridgeConfig::default(),
            channel_capacity: 256,
            dali_lights: Vec::new(),
            dmx_addresses: Vec::new(),
            groups: Vec::new(),
            startup_commands: Vec::new(),
            simulation: VirtualUniverseConfig::default(),
            activity_log: None,
        }
    }
}

impl Settings {
    /// Settings file path: `$LUXBRIDGE_SETTINGS`, else `luxbridge.json`
    pub fn path() -> PathBuf {
        std::env::var_os(SETTINGS_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS_FILE))
    }

    /// Load settings from a file
    ///
    /// A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(SettingsError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        serde_json::from_str(&text).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Channel capacity, never zero
    pub fn channel_capacity(&self) -> usize {
        self.channel_capacity.max(1)
    }
}
