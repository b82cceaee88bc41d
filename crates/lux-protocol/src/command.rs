//! DALI command set
//!
//! The bridge understands a small subset of the IEC 62386 command space.
//! Codes outside that subset decode to [`DaliCommand::Unknown`] and leave
//! device state untouched.

use std::fmt;

use crate::address::SceneId;

/// Command opcodes
pub mod opcode {
    /// Switch off immediately
    pub const OFF: u8 = 0;
    /// Step up
    pub const UP: u8 = 1;
    /// Step down
    pub const DOWN: u8 = 2;
    /// Recall maximum level
    pub const MAX_LEVEL: u8 = 5;
    /// Recall minimum level
    pub const MIN_LEVEL: u8 = 6;
    /// First scene recall opcode (GO TO SCENE 0)
    pub const GO_TO_SCENE_BASE: u8 = 0x10;
    /// Last scene recall opcode (GO TO SCENE 15)
    pub const GO_TO_SCENE_LAST: u8 = 0x1F;
    /// Reset
    pub const RESET: u8 = 32;
    /// Query actual level (reported, never stored)
    pub const QUERY_ACTUAL_LEVEL: u8 = 33;
    /// Terminate: every device off
    pub const TERMINATE: u8 = 161;
    /// Store to data transfer register
    pub const STORE_TO_DTR: u8 = 163;
}

/// Brightness step applied by UP and DOWN on a DALI device
pub const DALI_STEP: u8 = 10;

/// Maximum arc power level
pub const MAX_LEVEL: u8 = 255;

/// Decoded DALI command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DaliCommand {
    /// Brightness to zero
    Off,
    /// Brightness up one step
    Up,
    /// Brightness down one step
    Down,
    /// Brightness to maximum
    MaxLevel,
    /// Brightness to minimum
    MinLevel,
    /// Recall the device's stored level for a scene
    GoToScene(SceneId),
    /// Brightness to zero
    Reset,
    /// Report the current brightness without changing it
    QueryActualLevel,
    /// Every device on the bus to zero
    Terminate,
    /// Acknowledged, no register model behind it
    StoreToDtr,
    /// Unrecognized command code
    Unknown(u8),
}

impl DaliCommand {
    /// Wire code for this command
    pub fn code(&self) -> u8 {
        match self {
            DaliCommand::Off => opcode::OFF,
            DaliCommand::Up => opcode::UP,
            DaliCommand::Down => opcode::DOWN,
            DaliCommand::MaxLevel => opcode::MAX_LEVEL,
            DaliCommand::MinLevel => opcode::MIN_LEVEL,
            DaliCommand::GoToScene(scene) => opcode::GO_TO_SCENE_BASE + scene.value(),
            DaliCommand::Reset => opcode::RESET,
            DaliCommand::QueryActualLevel => opcode::QUERY_ACTUAL_LEVEL,
            DaliCommand::Terminate => opcode::TERMINATE,
            DaliCommand::StoreToDtr => opcode::STORE_TO_DTR,
            DaliCommand::Unknown(code) => *code,
        }
    }

    /// Human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            DaliCommand::Off => "Off",
            DaliCommand::Up => "Up",
            DaliCommand::Down => "Down",
            DaliCommand::MaxLevel => "Max Level",
            DaliCommand::MinLevel => "Min Level",
            DaliCommand::GoToScene(_) => "Go To Scene",
            DaliCommand::Reset => "Reset",
            DaliCommand::QueryActualLevel => "Query Actual Level",
            DaliCommand::Terminate => "Terminate",
            DaliCommand::StoreToDtr => "Store To DTR",
            DaliCommand::Unknown(_) => "Unknown",
        }
    }

    /// Whether this command code is part of the understood set
    pub fn is_known(&self) -> bool {
        !matches!(self, DaliCommand::Unknown(_))
    }

    /// Whether applying this command can change a device's brightness
    pub fn mutates_level(&self) -> bool {
        !matches!(
            self,
            DaliCommand::QueryActualLevel | DaliCommand::StoreToDtr | DaliCommand::Unknown(_)
        )
    }

    /// The commands offered by the bridge panel, in display order
    pub fn panel_commands() -> [DaliCommand; 5] {
        [
            DaliCommand::Off,
            DaliCommand::Up,
            DaliCommand::Down,
            DaliCommand::MaxLevel,
            DaliCommand::MinLevel,
        ]
    }
}

impl From<u8> for DaliCommand {
    fn from(code: u8) -> Self {
        match code {
            opcode::OFF => DaliCommand::Off,
            opcode::UP => DaliCommand::Up,
            opcode::DOWN => DaliCommand::Down,
            opcode::MAX_LEVEL => DaliCommand::MaxLevel,
            opcode::MIN_LEVEL => DaliCommand::MinLevel,
            opcode::GO_TO_SCENE_BASE..=opcode::GO_TO_SCENE_LAST => {
                DaliCommand::GoToScene(SceneId::from_low_bits(code))
            }
            opcode::RESET => DaliCommand::Reset,
            opcode::QUERY_ACTUAL_LEVEL => DaliCommand::QueryActualLevel,
            opcode::TERMINATE => DaliCommand::Terminate,
            opcode::STORE_TO_DTR => DaliCommand::StoreToDtr,
            other => DaliCommand::Unknown(other),
        }
    }
}

impl From<DaliCommand> for u8 {
    fn from(command: DaliCommand) -> Self {
        command.code()
    }
}

impl fmt::Display for DaliCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DaliCommand::GoToScene(scene) => write!(f, "Go To Scene {}", scene),
            DaliCommand::Unknown(code) => write!(f, "Unknown (0x{:02X})", code),
            other => f.write_str(other.name()),
        }
    }
}
