//! DALI forward frame encoding
//!
//! The frame model is illustrative rather than wire-accurate: it exposes the
//! field breakdown of a forward frame and a two-bits-per-bit line code so the
//! last transmission can be inspected.
//!
//! # Frame Layout
//! ```text
//! [START] [ADDRESS x6] [COMMAND x8] [STOP x2]
//!    1      AAAAAA       CCCCCCCC      SS
//! ```
//!
//! # Line Code
//! Each data bit is sent MSB first as `10` (bit = 1) or `01` (bit = 0).
//! A frame's payload is the line-coded address byte followed by the
//! line-coded command byte, 32 bits in total.

use std::fmt;

/// Start bit of every forward frame
pub const START_BIT: &str = "1";

/// Nominal forward frame bit rate, shown in frame reports
pub const BIT_RATE: u32 = 1200;

/// Stop-bit layout of a forward frame
///
/// The group/scene controller and the bridge panel render the same fields
/// but disagree on the stop bits. Neither is standards-accurate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum FrameLayout {
    /// Group/scene controller layout (stop bits `11`)
    #[default]
    Controller,
    /// Bridge panel layout (stop bits `01`)
    Panel,
}

impl FrameLayout {
    /// Stop-bit field for this layout
    pub fn stop_bits(&self) -> &'static str {
        match self {
            FrameLayout::Controller => "11",
            FrameLayout::Panel => "01",
        }
    }
}

/// An encoded forward frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Raw address byte
    pub address_byte: u8,
    /// Raw command byte
    pub command_byte: u8,
    /// Layout used for the field breakdown
    pub layout: FrameLayout,
    /// 6-bit short address field
    pub address_field: String,
    /// 8-bit command field
    pub command_field: String,
    /// Stop-bit field
    pub stop_bits: &'static str,
    /// Line-coded payload (address byte then command byte)
    pub encoded_bits: String,
    /// Length of `encoded_bits`
    pub bit_length: usize,
}

impl Frame {
    /// Unencoded `start | address | command | stop` bit string
    pub fn bit_sequence(&self) -> String {
        format!(
            "{}{}{}{}",
            START_BIT, self.address_field, self.command_field, self.stop_bits
        )
    }

    /// One-line summary used in the activity log
    pub fn summary(&self) -> String {
        format!("Addr: {}, Cmd: {}", self.address_byte >> 1, self.command_byte)
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "DALI Frame Information:")?;
        writeln!(f, "Start Bit: {}", START_BIT)?;
        writeln!(f, "Address Byte: {:08b}", self.address_byte)?;
        writeln!(f, "Data Byte: {:08b}", self.command_byte)?;
        writeln!(f, "Stop Bits: {}", self.stop_bits)?;
        writeln!(f)?;
        writeln!(f, "Manchester Encoded: {}", self.encoded_bits)?;
        writeln!(f, "Message Length: {} bits", self.bit_length)?;
        write!(f, "Bit Rate: {} bits/sec", BIT_RATE)
    }
}

/// Line-code a single byte, MSB first
///
/// Always returns exactly 16 characters.
pub fn manchester_encode(byte: u8) -> String {
    let mut encoded = String::with_capacity(16);
    for bit in (0..8).rev() {
        if (byte >> bit) & 1 == 1 {
            encoded.push_str("10");
        } else {
            encoded.push_str("01");
        }
    }
    encoded
}

/// Line-code an arbitrary bit string
///
/// Characters other than `0` and `1` are skipped.
pub fn manchester_encode_bits(bits: &str) -> String {
    bits.chars()
        .filter_map(|c| match c {
            '1' => Some("10"),
            '0' => Some("01"),
            _ => None,
        })
        .collect()
}

/// Encode a frame using the controller layout
pub fn encode_frame(address_byte: u8, command_byte: u8) -> Frame {
    encode_frame_with(FrameLayout::Controller, address_byte, command_byte)
}

/// Encode a frame using the given layout
pub fn encode_frame_with(layout: FrameLayout, address_byte: u8, command_byte: u8) -> Frame {
    let mut encoded_bits = manchester_encode(address_byte);
    encoded_bits.push_str(&manchester_encode(command_byte));
    let bit_length = encoded_bits.len();

    Frame {
        address_byte,
        command_byte,
        layout,
        address_field: format!("{:06b}", (address_byte >> 1) & 0x3F),
        command_field: format!("{:08b}", command_byte),
        stop_bits: layout.stop_bits(),
        encoded_bits,
        bit_length,
    }
}
