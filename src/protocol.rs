//! ShuttlePRO HID input report layout
//!
//! Report Structure (5 significant bytes, read into a 32-byte buffer):
//! - Byte 0: Shuttle ring position (0 = center, 1..=7 right, 249..=255 left)
//! - Byte 1: Jog wheel position (free-running counter, wraps mod 256)
//! - Byte 2: Unused
//! - Byte 3: Buttons 1-8 (bit 0 = button 1)
//! - Byte 4: Buttons 9-15 (bit 0 = button 9, bit 7 unused)

use crate::error::{Result, ShuttleError};

/// Contour Design USB Vendor ID
pub const CONTOUR_VENDOR_ID: u16 = 0x0b33;
/// ShuttlePRO v2 Product ID
pub const SHUTTLEPRO_V2_PID: u16 = 0x0030;

/// Size of the buffer handed to the HID read
pub const READ_BUFFER_SIZE: usize = 32;
/// Bytes a report must carry for every field to be present
pub const MIN_REPORT_LEN: usize = 5;

const SHUTTLE_OFFSET: usize = 0;
const JOG_OFFSET: usize = 1;
const BUTTONS_LOW_OFFSET: usize = 3;
const BUTTONS_HIGH_OFFSET: usize = 4;

/// Bits of `buttons_high` that carry buttons 9-15
pub const BUTTONS_HIGH_MASK: u8 = 0x7F;

/// A decoded device report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ShuttleReport {
    pub shuttle_position: u8,
    pub jog_position: u8,
    pub buttons_low: u8,
    pub buttons_high: u8,
}

impl ShuttleReport {
    /// Parse a report from raw bytes. Trailing bytes beyond the fields are ignored.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < MIN_REPORT_LEN {
            return Err(ShuttleError::MalformedReport {
                len: bytes.len(),
                expected: MIN_REPORT_LEN,
            });
        }

        Ok(Self {
            shuttle_position: bytes[SHUTTLE_OFFSET],
            jog_position: bytes[JOG_OFFSET],
            buttons_low: bytes[BUTTONS_LOW_OFFSET],
            buttons_high: bytes[BUTTONS_HIGH_OFFSET] & BUTTONS_HIGH_MASK,
        })
    }

    /// Combined 15-bit button mask (bit 0 = button 1)
    pub fn buttons(&self) -> u16 {
        ((self.buttons_high as u16) << 8) | self.buttons_low as u16
    }
}

/// Hex rendering used for report dumps
pub fn hex_dump(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(" ")
}
