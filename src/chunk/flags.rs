//! Header flag byte
//!
//! ```text
//!  bit  7      6 5 4        3 2 1        0
//!      +------+------------+------------+------+
//!      |marker| next width | body width | used |
//!      +------+------------+------------+------+
//! ```
//!
//! The marker bit is always set. A zero byte, which is what a freshly grown
//! or never-written region reads as, therefore never decodes as a header.

use std::fmt;

use crate::word::WordWidth;

pub const USED_BIT: u8 = 0b0000_0001;
pub const BODY_SHIFT: u8 = 1;
pub const NEXT_SHIFT: u8 = 4;
pub const WIDTH_MASK: u8 = 0b0000_0111;
pub const MARKER_MASK: u8 = 0b1000_0000;
pub const MARKER_BITS: u8 = 0b1000_0000;

/// Decoded form of the first header byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderFlags {
    pub used: bool,
    pub body_width: WordWidth,
    pub next_width: WordWidth,
}

/// The flag byte does not carry the header marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkerMismatch {
    pub found: u8,
}

impl fmt::Display for MarkerMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "marker bits mismatch in flag byte {:#04x}", self.found)
    }
}

impl std::error::Error for MarkerMismatch {}

impl HeaderFlags {
    pub fn new(used: bool, body_width: WordWidth, next_width: WordWidth) -> Self {
        Self {
            used,
            body_width,
            next_width,
        }
    }

    pub fn encode(self) -> u8 {
        MARKER_BITS
            | (self.next_width.index() << NEXT_SHIFT)
            | (self.body_width.index() << BODY_SHIFT)
            | if self.used { USED_BIT } else { 0 }
    }

    /// Checked explicitly before any field is decoded.
    pub fn has_marker(byte: u8) -> bool {
        byte & MARKER_MASK == MARKER_BITS
    }

    pub fn decode(byte: u8) -> Result<Self, MarkerMismatch> {
        if !Self::has_marker(byte) {
            return Err(MarkerMismatch { found: byte });
        }
        Ok(Self {
            used: byte & USED_BIT != 0,
            body_width: width_at(byte, BODY_SHIFT),
            next_width: width_at(byte, NEXT_SHIFT),
        })
    }
}

fn width_at(byte: u8, shift: u8) -> WordWidth {
    // three bits always name one of the eight widths
    WordWidth::ALL[((byte >> shift) & WIDTH_MASK) as usize]
}
