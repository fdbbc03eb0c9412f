//! Outgoing command frames.
//!
//! ## Frame Format
//!
//! Every command sent to the UPS is exactly seven bytes:
//!
//! ```text
//! +--------+----+----+----+----+----------+------+
//! | Opcode | P1 | P2 | P3 | P4 | Checksum |  CR  |
//! +--------+----+----+----+----+----------+------+
//! |   1    | 1  | 1  | 1  | 1  |    1     | 0x0D |
//! +--------+----+----+----+----+----------+------+
//! ```
//!
//! The checksum is the two's-complement negation of the sum of the five
//! preceding bytes, so the six protocol bytes always sum to zero mod 256.

use crate::protocol::commands::CommandSpec;

/// Frame terminator (carriage return).
pub const TERMINATOR: u8 = 0x0D;

/// Total length of an outgoing frame, terminator included.
pub const FRAME_LEN: usize = 7;

/// Compute the checksum byte for a command.
pub fn checksum(opcode: u8, p1: u8, p2: u8, p3: u8, p4: u8) -> u8 {
    [opcode, p1, p2, p3, p4]
        .iter()
        .fold(0u8, |acc, b| acc.wrapping_add(*b))
        .wrapping_neg()
}

/// Build the seven wire bytes for a command.
pub fn build_frame(opcode: u8, p1: u8, p2: u8, p3: u8, p4: u8) -> [u8; FRAME_LEN] {
    [
        opcode,
        p1,
        p2,
        p3,
        p4,
        checksum(opcode, p1, p2, p3, p4),
        TERMINATOR,
    ]
}

/// A command frame ready to be written to the serial line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandFrame {
    opcode: u8,
    params: [u8; 4],
}

impl CommandFrame {
    /// Create a frame from an opcode and its four parameter bytes.
    pub fn new(opcode: u8, params: [u8; 4]) -> Self {
        Self { opcode, params }
    }

    /// Opcode byte.
    pub fn opcode(&self) -> u8 {
        self.opcode
    }

    /// Parameter bytes.
    pub fn params(&self) -> [u8; 4] {
        self.params
    }

    /// Checksum byte of this frame.
    pub fn checksum(&self) -> u8 {
        let [p1, p2, p3, p4] = self.params;
        checksum(self.opcode, p1, p2, p3, p4)
    }

    /// Build the complete frame data.
    pub fn build(&self) -> [u8; FRAME_LEN] {
        let [p1, p2, p3, p4] = self.params;
        build_frame(self.opcode, p1, p2, p3, p4)
    }
}

impl From<&CommandSpec> for CommandFrame {
    fn from(spec: &CommandSpec) -> Self {
        Self::new(spec.opcode, spec.params)
    }
}

/// Render bytes as lowercase hex without separators.
pub fn to_hex(data: &[u8]) -> String {
    use std::fmt::Write;

    let mut out = String::with_capacity(data.len() * 2);
    for b in data {
        let _ = write!(out, "{b:02x}");
    }
    out
}

/// Parse a hex string, ignoring whitespace (e.g. `"51 ff ff ff ff b3 0d"`).
pub fn parse_hex(text: &str) -> Option<Vec<u8>> {
    let digits: Vec<u8> = text.bytes().filter(|c| !c.is_ascii_whitespace()).collect();
    if digits.is_empty() || digits.len() % 2 != 0 {
        return None;
    }

    digits
        .chunks(2)
        .map(|pair| {
            let s = std::str::from_utf8(pair).ok()?;
            u8::from_str_radix(s, 16).ok()
        })
        .collect()
}
