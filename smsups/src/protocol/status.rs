//! Status ('Q') reply decoding.
//!
//! ## Reply Layout
//!
//! ```text
//! +--------+------+------+------+------+------+------+-------+------+
//! | Status | Vin  | Vout | Load | Freq | Batt | Temp | Flags | (CR) |
//! +--------+------+------+------+------+------+------+-------+------+
//! |   1    |  4   |  2   |  2   |  2   |  2   |  2   |   1   |  1   |
//! +--------+------+------+------+------+------+------+-------+------+
//! ```
//!
//! All numeric fields are big-endian unsigned integers in tenths.

use crate::error::{Error, Result};
use crate::protocol::frame::{TERMINATOR, to_hex};
use byteorder::{BigEndian, ReadBytesExt};
use chrono::{DateTime, Local};
use log::{debug, error};
use serde::{Serialize, Serializer};
use std::io::Cursor;

/// Minimum reply length accepted by the decoder, checked before the
/// trailing terminator is stripped.
pub const MIN_STATUS_LEN: usize = 17;

/// Summary used when no flag bit is set.
pub const NO_ACTIVE_FLAGS: &str = "no active flags";

/// Timestamp format used in published telemetry.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A named bit of the status flags byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum UpsFlag {
    /// Running on battery (bit 7).
    BatteryInUse,
    /// Battery low (bit 6).
    LowBattery,
    /// Bypass active (bit 5).
    Bypass,
    /// Boost active (bit 4).
    Boost,
    /// UPS reports OK (bit 3).
    UpsOk,
    /// Battery test running (bit 2).
    TestActive,
    /// Shutdown in progress (bit 1).
    ShutdownActive,
    /// Beeper enabled (bit 0).
    BeepOn,
}

impl UpsFlag {
    /// All flags, most significant bit first.
    pub const ALL: [Self; 8] = [
        Self::BatteryInUse,
        Self::LowBattery,
        Self::Bypass,
        Self::Boost,
        Self::UpsOk,
        Self::TestActive,
        Self::ShutdownActive,
        Self::BeepOn,
    ];

    /// Bit position inside the flags byte.
    pub fn bit(self) -> u8 {
        match self {
            Self::BatteryInUse => 7,
            Self::LowBattery => 6,
            Self::Bypass => 5,
            Self::Boost => 4,
            Self::UpsOk => 3,
            Self::TestActive => 2,
            Self::ShutdownActive => 1,
            Self::BeepOn => 0,
        }
    }

    /// Name as published in `active_flags`.
    pub fn name(self) -> &'static str {
        match self {
            Self::BatteryInUse => "BatteryInUse",
            Self::LowBattery => "LowBattery",
            Self::Bypass => "Bypass",
            Self::Boost => "Boost",
            Self::UpsOk => "UpsOk",
            Self::TestActive => "TestActive",
            Self::ShutdownActive => "ShutdownActive",
            Self::BeepOn => "BeepOn",
        }
    }

    /// Whether this flag is set in `raw`.
    pub fn is_set(self, raw: u8) -> bool {
        raw & (1 << self.bit()) != 0
    }

    /// Flags set in `raw`, most significant bit first.
    pub fn from_bits(raw: u8) -> Vec<Self> {
        Self::ALL.into_iter().filter(|f| f.is_set(raw)).collect()
    }
}

/// Decoded telemetry from a status reply.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusResponse {
    /// Input voltage (V).
    pub vin: f64,
    /// Output voltage (V).
    pub vout: f64,
    /// Load (%).
    pub load_percent: f64,
    /// Line frequency (Hz).
    pub frequency: f64,
    /// Battery charge (%).
    pub battery_percent: f64,
    /// Temperature (°C).
    pub temperature: f64,
    /// Raw flags byte.
    pub extra_flags_raw: u8,
    /// Flags byte as eight binary digits.
    pub extra_flags_binary: String,
    /// Flags set in `extra_flags_raw`.
    pub active_flags: Vec<UpsFlag>,
    /// Comma-separated flag names or [`NO_ACTIVE_FLAGS`].
    pub active_flags_str: String,
    /// Hex of the reply after terminator stripping.
    pub raw_response_hex: String,
    /// Capture time.
    #[serde(rename = "timestamp", serialize_with = "serialize_timestamp")]
    pub captured_at: DateTime<Local>,
}

fn serialize_timestamp<S>(
    ts: &DateTime<Local>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_str(&ts.format(TIMESTAMP_FORMAT))
}

impl StatusResponse {
    /// Whether `flag` is active.
    pub fn has_flag(&self, flag: UpsFlag) -> bool {
        self.active_flags.contains(&flag)
    }

    /// Capture time formatted for display.
    pub fn timestamp(&self) -> String {
        self.captured_at.format(TIMESTAMP_FORMAT).to_string()
    }

    /// JSON document published on the status topic.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::MalformedResponse(e.to_string()))
    }
}

/// Human-readable summary of a flags byte.
pub fn flags_summary(raw: u8) -> String {
    let names: Vec<&str> = UpsFlag::from_bits(raw)
        .into_iter()
        .map(UpsFlag::name)
        .collect();
    if names.is_empty() {
        NO_ACTIVE_FLAGS.to_string()
    } else {
        names.join(", ")
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn tenths(raw: u32) -> f64 {
    round1(f64::from(raw) / 10.0)
}

/// Decode a status reply captured now.
pub fn decode_status(raw: &[u8]) -> Result<StatusResponse> {
    decode_status_at(raw, Local::now())
}

/// Decode a status reply with an explicit capture time.
pub fn decode_status_at(raw: &[u8], captured_at: DateTime<Local>) -> Result<StatusResponse> {
    if raw.len() < MIN_STATUS_LEN {
        debug!("Status reply too short: {} bytes", raw.len());
        return Err(Error::ShortResponse { len: raw.len() });
    }

    let data = match raw.split_last() {
        Some((&TERMINATOR, rest)) => rest,
        _ => raw,
    };

    unpack(data, captured_at).inspect_err(|e| error!("Failed to decode status reply: {e}"))
}

fn unpack(data: &[u8], captured_at: DateTime<Local>) -> Result<StatusResponse> {
    let malformed = |field: &str, e: std::io::Error| {
        Error::MalformedResponse(format!("{field}: {e} ({} bytes)", data.len()))
    };

    let mut cur = Cursor::new(data);
    cur.set_position(1);

    let vin = cur
        .read_u32::<BigEndian>()
        .map_err(|e| malformed("vin", e))?;
    let mut next_u16 = |field: &str| {
        cur.read_u16::<BigEndian>()
            .map(u32::from)
            .map_err(|e| malformed(field, e))
    };
    let vout = next_u16("vout")?;
    let load = next_u16("load_percent")?;
    let freq = next_u16("frequency")?;
    let batt = next_u16("battery_percent")?;
    let temp = next_u16("temperature")?;
    let flags = cur.read_u8().map_err(|e| malformed("flags", e))?;

    Ok(StatusResponse {
        vin: tenths(vin),
        vout: tenths(vout),
        load_percent: tenths(load),
        frequency: tenths(freq),
        battery_percent: tenths(batt),
        temperature: tenths(temp),
        extra_flags_raw: flags,
        extra_flags_binary: format!("{flags:08b}"),
        active_flags: UpsFlag::from_bits(flags),
        active_flags_str: flags_summary(flags),
        raw_response_hex: to_hex(data),
        captured_at,
    })
}
