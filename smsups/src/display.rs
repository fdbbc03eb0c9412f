//! Console rendering of UPS replies.

use crate::protocol::frame::to_hex;
use crate::protocol::status::StatusResponse;
use std::fmt::Write;

/// Separator line printed after every status block.
pub const SEPARATOR: &str = "--------------------------------------------------";

/// Render a status reply as a multi-line console block.
pub fn render_status_human(status: &StatusResponse) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Vin: {:.1} V | Vout: {:.1} V | Bat: {:.1} %",
        status.vin, status.vout, status.battery_percent
    );
    let _ = writeln!(
        out,
        "Load: {:.1} % | Temp: {:.1} °C | Freq: {:.1} Hz",
        status.load_percent, status.temperature, status.frequency
    );
    let _ = writeln!(
        out,
        "Flags: 0b{} → {}",
        status.extra_flags_binary, status.active_flags_str
    );
    let _ = writeln!(out, "Time: {}", status.timestamp());
    out.push_str(SEPARATOR);
    out
}

/// Render a reply to the 'I' (information) command: hex plus the printable
/// ASCII characters it contains.
pub fn info_response(raw: &[u8]) -> String {
    let text: String = raw
        .iter()
        .map(|&b| {
            if b.is_ascii_graphic() || b == b' ' {
                b as char
            } else {
                '.'
            }
        })
        .collect();
    format!("{}\n{}", to_hex(raw), text.trim_matches('.').trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::status::decode_status_at;
    use chrono::{Local, TimeZone};

    #[test]
    fn test_render_status_human() {
        let raw = [
            0x00, 0x00, 0x00, 0x09, 0x60, 0x00, 0xE6, 0x00, 0x00, 0x02, 0x58, 0x03, 0x84, 0x01,
            0xF4, 0x81, 0x0D,
        ];
        let at = Local.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        let status = decode_status_at(&raw, at).unwrap();

        let text = render_status_human(&status);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Vin: 240.0 V | Vout: 23.0 V | Bat: 90.0 %");
        assert_eq!(lines[1], "Load: 0.0 % | Temp: 50.0 °C | Freq: 60.0 Hz");
        assert_eq!(lines[2], "Flags: 0b10000001 → BatteryInUse, BeepOn");
        assert_eq!(lines[3], "Time: 2024-05-01 08:00:00");
        assert_eq!(lines[4], SEPARATOR);
    }

    #[test]
    fn test_info_response() {
        let raw = b"#SMS GAMER  v7\r";
        let text = info_response(raw);
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some(to_hex(raw).as_str()));
        assert_eq!(lines.next(), Some("#SMS GAMER  v7"));
    }

    #[test]
    fn test_info_response_binary_only() {
        let text = info_response(&[0x00, 0x01]);
        assert_eq!(text, "0001\n");
    }
}
