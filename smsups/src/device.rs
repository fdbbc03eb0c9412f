//! Serial port enumeration and UPS port auto-selection.
//!
//! SMS units ship with a USB cable that enumerates as a plain USB-UART
//! bridge, so auto-detection ranks ports by the bridge chip they expose.

use crate::error::{Error, Result};
use log::info;
#[cfg(feature = "native")]
use log::{debug, trace};
use serde::Serialize;

/// USB-UART bridge chips seen on UPS serial cables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DeviceKind {
    /// Prolific PL2303.
    Prolific,
    /// CH340/CH341.
    Ch340,
    /// Silicon Labs CP210x.
    Cp210x,
    /// FTDI FT232 family.
    Ftdi,
    /// Anything else.
    Unknown,
}

const KNOWN_USB_BRIDGES: &[(u16, &[u16], DeviceKind)] = &[
    (0x067B, &[0x2303, 0x23A3, 0x23C3, 0x23D3], DeviceKind::Prolific),
    (0x1A86, &[0x7523, 0x7522, 0x5523], DeviceKind::Ch340),
    (0x10C4, &[0xEA60, 0xEA70, 0xEA71], DeviceKind::Cp210x),
    (0x0403, &[0x6001, 0x6010, 0x6011, 0x6014, 0x6015], DeviceKind::Ftdi),
];

impl DeviceKind {
    /// Classify a USB VID/PID pair.
    #[must_use]
    pub fn from_vid_pid(vid: u16, pid: u16) -> Self {
        KNOWN_USB_BRIDGES
            .iter()
            .find(|(v, pids, _)| *v == vid && pids.contains(&pid))
            .map_or(Self::Unknown, |(_, _, kind)| *kind)
    }

    /// Human-readable chip name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Prolific => "PL2303",
            Self::Ch340 => "CH340/CH341",
            Self::Cp210x => "CP210x",
            Self::Ftdi => "FTDI",
            Self::Unknown => "Unknown",
        }
    }

    /// Whether the chip is a recognised USB-UART bridge.
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

/// An enumerated serial port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetectedPort {
    /// Port name/path (e.g., "/dev/ttyUSB0" or "COM3").
    pub name: String,
    /// Bridge chip, if recognised.
    pub device: DeviceKind,
    /// USB vendor id.
    pub vid: Option<u16>,
    /// USB product id.
    pub pid: Option<u16>,
    /// USB manufacturer string.
    pub manufacturer: Option<String>,
    /// USB product string.
    pub product: Option<String>,
    /// USB serial number.
    pub serial: Option<String>,
}

impl DetectedPort {
    /// A port with no USB metadata.
    pub fn plain(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            device: DeviceKind::Unknown,
            vid: None,
            pid: None,
            manufacturer: None,
            product: None,
            serial: None,
        }
    }

    /// Whether this is a USB port.
    pub fn is_usb(&self) -> bool {
        self.vid.is_some()
    }
}

/// Enumerate serial ports.
#[cfg(feature = "native")]
pub fn detect_ports() -> Vec<DetectedPort> {
    let ports = match serialport::available_ports() {
        Ok(ports) => ports,
        Err(e) => {
            debug!("Failed to enumerate serial ports: {e}");
            return Vec::new();
        },
    };

    ports
        .into_iter()
        .map(|info| {
            let mut detected = DetectedPort::plain(info.port_name);
            if let serialport::SerialPortType::UsbPort(usb) = info.port_type {
                detected.device = DeviceKind::from_vid_pid(usb.vid, usb.pid);
                trace!(
                    "Found USB port: {} (VID: {:04X}, PID: {:04X}, Device: {:?})",
                    detected.name, usb.vid, usb.pid, detected.device
                );
                detected.vid = Some(usb.vid);
                detected.pid = Some(usb.pid);
                detected.manufacturer = usb.manufacturer;
                detected.product = usb.product;
                detected.serial = usb.serial_number;
            }
            detected
        })
        .collect()
}

/// Enumerate serial ports (no serial backend compiled in).
#[cfg(not(feature = "native"))]
pub fn detect_ports() -> Vec<DetectedPort> {
    Vec::new()
}

/// Pick the most likely UPS port: a known bridge chip, then any USB port,
/// then the first port.
pub fn select_port(ports: &[DetectedPort]) -> Option<&DetectedPort> {
    ports
        .iter()
        .find(|p| p.device.is_known())
        .or_else(|| ports.iter().find(|p| p.is_usb()))
        .or_else(|| ports.first())
}

/// Auto-detect the UPS port.
pub fn auto_detect_port() -> Result<DetectedPort> {
    let ports = detect_ports();
    let port = select_port(&ports).ok_or(Error::DeviceNotFound)?;
    if port.device.is_known() {
        info!("Auto-detected {} USB-UART bridge: {}", port.device.name(), port.name);
    } else {
        info!("Using first available port: {}", port.name);
    }
    Ok(port.clone())
}

/// Format detected ports for display, one line each.
pub fn format_port_list(ports: &[DetectedPort]) -> Vec<String> {
    ports
        .iter()
        .map(|port| {
            let device_info = if port.device.is_known() {
                format!(" [{}]", port.device.name())
            } else if let (Some(vid), Some(pid)) = (port.vid, port.pid) {
                format!(" [VID:{vid:04X} PID:{pid:04X}]")
            } else {
                String::new()
            };
            let product_info = port
                .product
                .as_ref()
                .map(|p| format!(" - {p}"))
                .unwrap_or_default();
            format!("{}{device_info}{product_info}", port.name)
        })
        .collect()
}
