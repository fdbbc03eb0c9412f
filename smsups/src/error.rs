//! Error types for smsups.

use std::io;
use thiserror::Error;

/// Result type for smsups operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for smsups operations.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error on the serial line.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Serial port error (open, configure).
    #[cfg(feature = "native")]
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// The serial port was already closed.
    #[error("Serial port is closed")]
    PortClosed,

    /// Status reply shorter than the fixed layout.
    #[error("Response too short: {len} bytes (need at least 17)")]
    ShortResponse {
        /// Number of bytes received.
        len: usize,
    },

    /// Status reply could not be unpacked.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Command key not present in the registry.
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    /// Inbound MQTT payload could not be decoded.
    #[error("Protocol decode error: {0}")]
    ProtocolDecode(String),

    /// MQTT broker refused or dropped a request.
    #[error("Broker unavailable: {0}")]
    BrokerUnavailable(String),

    /// No serial port could be found.
    #[error("No serial port found")]
    DeviceNotFound,

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Whether this error comes from the serial transport.
    pub fn is_transport(&self) -> bool {
        match self {
            Self::Io(_) | Self::PortClosed => true,
            #[cfg(feature = "native")]
            Self::Serial(_) => true,
            _ => false,
        }
    }

    /// Whether this error only affects a single poll cycle or message.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::ShortResponse { .. }
                | Self::MalformedResponse(_)
                | Self::UnknownCommand(_)
                | Self::ProtocolDecode(_)
                | Self::BrokerUnavailable(_)
        )
    }
}
