//! UPS session: command exchange over a [`Port`].
//!
//! Every exchange is write → settle → read. The settle delay depends on the
//! command class (see [`SettleDelays`]); the transport itself never sleeps.
//!
//! ## Example
//!
//! ```rust,no_run
//! use smsups::{NativePort, SerialConfig, Ups};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let port = NativePort::open(&SerialConfig::new("/dev/ttyUSB0", 2400))?;
//!     let mut ups = Ups::new(port);
//!
//!     if let Some(status) = ups.query_status()? {
//!         println!("Battery: {:.1}%", status.battery_percent);
//!     }
//!
//!     ups.disconnect()?;
//!     Ok(())
//! }
//! ```

use crate::error::Result;
use crate::port::Port;
use crate::protocol::commands::{self, CommandSpec, SettleDelays};
use crate::protocol::frame::{CommandFrame, to_hex};
use crate::protocol::status::{StatusResponse, decode_status};
use log::{debug, info, trace, warn};
use std::thread;
use std::time::Duration;

/// Maximum number of bytes read per exchange.
pub const MAX_RESPONSE_LEN: usize = 64;

/// UPS session over a serial port.
///
/// Generic over the port type `P`, which must implement the `Port` trait.
pub struct Ups<P: Port> {
    port: P,
    delays: SettleDelays,
}

impl<P: Port> Ups<P> {
    /// Create a new session with default settle delays.
    pub fn new(port: P) -> Self {
        Self {
            port,
            delays: SettleDelays::default(),
        }
    }

    /// Override the settle delays.
    #[must_use]
    pub fn with_settle_delays(mut self, delays: SettleDelays) -> Self {
        self.delays = delays;
        self
    }

    /// Settle delays in use.
    pub fn settle_delays(&self) -> SettleDelays {
        self.delays
    }

    /// Get a reference to the underlying port.
    pub fn port(&self) -> &P {
        &self.port
    }

    /// Whether the serial line is open.
    pub fn is_connected(&self) -> bool {
        self.port.is_open()
    }

    /// Send a registered command and read its reply after the settle delay
    /// of its class.
    ///
    /// Returns `Ok(None)` when the device stays silent.
    pub fn exchange(&mut self, spec: &CommandSpec) -> Result<Option<Vec<u8>>> {
        self.exchange_with(spec, self.delays.for_class(spec.class))
    }

    fn exchange_with(&mut self, spec: &CommandSpec, settle: Duration) -> Result<Option<Vec<u8>>> {
        let frame = CommandFrame::from(spec).build();
        trace!("Sending command '{}': {}", spec.name, to_hex(&frame));
        self.transact(&frame, settle)
    }

    /// Send raw bytes and read the reply after `settle`.
    pub fn send_raw(&mut self, data: &[u8], settle: Duration) -> Result<Option<Vec<u8>>> {
        trace!("Sending raw bytes: {}", to_hex(data));
        self.transact(data, settle)
    }

    fn transact(&mut self, data: &[u8], settle: Duration) -> Result<Option<Vec<u8>>> {
        // Stale bytes from an earlier exchange would prefix the reply
        self.port.clear_buffers()?;
        self.port.write_all_bytes(data)?;
        thread::sleep(settle);
        let response = self.port.read_up_to(MAX_RESPONSE_LEN)?;

        if response.is_empty() {
            return Ok(None);
        }
        debug!("Response ({} bytes): {}", response.len(), to_hex(&response));
        Ok(Some(response))
    }

    /// Send a command from the simple polling subset (Q, I, F).
    pub fn send_simple(&mut self, key: &str) -> Result<Option<Vec<u8>>> {
        let spec = commands::simple_command(key)?;
        let response = self.exchange(spec)?;
        if response.is_none() {
            warn!("No response from UPS for '{key}'");
        }
        Ok(response)
    }

    /// Send a predefined command from the registry.
    ///
    /// Always waits the control settle delay, whatever the command class.
    pub fn send_predefined(&mut self, key: &str) -> Result<Option<Vec<u8>>> {
        let spec = commands::lookup(key)?;
        info!("Sending predefined command '{key}' ({})", spec.description);
        let response = self.exchange_with(spec, self.delays.control)?;
        if response.is_none() {
            warn!("No response for predefined command '{key}'");
        }
        Ok(response)
    }

    /// Poll the status ('Q') and decode it.
    ///
    /// Returns `Ok(None)` when the device did not answer.
    pub fn query_status(&mut self) -> Result<Option<StatusResponse>> {
        match self.send_simple("Q")? {
            Some(raw) => decode_status(&raw).map(Some),
            None => Ok(None),
        }
    }

    /// Close the serial line. Safe to call repeatedly.
    pub fn disconnect(&mut self) -> Result<()> {
        if self.port.is_open() {
            info!("Disconnected from UPS on {}", self.port.name());
        }
        self.port.close()
    }
}
