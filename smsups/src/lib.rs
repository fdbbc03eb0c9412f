//! # smsups
//!
//! A library for monitoring and controlling SMS UPS units over their serial
//! protocol, with an MQTT bridge for Home-Assistant style hubs.
//!
//! This crate provides:
//!
//! - Command frame encoding with the protocol checksum
//! - Status ('Q') reply decoding into typed telemetry
//! - The registry of predefined commands (beep toggle, battery tests, ...)
//! - A blocking UPS session over any [`Port`]
//! - A bridge that polls the UPS, publishes telemetry and discovery
//!   documents, and executes commands received over MQTT
//!
//! ## Features
//!
//! - `native` (default): serial port support via the `serialport` crate
//! - `mqtt` (default): MQTT client support via `rumqttc`
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
//!     match ups.query_status()? {
//!         Some(status) => println!("{}", status.to_json()?),
//!         None => println!("UPS did not answer"),
//!     }
//!
//!     // Toggle the beeper
//!     ups.send_predefined("M")?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

use std::sync::{Arc, OnceLock};

pub mod bridge;
pub mod config;
pub mod device;
pub mod discovery;
pub mod display;
pub mod error;
#[cfg(feature = "mqtt")]
pub mod mqtt;
pub mod port;
pub mod protocol;
pub mod ups;

static INTERRUPT_CHECKER: OnceLock<Arc<dyn Fn() -> bool + Send + Sync>> = OnceLock::new();

/// Register a global interruption checker used by long-running library loops.
///
/// The checker should return `true` when the bridge or a monitor loop should
/// stop (for example after receiving Ctrl-C in CLI applications).
pub fn set_interrupt_checker<F>(checker: F)
where
    F: Fn() -> bool + Send + Sync + 'static,
{
    let _ = INTERRUPT_CHECKER.set(Arc::new(checker));
}

/// Returns whether interruption was requested by the embedding application.
#[must_use]
pub fn is_interrupted_requested() -> bool {
    INTERRUPT_CHECKER.get().is_some_and(|checker| checker())
}

#[cfg(test)]
pub(crate) fn test_set_interrupted(value: bool) {
    use std::sync::atomic::{AtomicBool, Ordering};

    static TEST_INTERRUPT_FLAG: OnceLock<Arc<AtomicBool>> = OnceLock::new();

    let flag = TEST_INTERRUPT_FLAG
        .get_or_init(|| {
            let shared = Arc::new(AtomicBool::new(false));
            let checker = Arc::clone(&shared);
            set_interrupt_checker(move || checker.load(Ordering::Relaxed));
            shared
        })
        .clone();

    flag.store(value, Ordering::Relaxed);
}

// Re-exports for convenience
#[cfg(feature = "native")]
pub use port::NativePort;
#[cfg(feature = "mqtt")]
pub use mqtt::{MqttClient, NetworkLoop, ReconnectBackoff};
pub use {
    bridge::{Bridge, BridgeSession, BridgeState, Dispatch, MqttLink},
    config::{BridgeConfig, BrokerConfig, DeviceInfo},
    device::{DetectedPort, DeviceKind, auto_detect_port, detect_ports, format_port_list},
    discovery::{DiscoveryMessage, discovery_messages},
    display::{info_response, render_status_human},
    error::{Error, Result},
    port::{Port, SerialConfig},
    protocol::{
        CommandClass, CommandFrame, CommandSpec, SettleDelays, StatusResponse, UpsFlag,
        build_frame, checksum, decode_status,
    },
    ups::Ups,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interrupt_checker_default_false() {
        test_set_interrupted(false);
        assert!(!is_interrupted_requested());
    }

    #[test]
    fn test_interrupt_checker_toggle_true_false() {
        test_set_interrupted(true);
        assert!(is_interrupted_requested());

        test_set_interrupted(false);
        assert!(!is_interrupted_requested());
    }
}
