//! Serial port resolution and session setup.

use {
    crate::{Cli, CliError, config::Config},
    anyhow::{Context, Result},
    log::{debug, info},
    smsups::{
        NativePort, SerialConfig, Ups, auto_detect_port,
        port::{DEFAULT_BAUD, DEFAULT_TIMEOUT},
    },
    std::time::Duration,
};

/// Pick the serial port: flag/env, then config file, then auto-detection.
pub(crate) fn resolve_port(cli: &Cli, config: &Config) -> Result<String> {
    if let Some(port) = &cli.port {
        return Ok(port.clone());
    }
    if let Some(port) = &config.serial.port {
        debug!("Using port from config: {port}");
        return Ok(port.clone());
    }
    match auto_detect_port() {
        Ok(port) => Ok(port.name),
        Err(smsups::Error::DeviceNotFound) => Err(CliError::DeviceNotFound(
            "No serial port found. Connect the UPS or pass --port".to_string(),
        )
        .into()),
        Err(e) => Err(e.into()),
    }
}

/// Build the serial configuration from flags, environment and config file.
pub(crate) fn serial_config(cli: &Cli, config: &Config) -> Result<SerialConfig> {
    let port = resolve_port(cli, config)?;
    let baud = cli.baud.or(config.serial.baud).unwrap_or(DEFAULT_BAUD);
    let timeout = cli
        .timeout
        .or(config.serial.timeout_secs)
        .map_or(DEFAULT_TIMEOUT, Duration::from_secs);
    Ok(SerialConfig::new(port, baud).with_timeout(timeout))
}

/// Open the serial port described by `serial`.
pub(crate) fn open_port(serial: &SerialConfig) -> Result<NativePort> {
    let port = NativePort::open(serial)
        .with_context(|| format!("Failed to open serial port {}", serial.port_name))?;
    info!(
        "Connected to UPS on {} (baud: {}, timeout: {}s)",
        serial.port_name,
        serial.baud_rate,
        serial.timeout.as_secs()
    );
    Ok(port)
}

/// Resolve, open and wrap the port in a UPS session.
pub(crate) fn open_ups(cli: &Cli, config: &Config) -> Result<Ups<NativePort>> {
    let serial = serial_config(cli, config)?;
    Ok(Ups::new(open_port(&serial)?))
}
