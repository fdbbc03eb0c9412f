//! Service mode: bridge the UPS to MQTT.

use anyhow::{Context, Result};
use log::{info, warn};
use smsups::{
    Bridge, BridgeConfig, BrokerConfig, NativePort, is_interrupted_requested,
    mqtt::{self, ReconnectBackoff},
};
use std::sync::Arc;
use std::time::Duration;

use crate::config::{Config, interval_from_secs};
use crate::serial::serial_config;
use crate::{BridgeArgs, Cli, CliError};

/// How long shutdown waits for the broker DISCONNECT to be written.
const DISCONNECT_GRACE: Duration = Duration::from_secs(3);

/// Apply command-line overrides on top of the file configuration.
fn apply_overrides(
    args: &BridgeArgs,
    bridge: &mut BridgeConfig,
    broker: &mut BrokerConfig,
) -> Result<()> {
    if let Some(secs) = args.interval {
        let interval = interval_from_secs(secs).ok_or_else(|| {
            CliError::Usage(format!(
                "Invalid interval {secs}: must be a positive number of seconds"
            ))
        })?;
        bridge.poll_interval = interval;
    }
    if let Some(host) = &args.mqtt_host {
        broker.host.clone_from(host);
    }
    if let Some(port) = args.mqtt_port {
        broker.port = port;
    }
    if args.mqtt_username.is_some() {
        broker.username.clone_from(&args.mqtt_username);
    }
    if args.mqtt_password.is_some() {
        broker.password.clone_from(&args.mqtt_password);
    }
    if let Some(id) = &args.client_id {
        bridge.client_id.clone_from(id);
    }
    if let Some(base) = &args.topic_base {
        bridge.topic_base.clone_from(base);
    }
    if let Some(prefix) = &args.discovery_prefix {
        bridge.discovery_prefix.clone_from(prefix);
    }
    Ok(())
}

fn check_file_interval(config: &Config) -> Result<()> {
    match config.bridge.interval_secs {
        Some(secs) if interval_from_secs(secs).is_none() => Err(CliError::Config(format!(
            "Invalid [bridge] interval_secs {secs}: must be a positive number of seconds"
        ))
        .into()),
        _ => Ok(()),
    }
}

/// Bridge command implementation.
pub(crate) fn cmd_bridge(cli: &Cli, config: &Config, args: &BridgeArgs) -> Result<()> {
    check_file_interval(config)?;
    let mut bridge_config = config.bridge_config();
    let mut broker = config.broker_config();
    apply_overrides(args, &mut bridge_config, &mut broker)?;
    bridge_config.validate()?;

    let serial = serial_config(cli, config)?;
    let (link, connection) = mqtt::connect(&broker, &bridge_config.client_id);
    let bridge = Bridge::open(bridge_config, || NativePort::open(&serial), link)
        .with_context(|| format!("Failed to open serial port {}", serial.port_name))?;
    let bridge = Arc::new(bridge);

    info!(
        "Connecting to MQTT broker at {}:{} as '{}'",
        broker.host,
        broker.port,
        bridge.config().client_id
    );
    let network = mqtt::spawn_network_loop(
        Arc::clone(&bridge),
        connection,
        ReconnectBackoff::from(&broker),
    );

    bridge.run(is_interrupted_requested);

    if is_interrupted_requested() {
        info!("Interrupted by user");
    }
    if !network.wait(DISCONNECT_GRACE) {
        warn!("MQTT disconnect not confirmed within {}s", DISCONNECT_GRACE.as_secs());
    }
    info!("Bridge stopped");
    Ok(())
}
