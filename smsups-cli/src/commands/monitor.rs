//! Continuous console monitor.

use anyhow::{Result, bail};
use console::style;
use log::{info, warn};
use smsups::{
    bridge::sleep_until_stopped, decode_status, protocol::frame::to_hex, render_status_human,
};
use std::time::Duration;

use crate::config::{Config, interval_from_secs};
use crate::serial::open_ups;
use crate::{Cli, CliError, was_interrupted};

/// Default interval of the decoded monitor.
const DEFAULT_INTERVAL: f64 = 2.0;

/// Default interval of the raw monitor.
const DEFAULT_RAW_INTERVAL: f64 = 0.5;

fn monitor_interval(interval: Option<f64>, raw: bool) -> Result<Duration> {
    let secs = interval.unwrap_or(if raw {
        DEFAULT_RAW_INTERVAL
    } else {
        DEFAULT_INTERVAL
    });
    interval_from_secs(secs).ok_or_else(|| {
        CliError::Usage(format!(
            "Invalid interval {secs}: must be a positive number of seconds"
        ))
        .into()
    })
}

/// Monitor command implementation.
pub(crate) fn cmd_monitor(
    cli: &Cli,
    config: &Config,
    interval: Option<f64>,
    json: bool,
    raw: bool,
) -> Result<()> {
    let interval = monitor_interval(interval, raw)?;
    let mut ups = open_ups(cli, config)?;

    info!(
        "Sending 'Q' every {:.1}s, press Ctrl+C to stop",
        interval.as_secs_f64()
    );

    while !was_interrupted() {
        if raw {
            match ups.send_simple("Q") {
                Ok(Some(response)) => {
                    println!("{}", to_hex(&response));
                    match decode_status(&response) {
                        Ok(status) => println!("{}", render_status_human(&status)),
                        Err(e) => warn!("Invalid status reply: {e}"),
                    }
                },
                Ok(None) => eprintln!("{}", style("(no response)").yellow()),
                Err(e) if e.is_transport() => bail!(e),
                Err(e) => warn!("{e}"),
            }
        } else {
            match ups.query_status() {
                Ok(Some(status)) if json => println!("{}", status.to_json()?),
                Ok(Some(status)) => println!("{}", render_status_human(&status)),
                Ok(None) => warn!("No response from UPS"),
                Err(e) if e.is_transport() => bail!(e),
                Err(e) => warn!("Invalid status reply: {e}"),
            }
        }
        sleep_until_stopped(interval, was_interrupted);
    }

    info!("Interrupted by user");
    ups.disconnect()?;
    Ok(())
}
