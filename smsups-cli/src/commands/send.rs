//! Predefined and raw command sending.

use anyhow::Result;
use console::style;
use dialoguer::{Confirm, theme::ColorfulTheme};
use log::{info, warn};
use smsups::{
    CommandSpec, SettleDelays, decode_status,
    protocol::{
        commands,
        frame::{parse_hex, to_hex},
    },
};
use std::io::IsTerminal;

use crate::config::Config;
use crate::serial::open_ups;
use crate::{Cli, CliError};

fn lookup_key(key: &str) -> Result<&'static CommandSpec> {
    commands::lookup(key).map_err(|_| {
        CliError::Usage(format!(
            "Unknown command '{key}'. Available: {}",
            commands::key_list()
        ))
        .into()
    })
}

/// Ask before sending a command that can power the load down.
fn confirm_dangerous(cli: &Cli, spec: &CommandSpec, yes: bool) -> Result<()> {
    if !spec.dangerous || yes {
        return Ok(());
    }
    if cli.non_interactive || !std::io::stdin().is_terminal() {
        return Err(CliError::Usage(format!(
            "Command '{}' ({}) requires --yes in non-interactive mode",
            spec.name, spec.description
        ))
        .into());
    }

    let prompt = format!(
        "Send '{}' ({})? The UPS output may switch off",
        spec.name, spec.description
    );
    let confirmed = Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .default(false)
        .interact()
        .map_err(|e| CliError::Cancelled(format!("Confirmation failed: {e}")))?;
    if confirmed {
        Ok(())
    } else {
        Err(CliError::Cancelled("Command cancelled".to_string()).into())
    }
}

/// Send command implementation.
pub(crate) fn cmd_send(cli: &Cli, config: &Config, key: &str, yes: bool) -> Result<()> {
    let spec = lookup_key(key)?;
    confirm_dangerous(cli, spec, yes)?;

    let mut ups = open_ups(cli, config)?;
    let response = ups.send_predefined(spec.name)?;
    ups.disconnect()?;

    let Some(response) = response else {
        eprintln!("{} No response for '{}'", style("⚠").yellow(), spec.name);
        return Ok(());
    };

    println!("{}", render_reply(spec, &response)?);
    Ok(())
}

/// Status replies are printed as JSON, everything else (and status replies
/// that do not decode) as hex.
fn render_reply(spec: &CommandSpec, response: &[u8]) -> Result<String> {
    if spec.name != "Q" {
        return Ok(to_hex(response));
    }
    match decode_status(response) {
        Ok(status) => Ok(serde_json::to_string_pretty(&status)?),
        Err(e) => {
            warn!("Could not decode status reply: {e}");
            Ok(to_hex(response))
        },
    }
}

/// Parse hex arguments into frame bytes.
fn parse_hex_args(parts: &[String]) -> Result<Vec<u8>> {
    let joined = parts.join(" ");
    match parse_hex(&joined) {
        Some(bytes) if !bytes.is_empty() => Ok(bytes),
        _ => Err(CliError::Usage(format!("Invalid hex frame: '{joined}'")).into()),
    }
}

/// Hex command implementation.
pub(crate) fn cmd_hex(cli: &Cli, config: &Config, parts: &[String]) -> Result<()> {
    let frame = parse_hex_args(parts)?;

    let mut ups = open_ups(cli, config)?;
    info!("Sending raw frame: {}", to_hex(&frame));
    let response = ups.send_raw(&frame, SettleDelays::default().control)?;
    ups.disconnect()?;

    println!("sent:     {}", to_hex(&frame));
    match response {
        Some(bytes) => println!("received: {}", to_hex(&bytes)),
        None => println!("received: (no response)"),
    }
    Ok(())
}
