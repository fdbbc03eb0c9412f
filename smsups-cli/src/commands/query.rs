//! One-shot polling command.

use anyhow::{Result, bail};
use smsups::{info_response, protocol::frame::to_hex, render_status_human};

use crate::config::Config;
use crate::serial::open_ups;
use crate::{Cli, QueryKind};

/// Query command implementation.
pub(crate) fn cmd_query(cli: &Cli, config: &Config, kind: QueryKind, json: bool) -> Result<()> {
    let mut ups = open_ups(cli, config)?;

    if kind == QueryKind::Q {
        let Some(status) = ups.query_status()? else {
            bail!("No response from UPS");
        };
        if json {
            println!("{}", serde_json::to_string_pretty(&status)?);
        } else {
            println!("{}", render_status_human(&status));
        }
        ups.disconnect()?;
        return Ok(());
    }

    let Some(raw) = ups.send_simple(kind.key())? else {
        bail!("No response from UPS");
    };
    match (kind, json) {
        (_, true) => println!(
            "{}",
            serde_json::json!({
                "command": kind.key(),
                "raw_response_hex": to_hex(&raw),
            })
        ),
        (QueryKind::I, false) => println!("{}", info_response(&raw)),
        _ => println!("{}", to_hex(&raw)),
    }
    ups.disconnect()?;
    Ok(())
}
