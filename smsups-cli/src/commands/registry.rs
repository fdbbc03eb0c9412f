//! Command registry listing.

use anyhow::Result;
use console::style;
use smsups::{
    CommandClass,
    protocol::{commands, frame::to_hex},
};

/// Commands command implementation.
pub(crate) fn cmd_commands(json: bool) -> Result<()> {
    if json {
        let entries: Vec<serde_json::Value> = commands::all()
            .iter()
            .map(|c| {
                serde_json::json!({
                    "key": c.name,
                    "opcode": format!("{:02x}", c.opcode),
                    "params": to_hex(&c.params),
                    "frame": to_hex(&smsups::CommandFrame::from(c).build()),
                    "class": match c.class {
                        CommandClass::Simple => "simple",
                        CommandClass::Control => "control",
                    },
                    "description": c.description,
                    "dangerous": c.dangerous,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    for c in commands::all() {
        let warning = if c.dangerous {
            format!(" {}", style("(dangerous)").red())
        } else {
            String::new()
        };
        println!(
            "  {:<3} {}  {}{warning}",
            style(c.name).cyan().bold(),
            style(to_hex(&smsups::CommandFrame::from(c).build())).dim(),
            c.description
        );
    }
    Ok(())
}
