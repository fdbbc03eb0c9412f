//! Serial port listing.

use anyhow::Result;
use console::style;
use smsups::{auto_detect_port, detect_ports, format_port_list};

/// List ports command implementation.
pub(crate) fn cmd_list_ports(json: bool) -> Result<()> {
    let detected = detect_ports();

    if json {
        println!("{}", serde_json::to_string_pretty(&detected)?);
        return Ok(());
    }

    eprintln!("{}", style("Available serial ports:").bold().underlined());
    if detected.is_empty() {
        eprintln!("  {}", style("(none found)").dim());
        return Ok(());
    }

    for line in format_port_list(&detected) {
        eprintln!("  {} {line}", style("•").green());
    }
    if let Ok(port) = auto_detect_port() {
        eprintln!(
            "\n{} Auto-detected: {}",
            style("→").green().bold(),
            style(&port.name).cyan().bold()
        );
    }
    Ok(())
}
