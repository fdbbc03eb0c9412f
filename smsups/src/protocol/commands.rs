//! Command registry.
//!
//! Every command the UPS understands is a fixed opcode followed by four
//! parameter bytes. Query commands use `0xFF` wildcards; control commands
//! carry device-specific values (battery test durations, shutdown/restore
//! timings).

use crate::error::{Error, Result};
use std::time::Duration;

/// Wildcard parameter bytes used by commands without arguments.
pub const WILDCARD: [u8; 4] = [0xFF, 0xFF, 0xFF, 0xFF];

/// Command class, which decides the settle delay before reading a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandClass {
    /// Read-only polling command.
    Simple,
    /// Predefined or state-changing command.
    Control,
}

/// Pause between writing a command and reading its reply, per class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettleDelays {
    /// Delay for simple polling commands.
    pub simple: Duration,
    /// Delay for predefined/control commands.
    pub control: Duration,
}

impl Default for SettleDelays {
    fn default() -> Self {
        Self {
            simple: Duration::from_millis(200),
            control: Duration::from_secs(1),
        }
    }
}

impl SettleDelays {
    /// Delay for the given command class.
    pub fn for_class(&self, class: CommandClass) -> Duration {
        match class {
            CommandClass::Simple => self.simple,
            CommandClass::Control => self.control,
        }
    }
}

/// A registered UPS command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandSpec {
    /// Symbolic key (e.g. `"Q"`, `"T1"`).
    pub name: &'static str,
    /// Opcode byte.
    pub opcode: u8,
    /// Parameter bytes.
    pub params: [u8; 4],
    /// Command class.
    pub class: CommandClass,
    /// Short human-readable description.
    pub description: &'static str,
    /// Whether the command can power the load down.
    pub dangerous: bool,
}

const fn simple(name: &'static str, opcode: u8, description: &'static str) -> CommandSpec {
    CommandSpec {
        name,
        opcode,
        params: WILDCARD,
        class: CommandClass::Simple,
        description,
        dangerous: false,
    }
}

const fn control(
    name: &'static str,
    opcode: u8,
    params: [u8; 4],
    description: &'static str,
) -> CommandSpec {
    CommandSpec {
        name,
        opcode,
        params,
        class: CommandClass::Control,
        description,
        dangerous: false,
    }
}

/// Every command known to the bridge, in display order.
static COMMANDS: &[CommandSpec] = &[
    simple("Q", 0x51, "General UPS status"),
    simple("I", 0x49, "Device information"),
    simple("F", 0x46, "Features"),
    control("M", 0x4D, WILDCARD, "Toggle beep on/off"),
    control("D", 0x44, WILDCARD, "Battery discharge test"),
    control("C", 0x43, WILDCARD, "Cancel active operation"),
    control("G", 0x47, [0x01, 0xFF, 0xFF, 0xFF], "Vendor function G"),
    control("L", 0x4C, WILDCARD, "Vendor function L"),
    control("T", 0x54, [0x00, 0x10, 0x00, 0x00], "Quick battery test (16 s)"),
    control("T1", 0x54, [0x00, 0x64, 0x00, 0x00], "Battery test (100 s)"),
    control("T2", 0x54, [0x00, 0xC8, 0x00, 0x00], "Battery test (200 s)"),
    control("T3", 0x54, [0x01, 0x2C, 0x00, 0x00], "Battery test (300 s)"),
    control("T9", 0x54, [0x03, 0x84, 0x00, 0x00], "Battery test (900 s)"),
    CommandSpec {
        dangerous: true,
        ..control("R", 0x52, [0x00, 0xC8, 0x27, 0x0F], "Shutdown & restore")
    },
];

/// Keys of the simple polling subset.
pub const SIMPLE_KEYS: &[&str] = &["Q", "I", "F"];

/// All registered commands.
pub fn all() -> &'static [CommandSpec] {
    COMMANDS
}

/// Look up a predefined command by key.
pub fn lookup(key: &str) -> Result<&'static CommandSpec> {
    COMMANDS
        .iter()
        .find(|c| c.name == key)
        .ok_or_else(|| Error::UnknownCommand(key.to_string()))
}

/// Look up a command from the simple polling subset.
pub fn simple_command(key: &str) -> Result<&'static CommandSpec> {
    if !SIMPLE_KEYS.contains(&key) {
        return Err(Error::UnknownCommand(key.to_string()));
    }
    lookup(key)
}

/// Comma-separated list of registered keys (for help text).
pub fn key_list() -> String {
    COMMANDS
        .iter()
        .map(|c| c.name)
        .collect::<Vec<_>>()
        .join(", ")
}
