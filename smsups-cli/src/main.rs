//! smsups CLI - monitor SMS UPS units and bridge them to MQTT.
//!
//! ## Features
//!
//! - Service mode bridging UPS telemetry and commands to MQTT
//! - One-shot queries and a continuous console monitor
//! - Predefined and raw (hex) command sending
//! - Layered configuration (flags, environment, TOML files)
//! - Shell completion generation

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use console::style;
use env_logger::Env;
use log::debug;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

mod commands;
mod config;
mod serial;

use config::Config;

/// Set by the Ctrl-C handler.
static INTERRUPTED: AtomicBool = AtomicBool::new(false);

/// Whether the user pressed Ctrl-C.
pub(crate) fn was_interrupted() -> bool {
    INTERRUPTED.load(Ordering::Relaxed)
}

/// Errors with a dedicated exit code.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    /// Invalid invocation (exit code 2).
    #[error("{0}")]
    Usage(String),
    /// Unusable configuration (exit code 3).
    #[error("{0}")]
    Config(String),
    /// No serial port available (exit code 4).
    #[error("{0}")]
    DeviceNotFound(String),
    /// Cancelled by the user (exit code 130).
    #[error("{0}")]
    Cancelled(String),
}

impl CliError {
    fn exit_code(&self) -> i32 {
        match self {
            Self::Usage(_) => 2,
            Self::Config(_) => 3,
            Self::DeviceNotFound(_) => 4,
            Self::Cancelled(_) => 130,
        }
    }
}

/// Map an error to the process exit code.
fn exit_code_for(err: &anyhow::Error) -> i32 {
    if let Some(cli_err) = err.downcast_ref::<CliError>() {
        return cli_err.exit_code();
    }
    match err.downcast_ref::<smsups::Error>() {
        Some(smsups::Error::DeviceNotFound) => 4,
        Some(smsups::Error::Config(_)) => 3,
        _ => 1,
    }
}

/// smsups - SMS UPS monitor and MQTT bridge.
///
/// Environment variables:
///   SMSUPS_PORT              - Serial port
///   SMSUPS_BAUD              - Baud rate (default: 2400)
///   SMSUPS_TIMEOUT           - Serial read timeout in seconds (default: 3)
///   SMSUPS_INTERVAL          - Bridge polling interval in seconds (default: 10)
///   SMSUPS_MQTT_HOST         - MQTT broker host
///   SMSUPS_MQTT_PORT         - MQTT broker port
///   SMSUPS_MQTT_USERNAME     - MQTT user name
///   SMSUPS_MQTT_PASSWORD     - MQTT password
///   SMSUPS_NON_INTERACTIVE   - Non-interactive mode (disable prompts)
#[derive(Parser)]
#[command(name = "smsups")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Serial port to use (auto-detected if not specified).
    #[arg(short, long, global = true, env = "SMSUPS_PORT")]
    port: Option<String>,

    /// Serial baud rate.
    #[arg(short, long, global = true, env = "SMSUPS_BAUD")]
    baud: Option<u32>,

    /// Serial read timeout in seconds.
    #[arg(long, global = true, env = "SMSUPS_TIMEOUT", value_name = "SECS")]
    timeout: Option<u64>,

    /// Path to a configuration file.
    #[arg(long = "config", global = true, value_name = "PATH")]
    config_path: Option<PathBuf>,

    /// Verbose output level (-v, -vv for increasing detail).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode (warnings and errors only).
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Non-interactive mode (fail instead of prompting).
    #[arg(long, global = true, env = "SMSUPS_NON_INTERACTIVE")]
    non_interactive: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Broker and topic options of the bridge.
#[derive(Args, Debug, Clone, Default)]
struct BridgeArgs {
    /// Polling interval in seconds.
    #[arg(short, long, env = "SMSUPS_INTERVAL", value_name = "SECS")]
    interval: Option<f64>,

    /// MQTT broker host.
    #[arg(long, env = "SMSUPS_MQTT_HOST")]
    mqtt_host: Option<String>,

    /// MQTT broker port.
    #[arg(long, env = "SMSUPS_MQTT_PORT")]
    mqtt_port: Option<u16>,

    /// MQTT user name.
    #[arg(long, env = "SMSUPS_MQTT_USERNAME")]
    mqtt_username: Option<String>,

    /// MQTT password.
    #[arg(long, env = "SMSUPS_MQTT_PASSWORD", hide_env_values = true)]
    mqtt_password: Option<String>,

    /// MQTT client id (also the discovery identity).
    #[arg(long)]
    client_id: Option<String>,

    /// Base topic for status and commands.
    #[arg(long)]
    topic_base: Option<String>,

    /// Home-Assistant discovery prefix.
    #[arg(long)]
    discovery_prefix: Option<String>,
}

/// Simple polling commands.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
enum QueryKind {
    /// General status.
    #[default]
    #[value(name = "Q", alias = "q")]
    Q,
    /// Device information.
    #[value(name = "I", alias = "i")]
    I,
    /// Features.
    #[value(name = "F", alias = "f")]
    F,
}

impl QueryKind {
    fn key(self) -> &'static str {
        match self {
            Self::Q => "Q",
            Self::I => "I",
            Self::F => "F",
        }
    }
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Run the MQTT bridge (service mode).
    Bridge(BridgeArgs),

    /// Send a single polling command and print the reply.
    Query {
        /// Command to send.
        #[arg(value_enum, default_value_t = QueryKind::Q)]
        command: QueryKind,

        /// Print the decoded status as JSON to stdout.
        #[arg(long)]
        json: bool,
    },

    /// Poll the UPS continuously and print each status.
    Monitor {
        /// Polling interval in seconds (default: 2, or 0.5 with --raw).
        #[arg(short, long, value_name = "SECS")]
        interval: Option<f64>,

        /// Print each status as a JSON line.
        #[arg(long, conflicts_with = "raw")]
        json: bool,

        /// Print the raw reply in hex before the decoded status.
        #[arg(long)]
        raw: bool,
    },

    /// Send a predefined command.
    Send {
        /// Command key (see `smsups commands`).
        key: String,

        /// Do not ask for confirmation of dangerous commands.
        #[arg(short, long)]
        yes: bool,
    },

    /// Send a raw frame given in hex (spaces allowed).
    Hex {
        /// Frame bytes, e.g. "51 FF FF FF FF B3 0D".
        #[arg(required = true, num_args = 1..)]
        bytes: Vec<String>,
    },

    /// List the predefined commands.
    #[command(name = "commands")]
    ListCommands {
        /// Output the registry as JSON to stdout.
        #[arg(long)]
        json: bool,
    },

    /// List available serial ports.
    ListPorts {
        /// Output port list as JSON to stdout.
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completion scripts.
    Completions {
        /// Shell type.
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn init_logging(cli: &Cli) {
    let log_level = if cli.quiet {
        "warn"
    } else {
        match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };
    let timestamps = if cli.verbose >= 2 {
        Some(env_logger::TimestampPrecision::Millis)
    } else if matches!(cli.command, Commands::Bridge(_)) {
        Some(env_logger::TimestampPrecision::Seconds)
    } else {
        None
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level))
        .format_target(cli.verbose >= 2)
        .format_timestamp(timestamps)
        .init();
}

fn install_interrupt_handler() {
    if let Err(e) = ctrlc::set_handler(|| INTERRUPTED.store(true, Ordering::Relaxed)) {
        debug!("Failed to install Ctrl-C handler: {e}");
    }
    smsups::set_interrupt_checker(was_interrupted);
}

fn run(cli: &Cli) -> Result<()> {
    let config = if let Some(ref path) = cli.config_path {
        Config::load_from_path(path)
    } else {
        Config::load()
    };

    match &cli.command {
        Commands::Bridge(args) => commands::bridge::cmd_bridge(cli, &config, args),
        Commands::Query { command, json } => {
            commands::query::cmd_query(cli, &config, *command, *json)
        },
        Commands::Monitor {
            interval,
            json,
            raw,
        } => commands::monitor::cmd_monitor(cli, &config, *interval, *json, *raw),
        Commands::Send { key, yes } => commands::send::cmd_send(cli, &config, key, *yes),
        Commands::Hex { bytes } => commands::send::cmd_hex(cli, &config, bytes),
        Commands::ListCommands { json } => commands::registry::cmd_commands(*json),
        Commands::ListPorts { json } => commands::ports::cmd_list_ports(*json),
        Commands::Completions { shell } => {
            commands::completions::cmd_completions(*shell);
            Ok(())
        },
    }
}

fn main() {
    if std::env::var_os("NO_COLOR").is_some() || !console::Term::stderr().is_term() {
        console::set_colors_enabled(false);
        console::set_colors_enabled_stderr(false);
    }

    let cli = Cli::parse();
    init_logging(&cli);
    install_interrupt_handler();

    debug!(
        "smsups v{} (verbose level: {})",
        env!("CARGO_PKG_VERSION"),
        cli.verbose
    );

    if let Err(err) = run(&cli) {
        eprintln!("{} {err:#}", style("Error:").red().bold());
        std::process::exit(exit_code_for(&err));
    }
}
