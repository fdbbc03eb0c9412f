//! Configuration file support for smsups.
//!
//! Configuration is loaded from multiple sources with the following priority (highest first):
//! 1. Command-line arguments
//! 2. Environment variables (SMSUPS_*)
//! 3. Local config file (./smsups.toml)
//! 4. Global config file (~/.config/smsups/config.toml)
//!
//! `--config <PATH>` replaces the file lookup of 3 and 4.

use directories::ProjectDirs;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use smsups::{BridgeConfig, BrokerConfig, DeviceInfo};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Local configuration file name.
pub const LOCAL_CONFIG: &str = "smsups.toml";

/// Serial settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SerialSection {
    /// Serial port (e.g., "/dev/ttyUSB0" or "COM3").
    pub port: Option<String>,
    /// Baud rate.
    pub baud: Option<u32>,
    /// Read timeout in seconds.
    pub timeout_secs: Option<u64>,
}

/// Broker and topic settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MqttSection {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub client_id: Option<String>,
    pub topic_base: Option<String>,
    pub discovery_prefix: Option<String>,
    pub keep_alive_secs: Option<u64>,
}

/// Bridge runtime settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BridgeSection {
    /// Polling interval in seconds.
    pub interval_secs: Option<f64>,
}

/// Device identity advertised in discovery.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceSection {
    pub name: Option<String>,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub sw_version: Option<String>,
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub serial: SerialSection,
    #[serde(default)]
    pub mqtt: MqttSection,
    #[serde(default)]
    pub bridge: BridgeSection,
    #[serde(default)]
    pub device: DeviceSection,
}

/// Convert a user-supplied number of seconds into a non-zero interval.
///
/// Returns `None` for negative, non-finite, zero or out-of-range values.
pub fn interval_from_secs(secs: f64) -> Option<Duration> {
    Duration::try_from_secs_f64(secs)
        .ok()
        .filter(|interval| !interval.is_zero())
}

fn merge_opt<T>(target: &mut Option<T>, other: Option<T>) {
    if other.is_some() {
        *target = other;
    }
}

impl Config {
    /// Load configuration from all available sources.
    pub fn load() -> Self {
        let mut config = Self::default();

        if let Some(global_path) = Self::global_config_path() {
            if let Some(global_config) = Self::load_from_file(&global_path) {
                debug!("Loaded global config from {}", global_path.display());
                config.merge(global_config);
            }
        }

        // Local config overrides global
        if let Some(local_config) = Self::load_from_file(Path::new(LOCAL_CONFIG)) {
            debug!("Loaded local config from {LOCAL_CONFIG}");
            config.merge(local_config);
        }

        config
    }

    /// Load configuration from a specific file path (--config flag).
    pub fn load_from_path(path: &Path) -> Self {
        if let Some(config) = Self::load_from_file(path) {
            debug!("Loaded config from {}", path.display());
            config
        } else {
            warn!(
                "Could not load config from {}, using defaults",
                path.display()
            );
            Self::default()
        }
    }

    fn load_from_file(path: &Path) -> Option<Self> {
        if !path.exists() {
            return None;
        }

        match fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => Some(config),
                Err(e) => {
                    warn!("Failed to parse config file {}: {}", path.display(), e);
                    None
                },
            },
            Err(e) => {
                warn!("Failed to read config file {}: {}", path.display(), e);
                None
            },
        }
    }

    /// Get the global configuration directory.
    pub fn global_config_dir() -> Option<PathBuf> {
        ProjectDirs::from("", "", "smsups")
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Get the global configuration file path.
    pub fn global_config_path() -> Option<PathBuf> {
        Self::global_config_dir().map(|dir| dir.join("config.toml"))
    }

    /// Merge another config into this one; set values win.
    fn merge(&mut self, other: Self) {
        merge_opt(&mut self.serial.port, other.serial.port);
        merge_opt(&mut self.serial.baud, other.serial.baud);
        merge_opt(&mut self.serial.timeout_secs, other.serial.timeout_secs);

        merge_opt(&mut self.mqtt.host, other.mqtt.host);
        merge_opt(&mut self.mqtt.port, other.mqtt.port);
        merge_opt(&mut self.mqtt.username, other.mqtt.username);
        merge_opt(&mut self.mqtt.password, other.mqtt.password);
        merge_opt(&mut self.mqtt.client_id, other.mqtt.client_id);
        merge_opt(&mut self.mqtt.topic_base, other.mqtt.topic_base);
        merge_opt(&mut self.mqtt.discovery_prefix, other.mqtt.discovery_prefix);
        merge_opt(&mut self.mqtt.keep_alive_secs, other.mqtt.keep_alive_secs);

        merge_opt(&mut self.bridge.interval_secs, other.bridge.interval_secs);

        merge_opt(&mut self.device.name, other.device.name);
        merge_opt(&mut self.device.manufacturer, other.device.manufacturer);
        merge_opt(&mut self.device.model, other.device.model);
        merge_opt(&mut self.device.sw_version, other.device.sw_version);
    }

    /// Broker settings with file values over library defaults.
    pub fn broker_config(&self) -> BrokerConfig {
        let mut broker = BrokerConfig::default();
        if let Some(host) = &self.mqtt.host {
            broker.host.clone_from(host);
        }
        if let Some(port) = self.mqtt.port {
            broker.port = port;
        }
        broker.username.clone_from(&self.mqtt.username);
        broker.password.clone_from(&self.mqtt.password);
        if let Some(secs) = self.mqtt.keep_alive_secs {
            broker.keep_alive = Duration::from_secs(secs);
        }
        broker
    }

    /// Bridge settings with file values over library defaults.
    pub fn bridge_config(&self) -> BridgeConfig {
        let mut bridge = BridgeConfig::default();
        if let Some(id) = &self.mqtt.client_id {
            bridge.client_id.clone_from(id);
        }
        if let Some(base) = &self.mqtt.topic_base {
            bridge.topic_base.clone_from(base);
        }
        if let Some(prefix) = &self.mqtt.discovery_prefix {
            bridge.discovery_prefix.clone_from(prefix);
        }
        if let Some(interval) = self.bridge.interval_secs.and_then(interval_from_secs) {
            bridge = bridge.with_poll_interval(interval);
        }

        let defaults = DeviceInfo::default();
        bridge.device = DeviceInfo {
            name: self.device.name.clone().unwrap_or(defaults.name),
            manufacturer: self
                .device
                .manufacturer
                .clone()
                .unwrap_or(defaults.manufacturer),
            model: self.device.model.clone().unwrap_or(defaults.model),
            sw_version: self
                .device
                .sw_version
                .clone()
                .unwrap_or(defaults.sw_version),
        };
        bridge
    }
}
