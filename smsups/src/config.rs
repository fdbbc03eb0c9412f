//! Bridge and broker configuration.
//!
//! These structures are built once by the embedding application and passed
//! to the bridge; nothing here is read from globals.

use crate::error::{Error, Result};
use crate::protocol::commands::SettleDelays;
use std::time::Duration;

/// Default MQTT client identifier (also the discovery identity).
pub const DEFAULT_CLIENT_ID: &str = "sms_gamer_monitor";

/// Default base topic for status and commands.
pub const DEFAULT_TOPIC_BASE: &str = "sms_gamer/ups";

/// Default Home-Assistant discovery prefix.
pub const DEFAULT_DISCOVERY_PREFIX: &str = "homeassistant";

/// Default polling interval.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Device identity advertised in discovery payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Display name.
    pub name: String,
    /// Manufacturer.
    pub manufacturer: String,
    /// Model.
    pub model: String,
    /// Software/firmware version string.
    pub sw_version: String,
}

impl Default for DeviceInfo {
    fn default() -> Self {
        Self {
            name: "SMS Gamer UPS".to_string(),
            manufacturer: "SMS".to_string(),
            model: "Gamer".to_string(),
            sw_version: "v7".to_string(),
        }
    }
}

/// Runtime configuration of the bridge.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// MQTT client id; also prefixes every discovery unique id.
    pub client_id: String,
    /// Base topic (`<base>/status`, `<base>/command`).
    pub topic_base: String,
    /// Discovery prefix.
    pub discovery_prefix: String,
    /// Device identity.
    pub device: DeviceInfo,
    /// Interval between status polls.
    pub poll_interval: Duration,
    /// Settle delays for serial exchanges.
    pub settle: SettleDelays,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            client_id: DEFAULT_CLIENT_ID.to_string(),
            topic_base: DEFAULT_TOPIC_BASE.to_string(),
            discovery_prefix: DEFAULT_DISCOVERY_PREFIX.to_string(),
            device: DeviceInfo::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            settle: SettleDelays::default(),
        }
    }
}

impl BridgeConfig {
    /// Topic the decoded status is published on.
    pub fn status_topic(&self) -> String {
        format!("{}/status", self.topic_base.trim_end_matches('/'))
    }

    /// Topic inbound commands arrive on.
    pub fn command_topic(&self) -> String {
        format!("{}/command", self.topic_base.trim_end_matches('/'))
    }

    /// Set the polling interval.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Check the values the bridge cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.client_id.trim().is_empty() {
            return Err(Error::Config("client id must not be empty".to_string()));
        }
        if self.topic_base.trim_matches('/').trim().is_empty() {
            return Err(Error::Config("topic base must not be empty".to_string()));
        }
        if self.discovery_prefix.trim_matches('/').trim().is_empty() {
            return Err(Error::Config("discovery prefix must not be empty".to_string()));
        }
        if self.poll_interval.is_zero() {
            return Err(Error::Config("poll interval must be positive".to_string()));
        }
        Ok(())
    }
}

/// MQTT broker connection settings.
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    /// Broker host name or address.
    pub host: String,
    /// Broker port.
    pub port: u16,
    /// Optional user name.
    pub username: Option<String>,
    /// Optional password.
    pub password: Option<String>,
    /// Keep-alive interval.
    pub keep_alive: Duration,
    /// First reconnect delay.
    pub reconnect_min: Duration,
    /// Reconnect delay cap.
    pub reconnect_max: Duration,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 1883,
            username: None,
            password: None,
            keep_alive: Duration::from_secs(60),
            reconnect_min: Duration::from_secs(1),
            reconnect_max: Duration::from_secs(120),
        }
    }
}
