//! Home-Assistant MQTT discovery documents.
//!
//! Every entity is announced with a retained config message at
//! `<prefix>/<component>/<client_id>_<key>/config`. The set is fully
//! deterministic for a given [`BridgeConfig`], so republishing it after a
//! reconnect overwrites the previous documents in place.

use crate::config::BridgeConfig;
use crate::protocol::status::UpsFlag;
use serde_json::{Map, Value, json};

/// A single discovery config message.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveryMessage {
    /// Config topic.
    pub topic: String,
    /// JSON document.
    pub payload: Value,
}

impl DiscoveryMessage {
    /// Serialized payload.
    pub fn payload_bytes(&self) -> Vec<u8> {
        self.payload.to_string().into_bytes()
    }
}

struct SensorDef {
    key: &'static str,
    label: &'static str,
    unit: Option<&'static str>,
    device_class: Option<&'static str>,
    icon: Option<&'static str>,
    measurement: bool,
}

const fn measured(
    key: &'static str,
    label: &'static str,
    unit: &'static str,
    device_class: Option<&'static str>,
    icon: Option<&'static str>,
) -> SensorDef {
    SensorDef {
        key,
        label,
        unit: Some(unit),
        device_class,
        icon,
        measurement: true,
    }
}

const SENSORS: &[SensorDef] = &[
    measured("vin", "Input Voltage", "V", Some("voltage"), None),
    measured("vout", "Output Voltage", "V", Some("voltage"), None),
    measured("load_percent", "Load Percent", "%", None, Some("mdi:gauge")),
    measured("frequency", "Frequency", "Hz", Some("frequency"), None),
    measured("battery_percent", "Battery Percent", "%", Some("battery"), None),
    measured("temperature", "Temperature", "°C", Some("temperature"), None),
    SensorDef {
        key: "active_flags_str",
        label: "Active Flags",
        unit: None,
        device_class: None,
        icon: Some("mdi:information-outline"),
        measurement: false,
    },
];

/// (flag, label, device_class, icon)
const BINARY_SENSORS: &[(UpsFlag, &str, Option<&str>, Option<&str>)] = &[
    (UpsFlag::BatteryInUse, "Battery In Use", Some("running"), None),
    (UpsFlag::LowBattery, "Low Battery", Some("battery"), None),
    (UpsFlag::Bypass, "Bypass", None, Some("mdi:power-plug-off")),
    (UpsFlag::Boost, "Boost", None, Some("mdi:flash")),
    (UpsFlag::UpsOk, "UPS OK", Some("problem"), None),
    (UpsFlag::TestActive, "Test Active", None, Some("mdi:test-tube")),
    (UpsFlag::ShutdownActive, "Shutdown Active", None, Some("mdi:power-off")),
    (UpsFlag::BeepOn, "Beep On", None, Some("mdi:volume-high")),
];

/// (key, label, command, icon)
const BUTTONS: &[(&str, &str, &str, &str)] = &[
    ("battery_test", "Battery Test", "T", "mdi:battery-charging"),
    ("battery_discharge", "Battery Discharge", "D", "mdi:battery-alert"),
    ("cancel_action", "Cancel Action", "C", "mdi:cancel"),
    ("shutdown_restore", "Shutdown & Restore", "R", "mdi:power-cycle"),
];

/// Command payload understood by the bridge's command topic.
pub fn command_payload(key: &str) -> String {
    json!({ "command": key }).to_string()
}

fn flag_template(flag: UpsFlag) -> String {
    let (on, off) = if flag == UpsFlag::UpsOk {
        // "problem" is ON when the UPS does not report OK
        ("OFF", "ON")
    } else {
        ("ON", "OFF")
    };
    format!(
        "{{% if '{}' in value_json.active_flags %}}{on}{{% else %}}{off}{{% endif %}}",
        flag.name()
    )
}

fn insert_opt(map: &mut Map<String, Value>, key: &str, value: Option<&str>) {
    if let Some(v) = value {
        map.insert(key.to_string(), Value::from(v));
    }
}

struct Builder<'a> {
    config: &'a BridgeConfig,
    device: Value,
    status_topic: String,
    command_topic: String,
}

impl<'a> Builder<'a> {
    fn new(config: &'a BridgeConfig) -> Self {
        let device = json!({
            "identifiers": [config.client_id],
            "name": config.device.name,
            "manufacturer": config.device.manufacturer,
            "model": config.device.model,
            "sw_version": config.device.sw_version,
        });
        Self {
            config,
            device,
            status_topic: config.status_topic(),
            command_topic: config.command_topic(),
        }
    }

    fn unique_id(&self, key: &str) -> String {
        format!("{}_{key}", self.config.client_id)
    }

    fn topic(&self, component: &str, key: &str) -> String {
        format!(
            "{}/{component}/{}/config",
            self.config.discovery_prefix.trim_end_matches('/'),
            self.unique_id(key)
        )
    }

    fn base(&self, key: &str, label: &str) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert(
            "name".into(),
            Value::from(format!("{} {label}", self.config.device.name)),
        );
        map.insert("unique_id".into(), Value::from(self.unique_id(key)));
        map.insert("device".into(), self.device.clone());
        map.insert("qos".into(), Value::from(1));
        map
    }

    fn message(&self, component: &str, key: &str, payload: Map<String, Value>) -> DiscoveryMessage {
        DiscoveryMessage {
            topic: self.topic(component, key),
            payload: Value::Object(payload),
        }
    }

    fn sensor(&self, def: &SensorDef) -> DiscoveryMessage {
        let mut map = self.base(def.key, def.label);
        map.insert("state_topic".into(), Value::from(self.status_topic.clone()));
        map.insert(
            "value_template".into(),
            Value::from(format!("{{{{ value_json.{} }}}}", def.key)),
        );
        map.insert("force_update".into(), Value::from(true));
        insert_opt(&mut map, "unit_of_measurement", def.unit);
        insert_opt(&mut map, "device_class", def.device_class);
        insert_opt(&mut map, "icon", def.icon);
        if def.measurement {
            map.insert("state_class".into(), Value::from("measurement"));
        }
        self.message("sensor", def.key, map)
    }

    fn binary_sensor(
        &self,
        flag: UpsFlag,
        label: &str,
        device_class: Option<&str>,
        icon: Option<&str>,
    ) -> DiscoveryMessage {
        let key = flag.name().to_lowercase();
        let mut map = self.base(&key, label);
        map.insert("state_topic".into(), Value::from(self.status_topic.clone()));
        map.insert("value_template".into(), Value::from(flag_template(flag)));
        map.insert("payload_on".into(), Value::from("ON"));
        map.insert("payload_off".into(), Value::from("OFF"));
        map.insert("entity_category".into(), Value::from("diagnostic"));
        insert_opt(&mut map, "device_class", device_class);
        insert_opt(&mut map, "icon", icon);
        self.message("binary_sensor", &key, map)
    }

    fn beep_switch(&self) -> DiscoveryMessage {
        let toggle = command_payload("M");
        let mut map = self.base("beep_control", "Beep Control");
        map.insert("state_topic".into(), Value::from(self.status_topic.clone()));
        map.insert(
            "value_template".into(),
            Value::from(flag_template(UpsFlag::BeepOn)),
        );
        map.insert("state_on".into(), Value::from("ON"));
        map.insert("state_off".into(), Value::from("OFF"));
        map.insert("command_topic".into(), Value::from(self.command_topic.clone()));
        map.insert("payload_on".into(), Value::from(toggle.clone()));
        map.insert("payload_off".into(), Value::from(toggle));
        map.insert("icon".into(), Value::from("mdi:volume-high"));
        self.message("switch", "beep_control", map)
    }

    fn button(&self, key: &str, label: &str, command: &str, icon: &str) -> DiscoveryMessage {
        let mut map = self.base(key, label);
        map.insert("command_topic".into(), Value::from(self.command_topic.clone()));
        map.insert("payload_press".into(), Value::from(command_payload(command)));
        map.insert("icon".into(), Value::from(icon));
        self.message("button", key, map)
    }
}

/// Build the full discovery set: sensors, binary sensors, the beep switch
/// and the action buttons, in that order.
pub fn discovery_messages(config: &BridgeConfig) -> Vec<DiscoveryMessage> {
    let builder = Builder::new(config);
    let mut messages = Vec::with_capacity(SENSORS.len() + BINARY_SENSORS.len() + 1 + BUTTONS.len());

    messages.extend(SENSORS.iter().map(|def| builder.sensor(def)));
    messages.extend(
        BINARY_SENSORS
            .iter()
            .map(|&(flag, label, class, icon)| builder.binary_sensor(flag, label, class, icon)),
    );
    messages.push(builder.beep_switch());
    messages.extend(
        BUTTONS
            .iter()
            .map(|&(key, label, command, icon)| builder.button(key, label, command, icon)),
    );
    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn find<'a>(messages: &'a [DiscoveryMessage], topic: &str) -> &'a Value {
        &messages
            .iter()
            .find(|m| m.topic == topic)
            .unwrap_or_else(|| panic!("missing {topic}"))
            .payload
    }

    #[test]
    fn test_discovery_count_and_unique_topics() {
        let messages = discovery_messages(&BridgeConfig::default());
        assert_eq!(messages.len(), 7 + 8 + 1 + 4);
        let topics: HashSet<_> = messages.iter().map(|m| m.topic.as_str()).collect();
        assert_eq!(topics.len(), messages.len());
    }

    #[test]
    fn test_discovery_is_deterministic() {
        let config = BridgeConfig::default();
        assert_eq!(discovery_messages(&config), discovery_messages(&config));
    }

    #[test]
    fn test_sensor_payload() {
        let messages = discovery_messages(&BridgeConfig::default());
        let vin = find(&messages, "homeassistant/sensor/sms_gamer_monitor_vin/config");
        assert_eq!(vin["name"], "SMS Gamer UPS Input Voltage");
        assert_eq!(vin["unique_id"], "sms_gamer_monitor_vin");
        assert_eq!(vin["state_topic"], "sms_gamer/ups/status");
        assert_eq!(vin["value_template"], "{{ value_json.vin }}");
        assert_eq!(vin["unit_of_measurement"], "V");
        assert_eq!(vin["device_class"], "voltage");
        assert_eq!(vin["state_class"], "measurement");
        assert_eq!(vin["qos"], 1);
        assert_eq!(vin["force_update"], true);
        assert_eq!(vin["device"]["identifiers"], json!(["sms_gamer_monitor"]));
        assert_eq!(vin["device"]["sw_version"], "v7");

        let flags = find(
            &messages,
            "homeassistant/sensor/sms_gamer_monitor_active_flags_str/config",
        );
        assert_eq!(flags["icon"], "mdi:information-outline");
        assert!(flags.get("state_class").is_none());
    }

    #[test]
    fn test_binary_sensor_templates() {
        let messages = discovery_messages(&BridgeConfig::default());
        let bat = find(
            &messages,
            "homeassistant/binary_sensor/sms_gamer_monitor_batteryinuse/config",
        );
        assert_eq!(
            bat["value_template"],
            "{% if 'BatteryInUse' in value_json.active_flags %}ON{% else %}OFF{% endif %}"
        );
        assert_eq!(bat["device_class"], "running");
        assert_eq!(bat["entity_category"], "diagnostic");

        let ok = find(
            &messages,
            "homeassistant/binary_sensor/sms_gamer_monitor_upsok/config",
        );
        assert_eq!(ok["device_class"], "problem");
        assert_eq!(
            ok["value_template"],
            "{% if 'UpsOk' in value_json.active_flags %}OFF{% else %}ON{% endif %}"
        );
    }

    #[test]
    fn test_switch_and_buttons() {
        let messages = discovery_messages(&BridgeConfig::default());
        let beep = find(
            &messages,
            "homeassistant/switch/sms_gamer_monitor_beep_control/config",
        );
        assert_eq!(beep["command_topic"], "sms_gamer/ups/command");
        assert_eq!(beep["payload_on"], r#"{"command":"M"}"#);
        assert_eq!(beep["payload_off"], beep["payload_on"]);

        let restore = find(
            &messages,
            "homeassistant/button/sms_gamer_monitor_shutdown_restore/config",
        );
        assert_eq!(restore["name"], "SMS Gamer UPS Shutdown & Restore");
        assert_eq!(restore["payload_press"], r#"{"command":"R"}"#);
        assert_eq!(restore["icon"], "mdi:power-cycle");
        assert_eq!(
            messages.last().map(|m| m.topic.as_str()),
            Some("homeassistant/button/sms_gamer_monitor_shutdown_restore/config")
        );
    }

    #[test]
    fn test_custom_identity() {
        let mut config = BridgeConfig {
            client_id: "garage_ups".to_string(),
            discovery_prefix: "ha".to_string(),
            topic_base: "garage/ups".to_string(),
            ..Default::default()
        };
        config.device.name = "Garage UPS".to_string();

        let messages = discovery_messages(&config);
        assert!(messages.iter().all(|m| m.topic.starts_with("ha/")));
        let temp = find(&messages, "ha/sensor/garage_ups_temperature/config");
        assert_eq!(temp["name"], "Garage UPS Temperature");
        assert_eq!(temp["state_topic"], "garage/ups/status");
    }

    #[test]
    fn test_command_payload_parses_back() {
        let value: Value = serde_json::from_str(&command_payload("T")).unwrap();
        assert_eq!(value["command"], "T");
    }
}
