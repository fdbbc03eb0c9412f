//! Serial-to-MQTT bridge runtime.
//!
//! The bridge owns the UPS session and a broker link. Two activities share
//! it: the polling loop ([`Bridge::run`]) on the caller's thread and the MQTT
//! network loop, which calls [`Bridge::on_connected`],
//! [`Bridge::on_disconnected`] and [`Bridge::on_message`] from its own
//! thread.
//!
//! ```text
//! Idle -> SerialConnecting -> SerialConnected -> MqttConnecting
//!      -> MqttConnected <-> MqttDisconnected <-> MqttReconnecting
//!      -> ShuttingDown -> Stopped
//! ```
//!
//! The UPS sits behind a single mutex that is held for a whole
//! write/settle/read exchange, so a command received over MQTT never
//! interleaves bytes with a scheduled poll.

use crate::config::BridgeConfig;
use crate::discovery::discovery_messages;
use crate::error::{Error, Result};
use crate::port::Port;
use crate::protocol::commands;
use crate::protocol::frame::to_hex;
use crate::protocol::status::StatusResponse;
use crate::ups::Ups;
use log::{debug, error, info, warn};
use serde_json::Value;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

/// Granularity of interruptible sleeps.
pub const SLEEP_SLICE: Duration = Duration::from_millis(100);

/// Broker operations the bridge needs. All publishes use QoS 1.
pub trait MqttLink: Send + Sync {
    /// Subscribe to `topic`.
    fn subscribe(&self, topic: &str) -> Result<()>;

    /// Publish `payload` to `topic`.
    fn publish(&self, topic: &str, payload: Vec<u8>, retain: bool) -> Result<()>;

    /// Disconnect from the broker.
    fn disconnect(&self) -> Result<()>;
}

/// Lifecycle state of the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    /// Not started.
    Idle,
    /// Opening the serial port.
    SerialConnecting,
    /// Serial port open, broker not yet contacted.
    SerialConnected,
    /// First broker connection attempt in progress.
    MqttConnecting,
    /// Connected to the broker and bridging.
    MqttConnected,
    /// Broker connection lost.
    MqttDisconnected,
    /// Waiting to retry the broker connection.
    MqttReconnecting,
    /// Shutdown requested.
    ShuttingDown,
    /// Serial closed and broker disconnected.
    Stopped,
}

impl BridgeState {
    /// Whether shutdown has started.
    pub fn is_stopping(self) -> bool {
        matches!(self, Self::ShuttingDown | Self::Stopped)
    }
}

impl fmt::Display for BridgeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::SerialConnecting => "serial connecting",
            Self::SerialConnected => "serial connected",
            Self::MqttConnecting => "mqtt connecting",
            Self::MqttConnected => "mqtt connected",
            Self::MqttDisconnected => "mqtt disconnected",
            Self::MqttReconnecting => "mqtt reconnecting",
            Self::ShuttingDown => "shutting down",
            Self::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Mutable runtime bookkeeping.
#[derive(Debug, Clone)]
pub struct BridgeSession {
    /// Current state.
    pub state: BridgeState,
    /// Successful broker connections so far.
    pub connects: u64,
    /// Status documents published.
    pub published: u64,
    /// Last decoded status.
    pub last_status: Option<StatusResponse>,
}

impl Default for BridgeSession {
    fn default() -> Self {
        Self {
            state: BridgeState::Idle,
            connects: 0,
            published: 0,
            last_status: None,
        }
    }
}

/// Outcome of an inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Not addressed to us, our own purge echo, or received during shutdown.
    Ignored,
    /// Command executed on the UPS.
    Executed {
        /// Registry key.
        key: String,
        /// UPS reply, if any.
        response: Option<Vec<u8>>,
    },
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The bridge.
pub struct Bridge<P: Port, M: MqttLink> {
    config: BridgeConfig,
    ups: Mutex<Ups<P>>,
    link: M,
    session: Mutex<BridgeSession>,
}

impl<P: Port, M: MqttLink> Bridge<P, M> {
    /// Open the serial side and build the bridge.
    ///
    /// An invalid configuration is rejected before the port is opened.
    /// Failing to open the serial port is fatal: the error is returned and
    /// nothing is retried.
    pub fn open<F>(config: BridgeConfig, open_port: F, link: M) -> Result<Self>
    where
        F: FnOnce() -> Result<P>,
    {
        config.validate()?;
        let session = Mutex::new(BridgeSession::default());
        lock(&session).state = BridgeState::SerialConnecting;

        let port = open_port().inspect_err(|e| error!("Failed to open UPS serial port: {e}"))?;
        info!("Connected to UPS on {} (baud: {})", port.name(), port.baud_rate());
        let ups = Ups::new(port).with_settle_delays(config.settle);

        let bridge = Self {
            config,
            ups: Mutex::new(ups),
            link,
            session,
        };
        bridge.set_state(BridgeState::SerialConnected);
        Ok(bridge)
    }

    /// Bridge configuration.
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Broker link.
    pub fn link(&self) -> &M {
        &self.link
    }

    /// Run `f` with the session locked.
    pub fn with_session<R>(&self, f: impl FnOnce(&mut BridgeSession) -> R) -> R {
        f(&mut lock(&self.session))
    }

    /// Current state.
    pub fn state(&self) -> BridgeState {
        self.with_session(|s| s.state)
    }

    /// Whether shutdown has started.
    pub fn is_stopping(&self) -> bool {
        self.state().is_stopping()
    }

    fn set_state(&self, state: BridgeState) {
        let previous = self.with_session(|s| std::mem::replace(&mut s.state, state));
        if previous != state {
            debug!("Bridge state: {previous} -> {state}");
        }
    }

    /// Mark the first broker connection attempt.
    pub fn on_connecting(&self) {
        if !self.is_stopping() {
            self.set_state(BridgeState::MqttConnecting);
        }
    }

    /// Mark a pending broker reconnection attempt.
    pub fn on_reconnecting(&self) {
        if !self.is_stopping() {
            self.set_state(BridgeState::MqttReconnecting);
        }
    }

    /// Handle a successful broker connection: subscribe to the command
    /// topic, purge retained commands, then republish discovery.
    pub fn on_connected(&self) -> Result<()> {
        if self.is_stopping() {
            return Ok(());
        }
        self.with_session(|s| {
            s.state = BridgeState::MqttConnected;
            s.connects += 1;
        });
        info!("Connected to MQTT broker");

        let command_topic = self.config.command_topic();
        self.link.subscribe(&command_topic)?;
        info!("Subscribed to '{command_topic}'");

        self.link.publish(&command_topic, Vec::new(), true)?;
        debug!("Purged retained messages on '{command_topic}'");

        let messages = discovery_messages(&self.config);
        for message in &messages {
            self.link
                .publish(&message.topic, message.payload_bytes(), true)?;
            debug!("Published discovery config to {}", message.topic);
        }
        info!("Published {} discovery configs", messages.len());
        Ok(())
    }

    /// Handle loss of the broker connection.
    pub fn on_disconnected(&self) {
        if self.is_stopping() {
            return;
        }
        if self.state() == BridgeState::MqttConnected {
            warn!("Disconnected from MQTT broker");
        }
        self.set_state(BridgeState::MqttDisconnected);
    }

    /// Handle an inbound message.
    ///
    /// Malformed payloads and unknown commands are logged and returned as
    /// errors; the caller only needs to carry on.
    pub fn on_message(&self, topic: &str, payload: &[u8]) -> Result<Dispatch> {
        if topic != self.config.command_topic() || payload.is_empty() || self.is_stopping() {
            return Ok(Dispatch::Ignored);
        }
        info!(
            "MQTT message on '{topic}': {}",
            String::from_utf8_lossy(payload)
        );
        self.dispatch(payload)
            .inspect_err(|e| warn!("Dropped command message: {e}"))
    }

    fn dispatch(&self, payload: &[u8]) -> Result<Dispatch> {
        let value: Value =
            serde_json::from_slice(payload).map_err(|e| Error::ProtocolDecode(e.to_string()))?;
        let key = value
            .get("command")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::ProtocolDecode("missing \"command\" key".to_string()))?;
        commands::lookup(key)?;

        let response = lock(&self.ups).send_predefined(key)?;
        match &response {
            Some(bytes) => info!("Command '{key}' response: {}", to_hex(bytes)),
            None => info!("Command '{key}' sent via MQTT, no response"),
        }
        Ok(Dispatch::Executed {
            key: key.to_string(),
            response,
        })
    }

    /// Run one polling cycle.
    ///
    /// Returns the decoded status, or `None` when the UPS stayed silent.
    /// The status is only published while the broker is connected.
    pub fn poll_once(&self) -> Result<Option<StatusResponse>> {
        let Some(status) = lock(&self.ups).query_status()? else {
            return Ok(None);
        };

        if self.state() == BridgeState::MqttConnected {
            let topic = self.config.status_topic();
            self.link
                .publish(&topic, status.to_json()?.into_bytes(), false)?;
            self.with_session(|s| s.published += 1);
            debug!("Published status to '{topic}'");
        } else {
            debug!("Broker not connected, status not published");
        }

        self.with_session(|s| s.last_status = Some(status.clone()));
        Ok(Some(status))
    }

    /// Poll until `stop` returns true, then shut down.
    ///
    /// Cycle failures are logged and skipped; the loop never aborts on its
    /// own.
    pub fn run<S>(&self, stop: S)
    where
        S: Fn() -> bool,
    {
        info!(
            "Polling UPS every {:.1}s",
            self.config.poll_interval.as_secs_f64()
        );

        while !stop() && !self.is_stopping() {
            match self.poll_once() {
                Ok(Some(status)) => debug!("Status: {}", status.active_flags_str),
                Ok(None) => warn!("No response from UPS, skipping cycle"),
                Err(e) if e.is_recoverable() => warn!("Poll cycle skipped: {e}"),
                Err(e) => error!("Poll cycle failed: {e}"),
            }
            sleep_until_stopped(self.config.poll_interval, || stop() || self.is_stopping());
        }

        self.shutdown();
    }

    /// Close the serial port and disconnect from the broker. Idempotent.
    pub fn shutdown(&self) {
        if self.is_stopping() {
            return;
        }
        self.set_state(BridgeState::ShuttingDown);
        info!("Shutting down bridge");

        if let Err(e) = lock(&self.ups).disconnect() {
            warn!("Failed to close serial port: {e}");
        }
        if let Err(e) = self.link.disconnect() {
            warn!("Failed to disconnect from broker: {e}");
        }
        self.set_state(BridgeState::Stopped);
    }
}

/// Sleep for `total`, waking early once `stop` returns true.
pub fn sleep_until_stopped<S>(total: Duration, stop: S)
where
    S: Fn() -> bool,
{
    let deadline = Instant::now() + total;
    loop {
        if stop() {
            return;
        }
        let now = Instant::now();
        if now >= deadline {
            return;
        }
        thread::sleep(SLEEP_SLICE.min(deadline - now));
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::port::mock::MockPort;
    use crate::protocol::commands::SettleDelays;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub(crate) enum LinkEvent {
        Subscribe(String),
        Publish {
            topic: String,
            payload: Vec<u8>,
            retain: bool,
        },
        Disconnect,
    }

    /// Broker link that records every call.
    #[derive(Default)]
    pub(crate) struct RecordingLink {
        pub events: Mutex<Vec<LinkEvent>>,
        pub fail_publish: AtomicBool,
    }

    impl RecordingLink {
        pub fn events(&self) -> Vec<LinkEvent> {
            lock(&self.events).clone()
        }
    }

    impl MqttLink for RecordingLink {
        fn subscribe(&self, topic: &str) -> Result<()> {
            lock(&self.events).push(LinkEvent::Subscribe(topic.to_string()));
            Ok(())
        }

        fn publish(&self, topic: &str, payload: Vec<u8>, retain: bool) -> Result<()> {
            if self.fail_publish.load(Ordering::Relaxed) {
                return Err(Error::BrokerUnavailable("request queue full".into()));
            }
            lock(&self.events).push(LinkEvent::Publish {
                topic: topic.to_string(),
                payload,
                retain,
            });
            Ok(())
        }

        fn disconnect(&self) -> Result<()> {
            lock(&self.events).push(LinkEvent::Disconnect);
            Ok(())
        }
    }

    fn fast_config() -> BridgeConfig {
        BridgeConfig {
            settle: SettleDelays {
                simple: Duration::ZERO,
                control: Duration::ZERO,
            },
            poll_interval: Duration::from_millis(20),
            ..Default::default()
        }
    }

    fn status_reply() -> Vec<u8> {
        vec![
            0x00, 0x00, 0x00, 0x09, 0x60, 0x00, 0xE6, 0x00, 0x00, 0x02, 0x58, 0x03, 0x84, 0x01,
            0xF4, 0x81, 0x0D,
        ]
    }

    fn bridge_with(port: MockPort) -> Bridge<MockPort, RecordingLink> {
        Bridge::open(fast_config(), || Ok(port), RecordingLink::default()).unwrap()
    }

    fn written(bridge: &Bridge<MockPort, RecordingLink>) -> Vec<Vec<u8>> {
        lock(&bridge.ups).port().written.clone()
    }

    #[test]
    fn test_open_failure_is_fatal() {
        let result: Result<Bridge<MockPort, RecordingLink>> = Bridge::open(
            fast_config(),
            || Err(Error::DeviceNotFound),
            RecordingLink::default(),
        );
        assert!(matches!(result, Err(Error::DeviceNotFound)));
    }

    #[test]
    fn test_open_rejects_invalid_config_before_opening_port() {
        let config = BridgeConfig {
            topic_base: String::new(),
            ..fast_config()
        };
        let opened = AtomicBool::new(false);
        let result = Bridge::open(
            config,
            || {
                opened.store(true, Ordering::Relaxed);
                Ok(MockPort::default())
            },
            RecordingLink::default(),
        );
        assert!(matches!(result, Err(Error::Config(_))));
        assert!(!opened.load(Ordering::Relaxed));
    }

    #[test]
    fn test_state_transitions() {
        let bridge = bridge_with(MockPort::default());
        assert_eq!(bridge.state(), BridgeState::SerialConnected);
        bridge.on_connecting();
        assert_eq!(bridge.state(), BridgeState::MqttConnecting);
        bridge.on_connected().unwrap();
        assert_eq!(bridge.state(), BridgeState::MqttConnected);
        bridge.on_disconnected();
        assert_eq!(bridge.state(), BridgeState::MqttDisconnected);
        bridge.on_reconnecting();
        assert_eq!(bridge.state(), BridgeState::MqttReconnecting);
        bridge.shutdown();
        assert_eq!(bridge.state(), BridgeState::Stopped);

        // Late network events do not resurrect a stopped bridge
        bridge.on_connected().unwrap();
        bridge.on_disconnected();
        assert_eq!(bridge.state(), BridgeState::Stopped);
    }

    #[test]
    fn test_connect_sequence_order() {
        let bridge = bridge_with(MockPort::default());
        bridge.on_connected().unwrap();

        let events = bridge.link().events();
        let discovery = discovery_messages(bridge.config());
        assert_eq!(events.len(), 2 + discovery.len());
        assert_eq!(events[0], LinkEvent::Subscribe("sms_gamer/ups/command".into()));
        assert_eq!(
            events[1],
            LinkEvent::Publish {
                topic: "sms_gamer/ups/command".into(),
                payload: Vec::new(),
                retain: true,
            }
        );
        for (event, message) in events[2..].iter().zip(&discovery) {
            assert_eq!(
                event,
                &LinkEvent::Publish {
                    topic: message.topic.clone(),
                    payload: message.payload_bytes(),
                    retain: true,
                }
            );
        }
    }

    #[test]
    fn test_connect_sequence_once_per_connect() {
        let bridge = bridge_with(MockPort::default());
        bridge.on_connected().unwrap();
        let first = bridge.link().events();
        bridge.on_disconnected();
        bridge.on_reconnecting();
        bridge.on_connected().unwrap();

        let all = bridge.link().events();
        assert_eq!(all.len(), first.len() * 2);
        assert_eq!(&all[first.len()..], first.as_slice());
        assert_eq!(bridge.with_session(|s| s.connects), 2);
    }

    #[test]
    fn test_connect_reports_broker_errors() {
        let bridge = bridge_with(MockPort::default());
        bridge.link().fail_publish.store(true, Ordering::Relaxed);
        assert!(matches!(bridge.on_connected(), Err(Error::BrokerUnavailable(_))));
    }

    #[test]
    fn test_dispatch_registered_command() {
        let bridge = bridge_with(MockPort::with_replies([vec![0x4D, 0x0D]]));
        let outcome = bridge
            .on_message("sms_gamer/ups/command", br#"{"command": "M"}"#)
            .unwrap();
        assert_eq!(
            outcome,
            Dispatch::Executed {
                key: "M".into(),
                response: Some(vec![0x4D, 0x0D]),
            }
        );
        assert_eq!(written(&bridge), vec![vec![0x4D, 0xFF, 0xFF, 0xFF, 0xFF, 0xB7, 0x0D]]);
        // Response is not republished
        assert!(bridge.link().events().is_empty());
    }

    #[test]
    fn test_dispatch_uses_control_settle_for_simple_keys() {
        let config = BridgeConfig {
            settle: SettleDelays {
                simple: Duration::ZERO,
                control: Duration::from_millis(300),
            },
            ..fast_config()
        };
        let port = MockPort::with_replies([status_reply()]);
        let bridge = Bridge::open(config, || Ok(port), RecordingLink::default()).unwrap();

        let start = Instant::now();
        let outcome = bridge
            .on_message("sms_gamer/ups/command", br#"{"command": "Q"}"#)
            .unwrap();
        assert!(start.elapsed() >= Duration::from_millis(300));
        assert!(matches!(
            outcome,
            Dispatch::Executed { ref key, response: Some(_) } if key == "Q"
        ));
    }

    #[test]
    fn test_dispatch_ignored_after_shutdown() {
        let bridge = bridge_with(MockPort::with_replies([vec![0x4D, 0x0D]]));
        bridge.shutdown();
        assert_eq!(
            bridge
                .on_message("sms_gamer/ups/command", br#"{"command": "M"}"#)
                .unwrap(),
            Dispatch::Ignored
        );
        assert!(written(&bridge).is_empty());
    }

    #[test]
    fn test_dispatch_ignores_purge_echo_and_other_topics() {
        let bridge = bridge_with(MockPort::default());
        assert_eq!(
            bridge.on_message("sms_gamer/ups/command", b"").unwrap(),
            Dispatch::Ignored
        );
        assert_eq!(
            bridge
                .on_message("other/topic", br#"{"command": "M"}"#)
                .unwrap(),
            Dispatch::Ignored
        );
        assert!(written(&bridge).is_empty());
    }

    #[test]
    fn test_dispatch_rejects_bad_payloads() {
        let bridge = bridge_with(MockPort::default());
        let topic = "sms_gamer/ups/command";

        assert!(matches!(
            bridge.on_message(topic, b"not json"),
            Err(Error::ProtocolDecode(_))
        ));
        assert!(matches!(
            bridge.on_message(topic, br#"{"cmd": "M"}"#),
            Err(Error::ProtocolDecode(_))
        ));
        assert!(matches!(
            bridge.on_message(topic, br#"{"command": 5}"#),
            Err(Error::ProtocolDecode(_))
        ));
        assert!(matches!(
            bridge.on_message(topic, br#"{"command": "XYZ"}"#),
            Err(Error::UnknownCommand(k)) if k == "XYZ"
        ));
        assert!(written(&bridge).is_empty());
    }

    #[test]
    fn test_poll_publishes_when_connected() {
        let bridge = bridge_with(MockPort::with_replies([status_reply(), status_reply()]));

        // Not connected yet: decoded but not published
        assert!(bridge.poll_once().unwrap().is_some());
        assert!(bridge.link().events().is_empty());

        bridge.on_connected().unwrap();
        let before = bridge.link().events().len();
        let status = bridge.poll_once().unwrap().unwrap();
        let events = bridge.link().events();
        assert_eq!(events.len(), before + 1);
        match events.last() {
            Some(LinkEvent::Publish {
                topic,
                payload,
                retain,
            }) => {
                assert_eq!(topic, "sms_gamer/ups/status");
                assert!(!retain);
                let value: Value = serde_json::from_slice(payload).unwrap();
                assert_eq!(value["battery_percent"], 90.0);
            },
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(bridge.with_session(|s| s.published), 1);
        assert_eq!(bridge.with_session(|s| s.last_status.clone()), Some(status));
    }

    #[test]
    fn test_poll_skips_bad_cycles() {
        let bridge = bridge_with(MockPort::with_replies([vec![0x01, 0x0D]]));
        bridge.on_connected().unwrap();
        let before = bridge.link().events().len();

        assert!(matches!(bridge.poll_once(), Err(Error::ShortResponse { len: 2 })));
        assert!(bridge.poll_once().unwrap().is_none());
        assert_eq!(bridge.link().events().len(), before);
    }

    #[test]
    fn test_run_stops_and_shuts_down() {
        let bridge = bridge_with(MockPort::with_replies([status_reply()]));
        bridge.on_connected().unwrap();

        let cycles = std::sync::atomic::AtomicUsize::new(0);
        bridge.run(|| cycles.fetch_add(1, Ordering::Relaxed) >= 3);

        assert_eq!(bridge.state(), BridgeState::Stopped);
        assert_eq!(lock(&bridge.ups).port().close_calls, 1);
        assert_eq!(bridge.link().events().last(), Some(&LinkEvent::Disconnect));

        // Second shutdown is a no-op
        bridge.shutdown();
        assert_eq!(lock(&bridge.ups).port().close_calls, 1);
    }

    #[test]
    fn test_sleep_until_stopped_wakes_early() {
        let start = Instant::now();
        sleep_until_stopped(Duration::from_secs(30), || true);
        assert!(start.elapsed() < Duration::from_secs(1));

        let start = Instant::now();
        sleep_until_stopped(Duration::from_millis(30), || false);
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    /// Port that logs `W` per write and `R` per non-empty read, echoing the
    /// opcode of each frame as its reply.
    struct TracingPort {
        log: Arc<Mutex<String>>,
        pending: Vec<u8>,
    }

    impl std::io::Read for TracingPort {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pending.is_empty() {
                return Err(std::io::Error::new(std::io::ErrorKind::TimedOut, "timeout"));
            }
            let n = buf.len().min(self.pending.len());
            buf[..n].copy_from_slice(&self.pending[..n]);
            self.pending.drain(..n);
            lock(&self.log).push('R');
            Ok(n)
        }
    }

    impl std::io::Write for TracingPort {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            lock(&self.log).push('W');
            self.pending.extend_from_slice(&[buf[0], 0x0D]);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl Port for TracingPort {
        fn timeout(&self) -> Duration {
            Duration::from_millis(5)
        }

        fn baud_rate(&self) -> u32 {
            2400
        }

        fn name(&self) -> &str {
            "tracing"
        }

        fn clear_buffers(&mut self) -> Result<()> {
            self.pending.clear();
            Ok(())
        }

        fn is_open(&self) -> bool {
            true
        }

        fn close(&mut self) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_concurrent_dispatch_never_interleaves() {
        let log = Arc::new(Mutex::new(String::new()));
        let port = TracingPort {
            log: Arc::clone(&log),
            pending: Vec::new(),
        };
        let config = BridgeConfig {
            settle: SettleDelays {
                simple: Duration::from_millis(2),
                control: Duration::from_millis(3),
            },
            ..Default::default()
        };
        let bridge = Bridge::open(config, || Ok(port), RecordingLink::default()).unwrap();

        thread::scope(|s| {
            s.spawn(|| {
                for _ in 0..10 {
                    // Echo replies are too short to decode
                    let _ = bridge.poll_once();
                }
            });
            s.spawn(|| {
                for _ in 0..10 {
                    bridge
                        .on_message("sms_gamer/ups/command", br#"{"command": "M"}"#)
                        .unwrap();
                }
            });
        });

        let log = lock(&log).clone();
        assert_eq!(log, "WR".repeat(20));
    }
}
