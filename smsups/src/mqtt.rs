//! rumqttc-backed broker link and network loop.

use crate::bridge::{Bridge, MqttLink, sleep_until_stopped};
use crate::config::BrokerConfig;
use crate::error::{Error, Result};
use crate::port::Port;
use log::{debug, error, info, trace, warn};
use rumqttc::{
    Client, ConnectReturnCode, Connection, Event, MqttOptions, Outgoing, Packet, QoS,
};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Capacity of the client request queue.
///
/// Connect handlers run on the network thread and enqueue the whole
/// discovery set at once, so the queue must hold it without blocking.
pub const REQUEST_CAPACITY: usize = 128;

/// Capped exponential reconnect backoff.
#[derive(Debug, Clone)]
pub struct ReconnectBackoff {
    min: Duration,
    max: Duration,
    current: Duration,
}

impl ReconnectBackoff {
    /// Create a backoff starting at `min` and capped at `max`.
    pub fn new(min: Duration, max: Duration) -> Self {
        Self {
            min,
            max: max.max(min),
            current: min,
        }
    }

    /// Delay before the next attempt; doubles the following one.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = (self.current * 2).min(self.max);
        delay
    }

    /// Start over after a successful connection.
    pub fn reset(&mut self) {
        self.current = self.min;
    }
}

impl Default for ReconnectBackoff {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_secs(120))
    }
}

impl From<&BrokerConfig> for ReconnectBackoff {
    fn from(config: &BrokerConfig) -> Self {
        Self::new(config.reconnect_min, config.reconnect_max)
    }
}

/// Broker link over a rumqttc client.
///
/// Requests are queued without blocking; a full queue surfaces as
/// [`Error::BrokerUnavailable`].
#[derive(Clone)]
pub struct MqttClient {
    client: Client,
}

fn broker_error(e: rumqttc::ClientError) -> Error {
    Error::BrokerUnavailable(e.to_string())
}

impl MqttLink for MqttClient {
    fn subscribe(&self, topic: &str) -> Result<()> {
        self.client
            .try_subscribe(topic, QoS::AtLeastOnce)
            .map_err(broker_error)
    }

    fn publish(&self, topic: &str, payload: Vec<u8>, retain: bool) -> Result<()> {
        self.client
            .try_publish(topic, QoS::AtLeastOnce, retain, payload)
            .map_err(broker_error)
    }

    fn disconnect(&self) -> Result<()> {
        self.client.try_disconnect().map_err(broker_error)
    }
}

/// Build the client options for `client_id`.
pub fn mqtt_options(config: &BrokerConfig, client_id: &str) -> MqttOptions {
    let mut options = MqttOptions::new(client_id, config.host.clone(), config.port);
    options.set_keep_alive(config.keep_alive);
    options.set_clean_session(true);
    if let Some(username) = &config.username {
        options.set_credentials(
            username.clone(),
            config.password.clone().unwrap_or_default(),
        );
    }
    options
}

/// Create the client and its (not yet started) network connection.
pub fn connect(config: &BrokerConfig, client_id: &str) -> (MqttClient, Connection) {
    debug!(
        "Creating MQTT client '{client_id}' for {}:{}",
        config.host, config.port
    );
    let (client, connection) = Client::new(mqtt_options(config, client_id), REQUEST_CAPACITY);
    (MqttClient { client }, connection)
}

/// Handle on the background network thread.
pub struct NetworkLoop {
    handle: JoinHandle<()>,
    finished: Receiver<()>,
}

impl NetworkLoop {
    /// Wait up to `timeout` for the thread to finish.
    ///
    /// The thread finishes once the DISCONNECT packet has been written, or
    /// when the connection fails after shutdown started. Returns `false` if
    /// it is still running when the timeout expires.
    pub fn wait(self, timeout: Duration) -> bool {
        match self.finished.recv_timeout(timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if self.handle.join().is_err() {
                    error!("MQTT network thread panicked");
                }
                true
            },
            Err(RecvTimeoutError::Timeout) => false,
        }
    }
}

/// Drive the network connection on a background thread.
///
/// Connect, disconnect and inbound publishes are forwarded to the bridge.
/// Lost connections are retried with `backoff` until the bridge starts
/// shutting down. After shutdown the loop keeps polling until the queued
/// disconnect request has gone out.
pub fn spawn_network_loop<P, M>(
    bridge: Arc<Bridge<P, M>>,
    mut connection: Connection,
    mut backoff: ReconnectBackoff,
) -> NetworkLoop
where
    P: Port + 'static,
    M: MqttLink + 'static,
{
    let (done, finished) = mpsc::channel();
    let handle = thread::spawn(move || {
        bridge.on_connecting();

        for notification in connection.iter() {
            match notification {
                Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                    if ack.code == ConnectReturnCode::Success {
                        backoff.reset();
                        if let Err(e) = bridge.on_connected() {
                            warn!("Connect handler failed: {e}");
                        }
                    } else if bridge.is_stopping() {
                        break;
                    } else {
                        error!("MQTT broker rejected connection: {:?}", ack.code);
                        retry_after(&bridge, &mut backoff);
                    }
                },
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    let topic = String::from_utf8_lossy(publish.topic.as_ref());
                    // Errors are logged by the bridge
                    let _ = bridge.on_message(&topic, &publish.payload[..]);
                },
                Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                    debug!("Sent MQTT disconnect");
                    break;
                },
                Ok(event) => trace!("MQTT event: {event:?}"),
                Err(e) => {
                    if bridge.is_stopping() {
                        debug!("MQTT connection closed during shutdown: {e}");
                        break;
                    }
                    error!("MQTT connection error: {e}");
                    retry_after(&bridge, &mut backoff);
                },
            }
        }
        debug!("MQTT network loop finished");
        let _ = done.send(());
    });

    NetworkLoop { handle, finished }
}

fn retry_after<P: Port, M: MqttLink>(bridge: &Bridge<P, M>, backoff: &mut ReconnectBackoff) {
    bridge.on_disconnected();
    let delay = backoff.next_delay();
    info!("Reconnecting to MQTT broker in {}s", delay.as_secs());
    bridge.on_reconnecting();
    sleep_until_stopped(delay, || bridge.is_stopping());
}
