//! MQTT Publisher
//!
//! Synchronous wrapper around `rumqttc`'s blocking [`Client`] and its
//! [`Connection`] event loop. The event loop only makes progress when
//! polled, so every operation polls it against a deadline:
//!
//! ```text
//! publish():   drain pending events → try_publish → poll until the
//!              packet is written or publish_timeout elapses
//! reconnect(): poll until CONNACK or connect_timeout elapses
//! ```
//!
//! Link state is derived from broker events: a successful CONNACK marks the
//! link up (and subscribes to the command topic), any connection error or
//! DISCONNECT marks it down. Incoming commands are logged.
//!
//! ## Delivery
//!
//! A record the scheduler was told failed must never reach the broker later,
//! or the next aggregate would repeat its samples. So:
//!
//! - nothing is queued while the link is down, including a link lost while
//!   draining events just before the publish
//! - once the session drops, `reconnect()` opens a fresh client, discarding
//!   whatever the old one still held
//! - a publish that timed out on a live session stays queued and will be
//!   written, so it is reported as sent

use std::time::{Duration, Instant};

use carbonlink_core::constants::time::{CONNECT_TIMEOUT_MS, PUBLISH_TIMEOUT_MS};
use carbonlink_core::errors::{ConnectError, PublishError};
use carbonlink_core::payload::{Channel, Record};
use carbonlink_core::traits::{TelemetryPublisher, TransportStatus};
use rumqttc::{Client, ConnectReturnCode, Connection, Event, MqttOptions, Outgoing, Packet, QoS};
use thiserror::Error;

use crate::{encode_record, ConnectionStats, Connector};

/// Pending events handled per drain, so a chatty broker cannot stall a tick
const MAX_DRAIN_EVENTS: usize = 32;

/// MQTT-specific errors
#[derive(Debug, Error)]
pub enum MqttError {
    /// Broker session is down
    #[error("Not connected to broker")]
    NotConnected,

    /// Client request queue refused the message
    #[error("Publish rejected: {0}")]
    Rejected(String),

    /// Network or protocol failure on the session
    #[error("Connection error: {0}")]
    Connection(String),

    /// Broker answered CONNECT with a failure code
    #[error("Broker refused connection: {0}")]
    Refused(String),

    /// Deadline passed while polling the event loop
    #[error("Operation timed out")]
    Timeout,

    /// Record could not be encoded
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<MqttError> for PublishError {
    fn from(err: MqttError) -> Self {
        match err {
            MqttError::NotConnected | MqttError::Connection(_) | MqttError::Refused(_) => {
                PublishError::NotConnected
            }
            MqttError::Rejected(_) => PublishError::Rejected {
                reason: "client request queue full",
            },
            MqttError::Timeout => PublishError::Timeout,
            MqttError::Encoding(_) => PublishError::Encoding,
            MqttError::Config(_) => PublishError::Rejected {
                reason: "invalid configuration",
            },
        }
    }
}

impl From<MqttError> for ConnectError {
    fn from(err: MqttError) -> Self {
        match err {
            MqttError::Timeout => ConnectError::Timeout,
            MqttError::Refused(_) => ConnectError::Refused {
                reason: "broker refused connection",
            },
            _ => ConnectError::Refused {
                reason: "network error",
            },
        }
    }
}

/// MQTT configuration
#[derive(Debug, Clone, PartialEq)]
pub struct MqttConfig {
    /// Broker host name or address
    pub host: String,
    /// Broker port
    pub port: u16,
    /// Client identifier presented to the broker
    pub client_id: String,
    /// Username and password, if the broker requires them
    pub credentials: Option<(String, String)>,
    /// First topic segment
    pub topic_prefix: String,
    /// Device API key, second topic segment
    pub api_key: String,
    /// Keep-alive interval
    pub keep_alive: Duration,
    /// Upper bound for one reconnect attempt
    pub connect_timeout: Duration,
    /// Upper bound for one publish
    pub publish_timeout: Duration,
    /// Capacity of the client request queue
    pub request_capacity: usize,
}

impl MqttConfig {
    /// Create new configuration for a broker host
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: 1883,
            client_id: format!("carbonlink-{}", std::process::id()),
            credentials: None,
            topic_prefix: "carbonlink".into(),
            api_key: "device".into(),
            keep_alive: Duration::from_secs(60),
            connect_timeout: Duration::from_millis(CONNECT_TIMEOUT_MS),
            publish_timeout: Duration::from_millis(PUBLISH_TIMEOUT_MS),
            request_capacity: 10,
        }
    }

    /// Parse `host` or `host:port`
    pub fn from_broker(broker: &str) -> Result<Self, MqttError> {
        let (host, port) = match broker.rsplit_once(':') {
            Some((host, port)) => {
                let port = port
                    .parse::<u16>()
                    .map_err(|_| MqttError::Config(format!("invalid port in `{}`", broker)))?;
                (host, port)
            }
            None => (broker, 1883),
        };

        if host.is_empty() {
            return Err(MqttError::Config("broker host is empty".into()));
        }
        Ok(Self::new(host).port(port))
    }

    /// Set broker port
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set client identifier
    pub fn client_id(mut self, id: impl Into<String>) -> Self {
        self.client_id = id.into();
        self
    }

    /// Set username and password
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Some((username.into(), password.into()));
        self
    }

    /// Set first topic segment
    pub fn topic_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.topic_prefix = prefix.into();
        self
    }

    /// Set device API key
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = key.into();
        self
    }

    /// Set keep-alive in seconds
    pub fn keep_alive_secs(mut self, secs: u64) -> Self {
        self.keep_alive = Duration::from_secs(secs);
        self
    }

    /// Set connect and publish bounds
    pub fn timeouts(mut self, connect: Duration, publish: Duration) -> Self {
        self.connect_timeout = connect;
        self.publish_timeout = publish;
        self
    }

    /// Primary topic for a channel
    pub fn topic(&self, channel: Channel) -> String {
        format!("{}/{}/{}", self.topic_prefix, self.api_key, channel.path())
    }

    /// Short topic tried once when an alert or heartbeat publish is rejected
    pub fn fallback_topic(&self, channel: Channel) -> Option<String> {
        match channel {
            Channel::Alert | Channel::Heartbeat => {
                Some(format!("{}/{}", self.topic_prefix, channel.path()))
            }
            Channel::SensorData => None,
        }
    }

    /// Topic the device listens on for commands
    pub fn commands_topic(&self) -> String {
        format!("{}/{}/commands", self.topic_prefix, self.api_key)
    }

    fn validate(&self) -> Result<(), MqttError> {
        if self.host.is_empty() {
            return Err(MqttError::Config("broker host is empty".into()));
        }
        if self.client_id.is_empty() {
            return Err(MqttError::Config("client id is empty".into()));
        }
        if self.topic_prefix.is_empty() || self.api_key.is_empty() {
            return Err(MqttError::Config("topic prefix and api key must be set".into()));
        }
        if self.keep_alive < Duration::from_secs(5) {
            return Err(MqttError::Config("keep-alive must be at least 5 s".into()));
        }
        Ok(())
    }
}

/// Telemetry publisher over an MQTT broker session
pub struct MqttPublisher {
    config: MqttConfig,
    client: Client,
    connection: Connection,
    connected: bool,
    /// Old session may still hold requests; replace it before reconnecting
    session_stale: bool,
    stats: ConnectionStats,
}

fn open_session(config: &MqttConfig) -> (Client, Connection) {
    let mut options = MqttOptions::new(config.client_id.clone(), config.host.clone(), config.port);
    options.set_keep_alive(config.keep_alive);
    if let Some((username, password)) = &config.credentials {
        options.set_credentials(username.clone(), password.clone());
    }
    Client::new(options, config.request_capacity.max(1))
}

impl MqttPublisher {
    /// Create a publisher; no network traffic until the first poll
    pub fn new(config: MqttConfig) -> Result<Self, MqttError> {
        config.validate()?;
        let (client, connection) = open_session(&config);

        Ok(Self {
            config,
            client,
            connection,
            connected: false,
            session_stale: false,
            stats: ConnectionStats::default(),
        })
    }

    /// Active configuration
    pub fn config(&self) -> &MqttConfig {
        &self.config
    }

    /// Handle queued broker events without waiting
    pub fn poll_pending(&mut self) {
        for _ in 0..MAX_DRAIN_EVENTS {
            match self.connection.try_recv() {
                Ok(Ok(event)) => self.handle_event(&event),
                Ok(Err(e)) => {
                    self.mark_down(&e);
                    break;
                }
                Err(_) => break,
            }
        }
    }

    /// Poll until `done` matches an event or `deadline` passes
    fn poll_until(&mut self, deadline: Instant, done: impl Fn(&Event) -> bool) -> Result<(), MqttError> {
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(MqttError::Timeout);
            }

            match self.connection.recv_timeout(remaining) {
                Ok(Ok(event)) => {
                    self.handle_event(&event);
                    if let Event::Incoming(Packet::ConnAck(ack)) = &event {
                        if ack.code != ConnectReturnCode::Success {
                            return Err(MqttError::Refused(format!("{:?}", ack.code)));
                        }
                    }
                    if done(&event) {
                        return Ok(());
                    }
                }
                Ok(Err(e)) => {
                    self.mark_down(&e);
                    return Err(MqttError::Connection(e.to_string()));
                }
                Err(_) => return Err(MqttError::Timeout),
            }
        }
    }

    fn handle_event(&mut self, event: &Event) {
        match event {
            Event::Incoming(Packet::ConnAck(ack)) => {
                if ack.code == ConnectReturnCode::Success {
                    self.connected = true;
                    let topic = self.config.commands_topic();
                    match self.client.try_subscribe(topic.as_str(), QoS::AtMostOnce) {
                        Ok(()) => log::info!("Connected to {}:{}, listening on {}", self.config.host, self.config.port, topic),
                        Err(e) => log::warn!("Subscribe to {} failed: {}", topic, e),
                    }
                } else {
                    self.connected = false;
                    log::error!("Broker refused connection: {:?}", ack.code);
                }
            }
            Event::Incoming(Packet::Publish(publish)) => {
                log::info!(
                    "Command on {}: {}",
                    publish.topic,
                    String::from_utf8_lossy(&publish.payload)
                );
            }
            Event::Incoming(Packet::Disconnect) => {
                self.session_stale |= self.connected;
                self.connected = false;
                log::warn!("Broker closed the session");
            }
            _ => {}
        }
    }

    fn mark_down(&mut self, error: &rumqttc::ConnectionError) {
        if self.connected {
            log::warn!("MQTT session lost: {}", error);
            self.session_stale = true;
        }
        self.connected = false;
        self.stats.last_error = Some(error.to_string());
    }

    fn publish_topic(&mut self, topic: &str, data: &[u8]) -> Result<(), MqttError> {
        if !self.connected {
            return Err(MqttError::NotConnected);
        }

        // The drain can observe a dropped session
        self.poll_pending();
        if !self.connected {
            return Err(MqttError::NotConnected);
        }

        self.client
            .try_publish(topic, QoS::AtMostOnce, false, data.to_vec())
            .map_err(|e| MqttError::Rejected(e.to_string()))?;

        let deadline = Instant::now() + self.config.publish_timeout;
        let written =
            self.poll_until(deadline, |event| matches!(event, Event::Outgoing(Outgoing::Publish(_))));
        self.settle_queued(topic, written)
    }

    /// Outcome of a publish that is already in the client queue
    fn settle_queued(&mut self, topic: &str, written: Result<(), MqttError>) -> Result<(), MqttError> {
        match written {
            Ok(()) => Ok(()),
            Err(MqttError::Timeout) if self.connected => {
                log::debug!("Publish to {} still queued at deadline, counting as sent", topic);
                Ok(())
            }
            Err(e) => {
                self.connected = false;
                self.session_stale = true;
                Err(e)
            }
        }
    }
}

impl Connector for MqttPublisher {
    type Error = MqttError;

    fn send(&mut self, topic: &str, data: &[u8]) -> Result<(), Self::Error> {
        match self.publish_topic(topic, data) {
            Ok(()) => {
                self.stats.record_sent(data.len());
                Ok(())
            }
            Err(e) => {
                self.stats.record_failure(&e);
                Err(e)
            }
        }
    }

    fn stats(&self) -> &ConnectionStats {
        &self.stats
    }
}

impl TelemetryPublisher for MqttPublisher {
    fn publish(&mut self, channel: Channel, payload: &Record) -> Result<(), PublishError> {
        let data = encode_record(payload)?;
        let topic = self.config.topic(channel);

        match self.send(&topic, &data) {
            Err(MqttError::Rejected(reason)) => match self.config.fallback_topic(channel) {
                Some(fallback) => {
                    log::warn!("Publish to {} rejected ({}), trying {}", topic, reason, fallback);
                    self.send(&fallback, &data).map_err(PublishError::from)
                }
                None => Err(MqttError::Rejected(reason).into()),
            },
            other => other.map_err(PublishError::from),
        }
    }
}

impl TransportStatus for MqttPublisher {
    fn is_connected(&self) -> bool {
        self.connected
    }

    fn reconnect(&mut self) -> Result<(), ConnectError> {
        if self.connected {
            return Ok(());
        }

        if self.session_stale {
            let (client, connection) = open_session(&self.config);
            self.client = client;
            self.connection = connection;
            self.session_stale = false;
            log::debug!("Opened a fresh MQTT session, queued requests discarded");
        }

        let deadline = Instant::now() + self.config.connect_timeout;
        match self.poll_until(deadline, |event| matches!(event, Event::Incoming(Packet::ConnAck(_)))) {
            Ok(()) => {
                self.stats.record_reconnect();
                Ok(())
            }
            Err(e) => {
                self.stats.last_error = Some(e.to_string());
                Err(e.into())
            }
        }
    }
}
