//! Runtime choice between the MQTT and HTTP publishers.

use carbonlink_connectors::{ConnectionStats, Connector, HttpPublisher, MqttPublisher};
use carbonlink_core::errors::{ConnectError, PublishError};
use carbonlink_core::payload::{Channel, Record};
use carbonlink_core::traits::{TelemetryPublisher, TransportStatus};

/// Publisher selected on the command line
pub enum Transport {
    Mqtt(MqttPublisher),
    Http(HttpPublisher),
}

impl Transport {
    /// Protocol name for logs
    pub fn name(&self) -> &'static str {
        match self {
            Transport::Mqtt(_) => "mqtt",
            Transport::Http(_) => "http",
        }
    }

    pub fn stats(&self) -> &ConnectionStats {
        match self {
            Transport::Mqtt(p) => p.stats(),
            Transport::Http(p) => p.stats(),
        }
    }
}

impl TelemetryPublisher for Transport {
    fn publish(&mut self, channel: Channel, payload: &Record) -> Result<(), PublishError> {
        match self {
            Transport::Mqtt(p) => p.publish(channel, payload),
            Transport::Http(p) => p.publish(channel, payload),
        }
    }
}

impl TransportStatus for Transport {
    fn is_connected(&self) -> bool {
        match self {
            Transport::Mqtt(p) => p.is_connected(),
            Transport::Http(p) => p.is_connected(),
        }
    }

    fn reconnect(&mut self) -> Result<(), ConnectError> {
        match self {
            Transport::Mqtt(p) => p.reconnect(),
            Transport::Http(p) => p.reconnect(),
        }
    }

    fn signal_strength(&self) -> Option<i32> {
        match self {
            Transport::Mqtt(p) => p.signal_strength(),
            Transport::Http(p) => p.signal_strength(),
        }
    }
}
