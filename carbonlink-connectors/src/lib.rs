//! Telemetry Transports for CarbonLink Devices
//!
//! ## Overview
//!
//! The core builds [`Record`]s and hands them to a
//! [`TelemetryPublisher`](carbonlink_core::traits::TelemetryPublisher). This
//! crate provides the two publishers real devices use and the one encoder
//! both share.
//!
//! ## Protocol Selection Guide
//!
//! ### MQTT
//!
//! **When to use:**
//! - A broker is reachable and dashboards subscribe to device topics
//! - Commands flow back to the device
//!
//! **Characteristics:**
//! - Persistent session, link state tracked from broker events
//! - Topics: `{prefix}/{api_key}/{sensor_data|alerts|heartbeat}`
//! - Alerts and heartbeats retry once on the short topic `{prefix}/{channel}`
//!
//! ### HTTP
//!
//! **When to use:**
//! - Posting straight to a web API, no broker
//! - Firewall-friendly environments
//!
//! **Characteristics:**
//! - Stateless requests, always "connected"
//! - One endpoint per channel: `{base_url}/{channel}`
//! - Bounded retries with exponential backoff
//!
//! ## Bounded Waits
//!
//! Both publishers are synchronous and every call returns within a fixed
//! bound: MQTT polls its event loop with a deadline, HTTP requests carry a
//! timeout and a retry cap. The tick loop never blocks indefinitely.
//!
//! ## Encoding
//!
//! Every record is encoded by [`encode_record`] as a flat JSON object with
//! fields in record order:
//!
//! ```rust
//! use carbonlink_connectors::encode_record;
//! use carbonlink_core::payload::Record;
//!
//! let bytes = encode_record(&Record::heartbeat(5000, None, 5000)).unwrap();
//! assert_eq!(bytes, br#"{"status":"online","uptime":5000,"timestamp":5000}"#);
//! ```

#[cfg(feature = "mqtt")]
pub mod mqtt;

#[cfg(feature = "http")]
pub mod http;

// Re-export common types
#[cfg(feature = "mqtt")]
pub use mqtt::{MqttConfig, MqttError, MqttPublisher};

#[cfg(feature = "http")]
pub use http::{HttpAuth, HttpConfig, HttpError, HttpPublisher};

use carbonlink_core::errors::PublishError;
use carbonlink_core::payload::Record;
use thiserror::Error;

/// A record could not be turned into JSON
///
/// Both publishers report it to the scheduler as [`PublishError::Encoding`].
#[derive(Debug, Error)]
#[error("Encoding error: {0}")]
pub struct EncodeError(pub String);

impl From<EncodeError> for PublishError {
    fn from(_: EncodeError) -> Self {
        PublishError::Encoding
    }
}

/// Encode a record as a flat JSON object
pub fn encode_record(record: &Record) -> Result<Vec<u8>, EncodeError> {
    serde_json::to_vec(record).map_err(|e| EncodeError(e.to_string()))
}

/// Byte-level sending shared by all publishers
pub trait Connector {
    type Error;

    /// Send an encoded payload to a topic or path
    fn send(&mut self, destination: &str, data: &[u8]) -> Result<(), Self::Error>;

    /// Get connection statistics
    fn stats(&self) -> &ConnectionStats;
}

/// Connection statistics common to all connectors
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ConnectionStats {
    /// Total messages sent successfully
    pub messages_sent: u64,
    /// Total messages failed to send
    pub messages_failed: u64,
    /// Total bytes sent
    pub bytes_sent: u64,
    /// Number of reconnections
    pub reconnections: u32,
    /// Last error message
    pub last_error: Option<String>,
}

impl ConnectionStats {
    /// Count one delivered message of `bytes` bytes
    pub fn record_sent(&mut self, bytes: usize) {
        self.messages_sent += 1;
        self.bytes_sent += bytes as u64;
    }

    /// Count one failed message and remember why
    pub fn record_failure(&mut self, error: &impl std::fmt::Display) {
        self.messages_failed += 1;
        self.last_error = Some(error.to_string());
    }

    /// Count one re-established link
    pub fn record_reconnect(&mut self) {
        self.reconnections += 1;
    }
}
