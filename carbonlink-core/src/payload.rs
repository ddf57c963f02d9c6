//! Structured Telemetry Payloads
//!
//! ## Overview
//!
//! Every message a device sends is a [`Record`]: a flat, ordered list of
//! `name → scalar` fields tagged with the [`Channel`] it belongs to. The core
//! builds records; transports encode them with one shared encoder (serde,
//! behind the `serde` feature) and decide topics or URLs from the channel.
//!
//! ## Field Sets
//!
//! ```text
//! SensorData: avg_co2, max_co2, min_co2, avg_humidity, max_humidity,
//!             min_humidity, credits, emissions, offset, timestamp,
//!             sample_count, credits_available
//! Alert:      alert_type, message, co2, credits, timestamp
//! Heartbeat:  status, uptime, signal_strength?, timestamp
//! ```
//!
//! `signal_strength` is left out when the transport cannot report one.
//!
//! ## Memory
//!
//! Records live on the stack: at most [`MAX_RECORD_FIELDS`] fields, names
//! and text values are `&'static str`. Building one never allocates.
//!
//! ```rust
//! use carbonlink_core::payload::{Channel, Record, Scalar};
//!
//! let record = Record::heartbeat(120_000, Some(-61), 120_000);
//! assert_eq!(record.channel(), Channel::Heartbeat);
//! assert_eq!(record.get("status"), Some(&Scalar::Text("online")));
//! ```

use heapless::Vec;

use crate::aggregator::AggregateReport;
use crate::alerts::AlertKind;
use crate::config::CreditFigures;
use crate::constants::MAX_RECORD_FIELDS;
use crate::time::Timestamp;

/// Logical destination of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Aggregated readings and credit figures
    SensorData,
    /// Threshold alerts
    Alert,
    /// Liveness beacons
    Heartbeat,
}

impl Channel {
    /// Path segment used for topics and endpoints
    pub const fn path(&self) -> &'static str {
        match self {
            Channel::SensorData => "sensor_data",
            Channel::Alert => "alerts",
            Channel::Heartbeat => "heartbeat",
        }
    }
}

/// A single field value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar {
    /// Floating point measurement
    Float(f32),
    /// Signed integer
    Int(i64),
    /// Unsigned integer (counts, timestamps)
    UInt(u64),
    /// Flag
    Bool(bool),
    /// Fixed text
    Text(&'static str),
}

/// One named field
pub type Field = (&'static str, Scalar);

/// Flat, ordered payload for one channel
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    channel: Channel,
    fields: Vec<Field, MAX_RECORD_FIELDS>,
}

impl Record {
    /// Empty record for a channel
    pub fn new(channel: Channel) -> Self {
        Self {
            channel,
            fields: Vec::new(),
        }
    }

    /// Aggregated window statistics plus the device's credit figures
    pub fn sensor_data(
        report: &AggregateReport,
        figures: &CreditFigures,
        credits_available: f32,
        timestamp: Timestamp,
    ) -> Self {
        Self::new(Channel::SensorData)
            .with("avg_co2", Scalar::Float(report.avg_co2))
            .with("max_co2", Scalar::Float(report.max_co2))
            .with("min_co2", Scalar::Float(report.min_co2))
            .with("avg_humidity", Scalar::Float(report.avg_humidity))
            .with("max_humidity", Scalar::Float(report.max_humidity))
            .with("min_humidity", Scalar::Float(report.min_humidity))
            .with("credits", Scalar::Float(figures.credits))
            .with("emissions", Scalar::Float(figures.emissions))
            .with("offset", Scalar::Bool(figures.offset))
            .with("timestamp", Scalar::UInt(timestamp))
            .with("sample_count", Scalar::UInt(report.sample_count as u64))
            .with("credits_available", Scalar::Float(credits_available))
    }

    /// Alert for the current reading and balance
    pub fn alert(kind: AlertKind, co2: f32, credits: f32, timestamp: Timestamp) -> Self {
        Self::new(Channel::Alert)
            .with("alert_type", Scalar::Text(kind.wire_name()))
            .with("message", Scalar::Text(kind.message()))
            .with("co2", Scalar::Float(co2))
            .with("credits", Scalar::Float(credits))
            .with("timestamp", Scalar::UInt(timestamp))
    }

    /// Liveness beacon
    pub fn heartbeat(uptime_ms: u64, signal_strength: Option<i32>, timestamp: Timestamp) -> Self {
        let record = Self::new(Channel::Heartbeat)
            .with("status", Scalar::Text("online"))
            .with("uptime", Scalar::UInt(uptime_ms));

        let record = match signal_strength {
            Some(dbm) => record.with("signal_strength", Scalar::Int(i64::from(dbm))),
            None => record,
        };

        record.with("timestamp", Scalar::UInt(timestamp))
    }

    /// Append a field, builder style
    ///
    /// Overflowing [`MAX_RECORD_FIELDS`] is a bug in the caller: debug builds
    /// panic, release builds log and drop the field. Use [`Record::insert`]
    /// to handle a full record explicitly.
    pub fn with(mut self, name: &'static str, value: Scalar) -> Self {
        let added = self.insert(name, value);
        debug_assert!(added, "record full, cannot add field `{}`", name);
        if !added {
            log_error!("Record full, dropped field `{}`", name);
        }
        self
    }

    /// Append a field, returning `false` when the record is full
    pub fn insert(&mut self, name: &'static str, value: Scalar) -> bool {
        self.fields.push((name, value)).is_ok()
    }

    /// Channel this record belongs to
    pub fn channel(&self) -> Channel {
        self.channel
    }

    /// Look up a field by name
    pub fn get(&self, name: &str) -> Option<&Scalar> {
        self.fields.iter().find(|(n, _)| *n == name).map(|(_, v)| v)
    }

    /// Fields in insertion order
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Field names in insertion order
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|(n, _)| *n)
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// No fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(feature = "serde")]
mod encode {
    use super::{Record, Scalar};
    use serde::ser::{Serialize, SerializeMap, Serializer};

    impl Serialize for Scalar {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            match *self {
                Scalar::Float(v) => serializer.serialize_f32(v),
                Scalar::Int(v) => serializer.serialize_i64(v),
                Scalar::UInt(v) => serializer.serialize_u64(v),
                Scalar::Bool(v) => serializer.serialize_bool(v),
                Scalar::Text(v) => serializer.serialize_str(v),
            }
        }
    }

    /// Records serialize as a flat map in field order
    impl Serialize for Record {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            let mut map = serializer.serialize_map(Some(self.fields.len()))?;
            for (name, value) in self.fields.iter() {
                map.serialize_entry(name, value)?;
            }
            map.end()
        }
    }
}
