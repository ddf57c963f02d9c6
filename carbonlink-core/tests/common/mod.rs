//! Shared fixtures for scheduler integration tests
//!
//! - [`ScriptedSensor`]: replays a fixed list of sensor results
//! - [`RecordingTransport`]: records every published record, with scripted
//!   link state and publish results
//! - [`Rig`]: a scheduler wired to both plus a shared mock clock

#![allow(dead_code)]

pub mod scenarios;

use std::collections::VecDeque;

use carbonlink_core::errors::{ConnectError, PublishError, SensorError};
use carbonlink_core::payload::{Channel, Record, Scalar};
use carbonlink_core::time::MockTimeSource;
use carbonlink_core::traits::{Reading, SensorProvider, TelemetryPublisher, TransportStatus};
use carbonlink_core::{DeviceConfig, TickReport, TickScheduler};

/// Sensor that replays scripted results, then repeats the last one
pub struct ScriptedSensor {
    script: VecDeque<Result<Reading, SensorError>>,
    last: Result<Reading, SensorError>,
    pub calls: usize,
}

impl ScriptedSensor {
    pub fn new(script: impl IntoIterator<Item = Result<Reading, SensorError>>) -> Self {
        Self {
            script: script.into_iter().collect(),
            last: Err(SensorError::Unavailable),
            calls: 0,
        }
    }

    /// Always returns the same reading
    pub fn constant(co2: f32, humidity: f32) -> Self {
        let mut sensor = Self::new(Vec::<Result<Reading, SensorError>>::new());
        sensor.last = Ok(Reading::new(co2, humidity));
        sensor
    }

    /// Queue more results
    pub fn push(&mut self, result: Result<Reading, SensorError>) {
        self.script.push_back(result);
    }
}

impl SensorProvider for ScriptedSensor {
    fn sample(&mut self) -> Result<Reading, SensorError> {
        self.calls += 1;
        if let Some(next) = self.script.pop_front() {
            self.last = next;
        }
        self.last
    }
}

/// Transport double that records every accepted publish
pub struct RecordingTransport {
    pub connected: bool,
    /// Result of the next publishes, front first; `Ok` once exhausted
    pub publish_results: VecDeque<Result<(), PublishError>>,
    /// Result of every reconnect attempt
    pub reconnect_result: Result<(), ConnectError>,
    pub reconnect_attempts: usize,
    pub publish_attempts: usize,
    pub signal: Option<i32>,
    pub published: Vec<(Channel, Record)>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self {
            connected: true,
            publish_results: VecDeque::new(),
            reconnect_result: Ok(()),
            reconnect_attempts: 0,
            publish_attempts: 0,
            signal: None,
            published: Vec::new(),
        }
    }

    pub fn disconnected() -> Self {
        Self {
            connected: false,
            ..Self::new()
        }
    }

    /// Fail the next `n` publishes with `error`
    pub fn fail_next(&mut self, n: usize, error: PublishError) {
        for _ in 0..n {
            self.publish_results.push_back(Err(error));
        }
    }

    /// Records published on one channel
    pub fn on(&self, channel: Channel) -> Vec<&Record> {
        self.published
            .iter()
            .filter(|(c, _)| *c == channel)
            .map(|(_, r)| r)
            .collect()
    }
}

impl TelemetryPublisher for RecordingTransport {
    fn publish(&mut self, channel: Channel, payload: &Record) -> Result<(), PublishError> {
        self.publish_attempts += 1;
        let result = self.publish_results.pop_front().unwrap_or(Ok(()));
        if result.is_ok() {
            self.published.push((channel, payload.clone()));
        }
        result
    }
}

impl TransportStatus for RecordingTransport {
    fn is_connected(&self) -> bool {
        self.connected
    }

    fn reconnect(&mut self) -> Result<(), ConnectError> {
        self.reconnect_attempts += 1;
        if self.reconnect_result.is_ok() {
            self.connected = true;
        }
        self.reconnect_result
    }

    fn signal_strength(&self) -> Option<i32> {
        self.signal
    }
}

/// Scheduler plus the clock that drives it
pub struct Rig {
    pub scheduler: TickScheduler<ScriptedSensor, RecordingTransport, MockTimeSource>,
    pub clock: MockTimeSource,
}

impl Rig {
    pub fn new(config: DeviceConfig, sensor: ScriptedSensor, transport: RecordingTransport) -> Self {
        let clock = MockTimeSource::new(0);
        let scheduler = TickScheduler::new(config, sensor, transport, clock.clone())
            .expect("valid test config");
        Self { scheduler, clock }
    }

    /// Advance the clock by `ms` and tick once
    pub fn step(&mut self, ms: u64) -> TickReport {
        self.clock.advance(ms);
        self.scheduler.tick()
    }

    /// Tick `n` times at one-second spacing, returning every report
    pub fn run_secs(&mut self, n: usize) -> Vec<TickReport> {
        (0..n).map(|_| self.step(1000)).collect()
    }

    pub fn transport(&self) -> &RecordingTransport {
        self.scheduler.transport()
    }

    pub fn transport_mut(&mut self) -> &mut RecordingTransport {
        self.scheduler.transport_mut()
    }
}

/// Float field of a record, panicking when absent or of another type
pub fn float(record: &Record, name: &str) -> f32 {
    match record.get(name) {
        Some(Scalar::Float(v)) => *v,
        other => panic!("field {} is {:?}, expected float", name, other),
    }
}

/// Unsigned field of a record
pub fn uint(record: &Record, name: &str) -> u64 {
    match record.get(name) {
        Some(Scalar::UInt(v)) => *v,
        other => panic!("field {} is {:?}, expected uint", name, other),
    }
}
