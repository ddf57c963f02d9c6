//! Tick Scheduler: the Device Control Loop
//!
//! ## Overview
//!
//! [`TickScheduler`] owns the complete [`DeviceState`] and advances it one
//! tick at a time. Each tick runs the same fixed sequence:
//!
//! ```text
//!   ┌─────────────────────────────────────────────────────────────┐
//!   │ 0. link      disconnected & backoff due → reconnect()       │
//!   │ 1. sample    sensor → Reading (fallback: last good reading) │
//!   │ 2. window    aggregator.push(sample)                        │
//!   │ 3. derive    credits / emissions / offset / ledger amount   │
//!   │ 4. ledger    burn or generate, then maybe auto-replenish    │
//!   │ 5. alert     evaluate → cooldown → dispatch Alert           │
//!   │ 6. aggregate interval due → summarize → dispatch SensorData │
//!   │              → reset window only if the publish succeeded   │
//!   │ 7. heartbeat interval due → dispatch Heartbeat              │
//!   └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Steps 2-5 are skipped while no reading has ever been acquired.
//!
//! ## Failure Handling
//!
//! Nothing in a tick is fatal. A disconnected transport drops the dispatch
//! (state still advances), a failed aggregate publish keeps the window for
//! the next interval, and alerts and heartbeats are fire-and-forget: their
//! timers move even when the message never left the device.
//!
//! ## Timing
//!
//! The scheduler never sleeps. Time comes from a [`TimeSource`]; the
//! [`TickDriver`] (std only) paces ticks on the wall and checks a shutdown
//! flag between them. Tests drive `tick()` directly with a mock clock.

use alloc::format;
use alloc::string::String;

use crate::aggregator::{Sample, SlidingAggregator};
use crate::alerts::{AlertEvaluator, AlertKind, AlertState};
use crate::config::{CreditFigures, DeviceConfig, Role};
use crate::errors::{ConfigError, ConnectError, LedgerError, PublishError, SensorError};
use crate::ledger::{BurnResult, CreditLedger, GenerateResult};
use crate::payload::Record;
use crate::time::{elapsed_ms, Schedule, TimeSource, Timestamp};
use crate::traits::{Reading, SensorProvider, TelemetryPublisher, TransportStatus};

/// Where this tick's reading came from
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReadingSource {
    /// Fresh from the sensor
    Fresh(Reading),
    /// Sensor failed; last good reading reused
    Reused(Reading),
    /// Sensor failed and there was nothing to reuse
    Missing,
}

impl ReadingSource {
    /// The reading used this tick, if any
    pub fn reading(&self) -> Option<Reading> {
        match *self {
            ReadingSource::Fresh(r) | ReadingSource::Reused(r) => Some(r),
            ReadingSource::Missing => None,
        }
    }
}

/// What the ledger did this tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LedgerAction {
    /// No reading, no ledger update
    None,
    /// Burner spent credits
    Burned(BurnResult),
    /// Creator earned credits
    Generated(GenerateResult),
    /// Ledger refused the amount
    Rejected(LedgerError),
}

/// Result of handing a record to the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Publisher accepted the record
    Sent,
    /// Transport was disconnected; nothing was attempted
    Dropped,
    /// Publisher returned an error
    Failed(PublishError),
    /// Alert condition held but the cooldown had not elapsed
    Suppressed,
    /// Aggregate interval elapsed with an empty window
    Empty,
}

impl DispatchOutcome {
    /// Record reached the publisher and was accepted
    pub fn is_sent(&self) -> bool {
        matches!(self, DispatchOutcome::Sent)
    }
}

/// Summary of one tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickReport {
    /// Clock reading at the start of the tick
    pub now: Timestamp,
    /// Reconnect attempt made this tick, if any
    pub reconnect: Option<Result<(), ConnectError>>,
    /// Reading used
    pub reading: ReadingSource,
    /// Derived figures, when a reading was available
    pub figures: Option<CreditFigures>,
    /// Ledger update
    pub ledger: LedgerAction,
    /// Auto-purchase happened
    pub replenished: bool,
    /// Alert raised this tick and what became of it
    pub alert: Option<(AlertKind, DispatchOutcome)>,
    /// Aggregate publish, when its interval elapsed
    pub aggregate: Option<DispatchOutcome>,
    /// Heartbeat, when its interval elapsed
    pub heartbeat: Option<DispatchOutcome>,
}

impl TickReport {
    fn new(now: Timestamp) -> Self {
        Self {
            now,
            reconnect: None,
            reading: ReadingSource::Missing,
            figures: None,
            ledger: LedgerAction::None,
            replenished: false,
            alert: None,
            aggregate: None,
            heartbeat: None,
        }
    }
}

/// All mutable state of one device
#[derive(Debug, Clone)]
pub struct DeviceState {
    aggregator: SlidingAggregator,
    ledger: CreditLedger,
    alert_states: [AlertState; 2],
    aggregate_schedule: Schedule,
    heartbeat_schedule: Schedule,
    reconnect_schedule: Schedule,
    last_reading: Option<Reading>,
    figures: Option<CreditFigures>,
    started_at: Timestamp,
    link_up: bool,
}

impl DeviceState {
    fn new(config: &DeviceConfig, start: Timestamp, link_up: bool) -> Self {
        let ledger = CreditLedger::new(config.profile.initial_credits, config.profile.auto_replenish)
            .with_burn_epsilon(config.burn_epsilon);

        Self {
            aggregator: SlidingAggregator::new(config.window_capacity),
            ledger,
            alert_states: [AlertState::new(config.alert_cooldown); 2],
            aggregate_schedule: Schedule::new(config.aggregate_interval, start),
            heartbeat_schedule: Schedule::new(config.heartbeat_interval, start),
            reconnect_schedule: Schedule::new(config.reconnect_backoff, start),
            last_reading: None,
            figures: None,
            started_at: start,
            link_up,
        }
    }

    /// Aggregation window
    pub fn aggregator(&self) -> &SlidingAggregator {
        &self.aggregator
    }

    /// Credit ledger
    pub fn ledger(&self) -> &CreditLedger {
        &self.ledger
    }

    /// Mutable ledger, e.g. to toggle auto-purchase at runtime
    pub fn ledger_mut(&mut self) -> &mut CreditLedger {
        &mut self.ledger
    }

    /// Cooldown state for one alert kind
    pub fn alert_state(&self, kind: AlertKind) -> &AlertState {
        &self.alert_states[kind.index()]
    }

    /// Aggregate publish timer
    pub fn aggregate_schedule(&self) -> &Schedule {
        &self.aggregate_schedule
    }

    /// Heartbeat timer
    pub fn heartbeat_schedule(&self) -> &Schedule {
        &self.heartbeat_schedule
    }

    /// Reconnect backoff timer
    pub fn reconnect_schedule(&self) -> &Schedule {
        &self.reconnect_schedule
    }

    /// Last reading accepted from the sensor
    pub fn last_reading(&self) -> Option<Reading> {
        self.last_reading
    }

    /// Figures derived from the most recent reading
    pub fn figures(&self) -> Option<CreditFigures> {
        self.figures
    }

    /// When the scheduler started
    pub fn started_at(&self) -> Timestamp {
        self.started_at
    }

    /// Milliseconds since start
    pub fn uptime_ms(&self, now: Timestamp) -> u64 {
        elapsed_ms(self.started_at, now)
    }

    /// Transport state observed on the last tick
    pub fn link_up(&self) -> bool {
        self.link_up
    }

    /// One-line summary for a status display or the log
    ///
    /// ```text
    /// CO2:1834 Hum:62 Cred:48.3 Off:NO Link:UP
    /// ```
    pub fn status_line(&self) -> String {
        let link = if self.link_up { "UP" } else { "DOWN" };
        let credits = self.ledger.available();

        match (self.last_reading, self.figures) {
            (Some(r), Some(f)) => format!(
                "CO2:{:.0} Hum:{:.0} Cred:{:.1} Off:{} Link:{}",
                r.co2,
                r.humidity,
                credits,
                if f.offset { "YES" } else { "NO" },
                link
            ),
            _ => format!("CO2:-- Hum:-- Cred:{:.1} Off:-- Link:{}", credits, link),
        }
    }
}

/// Runs the control loop over a sensor, a transport and a clock
pub struct TickScheduler<S, P, C> {
    config: DeviceConfig,
    evaluator: AlertEvaluator,
    state: DeviceState,
    sensor: S,
    transport: P,
    clock: C,
}

impl<S, P, C> TickScheduler<S, P, C>
where
    S: SensorProvider,
    P: TelemetryPublisher + TransportStatus,
    C: TimeSource,
{
    /// Validate `config` and start all timers at the current clock reading
    pub fn new(config: DeviceConfig, sensor: S, transport: P, clock: C) -> Result<Self, ConfigError> {
        config.validate()?;

        let start = clock.now();
        let state = DeviceState::new(&config, start, transport.is_connected());
        let evaluator = AlertEvaluator::new(
            config.critical_reading_threshold,
            config.critical_credits_threshold,
        );

        log_info!(
            "{} scheduler started: window {}, aggregate every {} ms, credits {:.1}",
            config.role,
            config.window_capacity,
            config.aggregate_interval.as_millis(),
            state.ledger.available()
        );

        Ok(Self {
            config,
            evaluator,
            state,
            sensor,
            transport,
            clock,
        })
    }

    /// Run one tick
    pub fn tick(&mut self) -> TickReport {
        let now = self.clock.now();
        let mut report = TickReport::new(now);

        report.reconnect = self.maintain_link(now);
        report.reading = self.acquire();

        if let Some(reading) = report.reading.reading() {
            self.apply_reading(now, reading, &mut report);
        }

        if self.state.aggregate_schedule.fire_if_due(now) {
            report.aggregate = Some(self.publish_aggregate(now));
        }

        if self.state.heartbeat_schedule.fire_if_due(now) {
            let record = Record::heartbeat(
                self.state.uptime_ms(now),
                self.transport.signal_strength(),
                now,
            );
            report.heartbeat = Some(self.dispatch(&record));
        }

        report
    }

    /// Device state
    pub fn state(&self) -> &DeviceState {
        &self.state
    }

    /// Mutable device state
    pub fn state_mut(&mut self) -> &mut DeviceState {
        &mut self.state
    }

    /// Active configuration
    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    /// Sensor provider
    pub fn sensor_mut(&mut self) -> &mut S {
        &mut self.sensor
    }

    /// Transport
    pub fn transport(&self) -> &P {
        &self.transport
    }

    /// Mutable transport
    pub fn transport_mut(&mut self) -> &mut P {
        &mut self.transport
    }

    /// Clock
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Take the collaborators back
    pub fn into_parts(self) -> (S, P, C) {
        (self.sensor, self.transport, self.clock)
    }

    fn maintain_link(&mut self, now: Timestamp) -> Option<Result<(), ConnectError>> {
        if self.transport.is_connected() {
            if !self.state.link_up {
                log_info!("Connection restored");
                self.state.link_up = true;
            }
            return None;
        }

        if self.state.link_up {
            log_warn!("Connection lost");
            self.state.link_up = false;
        }

        if !self.state.reconnect_schedule.fire_if_due(now) {
            return None;
        }

        let result = self.transport.reconnect();
        match result {
            Ok(()) => {
                log_info!("Connection restored");
                self.state.link_up = true;
            }
            Err(e) => {
                log_error!(
                    "Reconnect failed: {}, retrying in {} ms",
                    e,
                    self.config.reconnect_backoff.as_millis()
                );
            }
        }
        Some(result)
    }

    fn acquire(&mut self) -> ReadingSource {
        let failure = match self.sensor.sample() {
            Ok(reading) if reading.is_valid() => {
                self.state.last_reading = Some(reading);
                return ReadingSource::Fresh(reading);
            }
            Ok(_) => SensorError::InvalidData {
                reason: "non-finite value",
            },
            Err(e) => e,
        };

        match self.state.last_reading {
            Some(reading) => {
                log_warn!("Sensor read failed ({}), reusing last reading", failure);
                ReadingSource::Reused(reading)
            }
            None => {
                log_warn!("Sensor read failed ({}), no reading yet", failure);
                ReadingSource::Missing
            }
        }
    }

    fn apply_reading(&mut self, now: Timestamp, reading: Reading, report: &mut TickReport) {
        self.state.aggregator.push(Sample::from_reading(reading, now));

        let figures = self
            .config
            .profile
            .figures(self.config.role, &reading, self.state.ledger.available());
        self.state.figures = Some(figures);
        report.figures = Some(figures);

        let ledger = &mut self.state.ledger;
        report.ledger = match self.config.role {
            Role::Burner => LedgerAction::Burned(ledger.burn(figures.ledger_amount)),
            Role::Creator => match ledger.generate(figures.ledger_amount) {
                Ok(result) => LedgerAction::Generated(result),
                Err(e) => {
                    log_warn!("Ledger rejected generation: {}", e);
                    LedgerAction::Rejected(e)
                }
            },
        };
        report.replenished =
            ledger.maybe_auto_replenish(self.config.replenish_threshold, self.config.replenish_amount);

        log_debug!(
            "CO2 {:.0} ppm, humidity {:.0}%, credits {:.1}, offset {}",
            reading.co2,
            reading.humidity,
            self.state.ledger.available(),
            figures.offset
        );

        let ledger_state = self.state.ledger.state();
        if let Some(kind) = self.evaluator.evaluate(&reading, &ledger_state) {
            let slot = kind.index();
            let outcome = if self.state.alert_states[slot].ready(now) {
                self.state.alert_states[slot].record(now);
                let record = Record::alert(kind, reading.co2, ledger_state.available, now);
                self.dispatch(&record)
            } else {
                DispatchOutcome::Suppressed
            };
            report.alert = Some((kind, outcome));
        }
    }

    fn publish_aggregate(&mut self, now: Timestamp) -> DispatchOutcome {
        let summary = match self.state.aggregator.summarize() {
            Ok(summary) => summary,
            Err(_) => return DispatchOutcome::Empty,
        };
        let figures = match self.state.figures {
            Some(figures) => figures,
            None => return DispatchOutcome::Empty,
        };

        let record = Record::sensor_data(&summary, &figures, self.state.ledger.available(), now);
        let outcome = self.dispatch(&record);
        if outcome.is_sent() {
            self.state.aggregator.reset();
        }
        outcome
    }

    fn dispatch(&mut self, record: &Record) -> DispatchOutcome {
        let channel = record.channel();

        if !self.transport.is_connected() {
            log_warn!("Transport down, dropped {} payload", channel.path());
            return DispatchOutcome::Dropped;
        }

        match self.transport.publish(channel, record) {
            Ok(()) => {
                log_info!("Published {} payload", channel.path());
                DispatchOutcome::Sent
            }
            Err(e) => {
                log_warn!("Publishing {} failed: {}", channel.path(), e);
                DispatchOutcome::Failed(e)
            }
        }
    }
}

#[cfg(feature = "std")]
pub use driver::TickDriver;

#[cfg(feature = "std")]
mod driver {
    use super::{DeviceState, TickReport, TickScheduler};
    use crate::time::TimeSource;
    use crate::traits::{SensorProvider, TelemetryPublisher, TransportStatus};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    /// Paces a scheduler in real time until shutdown
    ///
    /// Ticks are aligned to a fixed period on the monotonic clock. The
    /// shutdown flag is checked at each tick boundary; a tick in progress
    /// always completes.
    #[derive(Debug, Clone)]
    pub struct TickDriver {
        period: Duration,
        shutdown: Arc<AtomicBool>,
        max_ticks: Option<u64>,
    }

    impl TickDriver {
        /// Driver with its own shutdown flag
        pub fn new(period: Duration) -> Self {
            Self {
                period,
                shutdown: Arc::new(AtomicBool::new(false)),
                max_ticks: None,
            }
        }

        /// Use an externally owned shutdown flag (e.g. set by a signal handler)
        pub fn with_shutdown(mut self, flag: Arc<AtomicBool>) -> Self {
            self.shutdown = flag;
            self
        }

        /// Stop after `ticks` ticks
        pub fn with_max_ticks(mut self, ticks: u64) -> Self {
            self.max_ticks = Some(ticks);
            self
        }

        fn should_stop(&self, ticks: u64) -> bool {
            self.shutdown.load(Ordering::Relaxed) || self.max_ticks.is_some_and(|max| ticks >= max)
        }

        /// Handle that stops the driver when set to `true`
        pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
            Arc::clone(&self.shutdown)
        }

        /// Run ticks until shutdown or the tick limit; returns ticks run
        ///
        /// `on_tick` sees each report together with the state it left behind.
        pub fn run<S, P, C, F>(&self, scheduler: &mut TickScheduler<S, P, C>, mut on_tick: F) -> u64
        where
            S: SensorProvider,
            P: TelemetryPublisher + TransportStatus,
            C: TimeSource,
            F: FnMut(&TickReport, &DeviceState),
        {
            let mut ticks = 0u64;
            let mut next = Instant::now();

            while !self.should_stop(ticks) {
                let report = scheduler.tick();
                on_tick(&report, scheduler.state());
                ticks += 1;

                // No trailing sleep once the loop is over
                if self.should_stop(ticks) {
                    break;
                }

                next += self.period;
                let now = Instant::now();
                if next > now {
                    std::thread::sleep(next - now);
                } else {
                    log_debug!("Tick overran its period by {:?}", now - next);
                    next = now;
                }
            }

            log_info!("Tick driver stopped after {} ticks", ticks);
            ticks
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::Channel;
    use crate::time::MockTimeSource;
    use alloc::vec::Vec;
    use core::time::Duration;

    struct FixedSensor(Option<Reading>);

    impl SensorProvider for FixedSensor {
        fn sample(&mut self) -> Result<Reading, SensorError> {
            self.0.ok_or(SensorError::Unavailable)
        }
    }

    #[derive(Default)]
    struct Sink {
        down: bool,
        sent: Vec<Channel>,
    }

    impl TelemetryPublisher for Sink {
        fn publish(&mut self, channel: Channel, _payload: &Record) -> Result<(), PublishError> {
            self.sent.push(channel);
            Ok(())
        }
    }

    impl TransportStatus for Sink {
        fn is_connected(&self) -> bool {
            !self.down
        }

        fn reconnect(&mut self) -> Result<(), ConnectError> {
            Err(ConnectError::Timeout)
        }
    }

    fn scheduler(
        role: Role,
        reading: Option<Reading>,
    ) -> (TickScheduler<FixedSensor, Sink, MockTimeSource>, MockTimeSource) {
        let clock = MockTimeSource::new(0);
        let config = DeviceConfig::for_role(role);
        let s = TickScheduler::new(config, FixedSensor(reading), Sink::default(), clock.clone()).unwrap();
        (s, clock)
    }

    #[test]
    fn rejects_invalid_config() {
        let config = DeviceConfig::default().with_window_capacity(0);
        let result = TickScheduler::new(config, FixedSensor(None), Sink::default(), MockTimeSource::new(0));
        assert!(matches!(result, Err(ConfigError::ZeroCapacity)));
    }

    #[test]
    fn first_aggregate_one_interval_after_start() {
        let (mut s, clock) = scheduler(Role::Creator, Some(Reading::new(500.0, 40.0)));

        for _ in 0..14 {
            clock.advance(1000);
            assert_eq!(s.tick().aggregate, None);
        }
        clock.advance(1000);
        let report = s.tick();
        assert_eq!(report.aggregate, Some(DispatchOutcome::Sent));
        assert_eq!(s.transport().sent, [Channel::SensorData]);
        assert!(s.state().aggregator().is_empty());
    }

    #[test]
    fn missing_reading_skips_processing() {
        let (mut s, clock) = scheduler(Role::Burner, None);
        clock.advance(1000);
        let report = s.tick();

        assert_eq!(report.reading, ReadingSource::Missing);
        assert_eq!(report.ledger, LedgerAction::None);
        assert!(report.alert.is_none());
        assert!(s.state().aggregator().is_empty());
        assert_eq!(s.state().ledger().available(), 50.0);
    }

    #[test]
    fn burner_burns_above_baseline() {
        let (mut s, clock) = scheduler(Role::Burner, Some(Reading::new(2000.0, 50.0)));
        clock.advance(1000);
        let report = s.tick();

        match report.ledger {
            LedgerAction::Burned(burn) => assert!((burn.actual_burned - 1.0).abs() < 1e-6),
            other => panic!("unexpected ledger action {:?}", other),
        }
        assert!((s.state().ledger().available() - 49.0).abs() < 1e-4);
    }

    #[test]
    fn dropped_when_disconnected() {
        let (mut s, clock) = scheduler(Role::Creator, Some(Reading::new(3000.0, 40.0)));
        s.transport_mut().down = true;
        clock.advance(1000);

        let report = s.tick();
        assert_eq!(
            report.alert,
            Some((AlertKind::CriticalHighReading, DispatchOutcome::Dropped))
        );
        assert_eq!(report.reconnect, None);
        assert!(s.transport().sent.is_empty());
        assert!(!s.state().link_up());
    }

    #[test]
    fn status_line_format() {
        let (mut s, clock) = scheduler(Role::Creator, Some(Reading::new(1834.0, 62.0)));
        assert_eq!(s.state().status_line(), "CO2:-- Hum:-- Cred:0.0 Off:-- Link:UP");

        clock.advance(1000);
        s.tick();
        let line = s.state().status_line();
        assert!(line.starts_with("CO2:1834 Hum:62 Cred:1.5"), "{}", line);
        assert!(line.ends_with("Off:YES Link:UP"), "{}", line);
    }

    #[cfg(feature = "std")]
    #[test]
    fn driver_honours_tick_limit() {
        let (mut s, _clock) = scheduler(Role::Creator, Some(Reading::new(500.0, 40.0)));
        let driver = TickDriver::new(Duration::from_millis(1)).with_max_ticks(3);

        let mut seen = 0;
        assert_eq!(driver.run(&mut s, |_, _| seen += 1), 3);
        assert_eq!(seen, 3);
    }

    #[cfg(feature = "std")]
    #[test]
    fn driver_stops_on_shutdown_flag() {
        use core::sync::atomic::Ordering;

        let (mut s, _clock) = scheduler(Role::Creator, Some(Reading::new(500.0, 40.0)));
        let driver = TickDriver::new(Duration::from_millis(1));
        let flag = driver.shutdown_handle();

        let ran = driver.run(&mut s, |report, _| {
            if report.now == 0 {
                flag.store(true, Ordering::Relaxed);
            }
        });
        assert_eq!(ran, 1);
    }

    #[cfg(feature = "std")]
    #[test]
    fn driver_returns_without_sleeping_after_last_tick() {
        let (mut s, _clock) = scheduler(Role::Creator, Some(Reading::new(500.0, 40.0)));
        let driver = TickDriver::new(Duration::from_secs(30)).with_max_ticks(1);

        let started = std::time::Instant::now();
        assert_eq!(driver.run(&mut s, |_, _| {}), 1);
        assert!(started.elapsed() < Duration::from_secs(5));

        let driver = TickDriver::new(Duration::from_secs(30));
        let flag = driver.shutdown_handle();
        let started = std::time::Instant::now();
        let ran = driver.run(&mut s, |_, _| flag.store(true, core::sync::atomic::Ordering::Relaxed));
        assert_eq!(ran, 1);
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
