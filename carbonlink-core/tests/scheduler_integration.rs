//! Integration tests for the tick scheduler
//!
//! Each test wires a scheduler to a scripted sensor, a recording transport
//! and a mock clock, then walks it through a scenario tick by tick.

mod common;

use core::time::Duration;

use carbonlink_core::errors::{ConnectError, PublishError, SensorError};
use carbonlink_core::payload::{Channel, Scalar};
use carbonlink_core::scheduler::{LedgerAction, ReadingSource};
use carbonlink_core::traits::Reading;
use carbonlink_core::{AlertKind, DispatchOutcome};

use common::scenarios::{fast_burner, fast_creator, ramp};
use common::{float, uint, RecordingTransport, Rig, ScriptedSensor};

#[test]
fn alert_cooldown_boundaries() {
    let mut rig = Rig::new(
        fast_burner(),
        ScriptedSensor::constant(2600.0, 50.0),
        RecordingTransport::new(),
    );

    let fired = rig.step(1000);
    assert_eq!(
        fired.alert,
        Some((AlertKind::CriticalHighReading, DispatchOutcome::Sent))
    );

    // t + cooldown - 1 ms
    let early = rig.step(9_999);
    assert_eq!(
        early.alert,
        Some((AlertKind::CriticalHighReading, DispatchOutcome::Suppressed))
    );

    // t + cooldown + 1 ms
    let late = rig.step(2);
    assert_eq!(
        late.alert,
        Some((AlertKind::CriticalHighReading, DispatchOutcome::Sent))
    );

    assert_eq!(rig.transport().on(Channel::Alert).len(), 2);
}

#[test]
fn alert_kinds_cool_down_independently() {
    let config = fast_burner()
        .with_initial_credits(1.0)
        .with_auto_replenish(false);
    let sensor = ScriptedSensor::new([
        Ok(Reading::new(900.0, 50.0)),
        Ok(Reading::new(2600.0, 50.0)),
    ]);
    let mut rig = Rig::new(config, sensor, RecordingTransport::new());

    let first = rig.step(1000);
    assert_eq!(first.alert, Some((AlertKind::LowCredits, DispatchOutcome::Sent)));

    let second = rig.step(1000);
    assert_eq!(
        second.alert,
        Some((AlertKind::CriticalHighReading, DispatchOutcome::Sent))
    );

    let state = rig.scheduler.state();
    assert_eq!(state.alert_state(AlertKind::LowCredits).last_fired_at, Some(1000));
    assert_eq!(
        state.alert_state(AlertKind::CriticalHighReading).last_fired_at,
        Some(2000)
    );
}

#[test]
fn burner_critical_reading_alert_payload() {
    let config = fast_burner().with_initial_credits(20.0);
    let mut rig = Rig::new(
        config,
        ScriptedSensor::constant(2600.0, 50.0),
        RecordingTransport::new(),
    );

    let report = rig.step(1000);
    assert_eq!(report.alert.map(|(k, _)| k), Some(AlertKind::CriticalHighReading));

    let alerts = rig.transport().on(Channel::Alert);
    let alert = alerts[0];
    assert_eq!(alert.get("alert_type"), Some(&Scalar::Text("HIGH_CO2")));
    assert_eq!(
        alert.get("message"),
        Some(&Scalar::Text("Dangerous CO2 levels detected!"))
    );
    assert_eq!(float(alert, "co2"), 2600.0);
    // 20 - (2600 - 1000) * 0.001
    assert!((float(alert, "credits") - 18.4).abs() < 1e-4);
    assert_eq!(uint(alert, "timestamp"), 1000);
}

#[test]
fn failed_publish_keeps_window_until_success() {
    let config = fast_creator().with_initial_credits(100.0);
    let mut transport = RecordingTransport::new();
    transport.fail_next(1, PublishError::Rejected { reason: "broker busy" });
    let mut rig = Rig::new(config, ScriptedSensor::constant(500.0, 40.0), transport);

    let reports = rig.run_secs(5);
    assert_eq!(
        reports[4].aggregate,
        Some(DispatchOutcome::Failed(PublishError::Rejected { reason: "broker busy" }))
    );
    assert_eq!(rig.scheduler.state().aggregator().len(), 5);
    assert!(rig.transport().on(Channel::SensorData).is_empty());

    let reports = rig.run_secs(5);
    assert_eq!(reports[4].aggregate, Some(DispatchOutcome::Sent));
    assert!(rig.scheduler.state().aggregator().is_empty());

    let sent = rig.transport().on(Channel::SensorData);
    assert_eq!(sent.len(), 1);
    assert_eq!(uint(sent[0], "sample_count"), 10);
}

#[test]
fn disconnected_dispatch_dropped_and_reconnect_on_backoff() {
    let config = fast_creator().with_initial_credits(100.0);
    let mut transport = RecordingTransport::disconnected();
    transport.reconnect_result = Err(ConnectError::Timeout);
    let mut rig = Rig::new(config, ScriptedSensor::constant(500.0, 40.0), transport);

    let reports = rig.run_secs(12);
    let attempts: Vec<u64> = reports
        .iter()
        .filter(|r| r.reconnect.is_some())
        .map(|r| r.now)
        .collect();
    assert_eq!(attempts, [5000, 10_000]);
    assert_eq!(rig.transport().reconnect_attempts, 2);

    // Aggregate timer advanced, window kept
    assert_eq!(reports[4].aggregate, Some(DispatchOutcome::Dropped));
    assert_eq!(reports[9].aggregate, Some(DispatchOutcome::Dropped));
    assert_eq!(rig.transport().publish_attempts, 0);
    assert_eq!(rig.scheduler.state().aggregator().len(), 12);

    rig.transport_mut().reconnect_result = Ok(());
    let reports = rig.run_secs(3);
    assert_eq!(reports[2].now, 15_000);
    assert_eq!(reports[2].reconnect, Some(Ok(())));
    assert_eq!(reports[2].aggregate, Some(DispatchOutcome::Sent));
    assert!(rig.scheduler.state().link_up());

    let sent = rig.transport().on(Channel::SensorData);
    assert_eq!(uint(sent[0], "sample_count"), 15);
}

#[test]
fn sensor_failure_reuses_last_reading() {
    let sensor = ScriptedSensor::new([
        Err(SensorError::Timeout),
        Ok(Reading::new(700.0, 45.0)),
        Err(SensorError::InvalidData { reason: "crc mismatch" }),
    ]);
    let mut rig = Rig::new(fast_creator(), sensor, RecordingTransport::new());

    let reports = rig.run_secs(4);
    assert_eq!(reports[0].reading, ReadingSource::Missing);
    assert_eq!(reports[0].ledger, LedgerAction::None);
    assert_eq!(reports[1].reading, ReadingSource::Fresh(Reading::new(700.0, 45.0)));
    assert_eq!(reports[2].reading, ReadingSource::Reused(Reading::new(700.0, 45.0)));
    assert_eq!(reports[3].reading, ReadingSource::Reused(Reading::new(700.0, 45.0)));

    let window = rig.scheduler.state().aggregator();
    assert_eq!(window.len(), 3);
    // Reused readings carry the tick time, not the original one
    assert_eq!(window.latest().map(|s| s.timestamp), Some(4000));
}

#[test]
fn non_finite_reading_counts_as_failure() {
    let sensor = ScriptedSensor::new([
        Ok(Reading::new(600.0, 40.0)),
        Ok(Reading::new(f32::NAN, 40.0)),
    ]);
    let mut rig = Rig::new(fast_creator(), sensor, RecordingTransport::new());

    let reports = rig.run_secs(2);
    assert_eq!(reports[1].reading, ReadingSource::Reused(Reading::new(600.0, 40.0)));
}

#[test]
fn creator_generates_and_reports_figures() {
    let mut rig = Rig::new(
        fast_creator(),
        ScriptedSensor::constant(1300.0, 40.0),
        RecordingTransport::new(),
    );

    let reports = rig.run_secs(5);
    match reports[0].ledger {
        LedgerAction::Generated(result) => assert!((result.generated - 1.0).abs() < 1e-6),
        other => panic!("unexpected ledger action {:?}", other),
    }

    let ledger = rig.scheduler.state().ledger().state();
    assert!((ledger.available - 5.0).abs() < 1e-4);
    assert!((ledger.generated_lifetime - 5.0).abs() < 1e-4);
    assert_eq!(ledger.burned_lifetime, 0.0);

    let sent = rig.transport().on(Channel::SensorData);
    assert_eq!(sent.len(), 1);
    let record = sent[0];
    assert_eq!(float(record, "avg_co2"), 1300.0);
    assert_eq!(float(record, "credits"), 650.0);
    assert!((float(record, "emissions") - 8.0).abs() < 1e-4);
    assert_eq!(record.get("offset"), Some(&Scalar::Bool(true)));
    assert_eq!(uint(record, "sample_count"), 5);
    assert_eq!(uint(record, "timestamp"), 5000);
    assert!((float(record, "credits_available") - 5.0).abs() < 1e-4);

    // Starting from zero, the low-credits alert fires once within the cooldown
    assert_eq!(rig.transport().on(Channel::Alert).len(), 1);
}

#[test]
fn burner_auto_replenishes_below_threshold() {
    let config = fast_burner().with_initial_credits(10.5);
    let mut rig = Rig::new(
        config,
        ScriptedSensor::constant(3000.0, 60.0),
        RecordingTransport::new(),
    );

    let report = rig.step(1000);
    match report.ledger {
        LedgerAction::Burned(burn) => assert!((burn.actual_burned - 2.0).abs() < 1e-6),
        other => panic!("unexpected ledger action {:?}", other),
    }
    assert!(report.replenished);

    let ledger = rig.scheduler.state().ledger().state();
    assert!((ledger.available - 108.5).abs() < 1e-3);
    assert_eq!(ledger.replenished_lifetime, 100.0);
    assert!((ledger.session_delta + 2.0).abs() < 1e-6);
}

#[test]
fn window_reports_most_recent_capacity_samples() {
    let config = fast_creator()
        .with_aggregate_interval(Duration::from_secs(20))
        .with_window_capacity(15);
    let mut rig = Rig::new(
        config,
        ScriptedSensor::new(ramp(1.0, 1.0, 20)),
        RecordingTransport::new(),
    );

    rig.run_secs(20);
    let sent = rig.transport().on(Channel::SensorData);
    assert_eq!(sent.len(), 1);
    assert_eq!(uint(sent[0], "sample_count"), 15);
    assert_eq!(float(sent[0], "min_co2"), 6.0);
    assert_eq!(float(sent[0], "max_co2"), 20.0);
    assert!((float(sent[0], "avg_co2") - 13.0).abs() < 1e-4);
}

#[test]
fn empty_window_skips_aggregate() {
    let sensor = ScriptedSensor::new([Err(SensorError::Unavailable)]);
    let mut rig = Rig::new(fast_creator(), sensor, RecordingTransport::new());

    let reports = rig.run_secs(5);
    assert_eq!(reports[4].aggregate, Some(DispatchOutcome::Empty));
    assert_eq!(rig.transport().publish_attempts, 0);
}

#[test]
fn heartbeat_carries_uptime_and_signal() {
    let mut transport = RecordingTransport::new();
    transport.signal = Some(-67);
    let mut rig = Rig::new(
        fast_creator().with_initial_credits(100.0),
        ScriptedSensor::constant(500.0, 40.0),
        transport,
    );

    let reports = rig.run_secs(60);
    assert!(reports[..59].iter().all(|r| r.heartbeat.is_none()));
    assert_eq!(reports[59].heartbeat, Some(DispatchOutcome::Sent));

    let beats = rig.transport().on(Channel::Heartbeat);
    assert_eq!(beats.len(), 1);
    assert_eq!(beats[0].get("status"), Some(&Scalar::Text("online")));
    assert_eq!(uint(beats[0], "uptime"), 60_000);
    assert_eq!(beats[0].get("signal_strength"), Some(&Scalar::Int(-67)));
}

#[test]
fn heartbeat_without_signal_omits_field() {
    let mut rig = Rig::new(
        fast_creator()
            .with_initial_credits(100.0)
            .with_heartbeat_interval(Duration::from_secs(2)),
        ScriptedSensor::constant(500.0, 40.0),
        RecordingTransport::new(),
    );

    rig.run_secs(2);
    let beats = rig.transport().on(Channel::Heartbeat);
    assert_eq!(beats.len(), 1);
    assert!(beats[0].get("signal_strength").is_none());
}
