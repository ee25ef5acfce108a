use std::sync::atomic::AtomicBool;
use std::time::Duration;

use pingtrip_core::mocks::{RecordingTransport, ScriptedSensor};
use pingtrip_core::{
    AnalogCalibration, Counter, CounterBuilder, Endpoint, ReadStrategy, RunParams, SamplerCfg, run,
};
use pingtrip_traits::clock::test_clock::TestClock;

fn counter(readings: Vec<u32>, clock: &TestClock) -> Counter<ScriptedSensor> {
    let mut c = CounterBuilder::new()
        .with_sensor(ScriptedSensor::new(readings))
        .with_sampler(SamplerCfg {
            strategy: ReadStrategy::Analog(AnalogCalibration::identity()),
            read_timeout: Duration::from_millis(5),
        })
        .with_clock(Box::new(clock.clone()))
        .build()
        .unwrap();
    c.set_baseline(200);
    c
}

fn params(max_ticks: u64, upload: bool) -> RunParams {
    RunParams {
        max_ticks: Some(max_ticks),
        upload,
        endpoint: Endpoint::default(),
    }
}

// Two passes of two ticks in every ten.
fn passes(n: usize) -> Vec<u32> {
    (0..n)
        .map(|i| if matches!(i % 10, 5 | 6) { 100 } else { 200 })
        .collect()
}

#[test]
fn ten_seconds_of_traffic() {
    let clock = TestClock::new();
    let mut c = counter(passes(100), &clock);
    let mut t = RecordingTransport::new();
    let summary = run(&mut c, &mut t, &params(100, true), &AtomicBool::new(false));

    assert_eq!(summary.ticks, 100);
    assert_eq!(summary.counted, 10);
    assert_eq!(summary.drift_checks, 5);
    assert_eq!(summary.baseline_moves, 0);
    assert_eq!(summary.uploads_ok, 1);
    assert_eq!(summary.snapshot.cumulative_count, 10);
    assert_eq!(clock.slept(), Duration::from_millis(10_000));

    // drift ran just before the upload, so the average restarted at 200
    assert_eq!(
        t.sent,
        vec![
            b"GET /dweet/for/PingTrip?&sonar_count=10&sonar_average=200&sonar_baseline=200 HTTP/1.1\r\n\r\n"
                .to_vec()
        ]
    );
    assert_eq!(t.connects[0].0, "dweet.io");
}

#[test]
fn receding_surface_moves_baseline_once() {
    let clock = TestClock::new();
    let readings: Vec<u32> = (0..60).map(|i| if i < 20 { 200 } else { 250 }).collect();
    let mut c = counter(readings, &clock);
    let mut t = RecordingTransport::new();
    let summary = run(&mut c, &mut t, &params(60, false), &AtomicBool::new(false));

    assert_eq!(summary.drift_checks, 3);
    assert_eq!(summary.baseline_moves, 1);
    assert_eq!(summary.counted, 0);
    assert_eq!(summary.snapshot.baseline_distance, 249);
    assert!(t.connects.is_empty());
}

#[test]
fn failed_upload_is_skipped_and_loop_continues() {
    let clock = TestClock::new();
    let mut c = counter(passes(250), &clock);
    let mut t = RecordingTransport::refusing();
    let summary = run(&mut c, &mut t, &params(250, true), &AtomicBool::new(false));

    assert_eq!(summary.ticks, 250);
    assert_eq!(summary.uploads_failed, 2);
    assert_eq!(summary.uploads_ok, 0);
    assert_eq!(t.connects.len(), 2);
    assert_eq!(summary.counted, 25);
}

#[test]
fn shutdown_flag_stops_before_first_tick() {
    let clock = TestClock::new();
    let mut c = counter(passes(10), &clock);
    let mut t = RecordingTransport::new();
    let params = RunParams {
        max_ticks: None,
        ..RunParams::default()
    };
    let summary = run(&mut c, &mut t, &params, &AtomicBool::new(true));
    assert_eq!(summary.ticks, 0);
    assert_eq!(clock.sleep_calls(), 0);
    assert_eq!(summary.snapshot.baseline_distance, 200);
}
