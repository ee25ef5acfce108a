use std::time::Duration;

use pingtrip_core::mocks::ScriptedSensor;
use pingtrip_core::{
    AnalogCalibration, BaselineOutcome, BuildError, CalibrationCfg, Counter, CounterBuilder,
    DetectionCfg, DisableReason, DriftCfg, DriftOutcome, ReadStrategy, SamplerCfg, TelemetryCfg,
    TickOutcome,
};
use pingtrip_traits::clock::test_clock::TestClock;
use rstest::{fixture, rstest};

// Raw readings are centimeters.
fn identity_sampler() -> SamplerCfg {
    SamplerCfg {
        strategy: ReadStrategy::Analog(AnalogCalibration::identity()),
        read_timeout: Duration::from_millis(5),
    }
}

fn counter_with(sensor: ScriptedSensor, clock: &TestClock) -> Counter<ScriptedSensor> {
    CounterBuilder::new()
        .with_sensor(sensor)
        .with_sampler(identity_sampler())
        .with_clock(Box::new(clock.clone()))
        .build()
        .expect("valid defaults")
}

#[fixture]
fn clock() -> TestClock {
    TestClock::new()
}

#[rstest]
fn stable_surface_establishes_baseline(clock: TestClock) {
    let mut c = counter_with(ScriptedSensor::new([200]), &clock);
    assert_eq!(c.establish_baseline(), BaselineOutcome::Established(200));
    let snap = c.snapshot();
    assert!(snap.baseline_established);
    assert_eq!(snap.baseline_distance, 200);
    assert_eq!(snap.rolling_average, 200);
    assert_eq!(clock.slept(), Duration::from_millis(20 * 200));
    // initial sample plus twenty averaging reads
    assert_eq!(c.sampler().sensor().reads(), 21);
}

#[rstest]
fn baseline_too_close_disables_detection(clock: TestClock) {
    let mut c = counter_with(ScriptedSensor::new([60]), &clock);
    assert_eq!(
        c.establish_baseline(),
        BaselineOutcome::Disabled(DisableReason::BelowThreshold {
            baseline: 60,
            threshold: 70
        })
    );
    assert!(!c.baseline().is_established());
    assert_eq!(c.tick_with_sample(0), TickOutcome::Clear);
    assert_eq!(c.snapshot().cumulative_count, 0);
}

#[rstest]
fn calibration_failure_keeps_running_with_zero_baseline(clock: TestClock) {
    let readings = (0..40).map(|i| if i % 2 == 0 { 100 } else { 250 });
    let mut c = counter_with(ScriptedSensor::new(readings), &clock);
    let outcome = c.establish_baseline();
    assert!(matches!(
        outcome,
        BaselineOutcome::Disabled(DisableReason::CalibrationFailed(e)) if e.iterations == 30
    ));
    // the average is seeded with the last sample taken during calibration
    assert_eq!(c.snapshot().rolling_average, 100);
    assert_eq!(c.correct_drift(), DriftOutcome::Skipped);
    let rec = String::from_utf8(c.encode_telemetry().unwrap()).unwrap();
    assert!(rec.ends_with("&sonar_baseline=0 HTTP/1.1\r\n\r\n"));
}

#[rstest]
fn failed_reads_yield_zero_and_are_counted(clock: TestClock) {
    let sensor = ScriptedSensor::from_script([Some(200), None, Some(200)]);
    let mut c = counter_with(sensor, &clock);
    c.set_baseline(200);
    assert_eq!(c.tick(), TickOutcome::Clear);
    // a dropout reads as 0 cm, which looks like a very close object
    assert_eq!(c.tick(), TickOutcome::Counted(1));
    assert_eq!(c.tick(), TickOutcome::Clear);
    let snap = c.snapshot();
    assert_eq!(snap.failed_reads, 1);
    assert_eq!(snap.latest_sample, 200);
}

#[rstest]
fn end_to_end_through_the_sampler(clock: TestClock) {
    let mut c = counter_with(ScriptedSensor::new([200, 120, 200]), &clock);
    c.set_baseline(200);
    for _ in 0..3 {
        c.tick();
    }
    let snap = c.snapshot();
    assert_eq!(snap.cumulative_count, 1);
    assert_eq!(snap.successive_run, 0);
    assert_eq!(snap.rolling_average, 180);
}

#[rstest]
fn telemetry_reflects_snapshot(clock: TestClock) {
    let mut c = CounterBuilder::new()
        .with_sensor(ScriptedSensor::new([200]))
        .with_sampler(identity_sampler())
        .with_telemetry(TelemetryCfg {
            device_id: "gate-3".into(),
            ..TelemetryCfg::default()
        })
        .with_clock(Box::new(clock))
        .build()
        .unwrap();
    c.set_baseline(200);
    c.tick_with_sample(120);
    c.tick_with_sample(200);
    assert_eq!(
        c.encode_telemetry().unwrap(),
        b"GET /dweet/for/gate-3?&sonar_count=1&sonar_average=180&sonar_baseline=200 HTTP/1.1\r\n\r\n"
    );
}

#[rstest]
#[case::zero_max_reads(
    CounterBuilder::new().with_calibration(CalibrationCfg { min_reads: 0, max_reads: 0, ..CalibrationCfg::default() }),
    "calibration.max_reads must be >= 1"
)]
#[case::min_above_max(
    CounterBuilder::new().with_calibration(CalibrationCfg { min_reads: 31, ..CalibrationCfg::default() }),
    "calibration.min_reads must be <= calibration.max_reads"
)]
#[case::negative_threshold(
    CounterBuilder::new().with_detection(DetectionCfg { threshold_cm: -1, ..DetectionCfg::default() }),
    "detection.threshold_cm must be >= 0"
)]
#[case::zero_tick(
    CounterBuilder::new().with_detection(DetectionCfg { tick: Duration::ZERO, ..DetectionCfg::default() }),
    "detection.tick must be > 0"
)]
#[case::zero_drift_interval(
    CounterBuilder::new().with_drift(DriftCfg { interval: Duration::ZERO, ..DriftCfg::default() }),
    "drift.interval must be > 0"
)]
#[case::bad_device_id(
    CounterBuilder::new().with_telemetry(TelemetryCfg { device_id: "a b".into(), ..TelemetryCfg::default() }),
    "telemetry.device_id must be non-empty URL-unreserved characters"
)]
#[case::record_too_small(
    CounterBuilder::new().with_telemetry(TelemetryCfg { max_record_len: 83, ..TelemetryCfg::default() }),
    "telemetry.max_record_len too small for device_id"
)]
fn builder_rejects_invalid_config(
    #[case] builder: CounterBuilder<pingtrip_core::counter::Missing>,
    #[case] expected: &str,
) {
    let err = builder
        .with_sensor(ScriptedSensor::new([200]))
        .build()
        .expect_err("invalid config");
    let BuildError::InvalidConfig(msg) = err;
    assert_eq!(msg, expected);
}

#[test]
fn builder_accepts_file_config() {
    let cfg = pingtrip_config::load_toml(
        r#"
        [sensor]
        read_method = "analog"
        [sensor.analog]
        gain_cm_per_count = 0.5
        [detection]
        threshold_cm = 40
        successive_threshold = 1
        [telemetry]
        device_id = "lot-a"
        "#,
    )
    .unwrap();
    let mut c = CounterBuilder::new()
        .apply_config(&cfg, None)
        .unwrap()
        .with_sensor(ScriptedSensor::new([400]))
        .with_clock(Box::new(TestClock::new()))
        .build()
        .unwrap();
    assert_eq!(c.detection_cfg().threshold_cm, 40);
    assert_eq!(c.telemetry_cfg().device_id, "lot-a");
    // 400 counts at 0.5 cm/count
    assert_eq!(c.establish_baseline(), BaselineOutcome::Established(200));
}
