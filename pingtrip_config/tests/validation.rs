use pingtrip_config::{ReadMethod, load_toml};
use rstest::rstest;

const FULL: &str = r#"
[sensor]
read_method = "pulse"
nominal_temp_c = 20.0
read_timeout_ms = 40

[pins]
trigger = 17
echo = 27

[calibration]
max_variance = 4
min_reads = 10
max_reads = 15
inter_sample_ms = 50

[detection]
threshold_cm = 60
successive_threshold = 2
tick_ms = 50

[drift]
threshold_cm = 8
interval_ms = 1000

[telemetry]
enabled = true
device_id = "Hall-North"
host = "dweet.io"
port = 80
interval_ms = 5000
timeout_ms = 2000
max_record_len = 200

[logging]
level = "debug"
rotation = "daily"
"#;

#[test]
fn full_config_parses_and_validates() {
    let cfg = load_toml(FULL).expect("parse TOML");
    cfg.validate().expect("valid config");
    assert_eq!(cfg.sensor.read_method, ReadMethod::Pulse);
    assert_eq!(cfg.pins.trigger, 17);
    assert_eq!(cfg.calibration.max_reads, 15);
    assert_eq!(cfg.detection.successive_threshold, 2);
    assert_eq!(cfg.drift.threshold_cm, 8);
    assert_eq!(cfg.telemetry.device_id, "Hall-North");
    assert_eq!(cfg.logging.rotation.as_deref(), Some("daily"));
}

#[test]
fn analog_without_calibration_is_rejected_unless_csv_supplied() {
    let cfg = load_toml("[sensor]\nread_method = \"analog\"\n").unwrap();
    let err = cfg.validate().expect_err("analog needs calibration");
    assert!(format!("{err}").contains("sensor.analog is required"));
    cfg.validate_with(true).expect("csv will provide calibration");
}

#[test]
fn analog_inline_calibration_parses() {
    let cfg = load_toml(
        r#"
[sensor]
read_method = "analog"
[sensor.analog]
gain_cm_per_count = 0.5
zero_counts = 12
"#,
    )
    .unwrap();
    cfg.validate().unwrap();
    let a = cfg.sensor.analog.unwrap();
    assert_eq!(a.zero_counts, 12);
    assert_eq!(a.offset_cm, 0.0);
}

#[test]
fn unknown_read_method_fails_to_parse() {
    assert!(load_toml("[sensor]\nread_method = \"laser\"\n").is_err());
}

#[rstest]
#[case("[calibration]\nmin_reads = 40\nmax_reads = 30\n", "min_reads must be <=")]
#[case("[calibration]\nmax_reads = 0\nmin_reads = 0\n", "max_reads must be >= 1")]
#[case("[calibration]\nmax_variance = -1\n", "max_variance must be >= 0")]
#[case("[detection]\ntick_ms = 0\n", "tick_ms must be >= 1")]
#[case("[detection]\nthreshold_cm = -5\n", "threshold_cm must be >= 0")]
#[case("[drift]\ninterval_ms = 0\n", "drift.interval_ms must be >= 1")]
#[case("[sensor]\nnominal_temp_c = 120.0\n", "nominal_temp_c")]
#[case("[sensor]\nread_timeout_ms = 0\n", "read_timeout_ms")]
#[case("[pins]\nadc_channel = 9\n", "adc_channel")]
#[case("[telemetry]\ndevice_id = \"has space\"\n", "device_id")]
#[case("[telemetry]\nmax_record_len = 40\n", "max_record_len must be >=")]
#[case("[telemetry]\nport = 0\n", "telemetry.port")]
#[case("[sensor.analog]\ngain_cm_per_count = 0.0\n", "gain_cm_per_count")]
#[case("[logging]\nrotation = \"weekly\"\n", "logging.rotation")]
fn rejects_invalid_values(#[case] toml: &str, #[case] needle: &str) {
    let cfg = load_toml(toml).expect("parse TOML");
    let err = cfg.validate().expect_err("should reject");
    assert!(
        format!("{err}").contains(needle),
        "expected {needle:?} in {err}"
    );
}

#[test]
fn disabled_telemetry_skips_endpoint_checks() {
    let cfg = load_toml("[telemetry]\nenabled = false\nhost = \"\"\nport = 0\n").unwrap();
    cfg.validate().unwrap();
}
