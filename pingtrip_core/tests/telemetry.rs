use std::time::Duration;

use pingtrip_core::mocks::RecordingTransport;
use pingtrip_core::{EncodeError, Endpoint, PingTripError, TelemetryEncoder, publish};
use rstest::rstest;

#[test]
fn record_is_bit_exact() {
    let rec = TelemetryEncoder::default()
        .encode("PingTrip", 5, 198, 200)
        .unwrap();
    assert_eq!(
        rec,
        b"GET /dweet/for/PingTrip?&sonar_count=5&sonar_average=198&sonar_baseline=200 HTTP/1.1\r\n\r\n"
    );
}

#[test]
fn large_values_fit_default_capacity() {
    let rec = TelemetryEncoder::default()
        .encode("bridge-7", u64::MAX, i32::MAX, i32::MAX)
        .unwrap();
    let s = String::from_utf8(rec).unwrap();
    assert!(s.contains("sonar_count=18446744073709551615&"));
    assert!(s.ends_with(" HTTP/1.1\r\n\r\n"));
}

#[rstest]
#[case::id_alone_too_long(16, 15 + 8)]
#[case::field_does_not_fit(40, 56)]
#[case::suffix_does_not_fit(87, 88)]
fn overflow_is_rejected_not_truncated(#[case] capacity: usize, #[case] needed: usize) {
    let err = TelemetryEncoder::new(capacity)
        .encode("PingTrip", 5, 198, 200)
        .unwrap_err();
    assert_eq!(err, EncodeError::Overflow { needed, capacity });
}

#[rstest]
#[case("")]
#[case("with space")]
#[case("slash/id")]
#[case("query?id")]
fn invalid_device_ids_rejected(#[case] id: &str) {
    assert_eq!(
        TelemetryEncoder::default().encode(id, 0, 0, 0),
        Err(EncodeError::InvalidDeviceId(id.to_string()))
    );
}

fn endpoint() -> Endpoint {
    Endpoint {
        host: "telemetry.local".into(),
        port: 8080,
        timeout: Duration::from_millis(750),
    }
}

#[test]
fn publish_sends_record_and_discards_reply() {
    let mut t = RecordingTransport::new();
    t.response = b"HTTP/1.1 200 OK\r\n\r\n{}".to_vec();
    let discarded = publish(&mut t, &endpoint(), b"GET / HTTP/1.1\r\n\r\n").unwrap();
    assert_eq!(discarded, 21);
    assert_eq!(
        t.connects,
        vec![("telemetry.local".to_string(), 8080, Duration::from_millis(750))]
    );
    assert_eq!(t.sent, vec![b"GET / HTTP/1.1\r\n\r\n".to_vec()]);
    assert_eq!(t.closes, 1);
    assert!(!t.is_connected());
}

#[test]
fn connect_failure_skips_the_cycle() {
    let mut t = RecordingTransport::refusing();
    let err = publish(&mut t, &endpoint(), b"x").unwrap_err();
    assert!(matches!(err, PingTripError::Transport(ref m) if m.contains("refused")));
    assert!(t.sent.is_empty());
    assert_eq!(t.closes, 0);
}

#[test]
fn send_failure_still_closes() {
    let mut t = RecordingTransport {
        fail_send: true,
        ..RecordingTransport::default()
    };
    let err = publish(&mut t, &endpoint(), b"x").unwrap_err();
    assert!(matches!(err, PingTripError::Transport(_)));
    assert_eq!(t.closes, 1);
}
