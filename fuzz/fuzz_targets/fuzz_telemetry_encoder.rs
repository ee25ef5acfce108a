#![no_main]
use libfuzzer_sys::arbitrary::{self, Arbitrary};
use libfuzzer_sys::fuzz_target;
use pingtrip_core::{EncodeError, TelemetryEncoder};

#[derive(Debug, Arbitrary)]
struct Input<'a> {
    device_id: &'a str,
    count: u64,
    average: i32,
    baseline: i32,
    capacity: u16,
}

fuzz_target!(|input: Input<'_>| {
    let enc = TelemetryEncoder::new(usize::from(input.capacity));
    match enc.encode(input.device_id, input.count, input.average, input.baseline) {
        Ok(rec) => {
            assert!(rec.len() <= enc.capacity());
            assert!(rec.starts_with(b"GET /dweet/for/"));
            assert!(rec.ends_with(b" HTTP/1.1\r\n\r\n"));
        }
        Err(EncodeError::Overflow { needed, capacity }) => assert!(needed > capacity),
        Err(EncodeError::InvalidDeviceId(_)) => {
            assert!(!pingtrip_config::is_valid_device_id(input.device_id));
        }
    }
});
