//! Telemetry record encoding and publishing.
//!
//! A record is a single HTTP request line for a dweet-style endpoint:
//!
//! ```text
//! GET /dweet/for/<device_id>?&sonar_count=<n>&sonar_average=<n>&sonar_baseline=<n> HTTP/1.1\r\n\r\n
//! ```
//!
//! Encoding is bounds-checked against a fixed capacity and never truncates.

use std::fmt::Write as _;
use std::time::Duration;

use pingtrip_traits::Transport;

use crate::error::{EncodeError, PingTripError};
use crate::hw_error::map_transport_error;

const PREFIX: &str = "GET /dweet/for/";
const QUERY_START: &str = "?";
const SUFFIX: &str = " HTTP/1.1\r\n\r\n";

pub const FIELD_COUNT: &str = "sonar_count";
pub const FIELD_AVERAGE: &str = "sonar_average";
pub const FIELD_BASELINE: &str = "sonar_baseline";

/// Default record capacity in bytes.
pub const DEFAULT_CAPACITY: usize = 256;

pub use pingtrip_config::is_valid_device_id;

/// Append-only byte buffer with a hard capacity.
#[derive(Debug)]
pub struct RecordBuilder {
    buf: Vec<u8>,
    capacity: usize,
    // Scratch for formatting field values.
    num: String,
}

impl RecordBuilder {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
            capacity,
            num: String::with_capacity(20),
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append `s` or fail without modifying the buffer.
    pub fn push_str(&mut self, s: &str) -> Result<(), EncodeError> {
        let needed = self.buf.len() + s.len();
        if needed > self.capacity {
            return Err(EncodeError::Overflow {
                needed,
                capacity: self.capacity,
            });
        }
        self.buf.extend_from_slice(s.as_bytes());
        Ok(())
    }

    /// Append `&name=value`.
    pub fn push_field(
        &mut self,
        name: &str,
        value: impl core::fmt::Display,
    ) -> Result<(), EncodeError> {
        self.num.clear();
        // Writing into a String cannot fail.
        let _ = write!(self.num, "{value}");
        let needed = self.buf.len() + 2 + name.len() + self.num.len();
        if needed > self.capacity {
            return Err(EncodeError::Overflow {
                needed,
                capacity: self.capacity,
            });
        }
        self.buf.push(b'&');
        self.buf.extend_from_slice(name.as_bytes());
        self.buf.push(b'=');
        self.buf.extend_from_slice(self.num.as_bytes());
        Ok(())
    }

    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TelemetryEncoder {
    capacity: usize,
}

impl Default for TelemetryEncoder {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl TelemetryEncoder {
    pub fn new(capacity: usize) -> Self {
        Self { capacity }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Encode one record. Fields are always emitted as count, average, baseline.
    pub fn encode(
        &self,
        device_id: &str,
        count: u64,
        average: i32,
        baseline: i32,
    ) -> Result<Vec<u8>, EncodeError> {
        if !is_valid_device_id(device_id) {
            return Err(EncodeError::InvalidDeviceId(device_id.to_string()));
        }
        let mut rb = RecordBuilder::with_capacity(self.capacity);
        rb.push_str(PREFIX)?;
        rb.push_str(device_id)?;
        rb.push_str(QUERY_START)?;
        rb.push_field(FIELD_COUNT, count)?;
        rb.push_field(FIELD_AVERAGE, average)?;
        rb.push_field(FIELD_BASELINE, baseline)?;
        rb.push_str(SUFFIX)?;
        Ok(rb.finish())
    }
}

/// Where records are delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
    pub timeout: Duration,
}

impl Default for Endpoint {
    fn default() -> Self {
        Self {
            host: "dweet.io".to_string(),
            port: 80,
            timeout: Duration::from_millis(5000),
        }
    }
}

/// Deliver one record: connect, send, drain and discard the reply, close.
///
/// Returns the number of response bytes discarded. A failure skips this
/// cycle; there is no retry.
pub fn publish<T: Transport + ?Sized>(
    transport: &mut T,
    endpoint: &Endpoint,
    record: &[u8],
) -> Result<usize, PingTripError> {
    if let Err(e) = transport.connect(&endpoint.host, endpoint.port, endpoint.timeout) {
        let err = map_transport_error(&*e);
        tracing::error!(host = %endpoint.host, port = endpoint.port, error = %err, "telemetry connect failed");
        return Err(err);
    }
    if let Err(e) = transport.send(record) {
        let err = map_transport_error(&*e);
        tracing::error!(error = %err, "telemetry send failed");
        transport.close();
        return Err(err);
    }
    let discarded = match transport.read_available() {
        Ok(bytes) => bytes.len(),
        Err(e) => {
            tracing::warn!(error = %e, "telemetry response read failed");
            0
        }
    };
    transport.close();
    tracing::debug!(bytes = record.len(), discarded, "telemetry published");
    Ok(discarded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_part_length_matches_config_bound() {
        let rec = TelemetryEncoder::default().encode("", 0, 0, 0);
        assert!(matches!(rec, Err(EncodeError::InvalidDeviceId(_))));
        let rec = TelemetryEncoder::default().encode("x", 0, 0, 0).unwrap();
        assert_eq!(rec.len(), pingtrip_config::RECORD_FIXED_LEN + 1 + 3);
    }

    #[test]
    fn push_str_failure_leaves_buffer_untouched() {
        let mut rb = RecordBuilder::with_capacity(4);
        rb.push_str("abc").unwrap();
        assert_eq!(
            rb.push_str("de"),
            Err(EncodeError::Overflow {
                needed: 5,
                capacity: 4
            })
        );
        assert_eq!(rb.len(), 3);
        assert_eq!(rb.finish(), b"abc");
    }

    #[test]
    fn negative_values_are_rendered_signed() {
        let rec = TelemetryEncoder::default().encode("d", 1, -3, 0).unwrap();
        let s = String::from_utf8(rec).unwrap();
        assert!(s.contains("&sonar_average=-3&"));
    }

    #[test]
    fn device_id_rejects_reserved_characters() {
        assert!(is_valid_device_id("Ping-Trip_1.0~x"));
        assert!(!is_valid_device_id("a/b"));
        assert!(!is_valid_device_id("a b"));
        assert!(!is_valid_device_id("a?b"));
    }
}
