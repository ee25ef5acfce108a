//! Hardware and I/O seams shared across the PingTrip workspace.
//!
//! The core engine only talks to the outside world through these traits, so
//! tests and the simulator can stand in for GPIO, ADC and network access.
pub mod clock;

pub use clock::{Clock, MonotonicClock};

/// Boxed error used at trait boundaries; the core maps it to typed errors.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A ranging sensor that yields one raw reading per call.
///
/// The meaning of the raw value depends on the configured read method:
/// echo round-trip width in microseconds for pulse sensors, ADC counts for
/// analog proxies. Unit conversion is owned by the core sampler.
pub trait RangeSensor {
    fn read_raw(&mut self, timeout: std::time::Duration) -> Result<u32, BoxError>;
}

impl<T: RangeSensor + ?Sized> RangeSensor for Box<T> {
    fn read_raw(&mut self, timeout: std::time::Duration) -> Result<u32, BoxError> {
        (**self).read_raw(timeout)
    }
}

/// Byte transport to the telemetry endpoint.
pub trait Transport {
    fn connect(
        &mut self,
        host: &str,
        port: u16,
        timeout: std::time::Duration,
    ) -> Result<(), BoxError>;
    fn send(&mut self, bytes: &[u8]) -> Result<(), BoxError>;
    /// Drain whatever the peer has sent so far (may be empty).
    fn read_available(&mut self) -> Result<Vec<u8>, BoxError>;
    fn close(&mut self);
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn connect(
        &mut self,
        host: &str,
        port: u16,
        timeout: std::time::Duration,
    ) -> Result<(), BoxError> {
        (**self).connect(host, port, timeout)
    }
    fn send(&mut self, bytes: &[u8]) -> Result<(), BoxError> {
        (**self).send(bytes)
    }
    fn read_available(&mut self) -> Result<Vec<u8>, BoxError> {
        (**self).read_available()
    }
    fn close(&mut self) {
        (**self).close();
    }
}
