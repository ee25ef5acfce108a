//! Sensor and transport backends for PingTrip.
//!
//! - `SimulatedRangeSensor` produces raw echo widths or ADC counts for a
//!   scripted scene (reference surface, passing objects, surface changes).
//! - `TcpTransport` carries telemetry records to the endpoint.
//! - With the `hardware` feature on Linux, `HardwareRangeSensor` drives an
//!   HC-SR04 over GPIO or an MCP3008 ADC over SPI.
pub mod error;
#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod hcsr04;
#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod mcp3008;
pub mod net;
pub mod util;

pub use net::TcpTransport;

use pingtrip_traits::{BoxError, RangeSensor};

use crate::error::HwError;

/// How the simulator encodes a distance into a raw reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SimSignal {
    /// Round-trip echo width in microseconds at `speed_m_s`.
    EchoMicros { speed_m_s: f32 },
    /// Linear ADC proxy: `counts = cm * counts_per_cm + zero_counts`.
    AdcCounts { counts_per_cm: f32, zero_counts: u32 },
}

impl SimSignal {
    fn encode(self, cm: f32) -> u32 {
        let raw = match self {
            SimSignal::EchoMicros { speed_m_s } => cm * 20_000.0 / speed_m_s,
            SimSignal::AdcCounts {
                counts_per_cm,
                zero_counts,
            } => cm * counts_per_cm + zero_counts as f32,
        };
        raw.round().max(0.0) as u32
    }
}

/// Scripted ranging scene.
///
/// Read `n` (0-based) sees the object when `n % pass_every` falls in the last
/// `pass_len` slots of the period; otherwise it sees the reference surface.
#[derive(Debug, Clone)]
pub struct SimulatedRangeSensor {
    signal: SimSignal,
    surface_cm: f32,
    object_cm: f32,
    pass_every: u64,
    pass_len: u64,
    jitter_cm: f32,
    surface_change: Option<(u64, f32)>,
    dropout_every: u64,
    reads: u64,
}

impl SimulatedRangeSensor {
    pub fn new(signal: SimSignal, surface_cm: f32) -> Self {
        Self {
            signal,
            surface_cm,
            object_cm: surface_cm,
            pass_every: 0,
            pass_len: 0,
            jitter_cm: 0.0,
            surface_change: None,
            dropout_every: 0,
            reads: 0,
        }
    }

    /// Let an object at `object_cm` pass for `len` reads out of every `every`.
    pub fn with_passes(mut self, every: u64, len: u64, object_cm: f32) -> Self {
        self.pass_every = every;
        self.pass_len = len.min(every);
        self.object_cm = object_cm;
        self
    }

    /// Alternate `+jitter`/`-jitter` around the true distance.
    pub fn with_jitter(mut self, jitter_cm: f32) -> Self {
        self.jitter_cm = jitter_cm.abs();
        self
    }

    /// Move the reference surface to `surface_cm` from read `after_reads` on.
    pub fn with_surface_change(mut self, after_reads: u64, surface_cm: f32) -> Self {
        self.surface_change = Some((after_reads, surface_cm));
        self
    }

    /// Fail every `every`-th read with a timeout (0 disables).
    pub fn with_dropouts(mut self, every: u64) -> Self {
        self.dropout_every = every;
        self
    }

    pub fn reads(&self) -> u64 {
        self.reads
    }

    fn distance_at(&self, n: u64) -> f32 {
        let surface = match self.surface_change {
            Some((after, cm)) if n >= after => cm,
            _ => self.surface_cm,
        };
        let passing = self.pass_every > 0
            && self.pass_len > 0
            && n % self.pass_every >= self.pass_every - self.pass_len;
        let base = if passing { self.object_cm } else { surface };
        let jitter = if n % 2 == 0 {
            self.jitter_cm
        } else {
            -self.jitter_cm
        };
        (base + jitter).max(0.0)
    }
}

impl RangeSensor for SimulatedRangeSensor {
    fn read_raw(&mut self, _timeout: std::time::Duration) -> Result<u32, BoxError> {
        let n = self.reads;
        self.reads += 1;
        if self.dropout_every > 0 && (n + 1) % self.dropout_every == 0 {
            tracing::trace!(read = n, "simulated dropout");
            return Err(Box::new(HwError::Timeout));
        }
        let cm = self.distance_at(n);
        let raw = self.signal.encode(cm);
        tracing::trace!(read = n, cm, raw, "simulated range read");
        Ok(raw)
    }
}

/// Physical sensor selected by read method.
#[cfg(all(feature = "hardware", target_os = "linux"))]
pub enum HardwareRangeSensor {
    Pulse(hcsr04::Hcsr04),
    Analog(mcp3008::Mcp3008),
}

#[cfg(all(feature = "hardware", target_os = "linux"))]
impl HardwareRangeSensor {
    pub fn pulse(trigger_pin: u8, echo_pin: u8) -> error::Result<Self> {
        Ok(Self::Pulse(hcsr04::Hcsr04::new(trigger_pin, echo_pin)?))
    }

    pub fn analog(channel: u8) -> error::Result<Self> {
        Ok(Self::Analog(mcp3008::Mcp3008::new(channel)?))
    }
}

#[cfg(all(feature = "hardware", target_os = "linux"))]
impl RangeSensor for HardwareRangeSensor {
    fn read_raw(&mut self, timeout: std::time::Duration) -> Result<u32, BoxError> {
        let res = match self {
            HardwareRangeSensor::Pulse(s) => s.ping(timeout),
            HardwareRangeSensor::Analog(a) => a.read_counts(),
        };
        match res {
            Ok(raw) => {
                tracing::debug!(raw, "range sensor sample");
                Ok(raw)
            }
            Err(e) => {
                tracing::warn!(error = %e, "range sensor read failed");
                Err(Box::new(e))
            }
        }
    }
}
