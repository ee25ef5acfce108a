//! Raw sensor reading to centimeters.

use pingtrip_traits::RangeSensor;

use crate::config::{AnalogCalibration, ReadStrategy, SamplerCfg};
use crate::hw_error::map_hw_error;

/// Speed of sound in air (m/s) at `temp_c` degrees Celsius.
#[inline]
pub fn speed_of_sound_m_s(temp_c: f32) -> f32 {
    331.3 + 0.606 * temp_c
}

/// Convert a round-trip echo width to a one-way distance.
///
/// `us * v` is meters·µs/s; halving for the round trip and scaling m → cm and
/// µs → s gives `us * v / 20_000`.
#[inline]
pub fn echo_us_to_cm(us: u32, temp_c: f32) -> i32 {
    let v = f64::from(speed_of_sound_m_s(temp_c));
    float_to_cm(f64::from(us) * v / 20_000.0)
}

#[inline]
pub fn counts_to_cm(raw: u32, cal: &AnalogCalibration) -> i32 {
    let delta = i64::from(raw) - i64::from(cal.zero_counts);
    #[allow(clippy::cast_precision_loss)]
    let cm = f64::from(cal.gain_cm_per_count) * delta as f64 + f64::from(cal.offset_cm);
    float_to_cm(cm)
}

// Truncate toward zero and clamp into [0, i32::MAX]; NaN maps to 0.
#[inline]
#[allow(clippy::cast_possible_truncation)]
fn float_to_cm(cm: f64) -> i32 {
    if cm.is_nan() || cm <= 0.0 {
        0
    } else if cm >= f64::from(i32::MAX) {
        i32::MAX
    } else {
        cm.trunc() as i32
    }
}

/// Reads one distance per call from a `RangeSensor`.
pub struct RangeSampler<S> {
    sensor: S,
    cfg: SamplerCfg,
    last_cm: i32,
    failed_reads: u64,
}

impl<S: RangeSensor> RangeSampler<S> {
    pub fn new(sensor: S, cfg: SamplerCfg) -> Self {
        Self {
            sensor,
            cfg,
            last_cm: 0,
            failed_reads: 0,
        }
    }

    /// Take one fresh reading in centimeters, always `>= 0`.
    ///
    /// A failed read is logged and yields 0; callers must tolerate it.
    pub fn sample(&mut self) -> i32 {
        let cm = match self.sensor.read_raw(self.cfg.read_timeout) {
            Ok(raw) => {
                let cm = self.to_cm(raw);
                tracing::trace!(raw, cm, "range sample");
                cm
            }
            Err(e) => {
                self.failed_reads += 1;
                let err = map_hw_error(&*e);
                tracing::warn!(error = %err, failed_reads = self.failed_reads, "range read failed; using 0 cm");
                0
            }
        };
        self.last_cm = cm;
        cm
    }

    /// Convert a raw reading with the configured strategy.
    pub fn to_cm(&self, raw: u32) -> i32 {
        match &self.cfg.strategy {
            ReadStrategy::Pulse { temp_c } => echo_us_to_cm(raw, *temp_c),
            ReadStrategy::Analog(cal) => counts_to_cm(raw, cal),
        }
    }
}

impl<S> RangeSampler<S> {
    pub fn last_cm(&self) -> i32 {
        self.last_cm
    }

    pub fn failed_reads(&self) -> u64 {
        self.failed_reads
    }

    pub fn config(&self) -> &SamplerCfg {
        &self.cfg
    }

    pub fn sensor(&self) -> &S {
        &self.sensor
    }

    pub fn sensor_mut(&mut self) -> &mut S {
        &mut self.sensor
    }
}

impl<S> core::fmt::Debug for RangeSampler<S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RangeSampler")
            .field("cfg", &self.cfg)
            .field("last_cm", &self.last_cm)
            .field("failed_reads", &self.failed_reads)
            .finish_non_exhaustive()
    }
}
