//! Runtime configuration types for the counting engine.
//!
//! These are separate from the TOML-deserialized config in `pingtrip_config`;
//! `conversions` bridges the two.

use std::time::Duration;

/// Linear ADC proxy: `cm = gain * (raw - zero_counts) + offset`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalogCalibration {
    pub gain_cm_per_count: f32,
    pub zero_counts: i32,
    pub offset_cm: f32,
}

impl AnalogCalibration {
    /// One count per centimeter, no offset.
    pub fn identity() -> Self {
        Self {
            gain_cm_per_count: 1.0,
            zero_counts: 0,
            offset_cm: 0.0,
        }
    }
}

/// How a raw reading becomes centimeters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReadStrategy {
    /// Echo width in microseconds; speed of sound derived from `temp_c`.
    Pulse { temp_c: f32 },
    /// ADC counts mapped through a linear calibration.
    Analog(AnalogCalibration),
}

impl Default for ReadStrategy {
    fn default() -> Self {
        ReadStrategy::Pulse { temp_c: 25.0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplerCfg {
    pub strategy: ReadStrategy,
    /// Per-read sensor timeout.
    pub read_timeout: Duration,
}

impl Default for SamplerCfg {
    fn default() -> Self {
        Self {
            strategy: ReadStrategy::default(),
            read_timeout: Duration::from_millis(30),
        }
    }
}

/// Baseline calibration loop parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalibrationCfg {
    /// Accepted running variance (cm) for the baseline to be trusted.
    pub max_variance: i32,
    /// Lower bound on averaging iterations, even if already stable.
    pub min_reads: u32,
    /// Hard cap on averaging iterations.
    pub max_reads: u32,
    /// Wait before each averaging sample.
    pub inter_sample: Duration,
}

impl Default for CalibrationCfg {
    fn default() -> Self {
        Self {
            max_variance: 5,
            min_reads: 20,
            max_reads: 30,
            inter_sample: Duration::from_millis(200),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectionCfg {
    /// Minimum shortening below the baseline (cm) that counts as detecting.
    pub threshold_cm: i32,
    /// Detecting ticks required before the count fires (0 = first tick).
    pub successive_threshold: u32,
    pub tick: Duration,
}

impl Default for DetectionCfg {
    fn default() -> Self {
        Self {
            threshold_cm: 70,
            successive_threshold: 0,
            tick: Duration::from_millis(100),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriftCfg {
    pub threshold_cm: i32,
    pub interval: Duration,
}

impl Default for DriftCfg {
    fn default() -> Self {
        Self {
            threshold_cm: 10,
            interval: Duration::from_millis(2000),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryCfg {
    pub device_id: String,
    /// Capacity of the record buffer in bytes.
    pub max_record_len: usize,
    pub interval: Duration,
}

impl Default for TelemetryCfg {
    fn default() -> Self {
        Self {
            device_id: "PingTrip".to_string(),
            max_record_len: 256,
            interval: Duration::from_millis(10_000),
        }
    }
}
