//! `From` implementations bridging `pingtrip_config` types to `pingtrip_core` types.

use std::time::Duration;

use crate::config::{
    AnalogCalibration, CalibrationCfg, DetectionCfg, DriftCfg, ReadStrategy, SamplerCfg,
    TelemetryCfg,
};
use crate::telemetry::Endpoint;

// ── AnalogCalibration ────────────────────────────────────────────────────────

impl From<&pingtrip_config::AnalogCalibration> for AnalogCalibration {
    fn from(c: &pingtrip_config::AnalogCalibration) -> Self {
        Self {
            gain_cm_per_count: c.gain_cm_per_count,
            zero_counts: c.zero_counts,
            offset_cm: c.offset_cm,
        }
    }
}

// ── SamplerCfg ───────────────────────────────────────────────────────────────

impl SamplerCfg {
    /// Build from the `[sensor]` table. `analog_override` (e.g. fitted from a
    /// CSV) takes precedence over `sensor.analog`.
    pub fn from_config(
        c: &pingtrip_config::SensorCfg,
        analog_override: Option<&pingtrip_config::AnalogCalibration>,
    ) -> Result<Self, crate::error::BuildError> {
        let strategy = match c.read_method {
            pingtrip_config::ReadMethod::Pulse => ReadStrategy::Pulse {
                temp_c: c.nominal_temp_c,
            },
            pingtrip_config::ReadMethod::Analog => {
                let cal = analog_override.or(c.analog.as_ref()).ok_or(
                    crate::error::BuildError::InvalidConfig(
                        "analog read method requires an analog calibration",
                    ),
                )?;
                ReadStrategy::Analog(cal.into())
            }
        };
        Ok(Self {
            strategy,
            read_timeout: Duration::from_millis(c.read_timeout_ms),
        })
    }
}

// ── CalibrationCfg ───────────────────────────────────────────────────────────

impl From<&pingtrip_config::CalibrationCfg> for CalibrationCfg {
    fn from(c: &pingtrip_config::CalibrationCfg) -> Self {
        Self {
            max_variance: c.max_variance,
            min_reads: c.min_reads,
            max_reads: c.max_reads,
            inter_sample: Duration::from_millis(c.inter_sample_ms),
        }
    }
}

// ── DetectionCfg / DriftCfg ──────────────────────────────────────────────────

impl From<&pingtrip_config::DetectionCfg> for DetectionCfg {
    fn from(c: &pingtrip_config::DetectionCfg) -> Self {
        Self {
            threshold_cm: c.threshold_cm,
            successive_threshold: c.successive_threshold,
            tick: Duration::from_millis(c.tick_ms),
        }
    }
}

impl From<&pingtrip_config::DriftCfg> for DriftCfg {
    fn from(c: &pingtrip_config::DriftCfg) -> Self {
        Self {
            threshold_cm: c.threshold_cm,
            interval: Duration::from_millis(c.interval_ms),
        }
    }
}

// ── Telemetry ────────────────────────────────────────────────────────────────

impl From<&pingtrip_config::TelemetryCfg> for TelemetryCfg {
    fn from(c: &pingtrip_config::TelemetryCfg) -> Self {
        Self {
            device_id: c.device_id.clone(),
            max_record_len: c.max_record_len,
            interval: Duration::from_millis(c.interval_ms),
        }
    }
}

impl From<&pingtrip_config::TelemetryCfg> for Endpoint {
    fn from(c: &pingtrip_config::TelemetryCfg) -> Self {
        Self {
            host: c.host.clone(),
            port: c.port,
            timeout: Duration::from_millis(c.timeout_ms),
        }
    }
}
