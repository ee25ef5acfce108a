#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Adaptive ranging and detection engine (hardware-agnostic).
//!
//! A distance sensor watches a fixed reference surface. Objects passing
//! underneath shorten the measured range for a while; each such episode is
//! counted once. All hardware goes through `pingtrip_traits::RangeSensor`
//! and `pingtrip_traits::Transport`.
//!
//! ## Architecture
//!
//! - **Sampling**: raw echo width or ADC counts to centimeters (`range`)
//! - **Calibration**: iterative averaging of the empty surface (`calibration`)
//! - **Detection**: edge-triggered counting with hysteresis and an EMA (`detection`)
//! - **Drift**: slow baseline correction for a moving surface (`drift`)
//! - **Telemetry**: bounds-checked record encoding and publishing (`telemetry`)
//! - **Control**: `Counter` owns all state; `runner` drives it on three cadences
//!
//! ## Integer arithmetic
//!
//! Distances are whole centimeters in `i32`. Averages halve with truncation
//! toward zero (`util::avg2_trunc`), so results are deterministic across
//! platforms.

pub mod calibration;
pub mod config;
pub mod conversions;
pub mod counter;
pub mod detection;
pub mod drift;
pub mod error;
pub mod hw_error;
pub mod mocks;
pub mod range;
pub mod runner;
pub mod schedule;
pub mod status;
pub mod telemetry;
pub mod util;

pub use calibration::BaselineCalibrator;
pub use config::{
    AnalogCalibration, CalibrationCfg, DetectionCfg, DriftCfg, ReadStrategy, SamplerCfg,
    TelemetryCfg,
};
pub use counter::{Counter, CounterBuilder, Snapshot};
pub use detection::{BaselineState, DetectionStateMachine};
pub use drift::DriftCorrector;
pub use error::{BuildError, CalibrationFailed, EncodeError, PingTripError, Report, Result};
pub use range::RangeSampler;
pub use runner::{RunParams, RunSummary, run};
pub use schedule::Cadence;
pub use status::{BaselineOutcome, DisableReason, DriftOutcome, TickOutcome};
pub use telemetry::{Endpoint, RecordBuilder, TelemetryEncoder, publish};
