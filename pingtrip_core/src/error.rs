use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum PingTripError {
    #[error("hardware error: {0}")]
    Hardware(String),
    #[error("hardware fault: {0}")]
    HardwareFault(String),
    #[error("timeout waiting for sensor")]
    Timeout,
    #[error("transport error: {0}")]
    Transport(String),
    #[error(transparent)]
    Encode(#[from] EncodeError),
}

/// Baseline calibration never settled below the accepted variance.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error(
    "baseline calibration failed: running variance {running_variance} > {max_variance} after {iterations} reads"
)]
pub struct CalibrationFailed {
    pub running_variance: i32,
    pub max_variance: i32,
    pub iterations: u32,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EncodeError {
    #[error("telemetry record overflow: needs {needed} bytes, capacity {capacity}")]
    Overflow { needed: usize, capacity: usize },
    #[error("invalid device id {0:?}")]
    InvalidDeviceId(String),
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
