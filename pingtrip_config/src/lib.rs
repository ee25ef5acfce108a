#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schemas and analog calibration parsing for the PingTrip counter.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - The analog calibration CSV loader enforces headers and performs a robust
//!   refit to reduce outlier influence before slope/intercept estimation.
use serde::Deserialize;

/// Fixed bytes of an outbound record with an empty device id and no digits.
///
/// `GET /dweet/for/?&sonar_count=&sonar_average=&sonar_baseline= HTTP/1.1\r\n\r\n`
pub const RECORD_FIXED_LEN: usize = 73;

/// Analog calibration CSV schema.
///
/// Expected headers:
/// raw,cm
///
/// Example:
/// raw,cm
/// 102,20.0
/// 512,100.0
#[derive(Debug, Deserialize, Clone, Copy)]
pub struct CalibrationRow {
    pub raw: i64,
    pub cm: f32,
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReadMethod {
    /// Echo round-trip timing (microseconds).
    #[default]
    Pulse,
    /// Calibrated analog level (ADC counts).
    Analog,
}

/// Linear analog proxy: `cm = gain_cm_per_count * (raw - zero_counts) + offset_cm`.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct AnalogCalibration {
    pub gain_cm_per_count: f32,
    #[serde(default)]
    pub zero_counts: i32,
    #[serde(default)]
    pub offset_cm: f32,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SensorCfg {
    pub read_method: ReadMethod,
    /// Temperature used for the speed-of-sound term (no live temperature input).
    pub nominal_temp_c: f32,
    /// Per-read timeout for the raw sensor primitive (ms).
    pub read_timeout_ms: u64,
    /// Required for `read_method = "analog"` unless a CSV is supplied.
    pub analog: Option<AnalogCalibration>,
}

impl Default for SensorCfg {
    fn default() -> Self {
        Self {
            read_method: ReadMethod::Pulse,
            nominal_temp_c: 25.0,
            read_timeout_ms: 30,
            analog: None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Pins {
    pub trigger: u8,
    pub echo: u8,
    pub adc_channel: u8,
}

impl Default for Pins {
    fn default() -> Self {
        Self {
            trigger: 23,
            echo: 24,
            adc_channel: 0,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CalibrationCfg {
    /// Largest running variance (cm) accepted as a stable baseline.
    pub max_variance: i32,
    pub min_reads: u32,
    pub max_reads: u32,
    /// Wait between calibration samples (ms).
    pub inter_sample_ms: u64,
}

impl Default for CalibrationCfg {
    fn default() -> Self {
        Self {
            max_variance: 5,
            min_reads: 20,
            max_reads: 30,
            inter_sample_ms: 200,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DetectionCfg {
    /// Baseline minus range must exceed this (cm) to count as detecting.
    pub threshold_cm: i32,
    /// Detecting samples required before an episode is counted.
    pub successive_threshold: u32,
    /// Fast tick period (ms).
    pub tick_ms: u64,
}

impl Default for DetectionCfg {
    fn default() -> Self {
        Self {
            threshold_cm: 70,
            successive_threshold: 0,
            tick_ms: 100,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DriftCfg {
    pub threshold_cm: i32,
    pub interval_ms: u64,
}

impl Default for DriftCfg {
    fn default() -> Self {
        Self {
            threshold_cm: 10,
            interval_ms: 2000,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct TelemetryCfg {
    pub enabled: bool,
    pub device_id: String,
    pub host: String,
    pub port: u16,
    pub interval_ms: u64,
    /// Connect/send timeout (ms).
    pub timeout_ms: u64,
    /// Upper bound on one encoded record (bytes).
    pub max_record_len: usize,
}

impl Default for TelemetryCfg {
    fn default() -> Self {
        Self {
            enabled: true,
            device_id: "PingTrip".to_string(),
            host: "dweet.io".to_string(),
            port: 80,
            interval_ms: 10_000,
            timeout_ms: 5000,
            max_record_len: 256,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub sensor: SensorCfg,
    #[serde(default)]
    pub pins: Pins,
    #[serde(default)]
    pub calibration: CalibrationCfg,
    #[serde(default)]
    pub detection: DetectionCfg,
    #[serde(default)]
    pub drift: DriftCfg,
    #[serde(default)]
    pub telemetry: TelemetryCfg,
    #[serde(default)]
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// True when `id` is non-empty and only uses URL unreserved characters.
pub fn is_valid_device_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'~'))
}

impl AnalogCalibration {
    /// Build a calibration from rows using ordinary least squares on all points.
    /// Fits cm = a*raw + b, then converts to cm = a*(raw - zero_counts) + offset_cm,
    /// where zero_counts = round(-b/a) is the raw reading nearest zero distance
    /// and offset_cm is whatever the rounding left over.
    pub fn from_rows(rows: Vec<CalibrationRow>) -> eyre::Result<Self> {
        if rows.len() < 2 {
            eyre::bail!("calibration requires at least two rows, got {}", rows.len());
        }

        // Ensure strictly monotonic raw values (increasing or decreasing), no duplicates
        let mut dir: i8 = 0;
        for i in 1..rows.len() {
            let d = rows[i].raw - rows[i - 1].raw;
            if d == 0 {
                eyre::bail!(
                    "calibration rows have duplicate raw values at index {} and {}",
                    i - 1,
                    i
                );
            }
            let step_dir = if d > 0 { 1 } else { -1 };
            if dir == 0 {
                dir = step_dir;
            } else if dir != step_dir {
                eyre::bail!(
                    "calibration raw values must be monotonic (strictly increasing or strictly decreasing)"
                );
            }
        }
        if rows.iter().any(|r| !r.cm.is_finite() || r.cm < 0.0) {
            eyre::bail!("calibration distances must be finite and >= 0");
        }

        let pts: Vec<(f64, f64)> = rows
            .iter()
            .map(|r| (r.raw as f64, f64::from(r.cm)))
            .collect();
        let (a0, b0) = fit_line(&pts)?;

        // RMS of residuals around the initial line
        let sumsq: f64 = pts
            .iter()
            .map(|(x, y)| {
                let r = y - (a0 * x + b0);
                r * r
            })
            .sum();
        let rms = (sumsq / pts.len() as f64).sqrt();

        // Reject outliers with |residual| > 2 sigma and refit if at least 2 remain.
        let (a, b) = robust_refit(&pts, a0, b0, rms, 2.0).unwrap_or((a0, b0));

        let zero_counts = -b / a;
        if !zero_counts.is_finite()
            || zero_counts < f64::from(i32::MIN)
            || zero_counts > f64::from(i32::MAX)
        {
            eyre::bail!("calibration produced invalid zero point");
        }

        // The integer zero point drops the fractional part of -b/a; the
        // offset carries the remainder so a*(raw - zero) + offset == a*raw + b.
        let zero = zero_counts.round();
        let offset = b + a * zero;

        Ok(AnalogCalibration {
            gain_cm_per_count: a as f32,
            zero_counts: zero as i32,
            offset_cm: offset as f32,
        })
    }
}

/// OLS fit of y = a*x + b.
fn fit_line(pts: &[(f64, f64)]) -> eyre::Result<(f64, f64)> {
    let n = pts.len() as f64;
    let mean_x = pts.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = pts.iter().map(|p| p.1).sum::<f64>() / n;
    let mut sxx = 0.0f64;
    let mut sxy = 0.0f64;
    for (x, y) in pts {
        let dx = x - mean_x;
        sxx += dx * dx;
        sxy += dx * (y - mean_y);
    }
    if !sxx.is_finite() || sxx == 0.0 {
        eyre::bail!("calibration cannot determine slope (degenerate raw variance)");
    }
    let a = sxy / sxx;
    if !a.is_finite() {
        eyre::bail!("calibration produced non-finite slope");
    }
    if a == 0.0 {
        eyre::bail!("calibration produced zero slope (invalid gain)");
    }
    Ok((a, mean_y - a * mean_x))
}

/// Single-step robust refit: drop points with |residual| > k * rms around
/// y = a0*x + b0 and refit the inliers with an online (Welford/Chan)
/// covariance update. Returns None when the refit does not apply, in which
/// case the caller keeps (a0, b0).
fn robust_refit(pts: &[(f64, f64)], a0: f64, b0: f64, rms: f64, k: f64) -> Option<(f64, f64)> {
    if !(rms.is_finite() && rms > 0.0 && k.is_finite() && k > 0.0) {
        return None;
    }
    let thr = k * rms;
    let mut n_in: usize = 0;
    let mut mean_x = 0.0f64;
    let mut mean_y = 0.0f64;
    let mut cxx = 0.0f64;
    let mut cxy = 0.0f64;

    for &(x, y) in pts {
        if (y - (a0 * x + b0)).abs() > thr {
            continue;
        }
        n_in += 1;
        let n = n_in as f64;
        let dx = x - mean_x;
        let dy = y - mean_y;
        mean_x += dx / n;
        mean_y += dy / n;
        cxx += dx * (x - mean_x);
        cxy += dx * (y - mean_y);
    }

    if n_in < 2 || n_in == pts.len() || !cxx.is_finite() || cxx == 0.0 {
        return None;
    }
    let a = cxy / cxx;
    if !a.is_finite() || a == 0.0 {
        return None;
    }
    Some((a, mean_y - a * mean_x))
}

impl TryFrom<Vec<CalibrationRow>> for AnalogCalibration {
    type Error = eyre::Report;
    fn try_from(rows: Vec<CalibrationRow>) -> Result<Self, Self::Error> {
        Self::from_rows(rows)
    }
}

pub fn load_calibration_csv(path: &std::path::Path) -> eyre::Result<AnalogCalibration> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .map_err(|e| eyre::eyre!("open calibration CSV {:?}: {}", path, e))?;

    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read CSV headers {:?}: {}", path, e))?
        .clone();
    let actual: Vec<&str> = headers.iter().collect();
    if actual != ["raw", "cm"] {
        eyre::bail!(
            "calibration CSV must have headers 'raw,cm', got: {}",
            actual.join(",")
        );
    }

    let mut rows = Vec::new();
    for (idx, rec) in rdr.deserialize::<CalibrationRow>().enumerate() {
        match rec {
            Ok(row) => rows.push(row),
            Err(e) => {
                eyre::bail!("invalid CSV row {}: {}", idx + 2, e);
            }
        }
    }

    AnalogCalibration::try_from(rows)
}

impl Config {
    /// Validate cross-field constraints. `analog_from_csv` is true when an
    /// analog calibration will be supplied separately.
    pub fn validate_with(&self, analog_from_csv: bool) -> eyre::Result<()> {
        // Sensor
        if !self.sensor.nominal_temp_c.is_finite()
            || !(-40.0..=85.0).contains(&self.sensor.nominal_temp_c)
        {
            eyre::bail!("sensor.nominal_temp_c must be within [-40, 85]");
        }
        if self.sensor.read_timeout_ms == 0 {
            eyre::bail!("sensor.read_timeout_ms must be >= 1");
        }
        if self.sensor.read_method == ReadMethod::Analog
            && self.sensor.analog.is_none()
            && !analog_from_csv
        {
            eyre::bail!("sensor.analog is required when read_method = \"analog\"");
        }
        if let Some(a) = self.sensor.analog
            && (!a.gain_cm_per_count.is_finite()
                || a.gain_cm_per_count == 0.0
                || !a.offset_cm.is_finite())
        {
            eyre::bail!("sensor.analog.gain_cm_per_count must be finite and non-zero");
        }
        if self.pins.adc_channel > 7 {
            eyre::bail!("pins.adc_channel must be in 0..=7");
        }

        // Calibration
        if self.calibration.max_variance < 0 {
            eyre::bail!("calibration.max_variance must be >= 0");
        }
        if self.calibration.max_reads == 0 {
            eyre::bail!("calibration.max_reads must be >= 1");
        }
        if self.calibration.min_reads > self.calibration.max_reads {
            eyre::bail!("calibration.min_reads must be <= calibration.max_reads");
        }
        if self.calibration.inter_sample_ms > 60_000 {
            eyre::bail!("calibration.inter_sample_ms is unreasonably large (>60s)");
        }

        // Detection
        if self.detection.threshold_cm < 0 {
            eyre::bail!("detection.threshold_cm must be >= 0");
        }
        if self.detection.tick_ms == 0 {
            eyre::bail!("detection.tick_ms must be >= 1");
        }

        // Drift
        if self.drift.threshold_cm < 0 {
            eyre::bail!("drift.threshold_cm must be >= 0");
        }
        if self.drift.interval_ms == 0 {
            eyre::bail!("drift.interval_ms must be >= 1");
        }

        // Telemetry
        if !is_valid_device_id(&self.telemetry.device_id) {
            eyre::bail!("telemetry.device_id must be non-empty and URL-safe ([A-Za-z0-9-._~])");
        }
        if self.telemetry.enabled {
            if self.telemetry.host.trim().is_empty() {
                eyre::bail!("telemetry.host must not be empty");
            }
            if self.telemetry.port == 0 {
                eyre::bail!("telemetry.port must be > 0");
            }
        }
        if self.telemetry.interval_ms == 0 {
            eyre::bail!("telemetry.interval_ms must be >= 1");
        }
        if self.telemetry.timeout_ms == 0 {
            eyre::bail!("telemetry.timeout_ms must be >= 1");
        }
        let min_record = RECORD_FIXED_LEN + self.telemetry.device_id.len() + 3;
        if self.telemetry.max_record_len < min_record {
            eyre::bail!("telemetry.max_record_len must be >= {min_record} for this device_id");
        }

        // Logging
        if let Some(r) = self.logging.rotation.as_deref()
            && !matches!(r, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly");
        }
        if let Some(f) = self.logging.file.as_deref()
            && f.trim().is_empty()
        {
            eyre::bail!("logging.file must not be empty when set");
        }

        Ok(())
    }

    pub fn validate(&self) -> eyre::Result<()> {
        self.validate_with(false)
    }
}
