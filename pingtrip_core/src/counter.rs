//! The `Counter` controller and its type-state builder.
//!
//! `Counter` owns every piece of mutable engine state (baseline, detection
//! counters, rolling average, drift checkpoint) and is passed explicitly to
//! each periodic callback.

use pingtrip_traits::{Clock, MonotonicClock, RangeSensor};

use crate::calibration::BaselineCalibrator;
use crate::config::{CalibrationCfg, DetectionCfg, DriftCfg, SamplerCfg, TelemetryCfg};
use crate::detection::{BaselineState, DetectionStateMachine};
use crate::drift::DriftCorrector;
use crate::error::{BuildError, EncodeError};
use crate::range::RangeSampler;
use crate::status::{BaselineOutcome, DisableReason, DriftOutcome, TickOutcome};
use crate::telemetry::{TelemetryEncoder, is_valid_device_id};

/// Read-only view of the engine state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    pub cumulative_count: u64,
    pub rolling_average: i32,
    pub baseline_distance: i32,
    pub baseline_established: bool,
    pub successive_run: u32,
    pub latest_sample: i32,
    pub failed_reads: u64,
}

pub struct Counter<S> {
    sampler: RangeSampler<S>,
    calibrator: BaselineCalibrator,
    baseline: BaselineState,
    detector: DetectionStateMachine,
    drift: DriftCorrector,
    encoder: TelemetryEncoder,
    telemetry: TelemetryCfg,
    clock: Box<dyn Clock + Send + Sync>,
}

impl<S> core::fmt::Debug for Counter<S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Counter")
            .field("baseline", &self.baseline)
            .field("count", &self.detector.cumulative_count())
            .field("rolling_average", &self.detector.rolling_average())
            .field("device_id", &self.telemetry.device_id)
            .finish_non_exhaustive()
    }
}

impl<S: RangeSensor> Counter<S> {
    /// Run baseline calibration and apply the disable policy.
    ///
    /// The baseline is disabled when calibration fails or when the
    /// calibrated distance does not exceed the detection threshold. The
    /// rolling average is then seeded with the baseline, or with the last
    /// sample if the sensor ended up disabled.
    pub fn establish_baseline(&mut self) -> BaselineOutcome {
        let threshold = self.detector.config().threshold_cm;
        let sampler = &mut self.sampler;
        let result = self.calibrator.calibrate(&*self.clock, || sampler.sample());

        let outcome = match result {
            Ok(distance) if distance > threshold => BaselineOutcome::Established(distance),
            Ok(distance) => BaselineOutcome::Disabled(DisableReason::BelowThreshold {
                baseline: distance,
                threshold,
            }),
            Err(e) => BaselineOutcome::Disabled(DisableReason::CalibrationFailed(e)),
        };

        match outcome {
            BaselineOutcome::Established(distance) => {
                self.baseline = BaselineState::established(distance);
                self.detector.reseed(distance);
            }
            BaselineOutcome::Disabled(reason) => {
                tracing::error!(%reason, "sensor disabled");
                self.baseline = BaselineState::disabled();
                self.detector.reseed(self.sampler.last_cm());
            }
        }
        outcome
    }

    /// Sample once and run one detection tick.
    pub fn tick(&mut self) -> TickOutcome {
        let r = self.sampler.sample();
        self.tick_with_sample(r)
    }
}

impl<S> Counter<S> {
    /// Run one detection tick on an externally supplied sample.
    pub fn tick_with_sample(&mut self, r: i32) -> TickOutcome {
        self.detector.tick(&self.baseline, r)
    }

    pub fn correct_drift(&mut self) -> DriftOutcome {
        self.drift.check(&mut self.baseline, &mut self.detector)
    }

    /// Force an established baseline, bypassing calibration.
    pub fn set_baseline(&mut self, distance: i32) {
        self.baseline = BaselineState::established(distance);
        self.detector.reseed(distance);
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            cumulative_count: self.detector.cumulative_count(),
            rolling_average: self.detector.rolling_average(),
            baseline_distance: self.baseline.distance(),
            baseline_established: self.baseline.is_established(),
            successive_run: self.detector.successive_run(),
            latest_sample: self.detector.latest_sample(),
            failed_reads: self.sampler.failed_reads(),
        }
    }

    /// Encode the current state as a telemetry record.
    pub fn encode_telemetry(&self) -> Result<Vec<u8>, EncodeError> {
        self.encoder.encode(
            &self.telemetry.device_id,
            self.detector.cumulative_count(),
            self.detector.rolling_average(),
            self.baseline.distance(),
        )
    }

    pub fn baseline(&self) -> &BaselineState {
        &self.baseline
    }

    pub fn detection_cfg(&self) -> &DetectionCfg {
        self.detector.config()
    }

    pub fn drift_cfg(&self) -> &DriftCfg {
        self.drift.config()
    }

    pub fn telemetry_cfg(&self) -> &TelemetryCfg {
        &self.telemetry
    }

    pub fn sampler(&self) -> &RangeSampler<S> {
        &self.sampler
    }

    pub fn sampler_mut(&mut self) -> &mut RangeSampler<S> {
        &mut self.sampler
    }

    pub fn clock(&self) -> &(dyn Clock + Send + Sync) {
        &*self.clock
    }
}

// ── Type-state builder ───────────────────────────────────────────────────────

pub struct Missing;
pub struct WithSensor<S>(S);

/// Builder for `Counter`. `build()` only exists once a sensor is provided.
pub struct CounterBuilder<St> {
    sensor: St,
    sampler: SamplerCfg,
    calibration: CalibrationCfg,
    detection: DetectionCfg,
    drift: DriftCfg,
    telemetry: TelemetryCfg,
    clock: Option<Box<dyn Clock + Send + Sync>>,
}

impl Default for CounterBuilder<Missing> {
    fn default() -> Self {
        Self {
            sensor: Missing,
            sampler: SamplerCfg::default(),
            calibration: CalibrationCfg::default(),
            detection: DetectionCfg::default(),
            drift: DriftCfg::default(),
            telemetry: TelemetryCfg::default(),
            clock: None,
        }
    }
}

impl CounterBuilder<Missing> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sensor<S: RangeSensor>(self, sensor: S) -> CounterBuilder<WithSensor<S>> {
        CounterBuilder {
            sensor: WithSensor(sensor),
            sampler: self.sampler,
            calibration: self.calibration,
            detection: self.detection,
            drift: self.drift,
            telemetry: self.telemetry,
            clock: self.clock,
        }
    }
}

impl<St> CounterBuilder<St> {
    pub fn with_sampler(mut self, cfg: SamplerCfg) -> Self {
        self.sampler = cfg;
        self
    }

    pub fn with_calibration(mut self, cfg: CalibrationCfg) -> Self {
        self.calibration = cfg;
        self
    }

    pub fn with_detection(mut self, cfg: DetectionCfg) -> Self {
        self.detection = cfg;
        self
    }

    pub fn with_drift(mut self, cfg: DriftCfg) -> Self {
        self.drift = cfg;
        self
    }

    pub fn with_telemetry(mut self, cfg: TelemetryCfg) -> Self {
        self.telemetry = cfg;
        self
    }

    /// Inject a clock (tests use a manual clock).
    pub fn with_clock(mut self, clock: Box<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Apply every engine section of a validated config file.
    pub fn apply_config(
        self,
        cfg: &pingtrip_config::Config,
        analog_override: Option<&pingtrip_config::AnalogCalibration>,
    ) -> Result<Self, BuildError> {
        let sampler = SamplerCfg::from_config(&cfg.sensor, analog_override)?;
        Ok(self
            .with_sampler(sampler)
            .with_calibration((&cfg.calibration).into())
            .with_detection((&cfg.detection).into())
            .with_drift((&cfg.drift).into())
            .with_telemetry((&cfg.telemetry).into()))
    }

    fn validate(&self) -> Result<(), BuildError> {
        let c = &self.calibration;
        if c.max_reads == 0 {
            return Err(BuildError::InvalidConfig("calibration.max_reads must be >= 1"));
        }
        if c.min_reads > c.max_reads {
            return Err(BuildError::InvalidConfig(
                "calibration.min_reads must be <= calibration.max_reads",
            ));
        }
        if c.max_variance < 0 {
            return Err(BuildError::InvalidConfig("calibration.max_variance must be >= 0"));
        }
        if self.detection.threshold_cm < 0 {
            return Err(BuildError::InvalidConfig("detection.threshold_cm must be >= 0"));
        }
        if self.detection.tick.is_zero() {
            return Err(BuildError::InvalidConfig("detection.tick must be > 0"));
        }
        if self.drift.threshold_cm < 0 {
            return Err(BuildError::InvalidConfig("drift.threshold_cm must be >= 0"));
        }
        if self.drift.interval.is_zero() {
            return Err(BuildError::InvalidConfig("drift.interval must be > 0"));
        }
        if self.telemetry.interval.is_zero() {
            return Err(BuildError::InvalidConfig("telemetry.interval must be > 0"));
        }
        if !is_valid_device_id(&self.telemetry.device_id) {
            return Err(BuildError::InvalidConfig(
                "telemetry.device_id must be non-empty URL-unreserved characters",
            ));
        }
        // Room for the fixed text, the id and three single-digit values.
        let min_len = pingtrip_config::RECORD_FIXED_LEN + self.telemetry.device_id.len() + 3;
        if self.telemetry.max_record_len < min_len {
            return Err(BuildError::InvalidConfig(
                "telemetry.max_record_len too small for device_id",
            ));
        }
        Ok(())
    }
}

impl<S: RangeSensor> CounterBuilder<WithSensor<S>> {
    pub fn build(self) -> Result<Counter<S>, BuildError> {
        self.validate()?;
        let WithSensor(sensor) = self.sensor;
        let clock = self
            .clock
            .unwrap_or_else(|| Box::new(MonotonicClock::new()));
        Ok(Counter {
            sampler: RangeSampler::new(sensor, self.sampler),
            calibrator: BaselineCalibrator::new(self.calibration),
            baseline: BaselineState::disabled(),
            detector: DetectionStateMachine::new(self.detection, 0),
            drift: DriftCorrector::new(self.drift),
            encoder: TelemetryEncoder::new(self.telemetry.max_record_len),
            telemetry: self.telemetry,
            clock,
        })
    }
}
