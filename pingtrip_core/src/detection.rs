//! Baseline state and the per-tick detection state machine.

use crate::config::DetectionCfg;
use crate::status::TickOutcome;
use crate::util::{avg2_trunc, sub_sat};

/// Distance to the reference surface.
///
/// `established == false` (distance 0) suppresses detection entirely.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BaselineState {
    distance: i32,
    established: bool,
}

impl BaselineState {
    pub fn established(distance: i32) -> Self {
        Self {
            distance,
            established: true,
        }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn distance(&self) -> i32 {
        self.distance
    }

    pub fn is_established(&self) -> bool {
        self.established
    }

    /// Move an established baseline to `distance`. No-op while disabled.
    pub fn adopt(&mut self, distance: i32) {
        if self.established {
            self.distance = distance;
        }
    }
}

/// Edge-triggered episode counter with a hysteresis run and an EMA of samples.
#[derive(Debug, Clone)]
pub struct DetectionStateMachine {
    cfg: DetectionCfg,
    cumulative_count: u64,
    successive_run: u32,
    rolling_average: i32,
    latest_sample: i32,
}

impl DetectionStateMachine {
    /// `seed` initializes both the rolling average and the latest sample.
    pub fn new(cfg: DetectionCfg, seed: i32) -> Self {
        Self {
            cfg,
            cumulative_count: 0,
            successive_run: 0,
            rolling_average: seed,
            latest_sample: seed,
        }
    }

    /// Whether sample `r` is far enough below an established baseline.
    #[inline]
    pub fn is_detecting(&self, baseline: &BaselineState, r: i32) -> bool {
        baseline.is_established() && sub_sat(baseline.distance(), r) > self.cfg.threshold_cm
    }

    pub fn tick(&mut self, baseline: &BaselineState, r: i32) -> TickOutcome {
        let threshold = self.cfg.successive_threshold;
        let outcome = if self.is_detecting(baseline, r) {
            if self.successive_run == threshold {
                self.cumulative_count = self.cumulative_count.saturating_add(1);
                self.successive_run += 1;
                tracing::info!(
                    count = self.cumulative_count,
                    sample = r,
                    baseline = baseline.distance(),
                    "object counted"
                );
                TickOutcome::Counted(self.cumulative_count)
            } else if self.successive_run < threshold {
                self.successive_run += 1;
                TickOutcome::Accumulating {
                    run: self.successive_run,
                }
            } else {
                TickOutcome::Occupied
            }
        } else {
            self.successive_run = 0;
            TickOutcome::Clear
        };

        self.rolling_average = avg2_trunc(self.rolling_average, r);
        self.latest_sample = r;
        tracing::trace!(sample = r, avg = self.rolling_average, run = self.successive_run, ?outcome, "tick");
        outcome
    }

    /// Restart both the rolling average and the latest sample from `value`.
    /// Counters are untouched.
    pub fn reseed(&mut self, value: i32) {
        self.rolling_average = value;
        self.latest_sample = value;
    }

    /// Restart the average from the latest sample.
    pub fn reset_average(&mut self) {
        self.rolling_average = self.latest_sample;
    }

    pub fn config(&self) -> &DetectionCfg {
        &self.cfg
    }

    pub fn cumulative_count(&self) -> u64 {
        self.cumulative_count
    }

    pub fn successive_run(&self) -> u32 {
        self.successive_run
    }

    pub fn rolling_average(&self) -> i32 {
        self.rolling_average
    }

    pub fn latest_sample(&self) -> i32 {
        self.latest_sample
    }
}
