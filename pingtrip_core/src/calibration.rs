//! Initial baseline calibration by iterative averaging.

use pingtrip_traits::Clock;

use crate::config::CalibrationCfg;
use crate::error::CalibrationFailed;
use crate::util::{abs_diff_i32, avg2_trunc};

/// Starting running variance; large enough that a handful of reads is
/// always needed before the baseline is trusted.
pub const INITIAL_RUNNING_VARIANCE: i32 = 500;

#[derive(Debug, Clone, Copy, Default)]
pub struct BaselineCalibrator {
    cfg: CalibrationCfg,
}

impl BaselineCalibrator {
    pub fn new(cfg: CalibrationCfg) -> Self {
        Self { cfg }
    }

    pub fn config(&self) -> &CalibrationCfg {
        &self.cfg
    }

    /// Average the reference surface until it is stable.
    ///
    /// The first sample seeds the average. Each iteration waits
    /// `inter_sample` on `clock`, then folds one sample into both the average
    /// and the running variance with truncating halving. The loop runs at
    /// least `min_reads` and at most `max_reads` iterations; it stops early
    /// once `min_reads` is reached and the running variance is within
    /// `max_variance` from the configuration.
    pub fn calibrate<C, F>(&self, clock: &C, sample: F) -> Result<i32, CalibrationFailed>
    where
        C: Clock + ?Sized,
        F: FnMut() -> i32,
    {
        self.calibrate_within(clock, self.cfg.max_variance, sample)
    }

    /// Same as [`calibrate`](Self::calibrate) with an explicit variance bound
    /// in place of the configured one.
    pub fn calibrate_within<C, F>(
        &self,
        clock: &C,
        max_variance: i32,
        mut sample: F,
    ) -> Result<i32, CalibrationFailed>
    where
        C: Clock + ?Sized,
        F: FnMut() -> i32,
    {
        let CalibrationCfg {
            min_reads,
            max_reads,
            inter_sample,
            ..
        } = self.cfg;

        let mut avg = sample();
        let mut running_variance = INITIAL_RUNNING_VARIANCE;
        let mut iterations: u32 = 0;
        tracing::debug!(initial = avg, "baseline calibration started");

        while (iterations < min_reads || running_variance > max_variance) && iterations < max_reads
        {
            clock.sleep(inter_sample);
            let s = sample();
            let variance = abs_diff_i32(avg, s);
            running_variance = avg2_trunc(running_variance, variance);
            avg = avg2_trunc(avg, s);
            iterations += 1;
            tracing::trace!(iterations, sample = s, avg, variance, running_variance, "calibrating");
        }

        if running_variance > max_variance {
            let err = CalibrationFailed {
                running_variance,
                max_variance,
                iterations,
            };
            tracing::error!(running_variance, max_variance, iterations, "baseline calibration failed");
            return Err(err);
        }
        tracing::info!(baseline = avg, running_variance, iterations, "baseline calibrated");
        Ok(avg)
    }
}
