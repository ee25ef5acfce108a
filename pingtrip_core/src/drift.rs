//! Slow-cadence baseline correction for a moving reference surface.

use crate::config::DriftCfg;
use crate::detection::{BaselineState, DetectionStateMachine};
use crate::status::DriftOutcome;
use crate::util::sub_sat;

#[derive(Debug, Clone, Default)]
pub struct DriftCorrector {
    cfg: DriftCfg,
    last_count_seen: u64,
}

impl DriftCorrector {
    pub fn new(cfg: DriftCfg) -> Self {
        Self {
            cfg,
            last_count_seen: 0,
        }
    }

    pub fn config(&self) -> &DriftCfg {
        &self.cfg
    }

    pub fn last_count_seen(&self) -> u64 {
        self.last_count_seen
    }

    /// Compare the rolling average against the baseline and adopt it when the
    /// surface has moved.
    ///
    /// A receding surface is always adopted. An approaching one only when no
    /// episode was counted since the previous check, since a passing object
    /// also pulls the average down. Afterwards the rolling average restarts
    /// from the latest sample and the count checkpoint advances.
    pub fn check(
        &mut self,
        baseline: &mut BaselineState,
        detector: &mut DetectionStateMachine,
    ) -> DriftOutcome {
        let count = detector.cumulative_count();
        let new_counts = count.saturating_sub(self.last_count_seen);
        let avg = detector.rolling_average();
        let from = baseline.distance();

        let outcome = if !baseline.is_established() {
            DriftOutcome::Skipped
        } else if sub_sat(avg, from) > self.cfg.threshold_cm {
            baseline.adopt(avg);
            tracing::info!(from, to = avg, "surface receded; baseline raised");
            DriftOutcome::Receded { from, to: avg }
        } else if new_counts == 0 && sub_sat(from, avg) > self.cfg.threshold_cm {
            baseline.adopt(avg);
            tracing::info!(from, to = avg, "surface approached; baseline lowered");
            DriftOutcome::Approached { from, to: avg }
        } else {
            DriftOutcome::Unchanged
        };

        detector.reset_average();
        self.last_count_seen = count;
        tracing::debug!(avg, baseline = baseline.distance(), new_counts, ?outcome, "drift check");
        outcome
    }
}
