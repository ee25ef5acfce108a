//! Outcomes reported by each engine step.

use crate::error::CalibrationFailed;

/// Result of one fast detection tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Nothing under the sensor; the successive run was reset.
    Clear,
    /// Detecting, but the run has not reached the threshold yet.
    Accumulating { run: u32 },
    /// Rising edge: a new episode was counted. Carries the new total.
    Counted(u64),
    /// Still detecting an episode that was already counted.
    Occupied,
}

/// Result of one slow drift check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriftOutcome {
    Unchanged,
    /// Surface moved away; baseline raised.
    Receded { from: i32, to: i32 },
    /// Surface moved closer with nothing counted; baseline lowered.
    Approached { from: i32, to: i32 },
    /// Baseline not established; only the rolling average was reset.
    Skipped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisableReason {
    CalibrationFailed(CalibrationFailed),
    /// The calibrated surface is too close to ever exceed the threshold.
    BelowThreshold { baseline: i32, threshold: i32 },
}

impl core::fmt::Display for DisableReason {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            DisableReason::CalibrationFailed(e) => write!(f, "{e}"),
            DisableReason::BelowThreshold {
                baseline,
                threshold,
            } => write!(
                f,
                "baseline {baseline} cm does not exceed detection threshold {threshold} cm"
            ),
        }
    }
}

impl std::error::Error for DisableReason {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DisableReason::CalibrationFailed(e) => Some(e),
            DisableReason::BelowThreshold { .. } => None,
        }
    }
}

/// What `Counter::establish_baseline` decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaselineOutcome {
    Established(i32),
    Disabled(DisableReason),
}

impl BaselineOutcome {
    pub fn is_established(&self) -> bool {
        matches!(self, BaselineOutcome::Established(_))
    }
}
