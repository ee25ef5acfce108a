//! Cooperative single-threaded control loop.
//!
//! Three cadences share one loop: the fast detection tick, the slow drift
//! check and the telemetry upload. Callbacks never overlap; when several are
//! due in the same iteration they run in that order, so drift always sees
//! the counters of the tick just taken.

use std::sync::atomic::{AtomicBool, Ordering};

use pingtrip_traits::{RangeSensor, Transport};

use crate::counter::{Counter, Snapshot};
use crate::schedule::Cadence;
use crate::status::{DriftOutcome, TickOutcome};
use crate::telemetry::{Endpoint, publish};

#[derive(Debug, Clone, Default)]
pub struct RunParams {
    /// Stop after this many fast ticks.
    pub max_ticks: Option<u64>,
    /// Publish telemetry on the telemetry cadence.
    pub upload: bool,
    pub endpoint: Endpoint,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub ticks: u64,
    pub counted: u64,
    pub drift_checks: u64,
    pub baseline_moves: u64,
    pub uploads_ok: u64,
    pub uploads_failed: u64,
    pub snapshot: Snapshot,
}

/// Drive `counter` until `shutdown` is set or `params.max_ticks` is reached.
///
/// The baseline should already be established (or disabled) by the caller.
pub fn run<S, T>(
    counter: &mut Counter<S>,
    transport: &mut T,
    params: &RunParams,
    shutdown: &AtomicBool,
) -> RunSummary
where
    S: RangeSensor,
    T: Transport + ?Sized,
{
    let start = counter.clock().now();
    let mut fast = Cadence::new(counter.detection_cfg().tick, start);
    let mut drift = Cadence::new(counter.drift_cfg().interval, start);
    let mut upload = Cadence::new(counter.telemetry_cfg().interval, start);

    let mut ticks = 0u64;
    let mut counted = 0u64;
    let mut drift_checks = 0u64;
    let mut baseline_moves = 0u64;
    let mut uploads_ok = 0u64;
    let mut uploads_failed = 0u64;

    tracing::info!(
        tick = ?fast.interval(),
        drift = ?drift.interval(),
        upload = params.upload,
        max_ticks = ?params.max_ticks,
        "control loop started"
    );

    loop {
        if shutdown.load(Ordering::Relaxed) {
            tracing::info!("shutdown requested");
            break;
        }
        let now = counter.clock().now();
        if fast.poll(now) {
            ticks += 1;
            if let TickOutcome::Counted(_) = counter.tick() {
                counted += 1;
            }
        }
        if drift.poll(now) {
            drift_checks += 1;
            match counter.correct_drift() {
                DriftOutcome::Receded { .. } | DriftOutcome::Approached { .. } => {
                    baseline_moves += 1;
                }
                DriftOutcome::Unchanged | DriftOutcome::Skipped => {}
            }
        }
        if params.upload && upload.poll(now) {
            let published = counter
                .encode_telemetry()
                .map_err(crate::error::PingTripError::from)
                .and_then(|record| publish(&mut *transport, &params.endpoint, &record));
            match published {
                Ok(_) => uploads_ok += 1,
                Err(e) => {
                    tracing::error!(error = %e, "telemetry cycle skipped");
                    uploads_failed += 1;
                }
            }
        }
        if params.max_ticks.is_some_and(|m| ticks >= m) {
            break;
        }

        let now = counter.clock().now();
        let mut wait = fast.due_in(now).min(drift.due_in(now));
        if params.upload {
            wait = wait.min(upload.due_in(now));
        }
        counter.clock().sleep(wait);
    }

    let snapshot = counter.snapshot();
    tracing::info!(
        ticks,
        count = snapshot.cumulative_count,
        average = snapshot.rolling_average,
        baseline = snapshot.baseline_distance,
        "control loop stopped"
    );
    RunSummary {
        ticks,
        counted,
        drift_checks,
        baseline_moves,
        uploads_ok,
        uploads_failed,
        snapshot,
    }
}
