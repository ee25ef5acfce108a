use std::time::{Duration, Instant};

use crate::error::{HwError, Result};

/// Wait until `is_high()` reports `level`, or fail with `EchoTimeout` once
/// `deadline` passes. Returns the instant the level was first observed.
///
/// A zero `poll_interval` busy-spins, which is what echo timing needs; any
/// other value sleeps between polls.
pub fn wait_for_level(
    mut is_high: impl FnMut() -> bool,
    level: bool,
    deadline: Instant,
    poll_interval: Duration,
) -> Result<Instant> {
    loop {
        if is_high() == level {
            return Ok(Instant::now());
        }
        if Instant::now() >= deadline {
            return Err(HwError::EchoTimeout);
        }
        if poll_interval.is_zero() {
            std::hint::spin_loop();
        } else {
            std::thread::sleep(poll_interval);
        }
    }
}

/// Measure the width of the next high pulse on a line.
///
/// Both edges must arrive within `timeout` of the call; the returned width is
/// the time between the rising and falling edge.
pub fn measure_pulse_width(
    mut is_high: impl FnMut() -> bool,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<Duration> {
    let deadline = Instant::now() + timeout;
    let rise = wait_for_level(&mut is_high, true, deadline, poll_interval)?;
    let fall = wait_for_level(&mut is_high, false, deadline, poll_interval)?;
    Ok(fall.saturating_duration_since(rise))
}

/// Clamp a pulse width to whole microseconds in `u32`.
#[inline]
pub fn width_to_micros(width: Duration) -> u32 {
    u32::try_from(width.as_micros()).unwrap_or(u32::MAX)
}
