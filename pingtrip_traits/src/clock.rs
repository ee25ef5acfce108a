use std::thread;
use std::time::{Duration, Instant};

/// Monotonic clock abstraction used by the control loop and calibration.
///
/// Every blocking wait in the engine goes through `sleep`, so a manual clock
/// lets calibration and scheduling run under test without real-time waits.
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, d: Duration);

    /// Milliseconds elapsed since `epoch`, saturating at 0 on underflow.
    fn ms_since(&self, epoch: Instant) -> u64 {
        let dur = self.now().saturating_duration_since(epoch);
        u64::try_from(dur.as_millis()).unwrap_or(u64::MAX)
    }
}

impl<C: Clock + ?Sized> Clock for std::sync::Arc<C> {
    fn now(&self) -> Instant {
        (**self).now()
    }
    fn sleep(&self, d: Duration) {
        (**self).sleep(d);
    }
}

/// Real-time clock backed by `std::time::Instant`.
#[derive(Debug, Default, Clone, Copy)]
pub struct MonotonicClock;

impl MonotonicClock {
    #[inline]
    pub fn new() -> Self {
        Self
    }
}

impl Clock for MonotonicClock {
    #[inline]
    fn now(&self) -> Instant {
        Instant::now()
    }

    #[inline]
    fn sleep(&self, d: Duration) {
        if d.is_zero() {
            return;
        }
        thread::sleep(d);
    }
}

#[cfg(any(test, feature = "test-clock"))]
pub mod test_clock {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Default)]
    struct State {
        offset: Duration,
        slept: Duration,
        sleeps: u64,
    }

    /// Deterministic clock: `sleep(d)` advances time by `d` and returns at once.
    ///
    /// Clones share the same timeline, so a test can keep a handle while the
    /// engine owns another.
    #[derive(Debug, Clone)]
    pub struct TestClock {
        origin: Instant,
        state: Arc<Mutex<State>>,
    }

    impl Default for TestClock {
        fn default() -> Self {
            Self::new()
        }
    }

    impl TestClock {
        pub fn new() -> Self {
            Self {
                origin: Instant::now(),
                state: Arc::new(Mutex::new(State::default())),
            }
        }

        /// Move time forward without counting it as a sleep.
        pub fn advance(&self, d: Duration) {
            if let Ok(mut s) = self.state.lock() {
                s.offset = s.offset.saturating_add(d);
            }
        }

        /// Total time spent inside `sleep`.
        pub fn slept(&self) -> Duration {
            self.state.lock().map(|s| s.slept).unwrap_or(Duration::ZERO)
        }

        /// Number of `sleep` calls observed.
        pub fn sleep_calls(&self) -> u64 {
            self.state.lock().map(|s| s.sleeps).unwrap_or(0)
        }
    }

    impl Clock for TestClock {
        fn now(&self) -> Instant {
            let off = self
                .state
                .lock()
                .map(|s| s.offset)
                .unwrap_or(Duration::ZERO);
            self.origin + off
        }

        fn sleep(&self, d: Duration) {
            if let Ok(mut s) = self.state.lock() {
                s.offset = s.offset.saturating_add(d);
                s.slept = s.slept.saturating_add(d);
                s.sleeps += 1;
            }
        }
    }

}
