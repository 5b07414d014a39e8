use std::thread;
use std::time::{Duration, Instant};

/// Time source for framing deadlines, settle delays and send throttling.
pub trait Clock {
    fn now(&self) -> Instant;

    /// Block for `d`. Simulated clocks advance instead.
    fn sleep(&self, d: Duration);

    /// Instant `d` from now; the end of a bounded wait.
    fn deadline_after(&self, d: Duration) -> Instant {
        self.now() + d
    }
}

/// Wall-clock time from `std::time::Instant`.
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
        if !d.is_zero() {
            thread::sleep(d);
        }
    }
}

#[cfg(any(test, feature = "test-util"))]
pub mod test_clock {
    use super::*;
    use std::sync::{Arc, Mutex, PoisonError};

    /// Manually driven clock. Clones share one timeline, so a byte source and
    /// the reader polling it agree on elapsed time; `sleep` advances instead
    /// of blocking.
    #[derive(Debug, Clone)]
    pub struct TestClock {
        origin: Instant,
        elapsed: Arc<Mutex<Duration>>,
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
                elapsed: Arc::new(Mutex::new(Duration::ZERO)),
            }
        }

        pub fn advance(&self, d: Duration) {
            let mut elapsed = self.elapsed.lock().unwrap_or_else(PoisonError::into_inner);
            *elapsed = elapsed.saturating_add(d);
        }

        /// Total simulated time since construction.
        pub fn elapsed(&self) -> Duration {
            *self.elapsed.lock().unwrap_or_else(PoisonError::into_inner)
        }
    }

    impl Clock for TestClock {
        fn now(&self) -> Instant {
            self.origin + self.elapsed()
        }

        fn sleep(&self, d: Duration) {
            self.advance(d);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_clock::TestClock;
    use super::*;

    #[test]
    fn sleeping_advances_shared_timeline() {
        let clock = TestClock::new();
        let other = clock.clone();
        let start = clock.now();
        other.sleep(Duration::from_millis(2_000));
        assert_eq!(clock.now() - start, Duration::from_millis(2_000));
        assert_eq!(clock.elapsed(), Duration::from_millis(2_000));
    }

    #[test]
    fn deadline_is_relative_to_now() {
        let clock = TestClock::new();
        clock.advance(Duration::from_millis(40));
        let deadline = clock.deadline_after(Duration::from_millis(100));
        assert_eq!(deadline - clock.now(), Duration::from_millis(100));
    }
}
