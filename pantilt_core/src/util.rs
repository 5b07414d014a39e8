//! Common time helpers for pantilt_core.

use std::time::{Duration, Instant};

/// Time left until `deadline`, zero once it has passed.
#[inline]
pub fn remaining(deadline: Instant, now: Instant) -> Duration {
    deadline.saturating_duration_since(now)
}

/// Per-read timeout: the poll interval, shortened so a read never runs past
/// `deadline`. Never returns zero so a read always gets a chance to run.
#[inline]
pub fn bounded_timeout(poll: Duration, deadline: Instant, now: Instant) -> Duration {
    poll.min(remaining(deadline, now)).max(Duration::from_millis(1))
}

/// Milliseconds between two instants, saturating at 0 and at `u64::MAX`.
#[inline]
pub fn elapsed_ms(since: Instant, now: Instant) -> u64 {
    let ms = now.saturating_duration_since(since).as_millis();
    (ms.min(u128::from(u64::MAX))) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounded_timeout_never_exceeds_deadline() {
        let now = Instant::now();
        let deadline = now + Duration::from_millis(30);
        assert_eq!(
            bounded_timeout(Duration::from_millis(100), deadline, now),
            Duration::from_millis(30)
        );
        assert_eq!(
            bounded_timeout(Duration::from_millis(10), deadline, now),
            Duration::from_millis(10)
        );
    }

    #[test]
    fn bounded_timeout_floors_at_one_ms() {
        let now = Instant::now();
        assert_eq!(
            bounded_timeout(Duration::from_millis(100), now, now + Duration::from_secs(1)),
            Duration::from_millis(1)
        );
    }

    #[test]
    fn elapsed_ms_saturates_backwards() {
        let now = Instant::now();
        assert_eq!(elapsed_ms(now + Duration::from_millis(5), now), 0);
        assert_eq!(elapsed_ms(now, now + Duration::from_millis(5)), 5);
    }
}
