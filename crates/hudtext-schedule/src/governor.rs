//! Minimum-interval enforcement between flushes.
//!
//! A [`RateGovernor`] belongs to exactly one scheduler, and therefore to one
//! recipient. It remembers when that recipient last received a flush and
//! pushes any earlier candidate time forward to `last_flush + min_interval`.
//! Requests are never dropped, only delayed.

use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct RateGovernor {
    min_interval: Duration,
    last_flush: Option<Instant>,
    blocked_until: Option<Instant>,
}

impl RateGovernor {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_flush: None,
            blocked_until: None,
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    pub fn last_flush(&self) -> Option<Instant> {
        self.last_flush
    }

    /// The earliest instant the next flush may happen, if anything limits it.
    pub fn earliest(&self) -> Option<Instant> {
        let after_flush = self.last_flush.map(|at| {
            at.checked_add(self.min_interval)
                .or_else(|| at.checked_add(Duration::from_secs(86_400)))
                .unwrap_or(at)
        });
        match (after_flush, self.blocked_until) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        }
    }

    /// Moves `target` forward to the earliest allowed instant.
    pub fn clamp(&self, target: Instant) -> Instant {
        match self.earliest() {
            Some(earliest) if earliest > target => earliest,
            _ => target,
        }
    }

    /// Records a flush that happened at `at`.
    pub fn record_flush(&mut self, at: Instant) {
        self.last_flush = Some(at);
    }

    /// Forbids flushing before `until`. Used when something outside the
    /// scheduler wrote to the recipient, which counts against its rate limit.
    pub fn block_until(&mut self, until: Instant) {
        self.blocked_until = Some(match self.blocked_until {
            Some(current) => current.max(until),
            None => until,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_millis(500);

    #[test]
    fn unconstrained_before_first_flush() {
        let governor = RateGovernor::new(WINDOW);
        let now = Instant::now();
        assert_eq!(governor.earliest(), None);
        assert_eq!(governor.clamp(now), now);
    }

    #[test]
    fn clamps_inside_window() {
        let mut governor = RateGovernor::new(WINDOW);
        let t0 = Instant::now();
        governor.record_flush(t0);

        assert_eq!(governor.clamp(t0 + Duration::from_millis(100)), t0 + WINDOW);
        let late = t0 + Duration::from_millis(900);
        assert_eq!(governor.clamp(late), late);
    }

    #[test]
    fn block_extends_but_never_shrinks() {
        let mut governor = RateGovernor::new(WINDOW);
        let t0 = Instant::now();
        governor.block_until(t0 + Duration::from_secs(2));
        governor.block_until(t0 + Duration::from_secs(1));
        assert_eq!(governor.earliest(), Some(t0 + Duration::from_secs(2)));
    }

    #[test]
    fn huge_interval_does_not_overflow() {
        let mut governor = RateGovernor::new(Duration::MAX);
        let t0 = Instant::now();
        governor.record_flush(t0);
        assert!(governor.clamp(t0) > t0);
    }

    #[test]
    fn block_and_flush_combine() {
        let mut governor = RateGovernor::new(WINDOW);
        let t0 = Instant::now();
        governor.record_flush(t0);
        governor.block_until(t0 + Duration::from_millis(100));
        assert_eq!(governor.earliest(), Some(t0 + WINDOW));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn clamp_never_moves_backwards(
            since_flush in 0u64..2_000,
            target_offset in 0u64..2_000,
            interval in 0u64..1_000,
        ) {
            let base = Instant::now();
            let mut governor = RateGovernor::new(Duration::from_millis(interval));
            governor.record_flush(base + Duration::from_millis(since_flush));

            let target = base + Duration::from_millis(target_offset);
            let clamped = governor.clamp(target);

            prop_assert!(clamped >= target);
            prop_assert!(clamped >= base + Duration::from_millis(since_flush + interval));
        }
    }
}
