//! Per-operation timing.

use chrono::{DateTime, TimeDelta, Utc};
use tokio::time::Instant;

/// Wall-clock start of an operation paired with a monotonic instant.
///
/// Every later timestamp is derived as `start + monotonic elapsed`, so an
/// operation's timestamps never go backwards even if the system clock is
/// adjusted mid-call, and durations are never negative.
#[derive(Debug, Clone, Copy)]
pub struct OperationClock {
    started_at: DateTime<Utc>,
    started: Instant,
}

impl OperationClock {
    /// Start timing now.
    pub fn start() -> Self {
        Self {
            started_at: Utc::now(),
            started: Instant::now(),
        }
    }

    /// Wall-clock time the operation started.
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Current time on this operation's timeline.
    pub fn now(&self) -> DateTime<Utc> {
        self.at(Instant::now())
    }

    /// Wall-clock time of `instant` on this operation's timeline.
    pub fn at(&self, instant: Instant) -> DateTime<Utc> {
        let elapsed = instant.saturating_duration_since(self.started);
        TimeDelta::from_std(elapsed)
            .ok()
            .and_then(|delta| self.started_at.checked_add_signed(delta))
            .unwrap_or(self.started_at)
    }
}

/// Whole milliseconds from `start` to `end`, rounded, never negative.
pub fn millis_between(start: DateTime<Utc>, end: DateTime<Utc>) -> u64 {
    let micros = (end - start).num_microseconds().unwrap_or(i64::MAX);
    if micros <= 0 {
        return 0;
    }
    (micros as f64 / 1000.0).round() as u64
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn millis_between_rounds_and_floors_at_zero() {
        let start = Utc::now();
        assert_eq!(millis_between(start, start + TimeDelta::microseconds(1_499)), 1);
        assert_eq!(millis_between(start, start + TimeDelta::microseconds(1_500)), 2);
        assert_eq!(millis_between(start, start - TimeDelta::seconds(3)), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn clock_follows_monotonic_time() {
        let clock = OperationClock::start();
        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(millis_between(clock.started_at(), clock.now()), 250);
    }
}
