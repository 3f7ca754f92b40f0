use std::time::Duration;

use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

pub const DEFAULT_MAX_WORK_DURATION: Duration = Duration::from_secs(3 * 60 * 60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeadlineSnapshot {
    pub elapsed: Duration,
    pub remaining: Duration,
    pub overdue: bool,
    pub deadline: OffsetDateTime,
    pub deadline_label: String,
    pub remaining_label: String,
}

/// Elapsed and remaining time against a fixed maximum work duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeadlineClock {
    max_duration: Duration,
}

impl Default for DeadlineClock {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_WORK_DURATION)
    }
}

impl DeadlineClock {
    pub fn new(max_duration: Duration) -> Self {
        Self { max_duration }
    }

    pub fn max_duration(&self) -> Duration {
        self.max_duration
    }

    pub fn elapsed(&self, started_at_ms: i64, now_ms: i64) -> Duration {
        let elapsed_ms = now_ms.saturating_sub(started_at_ms).max(0);
        Duration::from_millis(u64::try_from(elapsed_ms).unwrap_or(0))
    }

    pub fn snapshot(&self, started_at_ms: i64, now_ms: i64) -> DeadlineSnapshot {
        let elapsed = self.elapsed(started_at_ms, now_ms);
        let remaining = self.max_duration.saturating_sub(elapsed);
        let deadline = deadline_at(started_at_ms, self.max_duration);
        DeadlineSnapshot {
            elapsed,
            remaining,
            overdue: elapsed >= self.max_duration,
            deadline_label: deadline
                .format(&Rfc3339)
                .unwrap_or_else(|_| deadline.unix_timestamp().to_string()),
            deadline,
            remaining_label: format_hours_minutes(remaining),
        }
    }
}

fn deadline_at(started_at_ms: i64, max_duration: Duration) -> OffsetDateTime {
    let deadline_ms = i128::from(started_at_ms) + max_duration.as_millis() as i128;
    OffsetDateTime::from_unix_timestamp_nanos(deadline_ms * 1_000_000)
        .unwrap_or(OffsetDateTime::UNIX_EPOCH)
}

pub fn format_hours_minutes(duration: Duration) -> String {
    let total_minutes = duration.as_secs() / 60;
    format!("{}h {:02}m", total_minutes / 60, total_minutes % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    const START_MS: i64 = 1_700_000_000_000;

    #[test]
    fn remaining_counts_down_from_max_duration() {
        let clock = DeadlineClock::new(Duration::from_secs(2 * 60 * 60));
        let snapshot = clock.snapshot(START_MS, START_MS + 35 * 60 * 1000);

        assert_eq!(snapshot.elapsed, Duration::from_secs(35 * 60));
        assert_eq!(snapshot.remaining, Duration::from_secs(85 * 60));
        assert!(!snapshot.overdue);
        assert_eq!(snapshot.remaining_label, "1h 25m");
    }

    #[test]
    fn remaining_saturates_at_zero_once_overdue() {
        let clock = DeadlineClock::new(Duration::from_secs(60 * 60));
        let snapshot = clock.snapshot(START_MS, START_MS + 3 * 60 * 60 * 1000);

        assert_eq!(snapshot.remaining, Duration::ZERO);
        assert!(snapshot.overdue);
        assert_eq!(snapshot.remaining_label, "0h 00m");
    }

    #[test]
    fn start_in_the_future_counts_as_not_started() {
        let clock = DeadlineClock::default();
        let snapshot = clock.snapshot(START_MS, START_MS - 10_000);
        assert_eq!(snapshot.elapsed, Duration::ZERO);
        assert_eq!(snapshot.remaining, DEFAULT_MAX_WORK_DURATION);
    }

    #[test]
    fn deadline_label_is_rfc3339_wall_clock() {
        let clock = DeadlineClock::new(Duration::from_secs(60 * 60));
        let snapshot = clock.snapshot(0, 0);
        assert_eq!(snapshot.deadline_label, "1970-01-01T01:00:00Z");
        assert_eq!(snapshot.deadline.unix_timestamp(), 3600);
    }
}
