use chrono::{DateTime, Local, Timelike};

/// Decides when a periodic report is due, aligned to wall-clock minutes.
///
/// With an interval of 10 reports go out at :00, :10, :20 and so on, no
/// matter when the process started. The marker keeps a minute from firing
/// twice when several checks land inside it. If checks are further apart than
/// the interval, boundary minutes can be missed and are not caught up.
#[derive(Debug, Clone)]
pub struct ReportScheduler {
    interval_minutes: u32,
    last_marker: Option<u32>,
    /// Minutes since the epoch of the last report, so the same minute-of-hour
    /// in a later hour still counts as new.
    last_fired: Option<i64>,
}

impl ReportScheduler {
    /// Intervals are clamped to `1..=60`; minute-of-hour alignment has no
    /// boundaries beyond that.
    #[must_use]
    pub fn new(interval_minutes: u32) -> Self {
        Self {
            interval_minutes: interval_minutes.clamp(1, 60),
            last_marker: None,
            last_fired: None,
        }
    }

    #[must_use]
    pub fn interval_minutes(&self) -> u32 {
        self.interval_minutes
    }

    /// Whether the interval splits the hour into equal parts.
    #[must_use]
    pub fn divides_hour(&self) -> bool {
        60 % self.interval_minutes == 0
    }

    /// Last minute-of-hour a report fired for.
    #[must_use]
    pub fn last_marker(&self) -> Option<u32> {
        self.last_marker
    }

    #[must_use]
    pub fn is_due(&self, now: DateTime<Local>) -> bool {
        now.minute() % self.interval_minutes == 0 && self.last_fired != Some(epoch_minute(now))
    }

    /// Returns `true` and records the minute when a report is due.
    pub fn poll(&mut self, now: DateTime<Local>) -> bool {
        if !self.is_due(now) {
            return false;
        }
        self.last_marker = Some(now.minute());
        self.last_fired = Some(epoch_minute(now));
        true
    }
}

fn epoch_minute(now: DateTime<Local>) -> i64 {
    now.timestamp().div_euclid(60)
}
