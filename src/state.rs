//! Availability state machine.
//!
//! ```text
//! Unknown --down--> Down   (DOWN)
//! Up      --down--> Down   (DOWN)
//! Down    --up----> Up     (RECOVERY, carries downtime)
//! ```
//!
//! Every other combination keeps the state and emits nothing. There is no
//! debounce: the first failing check alerts.

use chrono::{DateTime, Local, TimeDelta};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Availability {
    /// No check has completed yet.
    #[default]
    Unknown,
    Up,
    Down,
}

impl fmt::Display for Availability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Availability::Unknown => "STARTING",
            Availability::Up => "UP",
            Availability::Down => "DOWN",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    WentDown,
    Recovered { downtime: TimeDelta },
}

#[derive(Debug, Clone, Default)]
pub struct AvailabilityTracker {
    current: Availability,
    down_since: Option<DateTime<Local>>,
}

impl AvailabilityTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn current(&self) -> Availability {
        self.current
    }

    #[must_use]
    pub fn down_since(&self) -> Option<DateTime<Local>> {
        self.down_since
    }

    /// Feeds one check result and returns the transition it caused, if any.
    pub fn observe(&mut self, is_up: bool, now: DateTime<Local>) -> Option<Transition> {
        match (self.current, is_up) {
            (Availability::Down, true) => {
                let downtime = self
                    .down_since
                    .take()
                    .map_or(TimeDelta::zero(), |since| now - since);
                self.current = Availability::Up;
                Some(Transition::Recovered { downtime })
            }
            (Availability::Unknown | Availability::Up, false) => {
                self.current = Availability::Down;
                self.down_since = Some(now);
                Some(Transition::WentDown)
            }
            (_, true) => {
                self.current = Availability::Up;
                None
            }
            (Availability::Down, false) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(minute: u32, second: u32) -> DateTime<Local> {
        Local
            .with_ymd_and_hms(2026, 10, 16, 12, minute, second)
            .unwrap()
    }

    #[test]
    fn test_first_success_is_silent() {
        let mut tracker = AvailabilityTracker::new();
        assert_eq!(tracker.current(), Availability::Unknown);
        assert_eq!(tracker.observe(true, at(0, 0)), None);
        assert_eq!(tracker.current(), Availability::Up);
        assert!(tracker.down_since().is_none());
    }

    #[test]
    fn test_first_failure_alerts() {
        let mut tracker = AvailabilityTracker::new();
        assert_eq!(tracker.observe(false, at(0, 0)), Some(Transition::WentDown));
        assert_eq!(tracker.current(), Availability::Down);
        assert_eq!(tracker.down_since(), Some(at(0, 0)));
    }

    #[test]
    fn test_down_then_up_emits_down_then_recovery() {
        let mut tracker = AvailabilityTracker::new();
        let mut events = Vec::new();
        events.extend(tracker.observe(false, at(1, 0)));
        assert!(tracker.down_since().is_some());
        events.extend(tracker.observe(true, at(2, 30)));

        assert_eq!(
            events,
            vec![
                Transition::WentDown,
                Transition::Recovered {
                    downtime: TimeDelta::seconds(90)
                }
            ]
        );
        assert!(tracker.down_since().is_none());
        assert_eq!(tracker.current(), Availability::Up);
    }

    #[test]
    fn test_repeated_failures_alert_once() {
        let mut tracker = AvailabilityTracker::new();
        tracker.observe(true, at(0, 0));
        let events: Vec<_> = (1..=3)
            .filter_map(|minute| tracker.observe(false, at(minute, 0)))
            .collect();
        assert_eq!(events, vec![Transition::WentDown]);
        // Outage start stays at the first failure.
        assert_eq!(tracker.down_since(), Some(at(1, 0)));
    }

    #[test]
    fn test_flapping_produces_matching_pairs() {
        let mut tracker = AvailabilityTracker::new();
        tracker.observe(true, at(0, 0));
        let events: Vec<_> = [false, true, false, true]
            .into_iter()
            .enumerate()
            .filter_map(|(i, is_up)| {
                let minute = u32::try_from(i).unwrap() + 1;
                tracker.observe(is_up, at(minute, 0))
            })
            .collect();
        assert_eq!(events.len(), 4);
        assert_eq!(events[0], Transition::WentDown);
        assert!(matches!(events[1], Transition::Recovered { .. }));
        assert_eq!(events[2], Transition::WentDown);
        assert!(matches!(events[3], Transition::Recovered { .. }));
    }

    #[test]
    fn test_status_labels() {
        assert_eq!(Availability::Unknown.to_string(), "STARTING");
        assert_eq!(Availability::Up.to_string(), "UP");
        assert_eq!(Availability::Down.to_string(), "DOWN");
    }
}
