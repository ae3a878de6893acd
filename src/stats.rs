use std::collections::VecDeque;

use crate::probe::ProbeOutcome;

/// Number of recent latencies kept for the rolling average.
pub const LATENCY_WINDOW: usize = 60;

/// Check counters plus a rolling window of recent response times.
#[derive(Debug, Clone, Default)]
pub struct Statistics {
    total_checks: u64,
    successful_checks: u64,
    failed_checks: u64,
    checks_this_interval: u64,
    latencies: VecDeque<f64>,
}

impl Statistics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, outcome: &ProbeOutcome) {
        self.total_checks += 1;
        self.checks_this_interval += 1;

        if outcome.is_up {
            self.successful_checks += 1;
            if let Some(latency) = outcome.latency_ms {
                self.latencies.push_back(latency);
                if self.latencies.len() > LATENCY_WINDOW {
                    self.latencies.pop_front();
                }
            }
        } else {
            self.failed_checks += 1;
        }
    }

    /// Percentage of successful checks, `0.0` before the first check.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn uptime_percent(&self) -> f64 {
        if self.total_checks == 0 {
            return 0.0;
        }
        self.successful_checks as f64 / self.total_checks as f64 * 100.0
    }

    /// Mean of the latency window, `0.0` when it is empty.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn average_latency_ms(&self) -> f64 {
        if self.latencies.is_empty() {
            return 0.0;
        }
        self.latencies.iter().sum::<f64>() / self.latencies.len() as f64
    }

    /// Starts a new reporting interval.
    pub fn start_interval(&mut self) {
        self.checks_this_interval = 0;
    }

    #[must_use]
    pub fn total_checks(&self) -> u64 {
        self.total_checks
    }

    #[must_use]
    pub fn successful_checks(&self) -> u64 {
        self.successful_checks
    }

    #[must_use]
    pub fn failed_checks(&self) -> u64 {
        self.failed_checks
    }

    #[must_use]
    pub fn checks_this_interval(&self) -> u64 {
        self.checks_this_interval
    }

    pub fn latencies(&self) -> impl Iterator<Item = f64> + '_ {
        self.latencies.iter().copied()
    }
}
