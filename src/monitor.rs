use chrono::{DateTime, Local};
use futures_util::FutureExt;
use log::{error, info, warn};
use std::{panic::AssertUnwindSafe, sync::Arc, time::Duration};
use tokio::{select, sync::RwLock, time::sleep};
use tokio_util::sync::CancellationToken;

use crate::error::Error;
use crate::notify::{Dispatcher, Notification, ReportSummary};
use crate::probe::{Probe, ProbeOutcome};
use crate::schedule::ReportScheduler;
use crate::state::{Availability, AvailabilityTracker, Transition};
use crate::stats::Statistics;

pub type SharedState = Arc<RwLock<MonitorState>>;

/// Everything the monitor knows about the site. Only the loop writes it.
#[derive(Debug, Clone)]
pub struct MonitorState {
    pub tracker: AvailabilityTracker,
    pub stats: Statistics,
    pub scheduler: ReportScheduler,
    pub last_outcome: Option<ProbeOutcome>,
}

/// Read-only copy handed to the health endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusSnapshot {
    pub availability: Availability,
    pub uptime_percent: f64,
    pub average_latency_ms: f64,
    pub total_checks: u64,
    pub failed_checks: u64,
}

impl MonitorState {
    #[must_use]
    pub fn new(report_interval_minutes: u32) -> Self {
        Self {
            tracker: AvailabilityTracker::new(),
            stats: Statistics::new(),
            scheduler: ReportScheduler::new(report_interval_minutes),
            last_outcome: None,
        }
    }

    #[must_use]
    pub fn shared(report_interval_minutes: u32) -> SharedState {
        Arc::new(RwLock::new(Self::new(report_interval_minutes)))
    }

    /// Folds one check result into the state and returns the notifications
    /// it triggers, state change first, report second.
    pub fn apply(&mut self, outcome: ProbeOutcome, now: DateTime<Local>) -> Vec<Notification> {
        let mut notifications = Vec::new();

        self.stats.record(&outcome);

        match self.tracker.observe(outcome.is_up, now) {
            Some(Transition::WentDown) => notifications.push(Notification::Down {
                outcome: outcome.clone(),
            }),
            Some(Transition::Recovered { downtime }) => notifications.push(Notification::Recovery {
                outcome: outcome.clone(),
                downtime,
            }),
            None => {}
        }
        self.last_outcome = Some(outcome);

        if self.scheduler.poll(now) {
            notifications.push(Notification::Report(self.report()));
            self.stats.start_interval();
        }

        notifications
    }

    #[must_use]
    pub fn report(&self) -> ReportSummary {
        ReportSummary {
            availability: self.tracker.current(),
            uptime_percent: self.stats.uptime_percent(),
            average_latency_ms: self.stats.average_latency_ms(),
            total_checks: self.stats.total_checks(),
            failed_checks: self.stats.failed_checks(),
            checks_this_interval: self.stats.checks_this_interval(),
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            availability: self.tracker.current(),
            uptime_percent: self.stats.uptime_percent(),
            average_latency_ms: self.stats.average_latency_ms(),
            total_checks: self.stats.total_checks(),
            failed_checks: self.stats.failed_checks(),
        }
    }
}

/// Drives probe, state update and dispatch for one site.
pub struct Monitor {
    url: String,
    check_interval: Duration,
    probe: Box<dyn Probe>,
    dispatcher: Dispatcher,
    state: SharedState,
}

impl Monitor {
    pub fn new(
        url: impl Into<String>,
        check_interval: Duration,
        probe: Box<dyn Probe>,
        dispatcher: Dispatcher,
        state: SharedState,
    ) -> Self {
        Self {
            url: url.into(),
            check_interval,
            probe,
            dispatcher,
            state,
        }
    }

    #[must_use]
    pub fn state(&self) -> SharedState {
        Arc::clone(&self.state)
    }

    /// Sends the startup notification, then checks the site every interval
    /// until `token` is cancelled.
    pub async fn run(&self, token: CancellationToken) {
        let (report_interval, even) = {
            let state = self.state.read().await;
            (state.scheduler.interval_minutes(), state.scheduler.divides_hour())
        };

        info!("Starting website monitoring for {}", self.url);
        info!("Check interval: {} seconds", self.check_interval.as_secs());
        info!("Reports every {report_interval} minutes");
        if !even {
            warn!("Report interval {report_interval} does not divide the hour, reports will be unevenly spaced");
        }
        if self.dispatcher.has_email() {
            info!("Email is set, notifications go to Telegram and email");
        }

        self.announce(report_interval).await;

        // Main monitoring loop
        loop {
            if token.is_cancelled() {
                info!("Shutdown requested, stopping monitor");
                break;
            }

            self.run_cycle().await;

            // Interruptible sleep
            select! {
                () = sleep(self.check_interval) => {},
                () = token.cancelled() => {
                    info!("Shutdown requested during sleep");
                    break;
                }
            }
        }

        info!("Website monitoring stopped gracefully");
    }

    async fn announce(&self, report_interval_minutes: u32) {
        let startup = Notification::Startup {
            check_interval_secs: self.check_interval.as_secs(),
            report_interval_minutes,
        };
        let delivery = self
            .dispatcher
            .dispatch(&startup.render(&self.url, Local::now()))
            .await;
        if delivery.all_ok() {
            info!("Startup notification sent");
        }
    }

    /// One iteration with errors and panics contained, so a bad cycle never
    /// ends the loop.
    pub async fn run_cycle(&self) {
        match AssertUnwindSafe(self.tick()).catch_unwind().await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!("Error checking {}: {e}", self.url),
            Err(_) => error!("Check cycle for {} panicked, continuing", self.url),
        }
    }

    /// Probes once, updates the shared state and sends whatever that
    /// triggered.
    pub async fn tick(&self) -> Result<(), Error> {
        let outcome = self.probe.probe().await?;
        let now = Local::now();
        log_outcome(&outcome);

        // The write lock is never held across network I/O.
        let notifications = self.state.write().await.apply(outcome, now);

        for notification in notifications {
            match &notification {
                Notification::Down { outcome } => warn!(
                    "Site went DOWN: {}",
                    outcome.error.as_deref().unwrap_or("unknown error")
                ),
                Notification::Recovery { downtime, .. } => {
                    info!("Site RECOVERED after {}s", downtime.num_seconds());
                }
                Notification::Report(report) => info!(
                    "REPORT | Uptime: {:.2}% | Avg: {:.0}ms",
                    report.uptime_percent, report.average_latency_ms
                ),
                Notification::Startup { .. } => {}
            }
            self.dispatcher
                .dispatch(&notification.render(&self.url, now))
                .await;
        }

        Ok(())
    }
}

fn log_outcome(outcome: &ProbeOutcome) {
    if outcome.is_up {
        info!(
            "UP | {} | {:.2}ms",
            outcome.status_code,
            outcome.latency_ms.unwrap_or_default()
        );
    } else {
        warn!(
            "DOWN | {} | {}",
            outcome.status_code,
            outcome.error.as_deref().unwrap_or("unknown error")
        );
    }
}
