//! Notification rendering and delivery.
//!
//! A [`Notification`] is rendered once into a [`Message`] that carries both
//! an HTML body for Telegram and a subject plus plain-text body for email.
//! The [`Dispatcher`] hands that message to every configured [`Transport`].

pub mod email;
pub mod telegram;

use async_trait::async_trait;
use chrono::{DateTime, Local, TimeDelta};
use log::{error, warn};
use std::time::Duration;

use crate::config::Config;
use crate::error::Error;
use crate::probe::ProbeOutcome;
use crate::state::Availability;

pub use email::Email;
pub use telegram::Telegram;

/// Upper bound for a single delivery attempt.
pub const TRANSPORT_TIMEOUT: Duration = Duration::from_secs(10);

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Startup,
    Down,
    Recovery,
    Report,
    /// Connectivity check, not part of normal monitoring.
    Test,
}

/// Figures carried by a periodic report.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportSummary {
    pub availability: Availability,
    pub uptime_percent: f64,
    pub average_latency_ms: f64,
    pub total_checks: u64,
    pub failed_checks: u64,
    pub checks_this_interval: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    Startup {
        check_interval_secs: u64,
        report_interval_minutes: u32,
    },
    Down {
        outcome: ProbeOutcome,
    },
    Recovery {
        outcome: ProbeOutcome,
        downtime: TimeDelta,
    },
    Report(ReportSummary),
}

/// A notification rendered for every channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub kind: NotificationKind,
    pub subject: String,
    pub html: String,
    pub text: String,
}

impl Message {
    #[must_use]
    pub fn test() -> Self {
        Self {
            kind: NotificationKind::Test,
            subject: "🧪 Test Email".to_string(),
            html: "🧪 Test message from monitoring setup".to_string(),
            text: "Test email from website monitoring setup".to_string(),
        }
    }

    /// Appends a trailing remark to both bodies.
    #[must_use]
    pub fn with_note(mut self, note: &str) -> Self {
        self.html.push_str(&format!("\n<i>{}</i>\n", escape_html(note)));
        self.text.push_str(&format!("\n{note}\n"));
        self
    }
}

impl Notification {
    #[must_use]
    pub fn kind(&self) -> NotificationKind {
        match self {
            Notification::Startup { .. } => NotificationKind::Startup,
            Notification::Down { .. } => NotificationKind::Down,
            Notification::Recovery { .. } => NotificationKind::Recovery,
            Notification::Report(_) => NotificationKind::Report,
        }
    }

    #[must_use]
    pub fn render(&self, url: &str, at: DateTime<Local>) -> Message {
        let timestamp = at.format(TIME_FORMAT).to_string();
        let site = escape_html(url);

        let (subject, html, text) = match self {
            Notification::Startup {
                check_interval_secs,
                report_interval_minutes,
            } => (
                format!("🚀 Monitor Started: {url}"),
                format!(
                    "🚀 <b>Monitor Started</b>\n\n\
                     🌐 Monitoring: {site}\n\
                     ⏱ Check interval: {check_interval_secs} seconds\n\
                     📊 Reports: every {report_interval_minutes} minutes\n\
                     ⏰ Started at: {timestamp}\n\n\
                     Monitoring is now active!\n"
                ),
                format!(
                    "MONITORING STARTED\n\n\
                     Website: {url}\n\
                     Check Interval: {check_interval_secs} seconds\n\
                     Report Interval: {report_interval_minutes} minutes\n\
                     Started at: {timestamp}\n\n\
                     The monitoring system is now active and will send alerts if the website goes down.\n"
                ),
            ),
            Notification::Down { outcome } => {
                let code = outcome.status_code;
                let reason = outcome.error.as_deref().unwrap_or("Unknown error");
                (
                    format!("🚨 WEBSITE DOWN: {url}"),
                    format!(
                        "🚨 <b>WEBSITE DOWN!</b>\n\n\
                         🌐 {site}\n\
                         ❌ Status: DOWN\n\
                         📊 Code: {code}\n\
                         ⚠️ Error: {}\n\
                         ⏰ {timestamp}\n",
                        escape_html(reason)
                    ),
                    format!(
                        "WEBSITE DOWN ALERT\n\n\
                         URL: {url}\n\
                         Status: DOWN\n\
                         Status Code: {code}\n\
                         Error: {reason}\n\
                         Time: {timestamp}\n\n\
                         This is an automated alert from your website monitoring system.\n"
                    ),
                )
            }
            Notification::Recovery { outcome, downtime } => {
                let code = outcome.status_code;
                let response = format_latency(outcome.latency_ms);
                let seconds = downtime.num_seconds();
                (
                    format!("✅ WEBSITE RECOVERED: {url}"),
                    format!(
                        "✅ <b>WEBSITE RECOVERED</b>\n\n\
                         🌐 {site}\n\
                         ✅ Status: UP\n\
                         📊 Code: {code}\n\
                         ⚡️ Response: {response}\n\
                         ⏱ Downtime: {seconds}s\n\
                         ⏰ {timestamp}\n"
                    ),
                    format!(
                        "WEBSITE RECOVERY ALERT\n\n\
                         URL: {url}\n\
                         Status: UP\n\
                         Status Code: {code}\n\
                         Response Time: {response}\n\
                         Downtime Duration: {seconds} seconds\n\
                         Time: {timestamp}\n\n\
                         Your website is back online!\n"
                    ),
                )
            }
            Notification::Report(report) => {
                let status = report.availability;
                let emoji = if status == Availability::Up { "✅" } else { "❌" };
                let uptime = report.uptime_percent;
                let average = report.average_latency_ms;
                let total = report.total_checks;
                let failed = report.failed_checks;
                let recent = report.checks_this_interval;
                (
                    format!("📊 Status Report: {url}"),
                    format!(
                        "📊 <b>Status Report</b>\n\n\
                         🌐 Website: {site}\n\
                         {emoji} Status: {status}\n\
                         📈 Uptime: {uptime:.2}%\n\
                         ⏱ Avg Response Time: {average:.0}ms\n\
                         🔍 Total Checks: {total}\n\
                         ❌ Failed: {failed}\n\
                         🕐 Checks since last report: {recent}\n\n\
                         ⏰ {timestamp}\n"
                    ),
                    format!(
                        "STATUS REPORT\n\n\
                         Website: {url}\n\
                         Current Status: {status}\n\
                         Uptime: {uptime:.2}%\n\
                         Average Response Time: {average:.0}ms\n\
                         Total Checks: {total}\n\
                         Failed Checks: {failed}\n\
                         Checks Since Last Report: {recent}\n\n\
                         Time: {timestamp}\n"
                    ),
                )
            }
        };

        Message {
            kind: self.kind(),
            subject,
            html,
            text,
        }
    }
}

fn format_latency(latency_ms: Option<f64>) -> String {
    latency_ms.map_or_else(|| "n/a".to_string(), |ms| format!("{ms:.0}ms"))
}

/// Escapes the characters Telegram's HTML parse mode treats as markup.
#[must_use]
pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// A delivery channel.
#[async_trait]
pub trait Transport: Send + Sync {
    fn name(&self) -> &'static str;

    async fn deliver(&self, message: &Message) -> Result<(), Error>;
}

/// Per-channel delivery result. An unconfigured channel counts as delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    pub telegram: bool,
    pub email: bool,
}

impl Delivery {
    #[must_use]
    pub fn all_ok(self) -> bool {
        self.telegram && self.email
    }
}

pub struct Dispatcher {
    telegram: Option<Box<dyn Transport>>,
    email: Option<Box<dyn Transport>>,
    timeout: Duration,
}

impl Dispatcher {
    #[must_use]
    pub fn new(telegram: Option<Box<dyn Transport>>, email: Option<Box<dyn Transport>>) -> Self {
        Self {
            telegram,
            email,
            timeout: TRANSPORT_TIMEOUT,
        }
    }

    /// Builds the Telegram channel and, when configured, the email channel.
    pub fn from_config(config: &Config) -> Result<Self, Error> {
        let telegram = Telegram::new(&config.telegram, TRANSPORT_TIMEOUT)?;
        let email = match &config.email {
            Some(options) => Some(Box::new(Email::new(options, TRANSPORT_TIMEOUT)?) as Box<dyn Transport>),
            None => {
                warn!("Email is not configured, notifications will only go to Telegram");
                None
            }
        };
        Ok(Self::new(Some(Box::new(telegram)), email))
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn has_email(&self) -> bool {
        self.email.is_some()
    }

    /// Sends `message` through every channel at once. Failures are logged and
    /// never stop the other channel.
    pub async fn dispatch(&self, message: &Message) -> Delivery {
        let (telegram, email) = tokio::join!(
            self.deliver_via(self.telegram.as_deref(), message),
            self.deliver_via(self.email.as_deref(), message),
        );
        Delivery { telegram, email }
    }

    async fn deliver_via(&self, transport: Option<&dyn Transport>, message: &Message) -> bool {
        let Some(transport) = transport else {
            return true;
        };

        match tokio::time::timeout(self.timeout, transport.deliver(message)).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                error!("{} delivery of {:?} failed: {e}", transport.name(), message.kind);
                false
            }
            Err(_) => {
                error!(
                    "{} delivery of {:?} timed out after {:?}",
                    transport.name(),
                    message.kind,
                    self.timeout
                );
                false
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::{Arc, Mutex};

    /// Records every delivered message; optionally fails or hangs.
    #[derive(Clone, Default)]
    pub(crate) struct RecordingTransport {
        pub(crate) sent: Arc<Mutex<Vec<Message>>>,
        pub(crate) fail: bool,
        pub(crate) hang: bool,
    }

    impl RecordingTransport {
        pub(crate) fn kinds(&self) -> Vec<NotificationKind> {
            self.sent.lock().unwrap().iter().map(|m| m.kind).collect()
        }
    }

    #[async_trait]
    impl Transport for RecordingTransport {
        fn name(&self) -> &'static str {
            "Recording"
        }

        async fn deliver(&self, message: &Message) -> Result<(), Error> {
            if self.hang {
                tokio::time::sleep(Duration::from_secs(60)).await;
            }
            if self.fail {
                return Err(Error::Telegram("rejected".into()));
            }
            self.sent.lock().unwrap().push(message.clone());
            Ok(())
        }
    }

    fn noon() -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 10, 16, 12, 0, 0).unwrap()
    }

    fn sample_message() -> Message {
        Notification::Down {
            outcome: ProbeOutcome::unreachable("Connection timeout"),
        }
        .render("https://example.com", noon())
    }

    #[test]
    fn test_render_down() {
        let message = sample_message();
        assert_eq!(message.kind, NotificationKind::Down);
        assert!(message.subject.contains("WEBSITE DOWN"));
        assert!(message.html.contains("<b>WEBSITE DOWN!</b>"));
        assert!(message.html.contains("Code: 0"));
        assert!(message.text.contains("Error: Connection timeout"));
        assert!(message.text.contains("2026-10-16 12:00:00"));
    }

    #[test]
    fn test_render_recovery() {
        let message = Notification::Recovery {
            outcome: ProbeOutcome::up(200, 40.4, 2048),
            downtime: TimeDelta::seconds(125),
        }
        .render("https://example.com", noon());
        assert!(message.html.contains("Response: 40ms"));
        assert!(message.html.contains("Downtime: 125s"));
        assert!(message.text.contains("Downtime Duration: 125 seconds"));
    }

    #[test]
    fn test_render_report() {
        let message = Notification::Report(ReportSummary {
            availability: Availability::Up,
            uptime_percent: 87.5,
            average_latency_ms: 48.6,
            total_checks: 8,
            failed_checks: 1,
            checks_this_interval: 8,
        })
        .render("https://example.com", noon());
        assert_eq!(message.kind, NotificationKind::Report);
        assert!(message.html.contains("Uptime: 87.50%"));
        assert!(message.html.contains("Avg Response Time: 49ms"));
        assert!(message.text.contains("Current Status: UP"));
        assert!(message.text.contains("Failed Checks: 1"));
    }

    #[test]
    fn test_render_startup() {
        let message = Notification::Startup {
            check_interval_secs: 60,
            report_interval_minutes: 10,
        }
        .render("https://example.com", noon());
        assert_eq!(message.kind, NotificationKind::Startup);
        assert!(message.text.contains("Check Interval: 60 seconds"));
        assert!(message.html.contains("every 10 minutes"));
    }

    #[test]
    fn test_html_is_escaped() {
        let message = Notification::Down {
            outcome: ProbeOutcome::unreachable("bad <tag> & more"),
        }
        .render("https://example.com/?a=1&b=2", noon());
        assert!(message.html.contains("bad &lt;tag&gt; &amp; more"));
        assert!(message.html.contains("?a=1&amp;b=2"));
        assert!(message.text.contains("bad <tag> & more"));
    }

    #[test]
    fn test_note_is_appended() {
        let message = sample_message().with_note("This is a test message");
        assert!(message.html.ends_with("<i>This is a test message</i>\n"));
        assert!(message.text.contains("This is a test message"));
    }

    #[tokio::test]
    async fn test_missing_channels_count_as_delivered() {
        let dispatcher = Dispatcher::new(None, None);
        let delivery = dispatcher.dispatch(&sample_message()).await;
        assert!(delivery.all_ok());
    }

    #[tokio::test]
    async fn test_failing_channel_does_not_block_the_other() {
        let telegram = RecordingTransport {
            fail: true,
            ..Default::default()
        };
        let email = RecordingTransport::default();
        let dispatcher = Dispatcher::new(Some(Box::new(telegram)), Some(Box::new(email.clone())));

        let delivery = dispatcher.dispatch(&sample_message()).await;
        assert_eq!(
            delivery,
            Delivery {
                telegram: false,
                email: true
            }
        );
        assert_eq!(email.kinds(), vec![NotificationKind::Down]);
    }

    #[tokio::test]
    async fn test_hanging_channel_times_out() {
        let telegram = RecordingTransport {
            hang: true,
            ..Default::default()
        };
        let email = RecordingTransport::default();
        let dispatcher = Dispatcher::new(Some(Box::new(telegram)), Some(Box::new(email.clone())))
            .with_timeout(Duration::from_millis(50));

        let delivery = dispatcher.dispatch(&sample_message()).await;
        assert!(!delivery.telegram);
        assert!(delivery.email);
        assert_eq!(email.kinds().len(), 1);
    }
}
