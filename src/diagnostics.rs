//! Setup checks run before deploying the monitor.

use chrono::{Local, TimeDelta};
use log::{error, info, warn};
use std::time::Duration;

use crate::config::Config;
use crate::error::Error;
use crate::notify::{
    Dispatcher, Message, Notification, ReportSummary, TRANSPORT_TIMEOUT, Telegram,
};
use crate::probe::{Probe, ProbeOutcome};
use crate::state::Availability;

const SAMPLE_NOTE: &str = "This is a test message";
const SAMPLE_PAUSE: Duration = Duration::from_secs(1);

/// Probes the site once, verifies the bot token and sends a test message
/// through every configured channel. Returns `false` if anything failed.
pub async fn check(config: &Config) -> Result<bool, Error> {
    info!("Configuration validated");
    info!("Website: {}", config.site.url);

    let outcome = crate::http_probe(config)?.probe().await?;
    let site_ok = outcome.is_up;
    if site_ok {
        info!(
            "Website is UP ({}, {:.2}ms, {} bytes)",
            outcome.status_code,
            outcome.latency_ms.unwrap_or_default(),
            outcome.content_length
        );
    } else {
        warn!(
            "Website is DOWN: {}",
            outcome.error.as_deref().unwrap_or("unknown error")
        );
    }

    let bot_ok = match Telegram::new(&config.telegram, TRANSPORT_TIMEOUT)?
        .bot_username()
        .await
    {
        Ok(username) => {
            info!("Bot connected: @{username}");
            true
        }
        Err(e) => {
            error!("Telegram bot check failed: {e}");
            false
        }
    };

    let delivery = Dispatcher::from_config(config)?
        .dispatch(&Message::test())
        .await;
    if delivery.telegram {
        info!("Test message sent to chat {}", config.telegram.chat_id);
    } else {
        warn!("Telegram test failed; send /start to the bot if the chat is not found");
    }
    if config.email.is_some() && delivery.email {
        info!("Test email sent");
    }

    Ok(site_ok && bot_ok && delivery.all_ok())
}

/// Sends one rendered sample of every notification kind.
pub async fn samples(config: &Config) -> Result<bool, Error> {
    let dispatcher = Dispatcher::from_config(config)?;
    let notifications =
        sample_notifications(config.check_interval_secs, config.report_interval_minutes);
    Ok(send_samples(&dispatcher, config.site.url.as_str(), notifications, SAMPLE_PAUSE).await)
}

#[must_use]
pub fn sample_notifications(
    check_interval_secs: u64,
    report_interval_minutes: u32,
) -> Vec<Notification> {
    vec![
        Notification::Down {
            outcome: ProbeOutcome::unreachable("Connection timeout"),
        },
        Notification::Recovery {
            outcome: ProbeOutcome::up(200, 234.0, 15_360),
            downtime: TimeDelta::seconds(125),
        },
        Notification::Report(ReportSummary {
            availability: Availability::Up,
            uptime_percent: 99.52,
            average_latency_ms: 245.0,
            total_checks: 1440,
            failed_checks: 7,
            checks_this_interval: 60,
        }),
        Notification::Startup {
            check_interval_secs,
            report_interval_minutes,
        },
    ]
}

async fn send_samples(
    dispatcher: &Dispatcher,
    url: &str,
    notifications: Vec<Notification>,
    pause: Duration,
) -> bool {
    let mut all_ok = true;
    for notification in notifications {
        let message = notification.render(url, Local::now()).with_note(SAMPLE_NOTE);
        let delivery = dispatcher.dispatch(&message).await;
        if delivery.all_ok() {
            info!("{:?} sample sent", message.kind);
        } else {
            error!("{:?} sample failed", message.kind);
            all_ok = false;
        }
        tokio::time::sleep(pause).await;
    }
    all_ok
}
