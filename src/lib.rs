pub mod config;
pub mod diagnostics;
pub mod error;
pub mod health;
pub mod monitor;
pub mod notify;
pub mod probe;
pub mod schedule;
pub mod state;
pub mod stats;

use log::{error, info};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub use config::Config;
pub use error::Error;
pub use monitor::{Monitor, MonitorState};

use crate::notify::Dispatcher;
use crate::probe::{ContentRules, HttpProbe};

/// Builds the probe for the configured site.
pub fn http_probe(config: &Config) -> Result<HttpProbe, Error> {
    HttpProbe::new(
        config.site.url.clone(),
        config.timeout(),
        ContentRules {
            min_length: config.site.min_content_length,
            required_text: config.site.required_text.clone(),
        },
    )
}

/// Monitors the configured site and serves the health endpoint until an
/// interrupt arrives.
///
/// Transports and the probe are built before anything starts, so bad
/// credentials or addresses fail here rather than inside the loop.
pub async fn run(config: Config) -> Result<(), Error> {
    let probe = http_probe(&config)?;
    let dispatcher = Dispatcher::from_config(&config)?;
    let state = MonitorState::shared(config.report_interval_minutes);
    let url = config.site.url.as_str();

    let monitor = Monitor::new(
        url,
        config.check_interval(),
        Box::new(probe),
        dispatcher,
        Arc::clone(&state),
    );
    let token = CancellationToken::new();

    let router = health::create_router(state, url, config.check_interval_secs);
    let server = tokio::spawn({
        let token = token.clone();
        let port = config.health_port;
        async move {
            if let Err(e) = health::serve(port, router, token).await {
                error!("Health endpoint failed: {e}");
            }
        }
    });

    tokio::spawn({
        let token = token.clone();
        async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for interrupt signal: {e}");
                return;
            }
            info!("Interrupt received, shutting down");
            token.cancel();
        }
    });

    monitor.run(token.clone()).await;

    token.cancel();
    if let Err(e) = server.await {
        error!("Health endpoint task failed: {e}");
    }
    Ok(())
}
