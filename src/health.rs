//! Plain-text status page for external uptime pollers.
//!
//! Requests are deliberately not logged: platforms poll this every few
//! seconds.

use axum::{
    Router,
    extract::State,
    http::{StatusCode, header},
    response::IntoResponse,
    routing::get,
};
use log::info;
use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::error::Error;
use crate::monitor::SharedState;

#[derive(Clone)]
struct HealthState {
    monitor: SharedState,
    url: Arc<str>,
    check_interval_secs: u64,
}

#[must_use]
pub fn create_router(monitor: SharedState, url: &str, check_interval_secs: u64) -> Router {
    let state = HealthState {
        monitor,
        url: Arc::from(url),
        check_interval_secs,
    };
    Router::new()
        .route("/", get(status))
        .route("/health", get(status))
        .fallback(not_found)
        .with_state(state)
}

async fn status(State(state): State<HealthState>) -> impl IntoResponse {
    let snapshot = state.monitor.read().await.snapshot();
    let body = format!(
        "Website Monitor: Running\n\
         URL: {}\n\
         Status: {}\n\
         Uptime: {:.2}%\n\
         Total Checks: {}\n\
         Check Interval: {}s\n",
        state.url,
        snapshot.availability,
        snapshot.uptime_percent,
        snapshot.total_checks,
        state.check_interval_secs,
    );
    ([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], body)
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "Not Found\n")
}

/// Serves the status page until `token` is cancelled.
pub async fn serve(port: u16, router: Router, token: CancellationToken) -> Result<(), Error> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!("Health endpoint listening on {}", listener.local_addr()?);

    axum::serve(listener, router)
        .with_graceful_shutdown(token.cancelled_owned())
        .await?;
    Ok(())
}
