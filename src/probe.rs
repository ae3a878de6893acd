use async_trait::async_trait;
use reqwest::Client;
use std::time::{Duration, Instant};
use url::Url;

use crate::error::Error;

/// Normalized result of one availability check.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeOutcome {
    pub is_up: bool,
    /// HTTP status, or `0` when no response arrived.
    pub status_code: u16,
    pub latency_ms: Option<f64>,
    /// Body size in bytes.
    pub content_length: usize,
    pub error: Option<String>,
}

impl ProbeOutcome {
    #[must_use]
    pub fn up(status_code: u16, latency_ms: f64, content_length: usize) -> Self {
        Self {
            is_up: true,
            status_code,
            latency_ms: Some(latency_ms),
            content_length,
            error: None,
        }
    }

    #[must_use]
    pub fn down(
        status_code: u16,
        latency_ms: Option<f64>,
        content_length: usize,
        error: impl Into<String>,
    ) -> Self {
        Self {
            is_up: false,
            status_code,
            latency_ms,
            content_length,
            error: Some(error.into()),
        }
    }

    /// A check that never got a response.
    #[must_use]
    pub fn unreachable(error: impl Into<String>) -> Self {
        Self::down(0, None, 0, error)
    }
}

/// Content checks applied to responses that are not HTTP errors.
#[derive(Debug, Clone, Default)]
pub struct ContentRules {
    pub min_length: usize,
    pub required_text: Option<String>,
}

impl ContentRules {
    /// Classifies a received response.
    #[must_use]
    pub fn evaluate(&self, status_code: u16, latency_ms: f64, body: &[u8]) -> ProbeOutcome {
        let length = body.len();

        if status_code >= 400 {
            return ProbeOutcome::down(
                status_code,
                Some(latency_ms),
                length,
                format!("HTTP {status_code}"),
            );
        }

        if length < self.min_length {
            return ProbeOutcome::down(
                status_code,
                Some(latency_ms),
                length,
                format!(
                    "Content too short: {length} bytes (minimum {})",
                    self.min_length
                ),
            );
        }

        if let Some(text) = &self.required_text {
            if !String::from_utf8_lossy(body).contains(text.as_str()) {
                return ProbeOutcome::down(
                    status_code,
                    Some(latency_ms),
                    length,
                    format!("Required text not found: {text:?}"),
                );
            }
        }

        ProbeOutcome::up(status_code, latency_ms, length)
    }
}

#[async_trait]
pub trait Probe: Send + Sync {
    /// Performs one check. Network failures come back as down outcomes; an
    /// `Err` means the probe itself could not run.
    async fn probe(&self) -> Result<ProbeOutcome, Error>;
}

/// Probes a URL with a single HTTP GET.
pub struct HttpProbe {
    client: Client,
    url: Url,
    rules: ContentRules,
}

impl HttpProbe {
    pub fn new(url: Url, timeout: Duration, rules: ContentRules) -> Result<Self, Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, url, rules })
    }

    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl Probe for HttpProbe {
    async fn probe(&self) -> Result<ProbeOutcome, Error> {
        let start = Instant::now();

        let response = match self.client.get(self.url.clone()).send().await {
            Ok(response) => response,
            Err(e) => return Ok(classify_error(&e)),
        };
        let status_code = response.status().as_u16();
        let body = match response.bytes().await {
            Ok(body) => body,
            Err(e) => return Ok(classify_error(&e)),
        };
        let latency_ms = start.elapsed().as_secs_f64() * 1000.0;

        Ok(self.rules.evaluate(status_code, latency_ms, &body))
    }
}

fn classify_error(err: &reqwest::Error) -> ProbeOutcome {
    if err.is_timeout() {
        ProbeOutcome::unreachable("Connection timeout")
    } else if err.is_connect() {
        ProbeOutcome::unreachable("Connection failed")
    } else {
        ProbeOutcome::unreachable(err.to_string())
    }
}
