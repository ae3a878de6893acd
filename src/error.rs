use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Environment file error: {0}")]
    EnvFile(#[from] dotenvy::Error),
    #[error("HTTP request error: {0}")]
    HttpRequest(#[from] reqwest::Error),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),
    #[error("Email address error: {0}")]
    EmailAddress(#[from] lettre::address::AddressError),
    #[error("Email build error: {0}")]
    EmailBuild(#[from] lettre::error::Error),
    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
    #[error("Telegram API rejected the message: {0}")]
    Telegram(String),
    /// The probe itself could not run. HTTP failures are outcomes, not errors;
    /// a `Probe` returns this only when it has no result to report.
    #[error("Probe failed: {0}")]
    Probe(String),
}
