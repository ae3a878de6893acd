use log::warn;
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};
use url::Url;

use crate::error::Error;

const DEFAULT_CHECK_INTERVAL_SECS: u64 = 60;
const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_REPORT_INTERVAL_MINUTES: u32 = 60;
const DEFAULT_HEALTH_PORT: u16 = 8080;
const DEFAULT_SMTP_SERVER: &str = "smtp.gmail.com";
const DEFAULT_SMTP_PORT: u16 = 587;

/// Settings as written in the TOML file. Everything is optional here; the
/// environment may fill gaps before [`RawConfig::validate`] runs.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawConfig {
    pub config: RawOptions,
    pub site: RawSite,
    pub telegram: RawTelegram,
    pub email: RawEmail,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawOptions {
    pub check_interval_secs: Option<u64>,
    pub timeout_secs: Option<u64>,
    pub report_interval_minutes: Option<u32>,
    pub health_port: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawSite {
    pub url: Option<String>,
    pub min_content_length: Option<usize>,
    pub required_text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawTelegram {
    pub bot_token: Option<String>,
    pub chat_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawEmail {
    pub from: Option<String>,
    pub to: Option<String>,
    pub password: Option<String>,
    pub smtp_server: Option<String>,
    pub smtp_port: Option<u16>,
}

/// Validated runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub check_interval_secs: u64,
    pub timeout_secs: u64,
    pub report_interval_minutes: u32,
    pub health_port: u16,
    pub site: SiteOptions,
    pub telegram: TelegramOptions,
    pub email: Option<EmailOptions>,
}

#[derive(Debug, Clone)]
pub struct SiteOptions {
    pub url: Url,
    pub min_content_length: usize,
    pub required_text: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TelegramOptions {
    pub bot_token: String,
    pub chat_id: String,
}

#[derive(Debug, Clone)]
pub struct EmailOptions {
    pub from: String,
    pub to: String,
    pub password: String,
    pub smtp_server: String,
    pub smtp_port: u16,
}

impl Config {
    /// Loads the configuration file (if any), overlays environment variables
    /// and `.env`, then validates the result.
    ///
    /// The file comes from `SITEWATCH_CONFIG` when set, otherwise from
    /// `<config dir>/sitewatch/config.toml`. A missing default file is fine:
    /// the whole configuration may come from the environment.
    pub fn load() -> Result<Config, Error> {
        // A missing .env file is the common case in containers.
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                return Err(e.into());
            }
        }

        let mut raw = match dotenvy::var("SITEWATCH_CONFIG") {
            Ok(path) => RawConfig::from_file(path)?,
            Err(_) => match default_config_path() {
                Some(path) if path.exists() => RawConfig::from_file(path)?,
                _ => RawConfig::default(),
            },
        };

        raw.apply_env(|key| dotenvy::var(key).ok())?;
        raw.validate()
    }

    #[must_use]
    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("sitewatch").join("config.toml"))
}

impl RawConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<RawConfig, Error> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Overrides file values with whatever `lookup` finds. Empty values count
    /// as unset.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        override_parsed(&mut self.config.check_interval_secs, "CHECK_INTERVAL", &get)?;
        override_parsed(&mut self.config.timeout_secs, "REQUEST_TIMEOUT", &get)?;
        override_parsed(
            &mut self.config.report_interval_minutes,
            "REPORT_INTERVAL_MINUTES",
            &get,
        )?;
        if get("HEALTH_PORT").is_some() {
            override_parsed(&mut self.config.health_port, "HEALTH_PORT", &get)?;
        } else {
            override_parsed(&mut self.config.health_port, "PORT", &get)?;
        }

        override_string(&mut self.site.url, "WEBSITE_URL", &get);
        override_parsed(&mut self.site.min_content_length, "MIN_CONTENT_LENGTH", &get)?;
        override_string(&mut self.site.required_text, "REQUIRED_TEXT", &get);

        override_string(&mut self.telegram.bot_token, "TELEGRAM_BOT_TOKEN", &get);
        override_string(&mut self.telegram.chat_id, "TELEGRAM_CHAT_ID", &get);

        override_string(&mut self.email.from, "EMAIL_FROM", &get);
        override_string(&mut self.email.to, "EMAIL_TO", &get);
        override_string(&mut self.email.password, "EMAIL_PASSWORD", &get);
        override_string(&mut self.email.smtp_server, "SMTP_SERVER", &get);
        override_parsed(&mut self.email.smtp_port, "SMTP_PORT", &get)?;

        Ok(())
    }

    /// Turns the raw settings into a [`Config`], reporting every missing
    /// mandatory setting at once.
    pub fn validate(self) -> Result<Config, Error> {
        let mut missing = Vec::new();
        if self.site.url.is_none() {
            missing.push("WEBSITE_URL not set");
        }
        if self.telegram.bot_token.is_none() {
            missing.push("TELEGRAM_BOT_TOKEN not set");
        }
        if self.telegram.chat_id.is_none() {
            missing.push("TELEGRAM_CHAT_ID not set");
        }
        let (Some(url), Some(bot_token), Some(chat_id)) = (
            self.site.url,
            self.telegram.bot_token,
            self.telegram.chat_id,
        ) else {
            return Err(Error::Config(missing.join(", ")));
        };

        let url = Url::parse(url.trim())?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::Config(format!(
                "WEBSITE_URL must use http or https, got {}",
                url.scheme()
            )));
        }

        let check_interval_secs = self
            .config
            .check_interval_secs
            .unwrap_or(DEFAULT_CHECK_INTERVAL_SECS);
        let timeout_secs = self.config.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
        let report_interval_minutes = self
            .config
            .report_interval_minutes
            .unwrap_or(DEFAULT_REPORT_INTERVAL_MINUTES);
        if check_interval_secs == 0 {
            return Err(Error::Config("CHECK_INTERVAL must be at least 1".into()));
        }
        if timeout_secs == 0 {
            return Err(Error::Config("REQUEST_TIMEOUT must be at least 1".into()));
        }
        if !(1..=60).contains(&report_interval_minutes) {
            return Err(Error::Config(format!(
                "REPORT_INTERVAL_MINUTES must be between 1 and 60, got {report_interval_minutes}"
            )));
        }

        let email = match (self.email.from, self.email.to, self.email.password) {
            (Some(from), Some(to), Some(password)) => Some(EmailOptions {
                from,
                to,
                password,
                smtp_server: self
                    .email
                    .smtp_server
                    .unwrap_or_else(|| DEFAULT_SMTP_SERVER.to_string()),
                smtp_port: self.email.smtp_port.unwrap_or(DEFAULT_SMTP_PORT),
            }),
            (None, None, None) => None,
            _ => {
                warn!("Email is partially configured (need EMAIL_FROM, EMAIL_TO and EMAIL_PASSWORD), email notifications disabled");
                None
            }
        };

        Ok(Config {
            check_interval_secs,
            timeout_secs,
            report_interval_minutes,
            health_port: self.config.health_port.unwrap_or(DEFAULT_HEALTH_PORT),
            site: SiteOptions {
                url,
                min_content_length: self.site.min_content_length.unwrap_or(0),
                required_text: self.site.required_text,
            },
            telegram: TelegramOptions { bot_token, chat_id },
            email,
        })
    }
}

fn override_string<G>(slot: &mut Option<String>, key: &str, get: &G)
where
    G: Fn(&str) -> Option<String>,
{
    if let Some(value) = get(key) {
        *slot = Some(value);
    }
}

fn override_parsed<T, G>(slot: &mut Option<T>, key: &str, get: &G) -> Result<(), Error>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    if let Some(value) = get(key) {
        let parsed = value
            .trim()
            .parse()
            .map_err(|_| Error::Config(format!("{key} must be a number, got {value:?}")))?;
        *slot = Some(parsed);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_load_config_from_toml() {
        let toml_content = r#"
            [config]
            check_interval_secs = 30
            timeout_secs = 5
            report_interval_minutes = 10
            health_port = 9000

            [site]
            url = "https://www.rust-lang.org"
            min_content_length = 500
            required_text = "Rust"

            [telegram]
            bot_token = "123:abc"
            chat_id = "42"

            [email]
            from = "monitor@example.com"
            to = "ops@example.com"
            password = "secret"
        "#;

        let mut temp_file = NamedTempFile::new().expect("Failed to create temp file");
        write!(temp_file, "{toml_content}").expect("Failed to write to temp file");

        let config = RawConfig::from_file(temp_file.path())
            .expect("Failed to parse config")
            .validate()
            .expect("Config should be valid");

        assert_eq!(config.check_interval_secs, 30);
        assert_eq!(config.timeout_secs, 5);
        assert_eq!(config.report_interval_minutes, 10);
        assert_eq!(config.health_port, 9000);
        assert_eq!(config.site.url.as_str(), "https://www.rust-lang.org/");
        assert_eq!(config.site.min_content_length, 500);
        assert_eq!(config.site.required_text.as_deref(), Some("Rust"));
        assert_eq!(config.telegram.chat_id, "42");
        let email = config.email.expect("Email should be enabled");
        assert_eq!(email.smtp_server, "smtp.gmail.com");
        assert_eq!(email.smtp_port, 587);
    }

    #[test]
    fn test_environment_only_uses_defaults() {
        let mut raw = RawConfig::default();
        raw.apply_env(env(&[
            ("WEBSITE_URL", "https://example.com"),
            ("TELEGRAM_BOT_TOKEN", "123:abc"),
            ("TELEGRAM_CHAT_ID", "42"),
        ]))
        .unwrap();
        let config = raw.validate().unwrap();

        assert_eq!(config.check_interval(), Duration::from_secs(60));
        assert_eq!(config.timeout(), Duration::from_secs(10));
        assert_eq!(config.report_interval_minutes, 60);
        assert_eq!(config.health_port, 8080);
        assert_eq!(config.site.min_content_length, 0);
        assert!(config.site.required_text.is_none());
        assert!(config.email.is_none());
    }

    #[test]
    fn test_environment_overrides_file() {
        let mut raw: RawConfig = toml::from_str(
            r#"
            [config]
            check_interval_secs = 30

            [site]
            url = "https://old.example.com"

            [telegram]
            bot_token = "file-token"
            chat_id = "1"
            "#,
        )
        .unwrap();
        raw.apply_env(env(&[
            ("WEBSITE_URL", "https://new.example.com"),
            ("CHECK_INTERVAL", "15"),
            ("PORT", "10000"),
            ("TELEGRAM_BOT_TOKEN", ""),
        ]))
        .unwrap();
        let config = raw.validate().unwrap();

        assert_eq!(config.site.url.host_str(), Some("new.example.com"));
        assert_eq!(config.check_interval_secs, 15);
        assert_eq!(config.health_port, 10000);
        // Empty values do not clobber the file.
        assert_eq!(config.telegram.bot_token, "file-token");
    }

    #[test]
    fn test_health_port_wins_over_port() {
        let mut raw = RawConfig::default();
        raw.apply_env(env(&[("HEALTH_PORT", "9100"), ("PORT", "10000")]))
            .unwrap();
        assert_eq!(raw.config.health_port, Some(9100));
    }

    #[test]
    fn test_missing_settings_are_reported_together() {
        let err = RawConfig::default().validate().unwrap_err();
        let message = err.to_string();
        assert!(message.contains("WEBSITE_URL not set"));
        assert!(message.contains("TELEGRAM_BOT_TOKEN not set"));
        assert!(message.contains("TELEGRAM_CHAT_ID not set"));
    }

    #[test]
    fn test_non_numeric_interval_is_rejected() {
        let mut raw = RawConfig::default();
        let err = raw
            .apply_env(env(&[("CHECK_INTERVAL", "soon")]))
            .unwrap_err();
        assert!(err.to_string().contains("CHECK_INTERVAL"));
    }

    #[test]
    fn test_zero_report_interval_is_rejected() {
        let mut raw = RawConfig::default();
        raw.apply_env(env(&[
            ("WEBSITE_URL", "https://example.com"),
            ("TELEGRAM_BOT_TOKEN", "t"),
            ("TELEGRAM_CHAT_ID", "c"),
            ("REPORT_INTERVAL_MINUTES", "0"),
        ]))
        .unwrap();
        assert!(matches!(raw.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_report_interval_above_an_hour_is_rejected() {
        let mut raw = RawConfig::default();
        raw.apply_env(env(&[
            ("WEBSITE_URL", "https://example.com"),
            ("TELEGRAM_BOT_TOKEN", "t"),
            ("TELEGRAM_CHAT_ID", "c"),
            ("REPORT_INTERVAL_MINUTES", "61"),
        ]))
        .unwrap();
        let err = raw.validate().unwrap_err();
        assert!(err.to_string().contains("between 1 and 60"));
    }

    #[test]
    fn test_non_http_url_is_rejected() {
        let mut raw = RawConfig::default();
        raw.apply_env(env(&[
            ("WEBSITE_URL", "ftp://example.com"),
            ("TELEGRAM_BOT_TOKEN", "t"),
            ("TELEGRAM_CHAT_ID", "c"),
        ]))
        .unwrap();
        assert!(matches!(raw.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_partial_email_disables_channel() {
        let mut raw = RawConfig::default();
        raw.apply_env(env(&[
            ("WEBSITE_URL", "https://example.com"),
            ("TELEGRAM_BOT_TOKEN", "t"),
            ("TELEGRAM_CHAT_ID", "c"),
            ("EMAIL_FROM", "monitor@example.com"),
        ]))
        .unwrap();
        assert!(raw.validate().unwrap().email.is_none());
    }
}
