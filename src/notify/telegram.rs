use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{Message, Transport};
use crate::config::TelegramOptions;
use crate::error::Error;

pub const API_BASE: &str = "https://api.telegram.org";

/// Telegram Bot API channel.
pub struct Telegram {
    client: Client,
    api_base: String,
    bot_token: String,
    chat_id: String,
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
}

#[derive(Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    description: Option<String>,
    result: Option<T>,
}

#[derive(Deserialize)]
struct BotUser {
    username: Option<String>,
}

impl Telegram {
    pub fn new(options: &TelegramOptions, timeout: Duration) -> Result<Self, Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_base: API_BASE.to_string(),
            bot_token: options.bot_token.clone(),
            chat_id: options.chat_id.clone(),
        })
    }

    /// Points the channel at another Bot API server.
    #[must_use]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.api_base, self.bot_token)
    }

    /// Checks the token with `getMe` and returns the bot's username.
    pub async fn bot_username(&self) -> Result<String, Error> {
        let response: ApiResponse<BotUser> = self
            .client
            .get(self.endpoint("getMe"))
            .send()
            .await?
            .json()
            .await?;

        if !response.ok {
            return Err(Error::Telegram(
                response
                    .description
                    .unwrap_or_else(|| "Unknown error".to_string()),
            ));
        }
        Ok(response
            .result
            .and_then(|user| user.username)
            .unwrap_or_else(|| "Unknown".to_string()))
    }
}

#[async_trait]
impl Transport for Telegram {
    fn name(&self) -> &'static str {
        "Telegram"
    }

    async fn deliver(&self, message: &Message) -> Result<(), Error> {
        let payload = SendMessage {
            chat_id: &self.chat_id,
            text: &message.html,
            parse_mode: "HTML",
        };

        let response = self
            .client
            .post(self.endpoint("sendMessage"))
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Telegram(format!("{status}: {body}")));
        }
        Ok(())
    }
}
