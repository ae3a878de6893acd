use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Tokio1Executor,
    message::{Mailbox, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use std::time::Duration;

use super::{Message, Transport};
use crate::config::EmailOptions;
use crate::error::Error;

/// SMTP channel using STARTTLS and the sender's credentials.
pub struct Email {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

impl Email {
    pub fn new(options: &EmailOptions, timeout: Duration) -> Result<Self, Error> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&options.smtp_server)?
            .port(options.smtp_port)
            .credentials(Credentials::new(
                options.from.clone(),
                options.password.clone(),
            ))
            .timeout(Some(timeout))
            .build();

        Ok(Self {
            transport,
            from: options.from.parse()?,
            to: options.to.parse()?,
        })
    }

    fn compose(&self, message: &Message) -> Result<lettre::Message, Error> {
        Ok(lettre::Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(message.subject.clone())
            .header(ContentType::TEXT_PLAIN)
            .body(message.text.clone())?)
    }
}

#[async_trait]
impl Transport for Email {
    fn name(&self) -> &'static str {
        "Email"
    }

    async fn deliver(&self, message: &Message) -> Result<(), Error> {
        let email = self.compose(message)?;
        self.transport.send(email).await?;
        Ok(())
    }
}
