use anyhow::{Context, Result};
use async_trait::async_trait;
use lettre::message::{header::ContentType, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::info;

use super::traits::{EmailRecipient, Mailer};
use crate::config::MailConfig;

/// Mailer delivering through an SMTP relay with STARTTLS
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    pub fn new(config: &MailConfig) -> Result<Self> {
        info!(
            "📧 Initializing email service for SMTP server: {}:{}",
            config.smtp_server, config.smtp_port
        );

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_server)
            .context("Failed to create SMTP relay")?
            .port(config.smtp_port);

        if !config.username.is_empty() {
            builder = builder.credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ));
        }

        Ok(Self {
            transport: builder.build(),
        })
    }
}

fn mailbox(recipient: &EmailRecipient) -> Result<Mailbox> {
    let address = recipient
        .address
        .parse::<Address>()
        .with_context(|| format!("Invalid email address: {}", recipient.address))?;
    Ok(Mailbox::new(Some(recipient.display_name.clone()), address))
}

/// Build the multi-recipient HTML message
pub fn build_message(
    subject: &str,
    html_body: &str,
    recipients: &[EmailRecipient],
    from: &EmailRecipient,
) -> Result<Message> {
    if recipients.is_empty() {
        return Err(anyhow::anyhow!("At least one recipient is required"));
    }

    let mut builder = Message::builder().from(mailbox(from)?).subject(subject);
    for recipient in recipients {
        builder = builder.to(mailbox(recipient)?);
    }

    builder
        .header(ContentType::TEXT_HTML)
        .body(html_body.to_string())
        .context("Failed to build email")
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(
        &self,
        subject: &str,
        html_body: &str,
        recipients: &[EmailRecipient],
        from: &EmailRecipient,
    ) -> Result<()> {
        let email = build_message(subject, html_body, recipients, from)?;
        self.transport.send(email).await.context("Failed to send email")?;
        info!("📧 Email '{}' sent to {} recipients", subject, recipients.len());
        Ok(())
    }
}
