use std::time::Duration;

use anyhow::{Context, anyhow, bail};
use async_trait::async_trait;
use lettre::message::{MultiPart, SinglePart, header};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use serde_json::Value;
use tracing::{error, info, instrument};

use crate::metrics::track_email_delivery;
use bookshelf_config::EmailConfig;

/// Template carrying a new account's verification code.
pub const USER_WELCOME_TEMPLATE: &str = "user_welcome";

/// Outbound mail dispatcher.
#[async_trait]
pub trait Mailer: Send + Sync + std::fmt::Debug {
    /// Renders `template` with `data` and delivers it to `recipient`.
    async fn send(&self, recipient: &str, template: &str, data: &Value) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    pub subject: String,
    pub text_body: String,
    pub html_body: String,
}

/// Renders a named template.
///
/// `user_welcome` expects `code` (string) and `year` (number) in `data`.
pub fn render_template(template: &str, data: &Value) -> anyhow::Result<RenderedEmail> {
    match template {
        USER_WELCOME_TEMPLATE => {
            let code = data["code"]
                .as_str()
                .ok_or_else(|| anyhow!("template {} requires a code", template))?;
            let year = data["year"]
                .as_i64()
                .ok_or_else(|| anyhow!("template {} requires a year", template))?;
            Ok(user_welcome(code, year))
        }
        other => bail!("unknown email template: {}", other),
    }
}

fn user_welcome(code: &str, year: i64) -> RenderedEmail {
    let text_body = format!(
        "Hi,\n\n\
         Thanks for signing up for a Bookshelf account.\n\n\
         Your email verification code is: {}\n\n\
         The code expires in 5 minutes.\n\n\
         If you didn't create an account, please ignore this email.\n\n\
         Bookshelf Team, {}",
        code, year
    );

    let html_body = format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Verify your email</title>
</head>
<body style="margin: 0; padding: 0; font-family: Arial, sans-serif; background-color: #f4f4f4;">
    <table width="100%" cellpadding="0" cellspacing="0" style="background-color: #f4f4f4; padding: 20px;">
        <tr>
            <td align="center">
                <table width="600" cellpadding="0" cellspacing="0" style="background-color: #ffffff; border-radius: 8px;">
                    <tr>
                        <td style="background-color: #0F766E; padding: 30px; text-align: center;">
                            <h1 style="margin: 0; color: #ffffff; font-size: 28px;">Bookshelf</h1>
                        </td>
                    </tr>
                    <tr>
                        <td style="padding: 40px 30px;">
                            <p style="font-size: 16px; color: #333333;">Thanks for signing up for a Bookshelf account.</p>
                            <p style="font-size: 16px; color: #333333;">Your email verification code is:</p>
                            <p style="font-size: 32px; letter-spacing: 8px; font-weight: bold; text-align: center;">{}</p>
                            <p style="font-size: 14px; color: #666666;">The code expires in 5 minutes.</p>
                        </td>
                    </tr>
                    <tr>
                        <td style="background-color: #f8f8f8; padding: 20px; text-align: center; font-size: 12px; color: #999999;">
                            &copy; {} Bookshelf
                        </td>
                    </tr>
                </table>
            </td>
        </tr>
    </table>
</body>
</html>"#,
        code, year
    );

    RenderedEmail {
        subject: "Welcome to Bookshelf! Verify your email".to_string(),
        text_body,
        html_body,
    }
}

/// SMTP delivery through lettre.
///
/// With `SMTP_ENABLED` unset the message is rendered but not sent.
#[derive(Debug, Clone)]
pub struct SmtpMailer {
    config: EmailConfig,
}

impl SmtpMailer {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    fn transport(&self) -> anyhow::Result<SmtpTransport> {
        if self.config.smtp_username.is_empty() {
            return Ok(SmtpTransport::builder_dangerous(&self.config.smtp_host)
                .port(self.config.smtp_port)
                .timeout(Some(Duration::from_secs(10)))
                .build());
        }

        let creds = Credentials::new(
            self.config.smtp_username.clone(),
            self.config.smtp_password.clone(),
        );

        Ok(SmtpTransport::relay(&self.config.smtp_host)
            .context("Failed to create SMTP relay")?
            .port(self.config.smtp_port)
            .credentials(creds)
            .timeout(Some(Duration::from_secs(10)))
            .build())
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    #[instrument(skip(self, data))]
    async fn send(&self, recipient: &str, template: &str, data: &Value) -> anyhow::Result<()> {
        let rendered = render_template(template, data)?;

        if !self.config.enabled {
            info!(subject = %rendered.subject, "SMTP disabled, email not sent");
            return Ok(());
        }

        let from = format!("{} <{}>", self.config.from_name, self.config.from_email);

        let email = Message::builder()
            .from(from.parse().context("Invalid from email")?)
            .to(recipient.parse().context("Invalid to email")?)
            .subject(rendered.subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(header::ContentType::TEXT_PLAIN)
                            .body(rendered.text_body),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(header::ContentType::TEXT_HTML)
                            .body(rendered.html_body),
                    ),
            )
            .context("Failed to build email")?;

        let mailer = self.transport()?;

        tokio::task::spawn_blocking(move || mailer.send(&email))
            .await
            .context("Task join error")?
            .context("Failed to send email")?;

        Ok(())
    }
}

/// Sends an email, retrying with a fixed pause between attempts.
///
/// Returns the last delivery error once `max_attempts` are exhausted.
pub async fn send_with_retry(
    mailer: &dyn Mailer,
    recipient: &str,
    template: &str,
    data: &Value,
    max_attempts: u32,
    backoff: Duration,
) -> anyhow::Result<()> {
    let mut last_error = None;

    for attempt in 1..=max_attempts {
        match mailer.send(recipient, template, data).await {
            Ok(()) => {
                info!(recipient, template, attempt, "Email sent");
                track_email_delivery("sent");
                return Ok(());
            }
            Err(e) => {
                error!(recipient, template, attempt, error = %e, "Email delivery failed");
                last_error = Some(e);
                if attempt < max_attempts {
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }

    track_email_delivery("failed");
    Err(last_error.unwrap_or_else(|| anyhow!("no delivery attempts were made")))
}
