//! Delivery of one-time codes by email.

use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::info;

use folio_core::config::SmtpConfig;

/// Subject line of the code email.
pub const OTP_SUBJECT: &str = "Your OTP for Article Management";

/// Errors from building or sending a code email.
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("Invalid mail address {address:?}: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("Failed to build message: {0}")]
    Build(String),

    #[error("Mail transport failed: {0}")]
    Transport(String),
}

/// Sends one-time codes to a recipient.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_otp(&self, to: &str, code: &str) -> Result<(), MailError>;
}

/// [`Mailer`] speaking SMTP over implicit TLS.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self, MailError> {
        let from = parse_mailbox(&config.from)?;
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
            .map_err(|e| MailError::Transport(e.to_string()))?
            .port(config.port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .build();
        info!(host = %config.host, port = config.port, "SMTP transport configured");
        Ok(Self { transport, from })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_otp(&self, to: &str, code: &str) -> Result<(), MailError> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(parse_mailbox(to)?)
            .subject(OTP_SUBJECT)
            .header(ContentType::TEXT_HTML)
            .body(otp_email_html(code))
            .map_err(|e| MailError::Build(e.to_string()))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;
        Ok(())
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, MailError> {
    address
        .parse()
        .map_err(|e: lettre::address::AddressError| MailError::InvalidAddress {
            address: address.to_string(),
            reason: e.to_string(),
        })
}

/// HTML body of the code email.
pub fn otp_email_html(code: &str) -> String {
    format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
  <h2 style="color: #333;">Article Management OTP</h2>
  <p>Your one-time password is:</p>
  <h1 style="color: #4CAF50; font-size: 36px; letter-spacing: 5px;">{code}</h1>
  <p style="color: #666;">This code will expire in 10 minutes.</p>
  <p style="color: #999; font-size: 12px;">If you didn't request this code, please ignore this email.</p>
</div>"#
    )
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn body_contains_code_and_expiry() {
        let html = otp_email_html("482193");
        assert!(html.contains("482193"));
        assert!(html.contains("10 minutes"));
    }

    #[test]
    fn named_mailbox_parses() {
        let mailbox = parse_mailbox("Folio <noreply@example.com>").unwrap();
        assert_eq!(mailbox.email.to_string(), "noreply@example.com");
    }

    #[test]
    fn bad_address_is_reported() {
        let err = parse_mailbox("not-an-address").unwrap_err();
        assert!(matches!(err, MailError::InvalidAddress { .. }));
    }
}
