//! OTP gate bound to the configured recipient.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use super::mailer::{MailError, Mailer};
use super::store::{OtpError, OtpStore};

/// Failure to deliver a code.
#[derive(Debug, thiserror::Error)]
pub enum SendCodeError {
    #[error(transparent)]
    Mail(#[from] MailError),
}

/// Issues codes to the single configured recipient and exchanges them for
/// session tokens.
pub struct AuthService {
    store: Arc<OtpStore>,
    mailer: Arc<dyn Mailer>,
    recipient: String,
}

impl AuthService {
    pub fn new(store: Arc<OtpStore>, mailer: Arc<dyn Mailer>, recipient: String) -> Self {
        Self {
            store,
            mailer,
            recipient,
        }
    }

    /// Issue a fresh code and email it. No retry on transport failure; the
    /// stored code stays valid until it expires or is replaced.
    #[instrument(skip(self))]
    pub async fn send_code(&self) -> Result<(), SendCodeError> {
        let issued = self.store.issue(&self.recipient).await;
        self.mailer.send_otp(&self.recipient, &issued.code).await?;
        info!(recipient = %self.recipient, expires_at = issued.expires_at, "OTP sent");
        Ok(())
    }

    /// Exchange a supplied code for a session token.
    #[instrument(skip(self, code))]
    pub async fn verify_code(&self, code: &str) -> Result<String, OtpError> {
        match self.store.redeem(&self.recipient, code).await {
            Ok(token) => {
                info!(recipient = %self.recipient, "OTP verified, session issued");
                Ok(token)
            }
            Err(e) => {
                warn!(recipient = %self.recipient, error = %e, "OTP verification failed");
                Err(e)
            }
        }
    }

    /// Whether `token` authorizes writes.
    pub async fn authorize(&self, token: &str) -> bool {
        self.store.verify(token).await
    }
}
