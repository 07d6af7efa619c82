//! Configuration defaults and validation.
//!
//! Values come from CLI flags with environment fallbacks (see each binary's
//! `Args`); this module holds the shared defaults and checks the mail block
//! before the Content API starts serving.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Port the Content API listens on.
pub const DEFAULT_API_PORT: u16 = 3001;

/// Port the lifecycle controller listens on.
pub const DEFAULT_CONTROLLER_PORT: u16 = 3000;

/// Backing document for articles, relative to the Content API working directory.
pub const DEFAULT_ARTICLES_PATH: &str = "src/data/articles.json";

/// Implicit-TLS SMTP submission port.
pub const DEFAULT_SMTP_PORT: u16 = 465;

/// Lifetimes of one-time codes and the sessions they unlock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtpConfig {
    pub otp_ttl_secs: u64,
    pub session_ttl_secs: u64,
}

impl Default for OtpConfig {
    fn default() -> Self {
        Self {
            otp_ttl_secs: 10 * 60,
            session_ttl_secs: 24 * 60 * 60,
        }
    }
}

impl OtpConfig {
    pub const fn otp_ttl(&self) -> Duration {
        Duration::from_secs(self.otp_ttl_secs)
    }

    pub const fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }
}

/// Outbound mail transport settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub from: String,
}

impl SmtpConfig {
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(Error::Config("SMTP host is not set".into()));
        }
        if self.port == 0 {
            return Err(Error::Config("SMTP port must be non-zero".into()));
        }
        if !looks_like_address(&self.from) {
            return Err(Error::Config(format!(
                "SMTP from-address is invalid: {:?}",
                self.from
            )));
        }
        Ok(())
    }
}

/// Validate the fixed OTP recipient address.
pub fn validate_recipient(recipient: &str) -> Result<()> {
    if looks_like_address(recipient) {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "OTP recipient is invalid: {recipient:?}"
        )))
    }
}

/// Cheap shape check; the mail transport does the real parsing.
fn looks_like_address(value: &str) -> bool {
    let value = value.trim();
    // Accept "Name <user@host>" as well as a bare address.
    let addr = value
        .rsplit_once('<')
        .and_then(|(_, rest)| rest.strip_suffix('>'))
        .unwrap_or(value);
    matches!(addr.split_once('@'), Some((user, host)) if !user.is_empty() && host.contains('.'))
}
