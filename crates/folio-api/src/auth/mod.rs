//! Authentication module for the Content API.
//!
//! Provides the OTP/session store, mail delivery of codes and the service
//! tying the two to the configured recipient.

pub mod mailer;
pub mod service;
pub mod store;

pub use mailer::{MailError, Mailer, SmtpMailer};
pub use service::{AuthService, SendCodeError};
pub use store::{IssuedOtp, OtpError, OtpStore, SecureRng};
