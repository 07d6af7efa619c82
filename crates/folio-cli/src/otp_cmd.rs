//! Login subcommands: send, verify, logout.
//!
//! User-facing output uses writeln! to stdout (this is a CLI binary, not debug output).

use std::io::{self, Write};

use crate::client::ContentClient;
use crate::config::CliConfig;

/// OTP subcommand actions.
#[derive(clap::Subcommand, Debug)]
pub enum OtpAction {
    /// Email a one-time code to the site owner.
    Send,
    /// Exchange a code for a session token and store it.
    Verify {
        /// The six-digit code from the email.
        code: String,
    },
    /// Forget the stored session token.
    Logout,
}

/// Execute an OTP subcommand.
pub async fn run(action: OtpAction, config: &CliConfig) -> anyhow::Result<()> {
    let mut out = io::stdout();
    match action {
        OtpAction::Send => {
            let reply = ContentClient::new(&config.api_url())?.send_otp().await?;
            writeln!(out, "{}", reply.message)?;
        }
        OtpAction::Verify { code } => {
            let token = ContentClient::new(&config.api_url())?
                .verify_otp(code.trim())
                .await?;
            CliConfig::save_token(Some(token))?;
            writeln!(out, "Logged in; session valid for 24 hours")?;
        }
        OtpAction::Logout => {
            CliConfig::save_token(None)?;
            writeln!(out, "Logged out")?;
        }
    }
    Ok(())
}
