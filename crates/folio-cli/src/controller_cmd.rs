//! Controller subcommands: health, status, start, stop, wait.
//!
//! User-facing output uses writeln! to stdout (this is a CLI binary, not debug output).

use std::io::{self, Write};
use std::time::Duration;

use crate::client::{ContentClient, ControllerClient};
use crate::config::CliConfig;

/// Controller subcommand actions.
#[derive(clap::Subcommand, Debug)]
pub enum ControllerAction {
    /// Check that the controller is up.
    Health,
    /// Show whether the Content API answers and whether the controller holds it.
    Status,
    /// Start the Content API.
    Start,
    /// Stop the Content API.
    Stop,
    /// Wait until the Content API answers.
    Wait {
        /// Number of probes.
        #[arg(long, default_value_t = 15)]
        attempts: u32,
        /// Seconds between probes.
        #[arg(long, default_value_t = 2)]
        interval: u64,
    },
}

/// Execute a controller subcommand.
pub async fn run(action: ControllerAction, config: &CliConfig) -> anyhow::Result<()> {
    let mut out = io::stdout();
    match action {
        ControllerAction::Health => {
            let health = ControllerClient::new(&config.controller_url())?.health().await?;
            writeln!(out, "{} ({})", health.status, health.timestamp)?;
        }
        ControllerAction::Status => {
            let status = ControllerClient::new(&config.controller_url())?.status().await?;
            writeln!(out, "running:     {}", status.running)?;
            writeln!(out, "has process: {}", status.has_process)?;
        }
        ControllerAction::Start => {
            let reply = ControllerClient::new(&config.controller_url())?.start().await?;
            writeln!(out, "{}", reply.message)?;
        }
        ControllerAction::Stop => {
            let reply = ControllerClient::new(&config.controller_url())?.stop().await?;
            writeln!(out, "{}", reply.message)?;
        }
        ControllerAction::Wait { attempts, interval } => {
            let api = ContentClient::new(&config.api_url())?;
            if !wait_until_live(&api, attempts, Duration::from_secs(interval)).await {
                anyhow::bail!("Content API did not answer after {attempts} attempts");
            }
            writeln!(out, "Content API is up")?;
        }
    }
    Ok(())
}

/// Probe up to `attempts` times, `interval` apart.
pub async fn wait_until_live(api: &ContentClient, attempts: u32, interval: Duration) -> bool {
    for attempt in 1..=attempts {
        if api.is_live().await {
            return true;
        }
        tracing::debug!(attempt, "Content API not answering yet");
        if attempt < attempts {
            tokio::time::sleep(interval).await;
        }
    }
    false
}
