//! folio CLI
//!
//! Starts and stops the Content API through the controller, logs in with an
//! emailed code and manages articles.

use std::io;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use folio_cli::articles_cmd::{self, ArticlesAction};
use folio_cli::config::CliConfig;
use folio_cli::controller_cmd::{self, ControllerAction};
use folio_cli::otp_cmd::{self, OtpAction};

#[derive(Parser, Debug)]
#[command(name = "folio")]
#[command(version, about = "folio publications backend CLI", long_about = None)]
struct Cli {
    /// Content API base URL
    #[arg(long, global = true, env = "FOLIO_API_URL")]
    api_url: Option<String>,

    /// Controller base URL
    #[arg(long, global = true, env = "FOLIO_CONTROLLER_URL")]
    controller_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Manage the Content API process.
    Controller {
        #[command(subcommand)]
        action: ControllerAction,
    },
    /// Log in with an emailed one-time code.
    Otp {
        #[command(subcommand)]
        action: OtpAction,
    },
    /// List and edit articles.
    Articles {
        #[command(subcommand)]
        action: ArticlesAction,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "folio_cli=warn".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let config = CliConfig::load().with_overrides(cli.api_url, cli.controller_url);

    match cli.command {
        Command::Controller { action } => controller_cmd::run(action, &config).await,
        Command::Otp { action } => otp_cmd::run(action, &config).await,
        Command::Articles { action } => articles_cmd::run(action, &config).await,
    }
}
