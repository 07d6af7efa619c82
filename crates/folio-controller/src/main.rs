//! folio lifecycle controller
//!
//! Small HTTP service that starts and stops the Content API on demand.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use folio_controller::probe::HttpProbe;
use folio_controller::reaper::SystemReaper;
use folio_controller::server::{AppState, build_router};
use folio_controller::supervisor::{ChildCommand, ProcessSupervisor, SupervisorConfig};
use folio_core::config::DEFAULT_API_PORT;
use folio_core::shutdown::shutdown_signal;
use folio_core::tracing_init::{crate_filter, init_tracing};

#[derive(Parser, Debug)]
#[command(name = "folio-controller")]
#[command(version, about = "folio controller - starts and stops the Content API")]
struct Args {
    /// Controller listen address
    #[arg(long, default_value = "127.0.0.1:3000", env = "FOLIO_CONTROLLER_ADDR")]
    addr: SocketAddr,

    /// Port the Content API listens on
    #[arg(long, default_value_t = DEFAULT_API_PORT, env = "FOLIO_API_PORT")]
    api_port: u16,

    /// Working directory for the Content API
    #[arg(long, env = "FOLIO_API_DIR")]
    api_dir: Option<PathBuf>,

    /// Content API binary, defaults to `folio-api` next to this executable
    #[arg(long, env = "FOLIO_API_BIN")]
    api_bin: Option<PathBuf>,

    /// Seconds to wait for the Content API to answer after spawning
    #[arg(long, default_value_t = 30, env = "FOLIO_STARTUP_TIMEOUT")]
    startup_timeout_secs: u64,

    /// Seconds between SIGTERM and a forced kill
    #[arg(long, default_value_t = 3, env = "FOLIO_STOP_GRACE")]
    stop_grace_secs: u64,

    /// Log level
    #[arg(long, default_value = "info", env = "FOLIO_LOG_LEVEL")]
    log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, env = "FOLIO_LOG_JSON")]
    log_json: bool,
}

/// `folio-api` in the directory of the running executable.
fn sibling_api_binary() -> anyhow::Result<PathBuf> {
    let exe = std::env::current_exe().context("Cannot locate controller executable")?;
    Ok(exe.with_file_name(format!("folio-api{}", std::env::consts::EXE_SUFFIX)))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(
        &crate_filter("folio_controller", &args.log_level),
        args.log_json,
    );

    let program = match args.api_bin {
        Some(path) => path,
        None => sibling_api_binary()?,
    };
    let mut command = ChildCommand::new(program)
        .arg("--port")
        .arg(args.api_port.to_string());
    if let Some(dir) = args.api_dir {
        command = command.current_dir(dir);
    }

    let config = SupervisorConfig {
        startup_timeout: Duration::from_secs(args.startup_timeout_secs),
        stop_grace: Duration::from_secs(args.stop_grace_secs),
        ..SupervisorConfig::new(command, args.api_port)
    };
    info!(
        program = %config.command.program.display(),
        api_port = config.port,
        startup_timeout = ?config.startup_timeout,
        stop_grace = ?config.stop_grace,
        "Supervisor configured"
    );

    let probe = Arc::new(HttpProbe::for_port(args.api_port)?);
    let supervisor = Arc::new(ProcessSupervisor::new(
        config,
        probe,
        Arc::new(SystemReaper),
    ));

    let app = build_router(AppState::new(Arc::clone(&supervisor)));
    let listener = tokio::net::TcpListener::bind(args.addr)
        .await
        .with_context(|| format!("Failed to bind {}", args.addr))?;

    // Notify systemd that the controller is ready to serve (unix only).
    #[cfg(unix)]
    sd_notify::notify(true, &[sd_notify::NotifyState::Ready])?;

    info!(addr = %args.addr, "Controller listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if supervisor.has_process().await {
        info!("Stopping Content API before exit");
        supervisor.stop().await;
    }
    info!("Controller stopped");
    Ok(())
}
