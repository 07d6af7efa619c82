//! folio Content API
//!
//! Emails one-time codes to the site owner, exchanges them for session
//! tokens and serves the article store over HTTP/JSON.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::info;

use folio_api::articles::JsonFileRepository;
use folio_api::auth::{AuthService, OtpStore, SmtpMailer};
use folio_api::server::{AppState, build_router};
use folio_core::config::{
    self, DEFAULT_API_PORT, DEFAULT_ARTICLES_PATH, DEFAULT_SMTP_PORT, OtpConfig, SmtpConfig,
};
use folio_core::shutdown::shutdown_signal;
use folio_core::tracing_init::{crate_filter, init_tracing};
use folio_core::{Clock, SystemClock};

#[derive(Parser, Debug)]
#[command(name = "folio-api")]
#[command(version, about = "folio Content API - OTP login and article store")]
struct Args {
    /// Port to listen on
    #[arg(long, default_value_t = DEFAULT_API_PORT, env = "PORT")]
    port: u16,

    /// Interface to bind
    #[arg(long, default_value = "0.0.0.0", env = "FOLIO_BIND_HOST")]
    host: IpAddr,

    /// Article document path
    #[arg(long, default_value = DEFAULT_ARTICLES_PATH, env = "ARTICLES_PATH")]
    articles_path: PathBuf,

    /// SMTP relay host
    #[arg(long, env = "SMTP_HOST")]
    smtp_host: String,

    /// SMTP port (implicit TLS)
    #[arg(long, default_value_t = DEFAULT_SMTP_PORT, env = "SMTP_PORT")]
    smtp_port: u16,

    /// SMTP username
    #[arg(long, env = "SMTP_USER")]
    smtp_user: String,

    /// SMTP password
    #[arg(long, env = "SMTP_PASS", hide_env_values = true)]
    smtp_pass: String,

    /// Sender address, defaults to the SMTP username
    #[arg(long, env = "SMTP_FROM")]
    smtp_from: Option<String>,

    /// Address that receives login codes
    #[arg(long, env = "OTP_RECIPIENT")]
    otp_recipient: String,

    /// Code lifetime in seconds
    #[arg(long, default_value_t = OtpConfig::default().otp_ttl_secs, env = "FOLIO_OTP_TTL")]
    otp_ttl_secs: u64,

    /// Session lifetime in seconds
    #[arg(long, default_value_t = OtpConfig::default().session_ttl_secs, env = "FOLIO_SESSION_TTL")]
    session_ttl_secs: u64,

    /// Log level
    #[arg(long, default_value = "info", env = "FOLIO_LOG_LEVEL")]
    log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, env = "FOLIO_LOG_JSON")]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(&crate_filter("folio_api", &args.log_level), args.log_json);

    let smtp = SmtpConfig {
        host: args.smtp_host,
        port: args.smtp_port,
        from: args.smtp_from.unwrap_or_else(|| args.smtp_user.clone()),
        username: args.smtp_user,
        password: args.smtp_pass,
    };
    smtp.validate()?;
    config::validate_recipient(&args.otp_recipient)?;

    let otp_config = OtpConfig {
        otp_ttl_secs: args.otp_ttl_secs,
        session_ttl_secs: args.session_ttl_secs,
    };
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let mailer = Arc::new(SmtpMailer::new(&smtp)?);
    let store = Arc::new(OtpStore::new(Arc::clone(&clock), otp_config));
    let auth = Arc::new(AuthService::new(store, mailer, args.otp_recipient));
    let articles = Arc::new(JsonFileRepository::new(&args.articles_path, clock));

    info!(
        articles = %args.articles_path.display(),
        smtp_host = %smtp.host,
        smtp_port = smtp.port,
        "Content API configured"
    );

    let app = build_router(AppState::new(auth, articles));
    let addr = SocketAddr::new(args.host, args.port);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Server running on http://localhost:{}", args.port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Content API stopped");
    Ok(())
}
