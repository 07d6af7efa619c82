//! Liveness probing of the Content API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::debug;

/// Answers whether the Content API is serving.
#[async_trait]
pub trait ReadinessProbe: Send + Sync {
    async fn is_live(&self) -> bool;
}

/// Probe errors.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Probes the public read endpoint over HTTP.
///
/// Any reply other than 500 counts as live; connection failures and
/// timeouts count as down.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    http: reqwest::Client,
    url: String,
}

impl HttpProbe {
    /// Per-request bound so a wedged server reads as down.
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(2);

    /// Probe `http://127.0.0.1:<port>/api/articles`.
    pub fn for_port(port: u16) -> Result<Self, ProbeError> {
        Self::new(format!("http://127.0.0.1:{port}/api/articles"))
    }

    pub fn new(url: impl Into<String>) -> Result<Self, ProbeError> {
        // reqwest uses rustls-no-provider; Err only means one is installed already.
        let _ = rustls::crypto::ring::default_provider().install_default();

        let http = reqwest::Client::builder()
            .timeout(Self::REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Whether a reply status means the server is up.
pub fn status_is_live(status: StatusCode) -> bool {
    status != StatusCode::INTERNAL_SERVER_ERROR
}

#[async_trait]
impl ReadinessProbe for HttpProbe {
    async fn is_live(&self) -> bool {
        match self.http.get(&self.url).send().await {
            Ok(resp) => status_is_live(resp.status()),
            Err(e) => {
                debug!(url = %self.url, error = %e, "Probe failed");
                false
            }
        }
    }
}
