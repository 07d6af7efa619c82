//! HTTP clients for the controller and the Content API.

use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;

use folio_core::wire::{
    ArticleResponse, ArticlesResponse, ControllerHealth, ServerStatus, StatusResponse,
    SuccessResponse, VerifyOtpRequest, VerifyOtpResponse,
};
use folio_core::{Article, ArticleDraft};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server error ({status}): {message}")]
    Api { status: u16, message: String },
}

fn http_client() -> Result<reqwest::Client, ClientError> {
    // reqwest uses rustls-no-provider; Err only means one is installed already.
    let _ = rustls::crypto::ring::default_provider().install_default();
    Ok(reqwest::Client::builder().build()?)
}

/// Decode a success body, or turn a failure envelope into [`ClientError::Api`].
async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, ClientError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp.json().await?);
    }
    let message = match resp.json::<StatusResponse>().await {
        Ok(body) => body.message,
        Err(_) => status.canonical_reason().unwrap_or("Unknown").to_string(),
    };
    Err(ClientError::Api {
        status: status.as_u16(),
        message,
    })
}

/// Client for the lifecycle controller.
#[derive(Debug, Clone)]
pub struct ControllerClient {
    http: reqwest::Client,
    base_url: String,
}

impl ControllerClient {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        Ok(Self {
            http: http_client()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn health(&self) -> Result<ControllerHealth, ClientError> {
        decode(self.http.get(self.url("/health")).send().await?).await
    }

    pub async fn status(&self) -> Result<ServerStatus, ClientError> {
        decode(self.http.get(self.url("/server-status")).send().await?).await
    }

    pub async fn start(&self) -> Result<StatusResponse, ClientError> {
        decode(self.http.post(self.url("/start-server")).send().await?).await
    }

    pub async fn stop(&self) -> Result<StatusResponse, ClientError> {
        decode(self.http.post(self.url("/stop-server")).send().await?).await
    }
}

/// Client for the Content API.
#[derive(Debug, Clone)]
pub struct ContentClient {
    http: reqwest::Client,
    base_url: String,
}

impl ContentClient {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        Ok(Self {
            http: http_client()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Whether the read endpoint answers with anything but 500.
    pub async fn is_live(&self) -> bool {
        self.http
            .get(self.url("/api/articles"))
            .send()
            .await
            .is_ok_and(|resp| resp.status() != StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub async fn send_otp(&self) -> Result<StatusResponse, ClientError> {
        decode(self.http.post(self.url("/api/send-otp")).send().await?).await
    }

    /// Exchange a code for a session token.
    pub async fn verify_otp(&self, code: &str) -> Result<String, ClientError> {
        let body = VerifyOtpRequest {
            otp: code.to_string(),
        };
        let resp: VerifyOtpResponse = decode(
            self.http
                .post(self.url("/api/verify-otp"))
                .json(&body)
                .send()
                .await?,
        )
        .await?;
        Ok(resp.token)
    }

    pub async fn list_articles(&self) -> Result<Vec<Article>, ClientError> {
        let resp: ArticlesResponse =
            decode(self.http.get(self.url("/api/articles")).send().await?).await?;
        Ok(resp.articles)
    }

    pub async fn save_article(
        &self,
        token: &str,
        draft: &ArticleDraft,
    ) -> Result<Article, ClientError> {
        let resp: ArticleResponse = decode(
            self.http
                .post(self.url("/api/articles"))
                .bearer_auth(token)
                .json(draft)
                .send()
                .await?,
        )
        .await?;
        Ok(resp.article)
    }

    pub async fn delete_article(&self, token: &str, id: i64) -> Result<(), ClientError> {
        let _: SuccessResponse = decode(
            self.http
                .delete(self.url(&format!("/api/articles/{id}")))
                .bearer_auth(token)
                .send()
                .await?,
        )
        .await?;
        Ok(())
    }
}
