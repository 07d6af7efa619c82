//! JSON envelopes shared by the Content API, the controller and the CLI.
//!
//! Every failure on either server is rendered as [`StatusResponse`] with
//! `success: false`.

use serde::{Deserialize, Serialize};

use crate::article::Article;

/// `{success, message}` envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub success: bool,
    pub message: String,
}

impl StatusResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Bare `{success}` envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Body of `POST /api/verify-otp`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VerifyOtpRequest {
    #[serde(default)]
    pub otp: String,
}

/// Successful `POST /api/verify-otp` reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyOtpResponse {
    pub success: bool,
    pub token: String,
}

/// `GET /api/articles` reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticlesResponse {
    pub success: bool,
    pub articles: Vec<Article>,
}

/// `POST /api/articles` reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleResponse {
    pub success: bool,
    pub article: Article,
}

/// Content API `GET /health` reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiHealth {
    pub status: String,
    /// RFC 3339 time of the reply.
    pub timestamp: String,
    /// Seconds since the process started.
    pub uptime: f64,
}

/// Controller `GET /health` reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerHealth {
    pub status: String,
    pub timestamp: String,
}

/// Controller `GET /server-status` reply.
///
/// `running` comes from probing the Content API, `has_process` from the
/// controller's own handle slot; the two can disagree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerStatus {
    pub running: bool,
    pub has_process: bool,
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn server_status_uses_camel_case() {
        let json = serde_json::to_value(ServerStatus {
            running: true,
            has_process: false,
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"running": true, "hasProcess": false}));
    }

    #[test]
    fn verify_request_tolerates_missing_otp() {
        let req: VerifyOtpRequest = serde_json::from_str("{}").unwrap();
        assert!(req.otp.is_empty());
    }
}
