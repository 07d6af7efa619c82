//! HTTP error mapping.
//!
//! Every failure leaves a handler as `{success: false, message}` with the
//! status for its class: input problems 400, missing or bad session 401,
//! upstream failures 500 with a generic message (details are logged where
//! the failure happens).

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use folio_core::wire::StatusResponse;

use crate::auth::OtpError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(&'static str),

    #[error("{0}")]
    Internal(&'static str),
}

impl ApiError {
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<OtpError> for ApiError {
    fn from(err: OtpError) -> Self {
        let message = match err {
            OtpError::NotFound => "No OTP found. Please request a new one.",
            OtpError::Expired => "OTP expired. Please request a new one.",
            OtpError::Mismatch => "Invalid OTP",
        };
        Self::BadRequest(message.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(StatusResponse::failure(self.to_string()))).into_response()
    }
}
