use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use tracing::{error, warn};

use folio_core::ArticleDraft;
use folio_core::clock::rfc3339_now;
use folio_core::wire::{
    ApiHealth, ArticleResponse, ArticlesResponse, StatusResponse, SuccessResponse,
    VerifyOtpRequest, VerifyOtpResponse,
};

use super::AppState;
use super::bearer::Authenticated;
use super::error::ApiError;
use crate::articles::RepositoryError;

/// `POST /api/send-otp`
pub async fn send_otp(State(state): State<AppState>) -> Result<Json<StatusResponse>, ApiError> {
    state.auth.send_code().await.map_err(|e| {
        error!(error = %e, "Error sending OTP");
        ApiError::Internal("Failed to send OTP")
    })?;
    Ok(Json(StatusResponse::ok("OTP sent successfully")))
}

/// `POST /api/verify-otp`
pub async fn verify_otp(
    State(state): State<AppState>,
    payload: Result<Json<VerifyOtpRequest>, JsonRejection>,
) -> Result<Json<VerifyOtpResponse>, ApiError> {
    let Json(req) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let otp = req.otp.trim();
    if otp.is_empty() {
        return Err(ApiError::BadRequest("OTP is required".into()));
    }

    let token = state.auth.verify_code(otp).await?;
    Ok(Json(VerifyOtpResponse {
        success: true,
        token,
    }))
}

/// `GET /api/articles`
pub async fn list_articles(
    State(state): State<AppState>,
) -> Result<Json<ArticlesResponse>, ApiError> {
    let articles = state.articles.list().await.map_err(|e| {
        error!(error = %e, "Error fetching articles");
        ApiError::Internal("Failed to fetch articles")
    })?;
    Ok(Json(ArticlesResponse {
        success: true,
        articles,
    }))
}

/// `POST /api/articles` (authenticated)
pub async fn save_article(
    _auth: Authenticated,
    State(state): State<AppState>,
    payload: Result<Json<ArticleDraft>, JsonRejection>,
) -> Result<Json<ArticleResponse>, ApiError> {
    let Json(draft) = payload.map_err(|e| {
        warn!(error = %e, "Rejected malformed article payload");
        ApiError::BadRequest(e.body_text())
    })?;

    let article = state.articles.upsert(draft).await.map_err(|e| match e {
        RepositoryError::Invalid(msg) => ApiError::BadRequest(msg),
        other => {
            error!(error = %other, "Error saving article");
            ApiError::Internal("Failed to save article")
        }
    })?;
    Ok(Json(ArticleResponse {
        success: true,
        article,
    }))
}

/// `DELETE /api/articles/{id}` (authenticated)
pub async fn delete_article(
    _auth: Authenticated,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let id: i64 = id
        .trim()
        .parse()
        .map_err(|_| ApiError::BadRequest("Invalid article id".into()))?;

    state.articles.remove(id).await.map_err(|e| {
        error!(error = %e, id, "Error deleting article");
        ApiError::Internal("Failed to delete article")
    })?;
    Ok(Json(SuccessResponse { success: true }))
}

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> Json<ApiHealth> {
    Json(ApiHealth {
        status: "OTP Server running".to_string(),
        timestamp: rfc3339_now(),
        uptime: state.started_at.elapsed().as_secs_f64(),
    })
}
