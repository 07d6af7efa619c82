//! Bearer-token gate for write routes.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use tracing::warn;

use super::AppState;
use super::error::ApiError;

/// Proof that the request carried a live session token.
///
/// Taking this extractor in a handler gates the route: missing tokens and
/// unknown or expired sessions are rejected with 401 before the handler runs.
#[derive(Debug, Clone, Copy)]
pub struct Authenticated;

/// Pull the token out of an `Authorization: Bearer <token>` header.
pub fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

impl FromRequestParts<AppState> for Authenticated {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(ApiError::Unauthorized("No token provided"))?;

        if state.auth.authorize(token).await {
            Ok(Self)
        } else {
            warn!(path = %parts.uri.path(), "Rejected write with invalid or expired session");
            Err(ApiError::Unauthorized("Invalid or expired session"))
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use axum::http::Request;

    use super::*;

    fn parts(header: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/api/articles");
        if let Some(value) = header {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn extracts_bearer_token() {
        assert_eq!(bearer_token(&parts(Some("Bearer abc123"))), Some("abc123"));
    }

    #[test]
    fn rejects_other_schemes_and_blanks() {
        assert_eq!(bearer_token(&parts(None)), None);
        assert_eq!(bearer_token(&parts(Some("Basic abc"))), None);
        assert_eq!(bearer_token(&parts(Some("Bearer "))), None);
    }
}
