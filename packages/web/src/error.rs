use api::{AuthError, CoverError, StoreError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Failures that end a request with a `500`.
///
/// Credential problems never get here; the routes turn those into redirects.
/// The body is a fixed message and the detail only goes to the log.
#[derive(Error, Debug)]
pub enum WebError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Cover(#[from] CoverError),

    #[error("session error: {0}")]
    Session(#[from] tower_sessions::session::Error),
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        match &self {
            WebError::Auth(e) if !e.is_internal() => tracing::warn!("Request failed: {}", self),
            _ => tracing::error!("Request failed: {}", self),
        }

        let message = match self {
            WebError::Cover(_) => "Image fetch error",
            WebError::Store(_) => "Database error",
            WebError::Auth(_) | WebError::Session(_) => "Internal server error",
        };

        (StatusCode::INTERNAL_SERVER_ERROR, message).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[tokio::test]
    async fn test_detail_is_not_exposed() {
        let err = WebError::Auth(AuthError::HashingFailed("entropy exhausted".into()));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"Internal server error");
    }

    #[test]
    fn test_cover_failure_message() {
        let err = WebError::Cover(CoverError::InvalidIsbn("x y".into()));
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
