//! # API Error Types
//!
//! [`AppError`] implements `IntoResponse` and renders the failure envelope:
//!
//! ```json
//! {"success": false, "error": "Verification Failed", "message": "...", "timestamp": 1700000000000}
//! ```
//!
//! Server-side failures carry a generic public message. The underlying
//! detail travels in a [`ErrorDetail`] response extension; the envelope
//! middleware swaps it in outside production.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use trustcred_verify::VerifyError;
use utoipa::ToSchema;

/// Failure envelope body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    /// Always `false`.
    pub success: bool,
    /// Short error title, e.g. "Validation Error".
    pub error: String,
    pub message: String,
    /// Unix milliseconds.
    pub timestamp: i64,
}

/// Internal error detail attached to 5xx responses as an extension.
#[derive(Debug, Clone)]
pub struct ErrorDetail(pub String);

/// Application-level error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// Malformed identifier, body, query or options (400).
    #[error("{0}")]
    Validation(String),

    /// Credential does not exist (404).
    #[error("credential not found: {0}")]
    NotFound(String),

    /// Server-side failure (500). `public` is shown in production.
    #[error("{detail}")]
    Internal {
        title: &'static str,
        public: &'static str,
        detail: String,
    },

    /// A dependency is down (503).
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl AppError {
    pub fn internal(detail: impl Into<String>) -> Self {
        Self::Internal {
            title: "Request Failed",
            public: "An internal error occurred",
            detail: detail.into(),
        }
    }

    /// Give a server-side failure an operation-specific title and public
    /// message. Client errors are returned unchanged.
    pub fn context(self, title: &'static str, public: &'static str) -> Self {
        match self {
            Self::Internal { detail, .. } => Self::Internal {
                title,
                public,
                detail,
            },
            other => other,
        }
    }

    fn status_and_title(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Validation(_) => (StatusCode::BAD_REQUEST, "Validation Error"),
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "Credential Not Found"),
            Self::Internal { title, .. } => (StatusCode::INTERNAL_SERVER_ERROR, *title),
            Self::ServiceUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "Service Unavailable"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, title) = self.status_and_title();

        let (message, detail) = match &self {
            Self::Validation(msg) => (msg.clone(), None),
            Self::NotFound(_) => ("The specified credential does not exist".to_string(), None),
            Self::Internal { public, detail, .. } => {
                tracing::error!(error = %detail, title, "request failed");
                (public.to_string(), Some(detail.clone()))
            }
            Self::ServiceUnavailable(msg) => {
                tracing::warn!(error = %msg, "service unavailable");
                ("Service temporarily unavailable".to_string(), Some(msg.clone()))
            }
        };

        let body = ErrorBody {
            success: false,
            error: title.to_string(),
            message,
            timestamp: Utc::now().timestamp_millis(),
        };

        let mut response = (status, Json(body)).into_response();
        if let Some(detail) = detail {
            response.extensions_mut().insert(ErrorDetail(detail));
        }
        response
    }
}

impl From<VerifyError> for AppError {
    fn from(err: VerifyError) -> Self {
        match err {
            VerifyError::InvalidArgument(msg) => Self::Validation(msg),
            VerifyError::NotFound(id) => Self::NotFound(id),
            VerifyError::LedgerUnavailable(_) | VerifyError::Internal(_) => {
                Self::internal(err.to_string())
            }
        }
    }
}

impl From<trustcred_core::ValidationError> for AppError {
    fn from(err: trustcred_core::ValidationError) -> Self {
        Self::Validation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn validation_is_400() {
        let (status, title) = AppError::Validation("bad id".into()).status_and_title();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(title, "Validation Error");
    }

    #[test]
    fn not_found_is_404() {
        let (status, _) = AppError::NotFound("abc".into()).status_and_title();
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn context_only_retitles_server_errors() {
        let err = AppError::internal("boom").context("Search Failed", "Unable to search");
        assert_eq!(err.status_and_title().1, "Search Failed");

        let err = AppError::Validation("x".into()).context("Search Failed", "Unable to search");
        assert_eq!(err.status_and_title().1, "Validation Error");
    }

    #[test]
    fn verify_errors_map_to_status() {
        let cases = [
            (VerifyError::InvalidArgument("x".into()), StatusCode::BAD_REQUEST),
            (VerifyError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (VerifyError::Internal("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, expected) in cases {
            assert_eq!(AppError::from(err).status_and_title().0, expected);
        }
    }

    #[tokio::test]
    async fn internal_detail_is_hidden_from_body() {
        let response = AppError::internal("connection refused to 10.0.0.5").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.extensions().get::<ErrorDetail>().is_some());

        let json = body_json(response).await;
        assert_eq!(json["success"], false);
        assert_eq!(json["message"], "An internal error occurred");
        assert!(!json.to_string().contains("10.0.0.5"));
    }
}
