//! # Public Credential Routes
//!
//! Shareable projections and QR rendering for a single credential. Both
//! routes sit in the verification rate tier.

use axum::body::Bytes;
use axum::extract::rejection::PathRejection;
use axum::extract::{Path, State};
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use trustcred_core::{CredentialId, PublicCredentialInfo};
use trustcred_verify::QrOptions;
use utoipa::ToSchema;

use crate::error::AppError;
use crate::extractors::credential_id_path;
use crate::middleware::rate_limit::{rate_limit_middleware, RateLimitTier};
use crate::routes::Envelope;
use crate::state::AppState;

const QR_FORMAT: &str = "data:image/png;base64";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/credentials/:credential_id/public", get(public_info))
        .route("/credentials/:credential_id/qr", post(generate_qr))
        .route_layer(from_fn_with_state(
            RateLimitTier::Verification,
            rate_limit_middleware,
        ))
}

/// Optional body of a QR generation request.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct QrGenerateRequest {
    /// `width` (100..=1000, default 300), `margin` (0..=10, default 2) and
    /// `errorCorrectionLevel` (`L`, `M`, `Q`, `H`; default `M`).
    #[schema(value_type = Option<Object>)]
    #[serde(default)]
    pub options: Option<QrOptions>,
}

impl QrGenerateRequest {
    /// An empty body means all defaults.
    fn from_body(body: &[u8]) -> Result<Self, AppError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_json::from_slice(body)
            .map_err(|e| AppError::Validation(format!("invalid QR generation request: {e}")))
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QrCodeResponse {
    #[schema(value_type = String)]
    pub credential_id: CredentialId,
    /// `data:image/png;base64,...`
    pub qr_code_data_url: String,
    #[schema(value_type = String)]
    pub format: &'static str,
}

/// GET /api/v1/credentials/:credentialId/public: Shareable credential
/// summary.
#[utoipa::path(
    get,
    path = "/api/v1/credentials/{credentialId}/public",
    params(("credentialId" = String, Path, description = "64-character hex credential ID")),
    responses(
        (status = 200, description = "Public credential information", body = crate::routes::SuccessBody),
        (status = 400, description = "Malformed credential ID", body = crate::error::ErrorBody),
        (status = 404, description = "Credential does not exist", body = crate::error::ErrorBody),
        (status = 429, description = "Rate limit exceeded"),
    ),
    tag = "credentials"
)]
pub(crate) async fn public_info(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> Result<Json<Envelope<PublicCredentialInfo>>, AppError> {
    let id = credential_id_path(path)?;

    let info = state
        .service
        .public_info(id.as_str())
        .await
        .map_err(|e| {
            AppError::from(e).context(
                "Request Failed",
                "Unable to retrieve credential information",
            )
        })?;
    Ok(Envelope::ok(info))
}

/// POST /api/v1/credentials/:credentialId/qr: Render a verification QR
/// code as a PNG data URL.
#[utoipa::path(
    post,
    path = "/api/v1/credentials/{credentialId}/qr",
    params(("credentialId" = String, Path, description = "64-character hex credential ID")),
    request_body(content = QrGenerateRequest, description = "Optional rendering options"),
    responses(
        (status = 200, description = "QR code data URL", body = crate::routes::SuccessBody),
        (status = 400, description = "Malformed credential ID or options", body = crate::error::ErrorBody),
        (status = 429, description = "Rate limit exceeded"),
    ),
    tag = "credentials"
)]
pub(crate) async fn generate_qr(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
    body: Bytes,
) -> Result<Json<Envelope<QrCodeResponse>>, AppError> {
    let id = credential_id_path(path)?;
    let options = QrGenerateRequest::from_body(&body)?.options.unwrap_or_default();
    options.validate()?;

    let data_url = state
        .service
        .generate_qr(id.as_str(), &options)
        .map_err(|e| {
            AppError::from(e).context("QR Code Generation Failed", "Unable to generate QR code")
        })?;

    Ok(Envelope::ok(QrCodeResponse {
        credential_id: id,
        qr_code_data_url: data_url,
        format: QR_FORMAT,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use trustcred_verify::ErrorCorrection;

    #[test]
    fn empty_body_uses_defaults() {
        let req = QrGenerateRequest::from_body(b"").unwrap();
        assert!(req.options.is_none());
        let req = QrGenerateRequest::from_body(b"  \n").unwrap();
        assert!(req.options.is_none());
    }

    #[test]
    fn partial_options_fill_defaults() {
        let req = QrGenerateRequest::from_body(br#"{"options":{"width":500,"errorCorrectionLevel":"H"}}"#)
            .unwrap();
        let options = req.options.unwrap();
        assert_eq!(options.width, 500);
        assert_eq!(options.margin, 2);
        assert_eq!(options.error_correction, ErrorCorrection::H);
    }

    #[test]
    fn malformed_body_is_validation_error() {
        let err = QrGenerateRequest::from_body(b"{not json").unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
