//! # Verification Routes
//!
//! Public, unauthenticated verification endpoints.
//!
//! | Method | Path | Rate tier |
//! |--------|------|-----------|
//! | GET | `/verify/:credentialId` | verification |
//! | POST | `/verify/batch` | batch |
//! | POST | `/verify/qr` | verification |
//! | GET | `/verify/health` | none |
//! | GET | `/verify/docs` | none |
//!
//! A credential that does not exist is still a `200` with `exists: false`;
//! only malformed input is a `400`.

use std::time::Instant;

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use trustcred_core::{BatchResult, CredentialId, VerificationResult};
use trustcred_verify::MAX_BATCH_SIZE;
use utoipa::ToSchema;

use crate::error::AppError;
use crate::extractors::{credential_id_path, extract_validated_json, Validate};
use crate::middleware::rate_limit::{rate_limit_middleware, RateLimitTier};
use crate::routes::Envelope;
use crate::state::AppState;

const QR_DATA_MIN: usize = 10;
const QR_DATA_MAX: usize = 1000;

pub fn router() -> Router<AppState> {
    let single = Router::new()
        .route("/verify/:credential_id", get(verify_credential))
        .route("/verify/qr", post(verify_qr))
        .route_layer(from_fn_with_state(
            RateLimitTier::Verification,
            rate_limit_middleware,
        ));

    let batch = Router::new()
        .route("/verify/batch", post(verify_batch))
        .route_layer(from_fn_with_state(RateLimitTier::Batch, rate_limit_middleware));

    Router::new()
        .merge(single)
        .merge(batch)
        .route("/verify/health", get(verification_health))
        .route("/verify/docs", get(api_docs))
}

// -- Request types ---------------------------------------------------------------

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BatchVerifyRequest {
    /// 1 to 50 credential identifiers (64 hex characters each).
    pub credential_ids: Vec<String>,
}

impl Validate for BatchVerifyRequest {
    fn validate(&self) -> Result<(), String> {
        if self.credential_ids.is_empty() {
            return Err("At least one credential ID is required".into());
        }
        if self.credential_ids.len() > MAX_BATCH_SIZE {
            return Err(format!(
                "Maximum {MAX_BATCH_SIZE} credentials can be verified at once"
            ));
        }
        if let Some(bad) = self
            .credential_ids
            .iter()
            .position(|raw| CredentialId::new(raw.as_str()).is_err())
        {
            return Err(format!(
                "credentialIds[{bad}]: Credential ID must be a 64-character hexadecimal string"
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QrVerifyRequest {
    /// JSON text scanned from a credential QR code.
    pub qr_data: String,
}

impl Validate for QrVerifyRequest {
    fn validate(&self) -> Result<(), String> {
        let len = self.qr_data.chars().count();
        if len < QR_DATA_MIN {
            return Err(format!("QR data must be at least {QR_DATA_MIN} characters"));
        }
        if len > QR_DATA_MAX {
            return Err(format!("QR data must not exceed {QR_DATA_MAX} characters"));
        }
        Ok(())
    }
}

// -- Health report ---------------------------------------------------------------

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerificationHealth {
    /// `healthy` or `degraded`.
    #[schema(value_type = String)]
    pub status: &'static str,
    /// Unix milliseconds.
    pub timestamp: i64,
    pub services: ServiceStatuses,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServiceStatuses {
    pub blockchain: BlockchainStatus,
    pub database: ComponentStatus,
    pub api: ApiStatus,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BlockchainStatus {
    #[schema(value_type = String)]
    pub status: &'static str,
    pub network: String,
    /// Probe round trip in milliseconds.
    pub latency: Option<u64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ComponentStatus {
    #[schema(value_type = String)]
    pub status: &'static str,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApiStatus {
    #[schema(value_type = String)]
    pub status: &'static str,
    pub response_time: u64,
}

fn up_down(ok: bool) -> &'static str {
    if ok {
        "up"
    } else {
        "down"
    }
}

// -- Handlers --------------------------------------------------------------------

/// GET /api/v1/verify/:credentialId: Verify a single credential.
#[utoipa::path(
    get,
    path = "/api/v1/verify/{credentialId}",
    params(("credentialId" = String, Path, description = "64-character hex credential ID")),
    responses(
        (status = 200, description = "Verification result", body = crate::routes::SuccessBody),
        (status = 400, description = "Malformed credential ID", body = crate::error::ErrorBody),
        (status = 429, description = "Rate limit exceeded"),
        (status = 500, description = "Ledger unavailable", body = crate::error::ErrorBody),
    ),
    tag = "verification"
)]
pub(crate) async fn verify_credential(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> Result<Json<Envelope<VerificationResult>>, AppError> {
    let id = credential_id_path(path)?;
    tracing::info!(credential_id = %id, "credential verification request received");

    let result = state.service.verify_id(&id).await.map_err(|e| {
        AppError::from(e).context(
            "Verification Failed",
            "Unable to verify credential at this time",
        )
    })?;
    Ok(Envelope::ok(result))
}

/// POST /api/v1/verify/batch: Verify up to 50 credentials at once.
#[utoipa::path(
    post,
    path = "/api/v1/verify/batch",
    request_body = BatchVerifyRequest,
    responses(
        (status = 200, description = "Per-credential results and summary", body = crate::routes::SuccessBody),
        (status = 400, description = "Empty, oversized or malformed batch", body = crate::error::ErrorBody),
        (status = 429, description = "Rate limit exceeded"),
    ),
    tag = "verification"
)]
pub(crate) async fn verify_batch(
    State(state): State<AppState>,
    body: Result<Json<BatchVerifyRequest>, JsonRejection>,
) -> Result<Json<Envelope<BatchResult>>, AppError> {
    let req = extract_validated_json(body)?;
    tracing::info!(count = req.credential_ids.len(), "batch verification request received");

    let batch = state
        .service
        .verify_batch(&req.credential_ids)
        .await
        .map_err(|e| {
            AppError::from(e).context(
                "Batch Verification Failed",
                "Unable to verify credentials at this time",
            )
        })?;
    Ok(Envelope::ok(batch))
}

/// POST /api/v1/verify/qr: Verify the credential a scanned QR code names.
#[utoipa::path(
    post,
    path = "/api/v1/verify/qr",
    request_body = QrVerifyRequest,
    responses(
        (status = 200, description = "Verification result", body = crate::routes::SuccessBody),
        (status = 400, description = "QR data is not a credential payload", body = crate::error::ErrorBody),
        (status = 429, description = "Rate limit exceeded"),
    ),
    tag = "verification"
)]
pub(crate) async fn verify_qr(
    State(state): State<AppState>,
    body: Result<Json<QrVerifyRequest>, JsonRejection>,
) -> Result<Json<Envelope<VerificationResult>>, AppError> {
    let req = extract_validated_json(body)?;

    let result = state
        .service
        .verify_from_qr(&req.qr_data)
        .await
        .map_err(|e| {
            AppError::from(e).context("QR Code Verification Failed", "Invalid QR code data")
        })?;
    Ok(Envelope::ok(result))
}

/// GET /api/v1/verify/health: Ledger and database connectivity.
///
/// `503` when the ledger probe fails. The database is reported but does
/// not decide the status: verification works from ledger data alone.
#[utoipa::path(
    get,
    path = "/api/v1/verify/health",
    responses(
        (status = 200, description = "All dependencies reachable", body = VerificationHealth),
        (status = 503, description = "Ledger unreachable", body = VerificationHealth),
    ),
    tag = "verification"
)]
pub(crate) async fn verification_health(
    State(state): State<AppState>,
) -> (StatusCode, Json<Envelope<VerificationHealth>>) {
    let started = Instant::now();

    let ledger = state.service.ledger_health().await;
    let database_ok = match state.service.store().ping().await {
        Ok(()) => true,
        Err(err) => {
            tracing::warn!(error = %err, "metadata store health check failed");
            false
        }
    };

    let healthy = ledger.healthy;
    let report = VerificationHealth {
        status: if healthy { "healthy" } else { "degraded" },
        timestamp: Utc::now().timestamp_millis(),
        services: ServiceStatuses {
            blockchain: BlockchainStatus {
                status: up_down(ledger.healthy),
                network: ledger.network,
                latency: ledger.latency_ms,
            },
            database: ComponentStatus {
                status: up_down(database_ok),
            },
            api: ApiStatus {
                status: "up",
                response_time: started.elapsed().as_millis() as u64,
            },
        },
    };

    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    let Json(mut envelope) = Envelope::ok(report);
    envelope.success = healthy;
    (status, Json(envelope))
}

/// GET /api/v1/verify/docs: Human-readable endpoint catalogue.
#[utoipa::path(
    get,
    path = "/api/v1/verify/docs",
    responses((status = 200, description = "Endpoint catalogue", body = crate::routes::SuccessBody)),
    tag = "verification"
)]
pub(crate) async fn api_docs(State(state): State<AppState>) -> Json<Envelope<Value>> {
    let limits = state.config.rate_limit;
    let minutes = (limits.window_secs / 60).max(1);
    let example_id = "a1b2c3d4e5f6789012345678901234567890123456789012345678901234abcd";

    Envelope::ok(json!({
        "title": "TrustCred Verification API",
        "version": "1.0.0",
        "description": "Public API for verifying digital credentials on the Stacks blockchain",
        "baseUrl": format!("{}/api/v1", state.config.base_url.trim_end_matches('/')),
        "endpoints": {
            "verify": {
                "single": {
                    "method": "GET",
                    "path": "/verify/:credentialId",
                    "description": "Verify a single credential by ID",
                    "parameters": {
                        "credentialId": "string (64-char hex) - The credential ID to verify"
                    },
                    "example": format!("/verify/{example_id}"),
                },
                "batch": {
                    "method": "POST",
                    "path": "/verify/batch",
                    "description": format!("Verify multiple credentials at once (max {MAX_BATCH_SIZE})"),
                    "body": { "credentialIds": "array of strings - Credential IDs to verify" },
                    "example": { "credentialIds": [example_id] },
                },
                "qr": {
                    "method": "POST",
                    "path": "/verify/qr",
                    "description": "Verify credential from QR code data",
                    "body": { "qrData": "string - JSON data from QR code" },
                },
            },
            "credentials": {
                "public": {
                    "method": "GET",
                    "path": "/credentials/:credentialId/public",
                    "description": "Get public information about a credential",
                },
                "qrGenerate": {
                    "method": "POST",
                    "path": "/credentials/:credentialId/qr",
                    "description": "Generate QR code for a credential",
                    "body": { "options": "object (optional) - width, margin, errorCorrectionLevel" },
                },
            },
            "search": {
                "method": "GET",
                "path": "/search/credentials",
                "description": "Search public credentials",
                "query": {
                    "issuer": "string (optional) - Filter by issuer name or address",
                    "schema": "string (optional) - Filter by schema name",
                    "limit": "number (optional) - Results per page (max 100, default 50)",
                    "offset": "number (optional) - Pagination offset (default 0)",
                },
                "example": "/search/credentials?issuer=university&limit=20",
            },
        },
        "rateLimits": {
            "verification": format!("{} requests per {minutes} minutes", limits.verification_max),
            "batch": format!("{} requests per {minutes} minutes", limits.batch_max),
            "search": format!("{} requests per {minutes} minutes", limits.search_max),
        },
        "responseFormat": {
            "success": {
                "success": true,
                "data": "object - Response data",
                "timestamp": "number - Unix timestamp (ms)",
                "processingTime": "number - Processing time in milliseconds",
            },
            "error": {
                "success": false,
                "error": "string - Error type",
                "message": "string - Error description",
                "timestamp": "number - Unix timestamp (ms)",
            },
        },
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID: &str = "a1b2c3d4e5f6789012345678901234567890123456789012345678901234abcd";

    #[test]
    fn batch_request_bounds() {
        let empty = BatchVerifyRequest {
            credential_ids: vec![],
        };
        assert_eq!(
            empty.validate().unwrap_err(),
            "At least one credential ID is required"
        );

        let too_many = BatchVerifyRequest {
            credential_ids: vec![ID.to_string(); MAX_BATCH_SIZE + 1],
        };
        assert!(too_many.validate().unwrap_err().starts_with("Maximum 50"));

        let full = BatchVerifyRequest {
            credential_ids: vec![ID.to_string(); MAX_BATCH_SIZE],
        };
        assert!(full.validate().is_ok());
    }

    #[test]
    fn batch_request_names_the_bad_index() {
        let req = BatchVerifyRequest {
            credential_ids: vec![ID.to_string(), "nothex".to_string()],
        };
        assert!(req.validate().unwrap_err().starts_with("credentialIds[1]"));
    }

    #[test]
    fn qr_data_length() {
        let short = QrVerifyRequest {
            qr_data: "{}".into(),
        };
        assert!(short.validate().is_err());
        let long = QrVerifyRequest {
            qr_data: "x".repeat(QR_DATA_MAX + 1),
        };
        assert!(long.validate().is_err());
        let ok = QrVerifyRequest {
            qr_data: format!("{{\"credentialId\":\"{ID}\"}}"),
        };
        assert!(ok.validate().is_ok());
    }
}
