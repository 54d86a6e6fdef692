//! # OpenAPI Specification Assembly
//!
//! Collects the utoipa-documented handlers into one OpenAPI document,
//! served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "TrustCred Verification API",
        version = "1.0.0",
        description = "Public API for verifying digital credentials anchored on the Stacks blockchain.\n\nAll endpoints are unauthenticated and rate limited per client IP. Successful responses use the envelope `{success, data, timestamp, processingTime}`; failures use `{success: false, error, message, timestamp}`.",
        license(name = "MIT")
    ),
    servers(
        (url = "http://localhost:3001", description = "Local development server"),
    ),
    paths(
        // -- Verification --------------------------------------------------
        crate::routes::verify::verify_credential,
        crate::routes::verify::verify_batch,
        crate::routes::verify::verify_qr,
        crate::routes::verify::verification_health,
        crate::routes::verify::api_docs,
        // -- Public credential info ----------------------------------------
        crate::routes::credentials::public_info,
        crate::routes::credentials::generate_qr,
        // -- Search --------------------------------------------------------
        crate::routes::search::search_credentials,
    ),
    components(
        schemas(
            crate::error::ErrorBody,
            crate::routes::SuccessBody,
            crate::routes::Pagination,
            crate::routes::verify::BatchVerifyRequest,
            crate::routes::verify::QrVerifyRequest,
            crate::routes::verify::VerificationHealth,
            crate::routes::verify::ServiceStatuses,
            crate::routes::verify::BlockchainStatus,
            crate::routes::verify::ComponentStatus,
            crate::routes::verify::ApiStatus,
            crate::routes::credentials::QrGenerateRequest,
            crate::routes::credentials::QrCodeResponse,
        ),
    ),
    tags(
        (name = "verification", description = "Single, batch and QR credential verification"),
        (name = "credentials", description = "Public credential information and QR code generation"),
        (name = "search", description = "Search of active credentials by issuer and schema"),
    )
)]
pub struct ApiDoc;

pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

/// GET /openapi.json
async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
