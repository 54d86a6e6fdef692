//! # Route Modules
//!
//! All public endpoints are mounted under `/api/v1` by [`crate::app`].
//!
//! | Module | Paths |
//! |--------|-------|
//! | [`verify`] | `/verify/:credentialId`, `/verify/batch`, `/verify/qr`, `/verify/health`, `/verify/docs` |
//! | [`credentials`] | `/credentials/:credentialId/public`, `/credentials/:credentialId/qr` |
//! | [`search`] | `/search/credentials` |

pub mod credentials;
pub mod search;
pub mod verify;

use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Pagination block attached to search responses.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub limit: u32,
    pub offset: u32,
    pub total: u64,
    pub has_more: bool,
}

/// Success envelope. `processingTime` is added by the envelope middleware.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<T> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
    /// Unix milliseconds.
    pub timestamp: i64,
}

impl<T: Serialize> Envelope<T> {
    pub fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data,
            pagination: None,
            timestamp: Utc::now().timestamp_millis(),
        })
    }

    pub fn paginated(data: T, pagination: Pagination) -> Json<Self> {
        Json(Self {
            success: true,
            data,
            pagination: Some(pagination),
            timestamp: Utc::now().timestamp_millis(),
        })
    }
}

/// OpenAPI shape of [`Envelope`].
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SuccessBody {
    pub success: bool,
    #[schema(value_type = Object)]
    pub data: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
    pub timestamp: i64,
    /// Handler time in milliseconds.
    pub processing_time: u64,
}
