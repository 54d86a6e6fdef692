//! # Extractors & Validation
//!
//! The [`Validate`] trait for request DTOs and helpers that map extractor
//! rejections to [`AppError::Validation`] (400).

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query};
use axum::Json;
use trustcred_core::CredentialId;

use crate::error::AppError;

/// Business-rule validation beyond what serde checks.
pub trait Validate {
    fn validate(&self) -> Result<(), String>;
}

/// Extract a JSON body, mapping rejections to [`AppError::Validation`].
pub fn extract_json<T>(result: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    result
        .map(|Json(v)| v)
        .map_err(|err| AppError::Validation(err.body_text()))
}

/// Extract a JSON body and run its [`Validate`] rules.
pub fn extract_validated_json<T: Validate>(
    result: Result<Json<T>, JsonRejection>,
) -> Result<T, AppError> {
    let value = extract_json(result)?;
    value.validate().map_err(AppError::Validation)?;
    Ok(value)
}

/// Extract query parameters and run their [`Validate`] rules.
pub fn extract_validated_query<T: Validate>(
    result: Result<Query<T>, QueryRejection>,
) -> Result<T, AppError> {
    let Query(value) = result.map_err(|err| AppError::Validation(err.body_text()))?;
    value.validate().map_err(AppError::Validation)?;
    Ok(value)
}

/// Parse the `:credentialId` path segment before any service call.
pub fn credential_id_path(
    result: Result<Path<String>, PathRejection>,
) -> Result<CredentialId, AppError> {
    let Path(raw) = result.map_err(|err| AppError::Validation(err.body_text()))?;
    CredentialId::new(&raw)
        .map_err(|_| AppError::Validation("Credential ID must be a 64-character hexadecimal string".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_path_accepts_valid_id() {
        let raw = "a1b2c3d4e5f6789012345678901234567890123456789012345678901234abcd";
        let id = credential_id_path(Ok(Path(raw.to_string()))).unwrap();
        assert_eq!(id.as_str(), raw);
    }

    #[test]
    fn credential_path_rejects_short_id() {
        let err = credential_id_path(Ok(Path("abc123".to_string()))).unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg.contains("64-character")));
    }
}
