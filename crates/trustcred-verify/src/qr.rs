//! # QR Payloads
//!
//! A credential QR code carries a small JSON document:
//!
//! ```json
//! {"credentialId": "<64 hex>", "verificationUrl": "<base>/verify/<id>", "timestamp": 1700000000000}
//! ```
//!
//! Rendered as a PNG and returned as a `data:image/png;base64,` URL.
//! Decoding accepts either `credentialId` or `id` as the identifier field.

use std::io::Cursor;

use base64ct::{Base64, Encoding};
use chrono::{DateTime, Utc};
use image::{imageops, DynamicImage, ImageBuffer, ImageFormat, Luma};
use qrcode::{EcLevel, QrCode};
use serde::{Deserialize, Serialize};
use trustcred_core::CredentialId;

use crate::error::VerifyError;

pub const MIN_WIDTH: u32 = 100;
pub const MAX_WIDTH: u32 = 1000;
pub const MAX_MARGIN: u32 = 10;

/// QR error-correction level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCorrection {
    L,
    #[default]
    M,
    Q,
    H,
}

impl ErrorCorrection {
    fn level(self) -> EcLevel {
        match self {
            Self::L => EcLevel::L,
            Self::M => EcLevel::M,
            Self::Q => EcLevel::Q,
            Self::H => EcLevel::H,
        }
    }
}

/// Rendering options. Missing fields take their defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct QrOptions {
    /// Target image side in pixels.
    pub width: u32,
    /// Quiet zone in modules.
    pub margin: u32,
    #[serde(rename = "errorCorrectionLevel")]
    pub error_correction: ErrorCorrection,
}

impl Default for QrOptions {
    fn default() -> Self {
        Self {
            width: 300,
            margin: 2,
            error_correction: ErrorCorrection::M,
        }
    }
}

impl QrOptions {
    pub fn validate(&self) -> Result<(), VerifyError> {
        if !(MIN_WIDTH..=MAX_WIDTH).contains(&self.width) {
            return Err(VerifyError::InvalidArgument(format!(
                "QR width must be between {MIN_WIDTH} and {MAX_WIDTH}, got {}",
                self.width
            )));
        }
        if self.margin > MAX_MARGIN {
            return Err(VerifyError::InvalidArgument(format!(
                "QR margin must be between 0 and {MAX_MARGIN}, got {}",
                self.margin
            )));
        }
        Ok(())
    }
}

/// The JSON document encoded in a credential QR code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QrPayload {
    pub credential_id: CredentialId,
    pub verification_url: String,
    /// Unix milliseconds.
    pub timestamp: i64,
}

impl QrPayload {
    pub fn new(id: &CredentialId, base_url: &str, now: DateTime<Utc>) -> Self {
        Self {
            credential_id: id.clone(),
            verification_url: format!("{}/verify/{}", base_url.trim_end_matches('/'), id),
            timestamp: now.timestamp_millis(),
        }
    }

    pub fn to_json(&self) -> Result<String, VerifyError> {
        serde_json::to_string(self).map_err(|e| VerifyError::Internal(e.to_string()))
    }
}

/// Extract the credential identifier from scanned QR text.
///
/// # Errors
///
/// [`VerifyError::InvalidArgument`] if the text is not JSON, has no
/// `credentialId`/`id` string field, or the identifier is malformed.
pub fn parse_payload(raw: &str) -> Result<CredentialId, VerifyError> {
    let value: serde_json::Value = serde_json::from_str(raw)
        .map_err(|e| VerifyError::InvalidArgument(format!("invalid QR code data: {e}")))?;
    let id = value
        .get("credentialId")
        .or_else(|| value.get("id"))
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| {
            VerifyError::InvalidArgument("invalid QR code data: missing credential ID".to_string())
        })?;
    Ok(CredentialId::new(id)?)
}

/// Render `text` as a PNG QR code and return it as a data URL.
pub fn render_data_url(text: &str, options: &QrOptions) -> Result<String, VerifyError> {
    options.validate()?;

    let code = QrCode::with_error_correction_level(text.as_bytes(), options.error_correction.level())
        .map_err(|e| VerifyError::Internal(format!("QR code generation failed: {e}")))?;

    let modules = code.width() as u32;
    let total = modules + 2 * options.margin;
    let scale = (options.width / total).max(1);
    let symbol = code
        .render::<Luma<u8>>()
        .quiet_zone(false)
        .module_dimensions(scale, scale)
        .build();

    // The symbol is centered; leftover pixels widen the quiet zone.
    let side = options.width.max(total * scale);
    let mut canvas: ImageBuffer<Luma<u8>, Vec<u8>> = ImageBuffer::from_pixel(side, side, Luma([255]));
    let offset = i64::from((side - symbol.width()) / 2);
    imageops::overlay(&mut canvas, &symbol, offset, offset);

    let mut png: Vec<u8> = Vec::new();
    DynamicImage::ImageLuma8(canvas)
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .map_err(|e| VerifyError::Internal(format!("QR code generation failed: {e}")))?;

    Ok(format!("data:image/png;base64,{}", Base64::encode_string(&png)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID: &str = "a1b2c3d4e5f6789012345678901234567890123456789012345678901234abcd";

    fn decode_png(data_url: &str) -> image::GrayImage {
        let b64 = data_url.strip_prefix("data:image/png;base64,").unwrap();
        let bytes = Base64::decode_vec(b64).unwrap();
        image::load_from_memory_with_format(&bytes, ImageFormat::Png)
            .unwrap()
            .to_luma8()
    }

    #[test]
    fn payload_json_shape() {
        let id = CredentialId::new(ID).unwrap();
        let payload = QrPayload::new(&id, "https://api.trustcred.com/", Utc::now());
        let json: serde_json::Value = serde_json::from_str(&payload.to_json().unwrap()).unwrap();
        assert_eq!(json["credentialId"], ID);
        assert_eq!(
            json["verificationUrl"],
            format!("https://api.trustcred.com/verify/{ID}")
        );
        assert!(json["timestamp"].is_i64());
    }

    #[test]
    fn parse_accepts_both_field_names() {
        let a = parse_payload(&format!(r#"{{"credentialId":"{ID}"}}"#)).unwrap();
        let b = parse_payload(&format!(r#"{{"id":"{}"}}"#, ID.to_uppercase())).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn parse_rejects_bad_input() {
        for raw in ["not json at all", r#"{"foo":"bar"}"#, r#"{"credentialId":42}"#, r#"{"id":"abc123"}"#] {
            assert!(
                matches!(parse_payload(raw), Err(VerifyError::InvalidArgument(_))),
                "accepted {raw}"
            );
        }
    }

    #[test]
    fn generated_payload_parses_back_to_same_id() {
        let id = CredentialId::new(ID).unwrap();
        let json = QrPayload::new(&id, "https://example.org", Utc::now()).to_json().unwrap();
        assert_eq!(parse_payload(&json).unwrap(), id);
    }

    #[test]
    fn renders_png_at_requested_width_with_white_margin() {
        let url = render_data_url("hello trustcred", &QrOptions::default()).unwrap();
        let img = decode_png(&url);
        assert_eq!(img.width(), 300);
        assert_eq!(img.height(), 300);
        assert_eq!(img.get_pixel(0, 0).0, [255]);
        assert!(img.pixels().any(|p| p.0 == [0]));
    }

    #[test]
    fn oversized_symbol_grows_image() {
        let text = "x".repeat(900);
        let options = QrOptions {
            width: 100,
            margin: 10,
            error_correction: ErrorCorrection::H,
        };
        let img = decode_png(&render_data_url(&text, &options).unwrap());
        assert!(img.width() > 100);
    }

    #[test]
    fn options_are_validated() {
        let bad = [
            QrOptions { width: 99, ..QrOptions::default() },
            QrOptions { width: 1001, ..QrOptions::default() },
            QrOptions { margin: 11, ..QrOptions::default() },
        ];
        for options in bad {
            assert!(render_data_url("x", &options).is_err());
        }
    }

    #[test]
    fn options_deserialize_with_defaults() {
        let o: QrOptions = serde_json::from_str(r#"{"errorCorrectionLevel":"H"}"#).unwrap();
        assert_eq!(o.width, 300);
        assert_eq!(o.margin, 2);
        assert_eq!(o.error_correction, ErrorCorrection::H);
    }
}
