//! Response envelope finishing.
//!
//! Handlers build `{success, data, timestamp}` and [`AppError`] builds the
//! failure body; this middleware stamps `processingTime` (whole
//! milliseconds) onto every JSON envelope and, outside production, replaces
//! generic 5xx messages with the [`ErrorDetail`] the error carried.
//!
//! [`AppError`]: crate::error::AppError

use std::time::Instant;

use axum::body::{to_bytes, Body};
use axum::extract::{Request, State};
use axum::http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use axum::middleware::Next;
use axum::response::Response;
use serde_json::Value;

use crate::error::ErrorDetail;

/// Largest body the middleware will buffer and rewrite.
const MAX_ENVELOPE_BYTES: usize = 4 * 1024 * 1024;

/// Whether 5xx responses may expose their internal detail.
#[derive(Debug, Clone, Copy)]
pub struct EnvelopeConfig {
    pub expose_details: bool,
}

fn is_json(response: &Response) -> bool {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"))
}

pub async fn envelope_middleware(
    State(config): State<EnvelopeConfig>,
    request: Request,
    next: Next,
) -> Response {
    let started = Instant::now();
    let response = next.run(request).await;
    if !is_json(&response) {
        return response;
    }

    let detail = response.extensions().get::<ErrorDetail>().cloned();
    let (mut parts, body) = response.into_parts();
    let bytes = match to_bytes(body, MAX_ENVELOPE_BYTES).await {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::error!(error = %err, "failed to buffer response body");
            parts.headers.remove(CONTENT_LENGTH);
            return Response::from_parts(parts, Body::empty());
        }
    };

    let mut json: Value = match serde_json::from_slice(&bytes) {
        Ok(Value::Object(map)) if map.contains_key("success") => Value::Object(map),
        _ => return Response::from_parts(parts, Body::from(bytes)),
    };

    json["processingTime"] = Value::from(started.elapsed().as_millis() as u64);
    if config.expose_details {
        if let Some(ErrorDetail(detail)) = detail {
            json["message"] = Value::String(detail);
        }
    }

    match serde_json::to_vec(&json) {
        Ok(rewritten) => {
            parts.headers.remove(CONTENT_LENGTH);
            Response::from_parts(parts, Body::from(rewritten))
        }
        Err(_) => Response::from_parts(parts, Body::from(bytes)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::middleware::from_fn_with_state;
    use axum::routing::get;
    use axum::{Json, Router};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use crate::error::AppError;

    fn app(expose_details: bool) -> Router {
        Router::new()
            .route("/ok", get(|| async { Json(serde_json::json!({"success": true, "data": 1})) }))
            .route("/plain", get(|| async { "ok" }))
            .route(
                "/fail",
                get(|| async { Err::<(), _>(AppError::internal("redis at 10.0.0.9 refused")) }),
            )
            .layer(from_fn_with_state(EnvelopeConfig { expose_details }, envelope_middleware))
    }

    async fn get_json(app: Router, uri: &str) -> Value {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn stamps_processing_time() {
        let json = get_json(app(false), "/ok").await;
        assert_eq!(json["data"], 1);
        assert!(json["processingTime"].is_u64());
    }

    #[tokio::test]
    async fn leaves_non_json_alone() {
        let response = app(false)
            .oneshot(Request::builder().uri("/plain").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"ok");
    }

    #[tokio::test]
    async fn exposes_detail_only_when_configured() {
        let hidden = get_json(app(false), "/fail").await;
        assert_eq!(hidden["message"], "An internal error occurred");

        let shown = get_json(app(true), "/fail").await;
        assert_eq!(shown["message"], "redis at 10.0.0.9 refused");
        assert!(shown["processingTime"].is_u64());
    }
}
