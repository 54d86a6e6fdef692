//! # trustcred-api: Public Verification Service
//!
//! Axum HTTP surface over the TrustCred verification pipeline. Every
//! endpoint is public; abuse is bounded by per-IP rate limits instead of
//! authentication.
//!
//! ## API Surface
//!
//! | Prefix | Module | Rate tier |
//! |--------|--------|-----------|
//! | `/api/v1/verify/*` | [`routes::verify`] | verification / batch |
//! | `/api/v1/credentials/*` | [`routes::credentials`] | verification |
//! | `/api/v1/search/*` | [`routes::search`] | search |
//! | `/health/*`, `/metrics`, `/openapi.json` | this module, [`openapi`] | none |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! Cors → Trace → Metrics → Envelope → RateLimit (per route group) → Handler
//! ```
//!
//! The envelope middleware stamps `processingTime` on every JSON envelope,
//! including rate-limit rejections.

pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::middleware::{from_fn, from_fn_with_state};
use axum::response::IntoResponse;
use axum::{Extension, Router};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::middleware::envelope::{envelope_middleware, EnvelopeConfig};
use crate::middleware::metrics::ApiMetrics;
use crate::middleware::rate_limit::RateLimiter;

pub use error::AppError;
pub use state::AppState;

/// Request bodies above this size are rejected with 413.
const BODY_LIMIT: usize = 1024 * 1024;

fn cors_layer(origin: &str) -> CorsLayer {
    let allow_origin = match HeaderValue::from_str(origin) {
        Ok(value) => AllowOrigin::exact(value),
        Err(_) => {
            tracing::warn!(origin, "CORS_ORIGIN is not a valid header value, cross-origin requests disabled");
            AllowOrigin::list(Vec::<HeaderValue>::new())
        }
    };
    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}

/// Assemble the full application router.
pub fn app(state: AppState) -> Router {
    let config = state.config.clone();
    let metrics = state.metrics.clone();
    let limiter = RateLimiter::new(config.rate_limit);
    let envelope = EnvelopeConfig {
        expose_details: !config.environment.is_production(),
    };

    let v1 = Router::new()
        .merge(routes::verify::router())
        .merge(routes::credentials::router())
        .merge(routes::search::router());

    let mut api = Router::new()
        .nest("/api/v1", v1)
        .merge(openapi::router())
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(from_fn_with_state(envelope, envelope_middleware))
        .layer(Extension(limiter));

    if config.metrics_enabled {
        api = api
            .layer(from_fn(middleware::metrics::metrics_middleware))
            .layer(Extension(metrics.clone()));
    }

    let api = api.with_state(state.clone());

    let mut probes = Router::new()
        .route("/health/liveness", axum::routing::get(liveness))
        .route("/health/readiness", axum::routing::get(readiness));

    if config.metrics_enabled {
        probes = probes
            .route("/metrics", axum::routing::get(prometheus_metrics))
            .layer(Extension(metrics));
    }

    Router::new()
        .merge(probes.with_state(state))
        .merge(api)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config.cors_origin))
}

/// GET /metrics: Prometheus text exposition.
async fn prometheus_metrics(Extension(metrics): Extension<ApiMetrics>) -> impl IntoResponse {
    match metrics.gather_and_encode() {
        Ok(body) => (
            StatusCode::OK,
            [(
                header::CONTENT_TYPE,
                "text/plain; version=0.0.4; charset=utf-8",
            )],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Failed to encode Prometheus metrics: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, e).into_response()
        }
    }
}

/// Liveness probe, always returns 200 if the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe.
///
/// The metadata store must answer a ping. The cache is optional: a failed
/// cache ping is logged but does not take the instance out of rotation.
/// The ledger is checked by `/api/v1/verify/health`, not here, so a slow
/// node does not flap every replica at once.
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    if let Err(e) = state.service.store().ping().await {
        tracing::warn!("Metadata store health check failed: {e}");
        return (StatusCode::SERVICE_UNAVAILABLE, "database unreachable").into_response();
    }

    if let Err(e) = state.service.cache().ping().await {
        tracing::warn!("Cache health check failed: {e}");
    }

    (StatusCode::OK, "ready").into_response()
}
