//! # Prometheus Metrics
//!
//! HTTP-level metrics (request counts, latency, errors) are recorded by
//! [`metrics_middleware`]. Verification outcomes, cache lookups and degraded
//! dependencies are recorded through [`MetricsObserver`], which the
//! verification pipeline calls as a side channel.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{MatchedPath, Request};
use axum::middleware::Next;
use axum::response::Response;
use prometheus::core::Collector;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};
use trustcred_core::{CredentialId, VerificationResult};
use trustcred_ledger::LedgerError;
use trustcred_verify::{CacheNamespace, TracingObserver, VerificationObserver};

/// Cheaply cloneable handle to the service's Prometheus registry.
#[derive(Clone)]
pub struct ApiMetrics {
    inner: Arc<Inner>,
}

struct Inner {
    registry: Registry,

    http_requests_total: IntCounterVec,
    http_request_duration_seconds: HistogramVec,
    http_errors_total: IntCounterVec,

    verifications_total: IntCounterVec,
    cache_lookups_total: IntCounterVec,
    degraded_total: IntCounterVec,
    ledger_fallbacks_total: IntCounterVec,
}

impl std::fmt::Debug for ApiMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiMetrics")
            .field("http_requests", &self.requests())
            .field("http_errors", &self.errors())
            .field("verifications_valid", &self.verifications("valid"))
            .finish_non_exhaustive()
    }
}

impl ApiMetrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let http_requests_total = IntCounterVec::new(
            Opts::new("trustcred_http_requests_total", "Total HTTP requests"),
            &["method", "path", "status"],
        )
        .expect("metric can be created");

        let http_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "trustcred_http_request_duration_seconds",
                "HTTP request duration in seconds",
            )
            .buckets(vec![
                0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
            ]),
            &["method", "path"],
        )
        .expect("metric can be created");

        let http_errors_total = IntCounterVec::new(
            Opts::new("trustcred_http_errors_total", "Total HTTP errors (4xx and 5xx)"),
            &["method", "path", "status"],
        )
        .expect("metric can be created");

        let verifications_total = IntCounterVec::new(
            Opts::new("trustcred_verifications_total", "Credential verifications by outcome"),
            &["outcome"],
        )
        .expect("metric can be created");

        let cache_lookups_total = IntCounterVec::new(
            Opts::new("trustcred_cache_lookups_total", "Cache lookups by namespace and result"),
            &["namespace", "result"],
        )
        .expect("metric can be created");

        let degraded_total = IntCounterVec::new(
            Opts::new(
                "trustcred_degraded_operations_total",
                "Best-effort operations skipped because a dependency failed",
            ),
            &["operation"],
        )
        .expect("metric can be created");

        let ledger_fallbacks_total = IntCounterVec::new(
            Opts::new("trustcred_ledger_fallbacks_total", "Ledger read failures handed to the fallback strategy"),
            &["network"],
        )
        .expect("metric can be created");

        for collector in [
            Box::new(http_requests_total.clone()) as Box<dyn Collector>,
            Box::new(http_request_duration_seconds.clone()),
            Box::new(http_errors_total.clone()),
            Box::new(verifications_total.clone()),
            Box::new(cache_lookups_total.clone()),
            Box::new(degraded_total.clone()),
            Box::new(ledger_fallbacks_total.clone()),
        ] {
            registry
                .register(collector)
                .expect("metric can be registered");
        }

        Self {
            inner: Arc::new(Inner {
                registry,
                http_requests_total,
                http_request_duration_seconds,
                http_errors_total,
                verifications_total,
                cache_lookups_total,
                degraded_total,
                ledger_fallbacks_total,
            }),
        }
    }

    /// Total request count across all labels.
    pub fn requests(&self) -> u64 {
        sum_counter(&self.inner.http_requests_total)
    }

    /// Total 4xx/5xx count across all labels.
    pub fn errors(&self) -> u64 {
        sum_counter(&self.inner.http_errors_total)
    }

    /// Verification count for one outcome label.
    pub fn verifications(&self, outcome: &str) -> u64 {
        self.inner
            .verifications_total
            .with_label_values(&[outcome])
            .get()
    }

    fn record_request(&self, method: &str, path: &str, status: u16, duration_secs: f64) {
        let status_str = status.to_string();
        self.inner
            .http_requests_total
            .with_label_values(&[method, path, &status_str])
            .inc();

        self.inner
            .http_request_duration_seconds
            .with_label_values(&[method, path])
            .observe(duration_secs);

        if status >= 400 {
            self.inner
                .http_errors_total
                .with_label_values(&[method, path, &status_str])
                .inc();
        }
    }

    /// Render the registry in the Prometheus text exposition format.
    pub fn gather_and_encode(&self) -> Result<String, String> {
        TextEncoder::new()
            .encode_to_string(&self.inner.registry.gather())
            .map_err(|e| format!("metrics exposition failed: {e}"))
    }
}

impl Default for ApiMetrics {
    fn default() -> Self {
        Self::new()
    }
}

fn sum_counter(counter: &IntCounterVec) -> u64 {
    counter
        .collect()
        .iter()
        .flat_map(|mf| mf.get_metric())
        .map(|m| m.get_counter().get_value() as u64)
        .sum()
}

/// Replace 64-hex credential id segments with `{credentialId}`.
///
/// Used when no route matched, so unknown paths cannot blow up label
/// cardinality with raw identifiers.
fn normalize_path(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            if segment.len() == 64 && segment.chars().all(|c| c.is_ascii_hexdigit()) {
                "{credentialId}"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Middleware that records HTTP request metrics.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let metrics = request.extensions().get::<ApiMetrics>().cloned();
    let method = request.method().to_string();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| normalize_path(request.uri().path()));
    let start = Instant::now();

    let response = next.run(request).await;

    if let Some(m) = metrics {
        let duration = start.elapsed().as_secs_f64();
        m.record_request(&method, &path, response.status().as_u16(), duration);
    }

    response
}

// -- Pipeline observer -----------------------------------------------------------

/// Records pipeline events as Prometheus counters, then forwards them to
/// [`TracingObserver`] for logging.
#[derive(Debug, Clone)]
pub struct MetricsObserver {
    metrics: ApiMetrics,
    log: TracingObserver,
}

impl MetricsObserver {
    pub fn new(metrics: ApiMetrics) -> Self {
        Self {
            metrics,
            log: TracingObserver,
        }
    }
}

impl VerificationObserver for MetricsObserver {
    fn on_cache_lookup(&self, namespace: CacheNamespace, hit: bool) {
        self.metrics
            .inner
            .cache_lookups_total
            .with_label_values(&[namespace.as_str(), if hit { "hit" } else { "miss" }])
            .inc();
        self.log.on_cache_lookup(namespace, hit);
    }

    fn on_store_degraded(&self, operation: &'static str, error: &str) {
        self.metrics
            .inner
            .degraded_total
            .with_label_values(&[operation])
            .inc();
        self.log.on_store_degraded(operation, error);
    }

    fn on_ledger_fallback(&self, id: &CredentialId, error: &LedgerError) {
        self.metrics
            .inner
            .ledger_fallbacks_total
            .with_label_values(&["stacks"])
            .inc();
        self.log.on_ledger_fallback(id, error);
    }

    fn on_verified(&self, result: &VerificationResult) {
        let outcome = match (result.exists, result.valid) {
            (false, _) => "not_found",
            (true, true) => "valid",
            (true, false) => "invalid",
        };
        self.metrics
            .inner
            .verifications_total
            .with_label_values(&[outcome])
            .inc();
        self.log.on_verified(result);
    }

    fn on_verify_failed(&self, id: &CredentialId, error: &str) {
        self.metrics
            .inner
            .verifications_total
            .with_label_values(&["error"])
            .inc();
        self.log.on_verify_failed(id, error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn starts_at_zero() {
        let m = ApiMetrics::new();
        assert_eq!(m.requests(), 0);
        assert_eq!(m.errors(), 0);
    }

    #[test]
    fn errors_count_only_4xx_and_5xx() {
        let m = ApiMetrics::new();
        m.record_request("GET", "/api/v1/verify/:credentialId", 200, 0.01);
        m.record_request("GET", "/api/v1/verify/:credentialId", 400, 0.01);
        m.record_request("POST", "/api/v1/verify/batch", 500, 0.2);
        assert_eq!(m.requests(), 3);
        assert_eq!(m.errors(), 2);
    }

    #[test]
    fn normalize_replaces_credential_ids() {
        let id = "ab".repeat(32);
        assert_eq!(
            normalize_path(&format!("/api/v1/verify/{id}")),
            "/api/v1/verify/{credentialId}"
        );
        assert_eq!(normalize_path("/api/v1/verify/batch"), "/api/v1/verify/batch");
    }

    #[test]
    fn observer_counts_outcomes() {
        let m = ApiMetrics::new();
        let observer = MetricsObserver::new(m.clone());
        let id = CredentialId::from_bytes([1; 32]);

        observer.on_verified(&VerificationResult::not_found(id.clone(), Utc::now()));
        observer.on_verify_failed(&id, "ledger down");

        assert_eq!(m.verifications("not_found"), 1);
        assert_eq!(m.verifications("error"), 1);
        assert_eq!(m.verifications("valid"), 0);
    }

    #[test]
    fn encode_contains_metric_names() {
        let m = ApiMetrics::new();
        m.record_request("GET", "/health/liveness", 200, 0.001);
        MetricsObserver::new(m.clone()).on_cache_lookup(CacheNamespace::Verification, true);
        let text = m.gather_and_encode().unwrap();
        assert!(text.contains("trustcred_http_requests_total"));
        assert!(text.contains("trustcred_cache_lookups_total"));
    }
}
