//! # Per-Client Rate Limiting
//!
//! Fixed-window counters keyed by client IP and tier. Each route group is
//! wrapped with its own [`RateLimitTier`]:
//!
//! | Tier | Default limit | Routes |
//! |------|---------------|--------|
//! | `Verification` | 100 / window | single, QR, public info, QR generation |
//! | `Batch` | 10 / window | batch verification |
//! | `Search` | 50 / window | public search |
//!
//! Allowed responses carry `X-RateLimit-Limit`, `X-RateLimit-Remaining` and
//! `X-RateLimit-Reset` (RFC 3339). Rejections are `429` with `retryAfter`
//! in seconds.
//!
//! Clients are keyed by socket peer address. `X-Forwarded-For` is only
//! consulted when [`RateLimitConfig::trust_proxy`] is set, i.e. when the
//! service runs behind a proxy that overwrites the header.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::{ConnectInfo, Request, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use parking_lot::RwLock;
use serde::Serialize;

/// Rate limiter configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub window_secs: u64,
    pub verification_max: u64,
    pub batch_max: u64,
    pub search_max: u64,
    /// Key clients on the first `X-Forwarded-For` hop instead of the peer.
    pub trust_proxy: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_secs: 15 * 60,
            verification_max: 100,
            batch_max: 10,
            search_max: 50,
            trust_proxy: false,
        }
    }
}

/// Route group a limit applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RateLimitTier {
    Verification,
    Batch,
    Search,
}

impl RateLimitTier {
    fn rejection(&self) -> (&'static str, &'static str) {
        match self {
            Self::Verification => (
                "Too Many Requests",
                "Too many verification requests, please try again later",
            ),
            Self::Batch => (
                "Too Many Batch Requests",
                "Too many batch verification requests, please try again later",
            ),
            Self::Search => (
                "Too Many Search Requests",
                "Too many search requests, please try again later",
            ),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u64,
    started: Instant,
}

/// Outcome of a limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed { limit: u64, remaining: u64, reset_in: Duration },
    Limited { retry_after: Duration },
}

/// Expired windows are swept at most this often.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug)]
struct Windows {
    by_client: HashMap<(RateLimitTier, String), Window>,
    last_sweep: Instant,
}

/// Shared rate limiter state.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    config: RateLimitConfig,
    windows: Arc<RwLock<Windows>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            windows: Arc::new(RwLock::new(Windows {
                by_client: HashMap::new(),
                last_sweep: Instant::now(),
            })),
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Number of live client windows across all tiers.
    pub fn tracked_clients(&self) -> usize {
        self.windows.read().by_client.len()
    }

    fn max_for(&self, tier: RateLimitTier) -> u64 {
        match tier {
            RateLimitTier::Verification => self.config.verification_max,
            RateLimitTier::Batch => self.config.batch_max,
            RateLimitTier::Search => self.config.search_max,
        }
    }

    /// Count a request from `client` against `tier`.
    pub fn check(&self, tier: RateLimitTier, client: &str) -> Decision {
        self.check_at(tier, client, Instant::now())
    }

    fn check_at(&self, tier: RateLimitTier, client: &str, now: Instant) -> Decision {
        let window_len = Duration::from_secs(self.config.window_secs);
        let limit = self.max_for(tier);
        let mut windows = self.windows.write();

        if now.saturating_duration_since(windows.last_sweep) >= SWEEP_INTERVAL {
            windows
                .by_client
                .retain(|_, w| now.saturating_duration_since(w.started) < window_len);
            windows.last_sweep = now;
        }

        let window = windows
            .by_client
            .entry((tier, client.to_string()))
            .or_insert(Window {
                count: 0,
                started: now,
            });
        if now.saturating_duration_since(window.started) >= window_len {
            *window = Window {
                count: 0,
                started: now,
            };
        }
        let reset_in = window_len.saturating_sub(now.saturating_duration_since(window.started));

        if window.count >= limit {
            return Decision::Limited {
                retry_after: reset_in,
            };
        }
        window.count += 1;
        Decision::Allowed {
            limit,
            remaining: limit - window.count,
            reset_in,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RateLimitedBody {
    success: bool,
    error: &'static str,
    message: &'static str,
    retry_after: u64,
    timestamp: i64,
}

/// Client address used as the limiter key: the socket peer, or the first
/// `X-Forwarded-For` hop when `trust_proxy` is set. Falls back to
/// `"unknown"` when neither is available.
fn client_key(headers: &HeaderMap, peer: Option<SocketAddr>, trust_proxy: bool) -> String {
    let forwarded = trust_proxy
        .then(|| {
            headers
                .get("x-forwarded-for")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.split(',').next())
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        })
        .flatten();
    forwarded
        .or_else(|| peer.map(|p| p.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}

/// Middleware enforcing one tier, wired per route group with
/// `from_fn_with_state(tier, rate_limit_middleware)`. The [`RateLimiter`]
/// itself is read from request extensions; without one, requests pass.
pub async fn rate_limit_middleware(
    State(tier): State<RateLimitTier>,
    request: Request,
    next: Next,
) -> Response {
    let Some(limiter) = request.extensions().get::<RateLimiter>().cloned() else {
        return next.run(request).await;
    };
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let client = client_key(request.headers(), peer, limiter.config().trust_proxy);

    match limiter.check(tier, &client) {
        Decision::Limited { retry_after } => {
            let (error, message) = tier.rejection();
            tracing::warn!(client = %client, ?tier, "rate limit exceeded");
            let body = RateLimitedBody {
                success: false,
                error,
                message,
                retry_after: retry_after.as_secs_f64().ceil() as u64,
                timestamp: Utc::now().timestamp_millis(),
            };
            (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response()
        }
        Decision::Allowed {
            limit,
            remaining,
            reset_in,
        } => {
            let mut response = next.run(request).await;
            let reset_at = Utc::now()
                + chrono::Duration::from_std(reset_in).unwrap_or_else(|_| chrono::Duration::zero());
            let headers = response.headers_mut();
            headers.insert("x-ratelimit-limit", HeaderValue::from(limit));
            headers.insert("x-ratelimit-remaining", HeaderValue::from(remaining));
            if let Ok(value) = HeaderValue::from_str(&reset_at.to_rfc3339()) {
                headers.insert("x-ratelimit-reset", value);
            }
            response
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(max: u64) -> RateLimiter {
        RateLimiter::new(RateLimitConfig {
            window_secs: 60,
            verification_max: max,
            batch_max: 1,
            search_max: max,
            trust_proxy: false,
        })
    }

    #[test]
    fn allows_up_to_limit_then_rejects() {
        let l = limiter(3);
        let now = Instant::now();
        for expected_remaining in [2, 1, 0] {
            match l.check_at(RateLimitTier::Verification, "1.2.3.4", now) {
                Decision::Allowed { remaining, .. } => assert_eq!(remaining, expected_remaining),
                other => panic!("unexpected {other:?}"),
            }
        }
        assert!(matches!(
            l.check_at(RateLimitTier::Verification, "1.2.3.4", now),
            Decision::Limited { .. }
        ));
    }

    #[test]
    fn tiers_and_clients_are_independent() {
        let l = limiter(1);
        let now = Instant::now();
        assert!(matches!(l.check_at(RateLimitTier::Batch, "a", now), Decision::Allowed { .. }));
        assert!(matches!(l.check_at(RateLimitTier::Batch, "a", now), Decision::Limited { .. }));
        assert!(matches!(l.check_at(RateLimitTier::Batch, "b", now), Decision::Allowed { .. }));
        assert!(matches!(l.check_at(RateLimitTier::Search, "a", now), Decision::Allowed { .. }));
    }

    #[test]
    fn window_resets_after_expiry() {
        let l = limiter(1);
        let start = Instant::now();
        l.check_at(RateLimitTier::Search, "a", start);
        assert!(matches!(l.check_at(RateLimitTier::Search, "a", start), Decision::Limited { .. }));
        let later = start + Duration::from_secs(61);
        assert!(matches!(l.check_at(RateLimitTier::Search, "a", later), Decision::Allowed { .. }));
    }

    #[test]
    fn client_key_ignores_forwarded_for_by_default() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7, 10.0.0.1"));
        let peer: SocketAddr = "127.0.0.1:5000".parse().unwrap();
        assert_eq!(client_key(&headers, Some(peer), false), "127.0.0.1");
        assert_eq!(client_key(&headers, None, false), "unknown");
    }

    #[test]
    fn client_key_uses_first_hop_behind_trusted_proxy() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7, 10.0.0.1"));
        let peer: SocketAddr = "127.0.0.1:5000".parse().unwrap();
        assert_eq!(client_key(&headers, Some(peer), true), "203.0.113.7");
        assert_eq!(client_key(&HeaderMap::new(), Some(peer), true), "127.0.0.1");
        assert_eq!(client_key(&HeaderMap::new(), None, true), "unknown");
    }

    #[test]
    fn expired_windows_are_swept_once_per_interval() {
        let l = limiter(5);
        let start = Instant::now();
        for n in 0..100 {
            l.check_at(RateLimitTier::Verification, &format!("10.0.0.{n}"), start);
        }
        assert_eq!(l.tracked_clients(), 100);

        // A full interval later every earlier window is gone.
        let later = start + Duration::from_secs(61);
        l.check_at(RateLimitTier::Verification, "10.0.1.1", later);
        assert_eq!(l.tracked_clients(), 1);

        // Within the next interval nothing is scanned.
        let soon = later + Duration::from_secs(1);
        l.check_at(RateLimitTier::Verification, "10.0.1.2", soon);
        assert_eq!(l.tracked_clients(), 2);
    }
}
