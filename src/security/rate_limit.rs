//! Fixed-window rate limiting middleware.
//!
//! Requests are bucketed by (client key, route class). A bucket allows
//! `max_requests` per window and resets entirely at the window boundary.
//! This is a best-effort, single-process abuse deterrent, not a
//! billing-grade limiter; the storage seam exists so a shared counter
//! store can replace the in-memory table for multi-instance deployments.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderValue, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;

use crate::config::RateLimitConfig;
use crate::observability::metrics;
use crate::security::client_ip::resolve_client_key;

/// Canonical path of the image proxy route.
pub const IMAGE_PROXY_PATH: &str = "/api/proxy-image";

/// Classification of an incoming path for quota selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    GenericApi,
    ImageProxy,
    Unlimited,
}

impl RouteClass {
    pub fn classify(path: &str) -> Self {
        if path == IMAGE_PROXY_PATH {
            RouteClass::ImageProxy
        } else if path == "/api" || path.starts_with("/api/") {
            RouteClass::GenericApi
        } else {
            RouteClass::Unlimited
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RouteClass::GenericApi => "generic-api",
            RouteClass::ImageProxy => "image-proxy",
            RouteClass::Unlimited => "none",
        }
    }
}

/// Outcome of a rate-limit check.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    pub retry_after_secs: u64,
}

/// Storage seam for rate-limit counters.
///
/// `check` performs the whole read-modify-write for one key and must be
/// atomic per key: two concurrent calls for the same key must never both
/// observe the last free slot.
pub trait RateLimitStore: Send + Sync {
    fn check(&self, key: &str, max_requests: u32, window: Duration) -> RateLimitDecision;
}

struct WindowEntry {
    count: u32,
    reset_at: Instant,
}

/// In-memory fixed-window store.
///
/// The DashMap entry API holds the shard lock for the duration of the
/// read-modify-write, which gives the per-key atomicity the trait asks for.
pub struct MemoryStore {
    entries: DashMap<String, WindowEntry>,
    high_water_mark: usize,
}

impl MemoryStore {
    pub fn new(high_water_mark: usize) -> Self {
        Self {
            entries: DashMap::new(),
            high_water_mark,
        }
    }

    /// Number of live entries; exposed for tests and diagnostics.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn sweep_expired(&self, now: Instant) {
        self.entries.retain(|_, entry| entry.reset_at > now);
    }
}

impl RateLimitStore for MemoryStore {
    fn check(&self, key: &str, max_requests: u32, window: Duration) -> RateLimitDecision {
        let now = Instant::now();

        // Opportunistic sweep: bounds the table by live keys in the last
        // window instead of total historical traffic. Amortized across
        // whichever request trips the mark.
        if self.entries.len() > self.high_water_mark {
            self.sweep_expired(now);
        }

        let mut entry = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| WindowEntry {
                count: 0,
                reset_at: now + window,
            });

        if now >= entry.reset_at {
            // Window elapsed: replace, not merge.
            entry.count = 1;
            entry.reset_at = now + window;
            return RateLimitDecision {
                allowed: true,
                limit: max_requests,
                remaining: max_requests.saturating_sub(1),
                retry_after_secs: 0,
            };
        }

        entry.count += 1;
        if entry.count > max_requests {
            let remaining_ms = entry.reset_at.duration_since(now).as_millis() as u64;
            RateLimitDecision {
                allowed: false,
                limit: max_requests,
                remaining: 0,
                retry_after_secs: remaining_ms.div_ceil(1000).max(1),
            }
        } else {
            RateLimitDecision {
                allowed: true,
                limit: max_requests,
                remaining: max_requests - entry.count,
                retry_after_secs: 0,
            }
        }
    }
}

/// Shared limiter state injected into the middleware.
pub struct RateLimiter {
    store: Arc<dyn RateLimitStore>,
    config: RateLimitConfig,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        let store = Arc::new(MemoryStore::new(config.high_water_mark));
        Self::with_store(config, store)
    }

    pub fn with_store(config: RateLimitConfig, store: Arc<dyn RateLimitStore>) -> Self {
        Self { store, config }
    }

    /// Quota for a route class; `None` means the class is unlimited and
    /// bypasses the limiter entirely.
    fn quota_for(&self, class: RouteClass) -> Option<u32> {
        match class {
            RouteClass::GenericApi => Some(self.config.api_max_requests),
            RouteClass::ImageProxy => Some(self.config.proxy_max_requests),
            RouteClass::Unlimited => None,
        }
    }

    pub fn check(&self, client_key: &str, class: RouteClass) -> Option<RateLimitDecision> {
        let max_requests = self.quota_for(class)?;
        let key = format!("{}:{}", class.as_str(), client_key);
        Some(self.store.check(
            &key,
            max_requests,
            Duration::from_millis(self.config.window_ms),
        ))
    }
}

/// Middleware enforcing per-route-class quotas.
///
/// Allowed responses carry `X-RateLimit-Limit` / `X-RateLimit-Remaining`;
/// denials are 429 with `Retry-After`.
pub async fn rate_limit_middleware(
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    State(limiter): State<Arc<RateLimiter>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !limiter.config.enabled {
        return next.run(request).await;
    }

    let class = RouteClass::classify(request.uri().path());
    let client_key =
        resolve_client_key(request.headers(), peer, limiter.config.trust_proxy_headers);
    let Some(decision) = limiter.check(&client_key, class) else {
        return next.run(request).await;
    };

    if decision.allowed {
        let mut response = next.run(request).await;
        let headers = response.headers_mut();
        headers.insert("x-ratelimit-limit", HeaderValue::from(decision.limit));
        headers.insert("x-ratelimit-remaining", HeaderValue::from(decision.remaining));
        response
    } else {
        tracing::warn!(route_class = class.as_str(), "rate limit exceeded");
        metrics::record_rate_limited(class.as_str());
        let mut response =
            (StatusCode::TOO_MANY_REQUESTS, "Rate limit exceeded").into_response();
        let headers = response.headers_mut();
        headers.insert("x-ratelimit-limit", HeaderValue::from(decision.limit));
        headers.insert("x-ratelimit-remaining", HeaderValue::from(0u32));
        headers.insert("retry-after", HeaderValue::from(decision.retry_after_secs));
        response
    }
}
