//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the edge gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Application backend all non-proxy traffic is forwarded to.
    pub upstream: UpstreamConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Rate limiting configuration.
    pub rate_limit: RateLimitConfig,

    /// Image proxy configuration.
    pub image_proxy: ImageProxyConfig,

    /// Security response header configuration.
    pub security_headers: SecurityHeadersConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Upstream application backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Backend address (e.g., "127.0.0.1:3000"). TLS is terminated by the
    /// platform; internal traffic is plain HTTP.
    pub address: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:3000".to_string(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Fixed window length in milliseconds.
    pub window_ms: u64,

    /// Request ceiling per window for generic `/api/*` routes.
    pub api_max_requests: u32,

    /// Request ceiling per window for the image proxy route.
    pub proxy_max_requests: u32,

    /// Trust client-identity headers (CF-Connecting-IP, X-Forwarded-For, ...).
    /// Only enable when the platform strips or overwrites these at its own
    /// edge; otherwise any client can forge its own quota bucket. When false
    /// the transport peer address is used instead.
    pub trust_proxy_headers: bool,

    /// Table size above which expired entries are swept before insert.
    pub high_water_mark: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            window_ms: 60_000,
            api_max_requests: 60,
            proxy_max_requests: 20,
            trust_proxy_headers: false,
            high_water_mark: 10_000,
        }
    }
}

/// Image proxy configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ImageProxyConfig {
    /// Host suffixes eligible for proxying (exact or dot-delimited
    /// subdomain match). Empty means the proxy rejects everything.
    pub allowed_domains: Vec<String>,

    /// Outbound fetch deadline in milliseconds.
    pub fetch_timeout_ms: u64,

    /// Maximum proxied body size in bytes. Enforced against both the
    /// declared Content-Length and the actual bytes read.
    pub max_body_bytes: usize,

    /// Maximum redirect hops; every hop is re-validated.
    pub max_redirects: usize,

    /// Origins allowed to read the proxied image cross-origin.
    pub allowed_origins: Vec<String>,

    /// Permit plain-HTTP upstreams and non-default ports. For local
    /// development and tests only; production keeps this false.
    pub allow_insecure_upstream: bool,
}

impl Default for ImageProxyConfig {
    fn default() -> Self {
        Self {
            allowed_domains: Vec::new(),
            fetch_timeout_ms: 5_000,
            max_body_bytes: 5 * 1024 * 1024,
            max_redirects: 3,
            allowed_origins: Vec::new(),
            allow_insecure_upstream: false,
        }
    }
}

/// Security response header configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityHeadersConfig {
    /// Enable the security header set.
    pub enabled: bool,

    /// External origins allowed for embedded video playback (frame-src and
    /// script-src in the CSP).
    pub frame_origins: Vec<String>,

    /// External origins allowed for thumbnail images (img-src in the CSP).
    pub img_origins: Vec<String>,

    /// Paths exempt from the header set. Entries ending in `/` match as
    /// prefixes, anything else matches exactly.
    pub exclude_paths: Vec<String>,
}

impl Default for SecurityHeadersConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            frame_origins: vec!["https://www.youtube-nocookie.com".to_string()],
            img_origins: vec!["https://i.ytimg.com".to_string()],
            exclude_paths: vec![
                "/manifest.webmanifest".to_string(),
                "/favicon.ico".to_string(),
                "/sw.js".to_string(),
                "/icons/".to_string(),
                "/data/".to_string(),
            ],
        }
    }
}

/// Observability settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Enable the Prometheus scrape endpoint.
    pub metrics_enabled: bool,

    /// Address for the metrics listener.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9100".to_string(),
        }
    }
}
