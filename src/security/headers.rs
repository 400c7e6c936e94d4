//! Security response headers.
//!
//! # Responsibilities
//! - Compute the CSP and hardening header set from configuration at startup
//! - Attach the set to every response outside the static-asset exclusions
//!
//! # Design Decisions
//! - Headers are precomputed once; the per-request work is an exclusion
//!   check and a handful of header inserts
//! - `X-XSS-Protection: 0` — modern browsers rely on CSP instead

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderName, HeaderValue, Request},
    middleware::Next,
    response::Response,
};

use crate::config::SecurityHeadersConfig;

/// Precomputed security header set with a path exclusion list.
pub struct SecurityHeaderPolicy {
    enabled: bool,
    exclude_paths: Vec<String>,
    headers: Vec<(HeaderName, HeaderValue)>,
}

impl SecurityHeaderPolicy {
    pub fn new(config: &SecurityHeadersConfig) -> Self {
        let csp = build_csp(&config.frame_origins, &config.img_origins);
        let csp_value = HeaderValue::from_str(&csp)
            .unwrap_or_else(|_| HeaderValue::from_static("default-src 'self'"));

        let headers = vec![
            (header::CONTENT_SECURITY_POLICY, csp_value),
            (
                header::X_CONTENT_TYPE_OPTIONS,
                HeaderValue::from_static("nosniff"),
            ),
            (
                header::X_FRAME_OPTIONS,
                HeaderValue::from_static("SAMEORIGIN"),
            ),
            (header::X_XSS_PROTECTION, HeaderValue::from_static("0")),
            (
                header::REFERRER_POLICY,
                HeaderValue::from_static("strict-origin-when-cross-origin"),
            ),
            (
                HeaderName::from_static("permissions-policy"),
                HeaderValue::from_static("camera=(self), geolocation=(self), microphone=()"),
            ),
            (
                header::STRICT_TRANSPORT_SECURITY,
                HeaderValue::from_static("max-age=63072000; includeSubDomains; preload"),
            ),
        ];

        Self {
            enabled: config.enabled,
            exclude_paths: config.exclude_paths.clone(),
            headers,
        }
    }

    /// Header set for a path, or `None` for excluded static assets.
    pub fn headers_for(&self, path: &str) -> Option<&[(HeaderName, HeaderValue)]> {
        if !self.enabled || self.is_excluded(path) {
            None
        } else {
            Some(&self.headers)
        }
    }

    fn is_excluded(&self, path: &str) -> bool {
        self.exclude_paths.iter().any(|entry| {
            if entry.ends_with('/') {
                path.starts_with(entry.as_str())
            } else {
                path == entry
            }
        })
    }
}

fn build_csp(frame_origins: &[String], img_origins: &[String]) -> String {
    let frames = join_sources(frame_origins);
    let imgs = join_sources(img_origins);
    format!(
        "default-src 'self'; \
         script-src 'self'{frames}; \
         style-src 'self' 'unsafe-inline'; \
         img-src 'self' data:{imgs}; \
         font-src 'self'; \
         frame-src 'self'{frames}; \
         connect-src 'self'"
    )
}

fn join_sources(origins: &[String]) -> String {
    origins
        .iter()
        .map(|o| format!(" {}", o.trim_end_matches('/')))
        .collect()
}

/// Middleware attaching the security header set to non-excluded responses.
pub async fn security_headers_middleware(
    State(policy): State<Arc<SecurityHeaderPolicy>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    let mut response = next.run(request).await;
    if let Some(set) = policy.headers_for(&path) {
        let headers = response.headers_mut();
        for (name, value) in set {
            headers.insert(name.clone(), value.clone());
        }
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> SecurityHeaderPolicy {
        SecurityHeaderPolicy::new(&SecurityHeadersConfig::default())
    }

    #[test]
    fn applies_to_regular_paths() {
        let policy = policy();
        let set = policy.headers_for("/api/products").expect("headers expected");
        let names: Vec<&str> = set.iter().map(|(n, _)| n.as_str()).collect();
        assert!(names.contains(&"content-security-policy"));
        assert!(names.contains(&"x-content-type-options"));
        assert!(names.contains(&"strict-transport-security"));
        assert!(names.contains(&"permissions-policy"));
    }

    #[test]
    fn skips_excluded_assets() {
        let policy = policy();
        assert!(policy.headers_for("/sw.js").is_none());
        assert!(policy.headers_for("/favicon.ico").is_none());
        assert!(policy.headers_for("/icons/logo-192.png").is_none());
        assert!(policy.headers_for("/data/products.json").is_none());
        // Exact entries do not match as prefixes.
        assert!(policy.headers_for("/sw.js.map").is_some());
    }

    #[test]
    fn csp_names_configured_origins() {
        let mut config = SecurityHeadersConfig::default();
        config.img_origins = vec!["https://thumbs.example.net".to_string()];
        let policy = SecurityHeaderPolicy::new(&config);
        let set = policy.headers_for("/").unwrap();
        let csp = set
            .iter()
            .find(|(n, _)| *n == header::CONTENT_SECURITY_POLICY)
            .and_then(|(_, v)| v.to_str().ok())
            .unwrap();
        assert!(csp.contains("img-src 'self' data: https://thumbs.example.net"));
        assert!(csp.contains("frame-src 'self' https://www.youtube-nocookie.com"));
    }

    #[test]
    fn disabled_policy_emits_nothing() {
        let mut config = SecurityHeadersConfig::default();
        config.enabled = false;
        let policy = SecurityHeaderPolicy::new(&config);
        assert!(policy.headers_for("/api/products").is_none());
    }
}
