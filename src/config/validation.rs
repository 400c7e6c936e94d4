//! Configuration validation.
//!
//! Semantic checks on top of what serde already guarantees syntactically.
//! Returns all validation errors, not just the first.

use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::GatewayConfig;

/// A single semantic problem found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid bind address: {0}")]
    InvalidBindAddress(String),

    #[error("invalid upstream address: {0}")]
    InvalidUpstreamAddress(String),

    #[error("rate limit window must be greater than zero")]
    ZeroWindow,

    #[error("rate limit quota for {0} must be greater than zero")]
    ZeroQuota(&'static str),

    #[error("image proxy body cap must be greater than zero")]
    ZeroBodyCap,

    #[error("image proxy fetch timeout must be greater than zero")]
    ZeroFetchTimeout,

    #[error("allowed domain must be a bare hostname: {0}")]
    InvalidAllowedDomain(String),

    #[error("allowed origin must be an absolute http(s) URL: {0}")]
    InvalidAllowedOrigin(String),
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    if config.upstream.address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidUpstreamAddress(
            config.upstream.address.clone(),
        ));
    }

    if config.rate_limit.enabled {
        if config.rate_limit.window_ms == 0 {
            errors.push(ValidationError::ZeroWindow);
        }
        if config.rate_limit.api_max_requests == 0 {
            errors.push(ValidationError::ZeroQuota("generic-api"));
        }
        if config.rate_limit.proxy_max_requests == 0 {
            errors.push(ValidationError::ZeroQuota("image-proxy"));
        }
    }

    if config.image_proxy.max_body_bytes == 0 {
        errors.push(ValidationError::ZeroBodyCap);
    }
    if config.image_proxy.fetch_timeout_ms == 0 {
        errors.push(ValidationError::ZeroFetchTimeout);
    }

    for domain in &config.image_proxy.allowed_domains {
        if !is_bare_hostname(domain) {
            errors.push(ValidationError::InvalidAllowedDomain(domain.clone()));
        }
    }

    for origin in &config.image_proxy.allowed_origins {
        if !is_http_origin(origin) {
            errors.push(ValidationError::InvalidAllowedOrigin(origin.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Allow-list entries are plain hostnames: no scheme, path, port,
/// credentials, or leading dot.
fn is_bare_hostname(domain: &str) -> bool {
    !domain.is_empty()
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && domain
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
}

fn is_http_origin(origin: &str) -> bool {
    match Url::parse(origin) {
        Ok(url) => {
            (url.scheme() == "https" || url.scheme() == "http")
                && url.host_str().is_some()
                && url.path() == "/"
                && url.query().is_none()
        }
        Err(_) => false,
    }
}
