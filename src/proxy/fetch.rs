//! Bounded outbound fetch for the image proxy.
//!
//! One outbound request per inbound request, hard-capped in time and
//! size. The client is built once at startup; its redirect policy
//! re-validates every hop against the same rules as the initial URL, so
//! an allow-listed host cannot bounce the gateway somewhere else.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use futures_util::StreamExt;
use reqwest::{header, redirect, Client};

use crate::config::ImageProxyConfig;
use crate::http::error::GatewayError;
use crate::proxy::validate::{validate_redirect_hop, ProxyRules, ValidatedTarget};

/// Browser-like identity for upstreams with hot-link protection.
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36";

const IMAGE_ACCEPT: &str = "image/avif,image/webp,image/apng,image/*;q=0.8";

/// Build the outbound client used by the image proxy.
pub fn build_fetch_client(
    config: &ImageProxyConfig,
    rules: Arc<ProxyRules>,
) -> Result<Client, reqwest::Error> {
    let max_redirects = config.max_redirects;
    let policy = redirect::Policy::custom(move |attempt| {
        if attempt.previous().len() > max_redirects {
            return attempt.error("too many redirects");
        }
        if validate_redirect_hop(attempt.url(), &rules) {
            attempt.follow()
        } else {
            attempt.error("redirect target failed validation")
        }
    });

    Client::builder()
        .timeout(Duration::from_millis(config.fetch_timeout_ms))
        .redirect(policy)
        .user_agent(BROWSER_USER_AGENT)
        .build()
}

/// Image payload fetched from the upstream.
pub struct FetchedImage {
    pub content_type: String,
    pub body: Bytes,
}

/// Fetch a validated target, enforcing the status, content-type, and size
/// stages of the pipeline.
pub async fn fetch_image(
    client: &Client,
    target: &ValidatedTarget,
    max_body_bytes: usize,
) -> Result<FetchedImage, GatewayError> {
    let origin = format!("{}://{}", target.url.scheme(), target.hostname);

    let response = client
        .get(target.url.clone())
        .header(header::ACCEPT, IMAGE_ACCEPT)
        .header(header::REFERER, format!("{origin}/"))
        .header(header::ORIGIN, origin)
        .send()
        .await
        .map_err(|error| {
            // Covers connect failures, timeouts, and rejected redirects.
            tracing::debug!(host = %target.hostname, timed_out = error.is_timeout(), "outbound fetch failed");
            GatewayError::UpstreamUnavailable
        })?;

    if !response.status().is_success() {
        return Err(GatewayError::UpstreamUnavailable);
    }

    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    if !content_type.starts_with("image/") {
        return Err(GatewayError::NotAnImage);
    }

    if let Some(declared) = response.content_length() {
        if declared > max_body_bytes as u64 {
            return Err(GatewayError::ImageTooLarge);
        }
    }

    // The declared length is advisory; count the actual bytes too.
    let mut body: Vec<u8> = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|_| GatewayError::UpstreamUnavailable)?;
        if body.len() + chunk.len() > max_body_bytes {
            return Err(GatewayError::ImageTooLarge);
        }
        body.extend_from_slice(&chunk);
    }

    Ok(FetchedImage {
        content_type,
        body: Bytes::from(body),
    })
}
