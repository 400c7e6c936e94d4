//! Request handler for the image proxy route.

use std::time::Instant;

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use crate::http::error::GatewayError;
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::proxy::{fetch, validate};

#[derive(Debug, Deserialize)]
pub struct ProxyImageParams {
    url: Option<String>,
}

/// Short browser TTL, long edge TTL.
const CACHE_CONTROL: &str = "public, max-age=300, s-maxage=86400";

/// `GET /api/proxy-image?url=<absolute-url>`.
///
/// If the inbound client disconnects, axum drops this future and the
/// in-flight outbound fetch is cancelled with it.
pub async fn proxy_image_handler(
    State(state): State<AppState>,
    request_headers: HeaderMap,
    Query(params): Query<ProxyImageParams>,
) -> Response {
    let start = Instant::now();
    match proxy_image(&state, &request_headers, params).await {
        Ok(response) => {
            metrics::record_request("GET", 200, "image-proxy", start);
            response
        }
        Err(error) => {
            let status = error.status().as_u16();
            metrics::record_proxy_rejected(error.stage());
            metrics::record_request("GET", status, "image-proxy", start);
            tracing::debug!(outcome = status, stage = error.stage(), "image proxy rejected");
            error.into_response()
        }
    }
}

async fn proxy_image(
    state: &AppState,
    request_headers: &HeaderMap,
    params: ProxyImageParams,
) -> Result<Response, GatewayError> {
    let raw = params.url.as_deref().ok_or(GatewayError::MissingParameter)?;
    let target = validate::validate_target(raw, &state.proxy_rules)?;
    let image = fetch::fetch_image(
        &state.fetch_client,
        &target,
        state.config.image_proxy.max_body_bytes,
    )
    .await?;

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(&image.content_type).map_err(|_| GatewayError::NotAnImage)?,
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(CACHE_CONTROL));

    let allowed_origins = &state.config.image_proxy.allowed_origins;
    if let Some(origin) = cors_origin(request_headers.get(header::ORIGIN), allowed_origins) {
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_str(&origin).map_err(|_| GatewayError::Internal)?,
        );
        if allowed_origins.len() > 1 {
            headers.insert(header::VARY, HeaderValue::from_static("Origin"));
        }
    }

    Ok((StatusCode::OK, headers, image.body).into_response())
}

/// Pick the CORS allow-origin: echo the request origin when it is on the
/// allow-list, otherwise fall back to the first configured origin. No
/// configured origins means no CORS header at all.
fn cors_origin(request_origin: Option<&HeaderValue>, allowed: &[String]) -> Option<String> {
    let first = allowed.first()?;
    if let Some(origin) = request_origin.and_then(|v| v.to_str().ok()) {
        if allowed.iter().any(|a| a == origin) {
            return Some(origin.to_string());
        }
    }
    Some(first.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cors_echoes_known_origin() {
        let allowed = vec![
            "https://shop.example.com".to_string(),
            "https://m.shop.example.com".to_string(),
        ];
        let origin = HeaderValue::from_static("https://m.shop.example.com");
        assert_eq!(
            cors_origin(Some(&origin), &allowed).as_deref(),
            Some("https://m.shop.example.com")
        );
    }

    #[test]
    fn cors_falls_back_for_unknown_origin() {
        let allowed = vec!["https://shop.example.com".to_string()];
        let origin = HeaderValue::from_static("https://attacker.net");
        assert_eq!(
            cors_origin(Some(&origin), &allowed).as_deref(),
            Some("https://shop.example.com")
        );
    }

    #[test]
    fn cors_absent_without_configuration() {
        assert_eq!(cors_origin(None, &[]), None);
    }
}
