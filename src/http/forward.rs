//! Pass-through forwarding to the application backend.
//!
//! The gateway owns abuse control and security headers; everything it does
//! not handle itself is forwarded verbatim to the configured upstream.
//! No load balancing, health checks, or retries here — the upstream is a
//! single internal service.

use std::str::FromStr;
use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::{
        uri::{Authority, PathAndQuery, Scheme},
        HeaderMap, Request, StatusCode, Uri,
    },
    response::{IntoResponse, Response},
};

use crate::http::server::AppState;
use crate::observability::metrics;
use crate::security::rate_limit::RouteClass;

pub async fn forward_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let class = RouteClass::classify(request.uri().path());

    let (parts, body) = request.into_parts();

    let mut uri_parts = parts.uri.clone().into_parts();
    uri_parts.scheme = Some(Scheme::HTTP);
    uri_parts.authority = match Authority::from_str(&state.config.upstream.address) {
        Ok(authority) => Some(authority),
        Err(_) => return bad_gateway(&method, class, start),
    };
    if uri_parts.path_and_query.is_none() {
        uri_parts.path_and_query = Some(PathAndQuery::from_static("/"));
    }
    let uri = match Uri::from_parts(uri_parts) {
        Ok(uri) => uri,
        Err(_) => return bad_gateway(&method, class, start),
    };

    let mut builder = Request::builder().method(parts.method.clone()).uri(uri);
    if let Some(headers) = builder.headers_mut() {
        copy_end_to_end_headers(&parts.headers, headers);
    }
    let outbound = match builder.body(body) {
        Ok(request) => request,
        Err(_) => return bad_gateway(&method, class, start),
    };

    match state.upstream_client.request(outbound).await {
        Ok(response) => {
            metrics::record_request(&method, response.status().as_u16(), class.as_str(), start);
            let (parts, body) = response.into_parts();
            Response::from_parts(parts, Body::new(body))
        }
        Err(error) => {
            tracing::error!(%error, "upstream request failed");
            bad_gateway(&method, class, start)
        }
    }
}

// Hop-by-hop headers per RFC 9110 §7.6.1; they describe the inbound
// connection, not the request, so they must not travel upstream.
const HOP_BY_HOP_HEADERS: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

fn copy_end_to_end_headers(source: &HeaderMap, target: &mut HeaderMap) {
    for (name, value) in source.iter() {
        if HOP_BY_HOP_HEADERS.contains(&name.as_str()) {
            continue;
        }
        target.append(name.clone(), value.clone());
    }
}

fn bad_gateway(method: &str, class: RouteClass, start: Instant) -> Response {
    metrics::record_request(method, 502, class.as_str(), start);
    (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response()
}
