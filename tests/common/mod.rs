//! Shared helpers for integration tests.

// Each test binary uses a subset of these helpers.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use futures_util::stream;
use tokio::net::TcpListener;

use edge_gateway::config::GatewayConfig;
use edge_gateway::http::HttpServer;
use edge_gateway::lifecycle::Shutdown;

/// Counts requests that actually reached a mock upstream.
pub type HitCounter = Arc<AtomicUsize>;

#[derive(Clone)]
struct MockState {
    hits: HitCounter,
    status: StatusCode,
    content_type: &'static str,
    body: &'static [u8],
}

async fn serve(State(state): State<MockState>) -> Response {
    state.hits.fetch_add(1, Ordering::SeqCst);
    (
        state.status,
        [(header::CONTENT_TYPE, state.content_type)],
        Bytes::from_static(state.body),
    )
        .into_response()
}

/// Streams the configured body 64 times in separate chunks. The stream has
/// no known length, so the response goes out chunked without Content-Length.
async fn serve_streamed(State(state): State<MockState>) -> Response {
    state.hits.fetch_add(1, Ordering::SeqCst);
    let chunks = std::iter::repeat(Bytes::from_static(state.body))
        .take(64)
        .map(Ok::<_, std::convert::Infallible>);
    Response::builder()
        .status(state.status)
        .header(header::CONTENT_TYPE, state.content_type)
        .body(Body::from_stream(stream::iter(chunks)))
        .unwrap()
}

async fn redirect_offsite(State(state): State<MockState>) -> Response {
    state.hits.fetch_add(1, Ordering::SeqCst);
    (
        StatusCode::FOUND,
        [(header::LOCATION, "https://attacker.invalid/a.jpg")],
    )
        .into_response()
}

/// Start a mock image upstream. Serves `body` as `content_type` on every
/// path except `/redirect-offsite`, which 302s off the allow-list, and
/// `/streamed`, which sends `body` 64 times as a chunked stream.
pub async fn start_image_upstream(
    status: StatusCode,
    content_type: &'static str,
    body: &'static [u8],
) -> (SocketAddr, HitCounter) {
    let hits: HitCounter = Arc::new(AtomicUsize::new(0));
    let app = Router::new()
        .route("/redirect-offsite", get(redirect_offsite))
        .route("/streamed", get(serve_streamed))
        .fallback(serve)
        .with_state(MockState {
            hits: hits.clone(),
            status,
            content_type,
            body,
        });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, hits)
}

/// Start a mock application backend answering every path with `body`.
pub async fn start_app_backend(body: &'static str) -> SocketAddr {
    let app = Router::new().fallback(move || async move { body });
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// Gateway config pointed at local mocks, with the proxy allow-list set to
/// the loopback host the image mock listens on.
pub fn gateway_config(app_backend: SocketAddr) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.upstream.address = app_backend.to_string();
    config.image_proxy.allowed_domains = vec!["127.0.0.1".to_string()];
    config.image_proxy.allow_insecure_upstream = true;
    config.image_proxy.allowed_origins = vec!["https://shop.example.com".to_string()];
    config
}

/// Start the gateway on an ephemeral port.
pub async fn start_gateway(config: GatewayConfig) -> (SocketAddr, Shutdown) {
    let shutdown = Shutdown::new();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = HttpServer::new(config).unwrap();
    let rx = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, rx).await;
    });
    tokio::time::sleep(Duration::from_millis(100)).await;
    (addr, shutdown)
}

/// URL of the gateway's proxy route for a given target.
pub fn proxy_url(gateway: SocketAddr) -> String {
    format!("http://{gateway}/api/proxy-image")
}
