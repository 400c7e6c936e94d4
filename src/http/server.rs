//! HTTP server setup and request dispatch.
//!
//! # Responsibilities
//! - Create the axum Router with the proxy route and pass-through fallback
//! - Wire up middleware (tracing, timeout, request ID, security headers,
//!   rate limiting)
//! - Bind the server to a listener with graceful shutdown

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    error_handling::HandleErrorLayer, http::StatusCode, middleware, routing::get, Router,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::{timeout::TimeoutLayer, BoxError, ServiceBuilder};
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::GatewayConfig;
use crate::http::forward::forward_handler;
use crate::proxy::fetch::build_fetch_client;
use crate::proxy::handler::proxy_image_handler;
use crate::proxy::validate::{AllowedDomainSet, ProxyRules};
use crate::security::headers::{security_headers_middleware, SecurityHeaderPolicy};
use crate::security::rate_limit::{rate_limit_middleware, RateLimiter, IMAGE_PROXY_PATH};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GatewayConfig>,
    pub proxy_rules: Arc<ProxyRules>,
    pub fetch_client: reqwest::Client,
    pub upstream_client: Client<HttpConnector, axum::body::Body>,
}

/// HTTP server for the edge gateway.
pub struct HttpServer {
    router: Router,
    config: GatewayConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: GatewayConfig) -> Result<Self, reqwest::Error> {
        let proxy_rules = Arc::new(ProxyRules {
            domains: AllowedDomainSet::new(&config.image_proxy.allowed_domains),
            allow_insecure_upstream: config.image_proxy.allow_insecure_upstream,
        });
        if proxy_rules.domains.is_empty() {
            tracing::warn!("image proxy allow-list is empty; all proxy requests will be rejected");
        }

        let fetch_client = build_fetch_client(&config.image_proxy, proxy_rules.clone())?;
        let upstream_client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        let limiter = Arc::new(RateLimiter::new(config.rate_limit.clone()));
        let header_policy = Arc::new(SecurityHeaderPolicy::new(&config.security_headers));

        let state = AppState {
            config: Arc::new(config.clone()),
            proxy_rules,
            fetch_client,
            upstream_client,
        };

        let router = Self::build_router(&config, state, limiter, header_policy);
        Ok(Self { router, config })
    }

    /// Build the axum router with all middleware layers.
    fn build_router(
        config: &GatewayConfig,
        state: AppState,
        limiter: Arc<RateLimiter>,
        header_policy: Arc<SecurityHeaderPolicy>,
    ) -> Router {
        Router::new()
            .route(IMAGE_PROXY_PATH, get(proxy_image_handler))
            .fallback(forward_handler)
            .with_state(state)
            // Layer order: the last layer added sees the request first.
            // Security headers sit outside the limiter so 429s carry them.
            .layer(middleware::from_fn_with_state(limiter, rate_limit_middleware))
            .layer(middleware::from_fn_with_state(
                header_policy,
                security_headers_middleware,
            ))
            .layer(
                ServiceBuilder::new()
                    .layer(HandleErrorLayer::new(|_: BoxError| async {
                        StatusCode::REQUEST_TIMEOUT
                    }))
                    .layer(TimeoutLayer::new(Duration::from_secs(
                        config.timeouts.request_secs,
                    ))),
            )
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server until the shutdown signal fires or Ctrl+C arrives.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {
                        tracing::info!("Shutdown signal received");
                    }
                    _ = shutdown.recv() => {
                        tracing::info!("Shutdown triggered");
                    }
                }
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }
}
