//! Integration tests for dispatch, rate limiting, and security headers.

use axum::http::StatusCode;

mod common;

#[tokio::test]
async fn forwards_api_traffic_with_security_and_quota_headers() {
    let backend = common::start_app_backend("catalog").await;
    let (gateway, shutdown) = common::start_gateway(common::gateway_config(backend)).await;

    let response = reqwest::get(format!("http://{gateway}/api/products"))
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let headers = response.headers().clone();
    assert!(headers.contains_key("content-security-policy"));
    assert_eq!(headers.get("x-content-type-options").unwrap(), "nosniff");
    assert_eq!(headers.get("x-frame-options").unwrap(), "SAMEORIGIN");
    assert!(headers.contains_key("strict-transport-security"));
    assert_eq!(headers.get("x-ratelimit-limit").unwrap(), "60");
    assert!(headers.contains_key("x-ratelimit-remaining"));
    assert_eq!(response.text().await.unwrap(), "catalog");

    shutdown.trigger();
}

#[tokio::test]
async fn excluded_static_assets_skip_security_headers() {
    let backend = common::start_app_backend("asset").await;
    let (gateway, shutdown) = common::start_gateway(common::gateway_config(backend)).await;

    let response = reqwest::get(format!("http://{gateway}/sw.js")).await.unwrap();

    assert_eq!(response.status(), 200);
    assert!(!response.headers().contains_key("content-security-policy"));
    // Static assets are also outside every route class: no quota headers.
    assert!(!response.headers().contains_key("x-ratelimit-limit"));

    shutdown.trigger();
}

#[tokio::test]
async fn quota_exhaustion_returns_429_with_retry_after() {
    let backend = common::start_app_backend("catalog").await;
    let mut config = common::gateway_config(backend);
    config.rate_limit.api_max_requests = 3;
    config.rate_limit.window_ms = 60_000;
    let (gateway, shutdown) = common::start_gateway(config).await;

    let client = reqwest::Client::new();
    let url = format!("http://{gateway}/api/products");

    for expected_remaining in ["2", "1", "0"] {
        let response = client.get(&url).send().await.unwrap();
        assert_eq!(response.status(), 200);
        assert_eq!(
            response.headers().get("x-ratelimit-remaining").unwrap(),
            expected_remaining
        );
    }

    let denied = client.get(&url).send().await.unwrap();
    assert_eq!(denied.status(), StatusCode::TOO_MANY_REQUESTS);
    let retry_after: u64 = denied
        .headers()
        .get("retry-after")
        .unwrap()
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!(retry_after >= 1);
    assert!(retry_after <= 60);
    // Denials still carry the hardening headers.
    assert!(denied.headers().contains_key("content-security-policy"));

    shutdown.trigger();
}

#[tokio::test]
async fn route_classes_have_independent_quotas() {
    let backend = common::start_app_backend("catalog").await;
    let mut config = common::gateway_config(backend);
    config.rate_limit.proxy_max_requests = 2;
    config.rate_limit.api_max_requests = 100;
    let (gateway, shutdown) = common::start_gateway(config).await;

    let client = reqwest::Client::new();

    // Proxy-route requests (missing param → 400, but still metered).
    for _ in 0..2 {
        let response = client.get(common::proxy_url(gateway)).send().await.unwrap();
        assert_eq!(response.status(), 400);
    }
    let denied = client.get(common::proxy_url(gateway)).send().await.unwrap();
    assert_eq!(denied.status(), StatusCode::TOO_MANY_REQUESTS);

    // Generic API traffic is unaffected.
    let ok = client
        .get(format!("http://{gateway}/api/products"))
        .send()
        .await
        .unwrap();
    assert_eq!(ok.status(), 200);

    shutdown.trigger();
}

#[tokio::test]
async fn trusted_proxy_headers_split_quota_buckets() {
    let backend = common::start_app_backend("catalog").await;
    let mut config = common::gateway_config(backend);
    config.rate_limit.api_max_requests = 1;
    config.rate_limit.trust_proxy_headers = true;
    let (gateway, shutdown) = common::start_gateway(config).await;

    let client = reqwest::Client::new();
    let url = format!("http://{gateway}/api/products");

    for ip in ["1.1.1.1", "2.2.2.2", "3.3.3.3"] {
        let response = client
            .get(&url)
            .header("x-forwarded-for", ip)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200, "each client key gets its own window");
    }

    let denied = client
        .get(&url)
        .header("x-forwarded-for", "1.1.1.1")
        .send()
        .await
        .unwrap();
    assert_eq!(denied.status(), StatusCode::TOO_MANY_REQUESTS);

    shutdown.trigger();
}

#[tokio::test]
async fn unreachable_backend_maps_to_502() {
    let mut config = common::gateway_config("127.0.0.1:1".parse().unwrap());
    config.rate_limit.enabled = false;
    let (gateway, shutdown) = common::start_gateway(config).await;

    let response = reqwest::get(format!("http://{gateway}/api/products"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

    shutdown.trigger();
}
