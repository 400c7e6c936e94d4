//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by method, status, route class
//! - `gateway_request_duration_seconds` (histogram): latency distribution
//! - `gateway_rate_limited_total` (counter): 429s by route class
//! - `gateway_proxy_rejected_total` (counter): proxy rejections by pipeline stage

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram, Label};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter on its own listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "metrics exporter listening"),
        Err(error) => tracing::error!(%error, "failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, route_class: &str, start: Instant) {
    let labels = vec![
        Label::new("method", method.to_string()),
        Label::new("status", status.to_string()),
        Label::new("route_class", route_class.to_string()),
    ];
    counter!("gateway_requests_total", labels.clone()).increment(1);
    histogram!("gateway_request_duration_seconds", labels)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_rate_limited(route_class: &str) {
    counter!("gateway_rate_limited_total", "route_class" => route_class.to_string()).increment(1);
}

pub fn record_proxy_rejected(stage: &str) {
    counter!("gateway_proxy_rejected_total", "stage" => stage.to_string()).increment(1);
}
