//! Gateway error taxonomy.
//!
//! Every failure surfaces as a specific status code with a short, fixed
//! body. Upstream error bodies, stack traces, and the internals of a
//! rejected URL are never echoed back to the caller.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Request-scoped failures surfaced by the gateway.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GatewayError {
    #[error("missing url parameter")]
    MissingParameter,

    #[error("invalid url")]
    InvalidUrl,

    #[error("credentials not allowed in url")]
    CredentialsInUrl,

    #[error("domain not allowed")]
    DomainNotAllowed,

    #[error("scheme not allowed")]
    SchemeNotAllowed,

    #[error("port not allowed")]
    PortNotAllowed,

    /// Covers fetch failures, timeouts, rejected redirects, and non-2xx
    /// upstream responses; the upstream status is deliberately not
    /// distinguishable from the outside.
    #[error("upstream unavailable")]
    UpstreamUnavailable,

    #[error("not an image")]
    NotAnImage,

    #[error("image too large")]
    ImageTooLarge,

    #[error("internal error")]
    Internal,
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::MissingParameter
            | GatewayError::InvalidUrl
            | GatewayError::CredentialsInUrl
            | GatewayError::SchemeNotAllowed => StatusCode::BAD_REQUEST,
            GatewayError::DomainNotAllowed
            | GatewayError::PortNotAllowed
            | GatewayError::NotAnImage => StatusCode::FORBIDDEN,
            GatewayError::UpstreamUnavailable => StatusCode::NOT_FOUND,
            GatewayError::ImageTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            GatewayError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Pipeline stage label for metrics and logs.
    pub fn stage(&self) -> &'static str {
        match self {
            GatewayError::MissingParameter => "params",
            GatewayError::InvalidUrl => "parse",
            GatewayError::CredentialsInUrl => "credentials",
            GatewayError::DomainNotAllowed => "domain",
            GatewayError::SchemeNotAllowed => "scheme",
            GatewayError::PortNotAllowed => "port",
            GatewayError::UpstreamUnavailable => "upstream",
            GatewayError::NotAnImage => "content_type",
            GatewayError::ImageTooLarge => "size",
            GatewayError::Internal => "internal",
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}
