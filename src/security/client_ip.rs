//! Client identity resolution from untrusted proxy headers.
//!
//! Rate-limit buckets are keyed by client identity. The resolver walks a
//! fixed priority list of proxy headers and returns the first value that
//! survives sanitization; clients with no usable candidate all share the
//! `"unknown"` bucket. That is a policy choice: an unidentifiable crowd
//! competes for one quota instead of each member getting their own.

use std::net::SocketAddr;

use axum::http::HeaderMap;

/// Shared bucket for clients whose identity cannot be resolved.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Candidate headers in priority order, closest-to-edge first.
const CANDIDATE_HEADERS: [&str; 5] = [
    "cf-connecting-ip",
    "x-real-ip",
    "x-client-ip",
    "x-forwarded-for",
    "forwarded",
];

/// Resolve the canonical client key for a request.
///
/// With `trust_proxy_headers` false the identity headers are ignored
/// entirely and the transport peer address is the key; spoofable headers
/// are only worth reading when the platform overwrites them at its edge.
pub fn resolve_client_key(
    headers: &HeaderMap,
    peer: SocketAddr,
    trust_proxy_headers: bool,
) -> String {
    if !trust_proxy_headers {
        return peer.ip().to_string();
    }

    for name in CANDIDATE_HEADERS {
        let Some(value) = headers.get(name).and_then(|v| v.to_str().ok()) else {
            continue;
        };
        let candidate = match name {
            // Left-most entry is the closest-to-client hop.
            "x-forwarded-for" => value.split(',').next().unwrap_or(""),
            "forwarded" => match forwarded_for_token(value) {
                Some(token) => token,
                None => continue,
            },
            _ => value,
        };
        if let Some(key) = sanitize_candidate(candidate) {
            return key;
        }
    }

    UNKNOWN_CLIENT.to_string()
}

/// Extract the `for=` token from a structured `Forwarded` header.
fn forwarded_for_token(value: &str) -> Option<&str> {
    value
        .split(';')
        .flat_map(|part| part.split(','))
        .find_map(|param| {
            let (key, val) = param.trim().split_once('=')?;
            if key.trim().eq_ignore_ascii_case("for") {
                Some(val.trim().trim_matches('"'))
            } else {
                None
            }
        })
}

/// Sanitize one candidate value into a canonical client key.
///
/// Strips `[v6]:port` brackets and trailing `:port` on dotted IPv4, then
/// rejects anything outside `[0-9a-fA-F:.\-_%]`. Idempotent: sanitizing an
/// already-sanitized value yields the same value.
pub fn sanitize_candidate(raw: &str) -> Option<String> {
    let mut value = raw.trim();

    if let Some(rest) = value.strip_prefix('[') {
        // Bracketed IPv6, optionally with a port suffix.
        let (inner, _) = rest.split_once(']')?;
        value = inner;
    } else if value.contains('.') {
        // Dotted IPv4 with a trailing port.
        if let Some((host, port)) = value.rsplit_once(':') {
            if !host.contains(':') && !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit())
            {
                value = host;
            }
        }
    }

    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    let valid = value
        .chars()
        .all(|c| c.is_ascii_hexdigit() || matches!(c, ':' | '.' | '-' | '_' | '%'));
    if !valid {
        return None;
    }
    Some(value.to_string())
}
