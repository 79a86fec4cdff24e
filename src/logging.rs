//! Request and response logging with secret redaction.
//!
//! Every attempt is logged at info level as one line; headers go to debug and
//! bodies to trace. Credential-bearing headers are never written out.

use crate::constants;
use std::collections::BTreeMap;
use tracing::{debug, info, trace};

const DEFAULT_MAX_BODY: usize = 1000;

/// Returns `true` for header names that carry credentials.
#[must_use]
pub fn should_redact_header(header_name: &str) -> bool {
    let lower = header_name.to_lowercase();
    matches!(
        lower.as_str(),
        "authorization"
            | "proxy-authorization"
            | "cookie"
            | "set-cookie"
            | "x-api-key"
            | "x-access-token"
            | "x-auth-token"
            | "api-key"
            | "api_key"
            | "token"
            | "secret"
            | "password"
    )
}

fn display_header(name: &str, value: &str) -> String {
    if should_redact_header(name) && !value.is_empty() {
        "[REDACTED]".to_string()
    } else {
        value.to_string()
    }
}

fn truncated(body: &str, max_body_len: usize) -> &str {
    if body.len() <= max_body_len {
        return body;
    }
    let mut end = max_body_len;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}

/// Logs one outgoing attempt.
pub fn log_request(
    attempt: u32,
    method: &str,
    url: &str,
    headers: &BTreeMap<String, String>,
    body: Option<&str>,
) {
    info!(
        target: "rest::http",
        attempt,
        "→ {} {}",
        method.to_uppercase(),
        url
    );

    for (name, value) in headers {
        debug!(target: "rest::http", "  {}: {}", name, display_header(name, value));
    }

    if let Some(body) = body {
        trace!(target: "rest::http", "Request body: {}", body);
    }
}

/// Logs the response to one attempt.
pub fn log_response(
    attempt: u32,
    status: u16,
    duration_ms: u128,
    headers: &BTreeMap<String, String>,
    body: &str,
    max_body_len: usize,
) {
    info!(
        target: "rest::http",
        attempt,
        "← {} ({}ms)",
        status,
        duration_ms
    );

    for (name, value) in headers {
        debug!(target: "rest::http", "  {}: {}", name, display_header(name, value));
    }

    let shown = truncated(body, max_body_len);
    if shown.len() < body.len() {
        trace!(
            target: "rest::http",
            "Response body: {} (truncated at {} bytes)",
            shown,
            max_body_len
        );
    } else {
        trace!(target: "rest::http", "Response body: {}", body);
    }
}

/// Maximum logged body length, from `REST_LOG_MAX_BODY`.
#[must_use]
pub fn get_max_body_len() -> usize {
    std::env::var(constants::ENV_LOG_MAX_BODY)
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(DEFAULT_MAX_BODY)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_redact_header_case_insensitive() {
        assert!(should_redact_header("Authorization"));
        assert!(should_redact_header("X-API-Key"));
        assert!(should_redact_header("cookie"));
        assert!(!should_redact_header("Content-Type"));
        assert!(!should_redact_header("Accept"));
    }

    #[test]
    fn test_display_header_keeps_empty_values() {
        assert_eq!(display_header("Authorization", "Basic abc"), "[REDACTED]");
        assert_eq!(display_header("Authorization", ""), "");
        assert_eq!(display_header("Accept", "text/plain"), "text/plain");
    }

    #[test]
    fn test_truncated_respects_char_boundaries() {
        assert_eq!(truncated("hello", 10), "hello");
        assert_eq!(truncated("hello", 3), "hel");
        // 'é' is two bytes; cutting inside it backs off
        assert_eq!(truncated("hé", 2), "h");
    }
}
