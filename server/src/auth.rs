//! Parse-endpoint auth gate (spec.md §6). Two independent checks:
//! (1) an optional `Authorization: Bearer <token>` that, if allow-listed,
//! grants Premium tier; (2) an optional mandatory parse-key gate, required
//! on every request once `PS_PARSE_KEY`/`PARSE_API_KEY` is configured.

use axum::http::HeaderMap;
use gateway_core::constant_time_eq;
use std::collections::HashMap;

pub fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(axum::http::header::AUTHORIZATION)?.to_str().ok()?;
    value.strip_prefix("Bearer ").map(|s| s.trim().to_string())
}

/// Returns true if the caller presented the required parse-key, checked
/// via `X-Parse-Key` header, `X-Api-Key` header, then `key` query param,
/// using a constant-time comparison (spec.md §8 testable property 7).
/// When `required` is `None`, the gate is open.
pub fn check_parse_key(
    required: Option<&str>,
    headers: &HeaderMap,
    query: &HashMap<String, String>,
) -> bool {
    let Some(required) = required else { return true };

    let presented = headers
        .get("x-parse-key")
        .and_then(|v| v.to_str().ok())
        .or_else(|| headers.get("x-api-key").and_then(|v| v.to_str().ok()))
        .map(|s| s.to_string())
        .or_else(|| query.get("key").cloned());

    match presented {
        Some(token) => constant_time_eq(&token, required),
        None => false,
    }
}
