//! OpenAI-compatible chat gateway (spec.md §4.11). Accepts a chat-
//! completions POST, rewrites `model` per the mapping table, routes to
//! the free pool (skipping Premium — this surface is free-pool-only),
//! and either buffered-proxies or stream-proxies to the chosen upstream.

use crate::state::AppState;
use crate::{ip, pool_status};
use axum::body::Bytes;
use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use gateway_core::{AccessLogRecord, ProviderDescriptor, ProviderId};
use serde_json::Value;
use std::net::SocketAddr;
use std::time::Instant;

pub async fn handle(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let start = Instant::now();
    let client_ip = ip::resolve(&headers, Some(peer));

    let Ok(payload): Result<serde_json::Value, _> = serde_json::from_slice(&body) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"ok": false, "error": {"code": "invalid_json", "message": "request body is not valid JSON"}})),
        )
            .into_response();
    };

    let stream = payload.get("stream").and_then(|v| v.as_bool()).unwrap_or(false);
    let requested_model = payload
        .get("model")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string();
    let input_text = extract_message_text(&payload);

    let snapshot = pool_status::get(&state);
    let route = decide_route(&requested_model, &input_text, &state.provider_a, &state.provider_b);

    let chosen = pick_ready(&route, &snapshot, &state.provider_a, &state.provider_b);

    let Some((provider_id, descriptor, model)) = chosen else {
        return unavailable_response(stream, start, &state, &client_ip);
    };

    let endpoint = format!("{}/chat/completions", descriptor.base_url);

    if stream {
        return stream_response(&state, &endpoint, &descriptor.api_key, payload, &model, provider_id, start, &client_ip).await;
    }

    buffered_response(&state, &endpoint, &descriptor.api_key, payload, &model, provider_id, start, &client_ip).await
}

/// A candidate route: the preferred provider+model, and the alternate
/// provider+model to fail over to if the preferred is not ready.
struct Route {
    preferred: (ProviderId, String),
    alternate: (ProviderId, String),
}

/// Decides the mapping-table route (spec.md §4.11). Rows 1/2 force a
/// provider by requested-model substring; otherwise the Chinese-character
/// heuristic from §4.8 step 2 picks the provider, echoing the requested
/// model when present or falling back to that provider's default.
fn decide_route(
    requested_model: &str,
    input_text: &str,
    provider_a: &ProviderDescriptor,
    provider_b: &ProviderDescriptor,
) -> Route {
    let lower = requested_model.to_ascii_lowercase();

    if lower.contains("deepseek") {
        return Route {
            preferred: (ProviderId::ProviderA, provider_a.default_model.clone()),
            alternate: (ProviderId::ProviderB, provider_b.default_model.clone()),
        };
    }
    if lower.contains("llama") {
        return Route {
            preferred: (ProviderId::ProviderB, provider_b.default_model.clone()),
            alternate: (ProviderId::ProviderA, provider_a.default_model.clone()),
        };
    }

    let echo_or = |descriptor: &ProviderDescriptor| -> String {
        if requested_model.is_empty() {
            descriptor.default_model.clone()
        } else {
            requested_model.to_string()
        }
    };

    if gateway_llm::prefers_provider_a(input_text) {
        Route {
            preferred: (ProviderId::ProviderA, echo_or(provider_a)),
            alternate: (ProviderId::ProviderB, echo_or(provider_b)),
        }
    } else {
        Route {
            preferred: (ProviderId::ProviderB, echo_or(provider_b)),
            alternate: (ProviderId::ProviderA, echo_or(provider_a)),
        }
    }
}

/// Returns the first ready candidate between preferred and alternate
/// (spec.md §4.11 "Failover: if the preferred provider is not ready and
/// the alternate is, switch"), or `None` if neither is ready.
fn pick_ready<'a>(
    route: &Route,
    snapshot: &gateway_core::PoolStatusSnapshot,
    provider_a: &'a ProviderDescriptor,
    provider_b: &'a ProviderDescriptor,
) -> Option<(ProviderId, &'a ProviderDescriptor, String)> {
    let descriptor_for = |id: ProviderId| -> &'a ProviderDescriptor {
        match id {
            ProviderId::ProviderA => provider_a,
            ProviderId::ProviderB => provider_b,
            ProviderId::Premium => unreachable!("chat gateway is free-pool-only"),
        }
    };
    let is_ready = |id: ProviderId| -> bool {
        let descriptor = descriptor_for(id);
        if !descriptor.is_configured() {
            return false;
        }
        match id {
            ProviderId::ProviderA => snapshot.provider_a_ready,
            ProviderId::ProviderB => snapshot.provider_b_ready,
            ProviderId::Premium => false,
        }
    };

    let (pref_id, pref_model) = &route.preferred;
    if is_ready(*pref_id) {
        return Some((*pref_id, descriptor_for(*pref_id), pref_model.clone()));
    }
    let (alt_id, alt_model) = &route.alternate;
    if is_ready(*alt_id) {
        return Some((*alt_id, descriptor_for(*alt_id), alt_model.clone()));
    }
    None
}

/// Concatenates every `messages[].content` string for the §4.8 step 2
/// Chinese-character heuristic.
fn extract_message_text(payload: &Value) -> String {
    let mut out = String::new();
    if let Some(messages) = payload.get("messages").and_then(|v| v.as_array()) {
        for message in messages {
            if let Some(content) = message.get("content").and_then(|v| v.as_str()) {
                out.push_str(content);
                out.push(' ');
            }
        }
    }
    out
}

async fn buffered_response(
    state: &AppState,
    endpoint: &str,
    api_key: &str,
    payload: Value,
    model: &str,
    provider_id: ProviderId,
    start: Instant,
    client_ip: &str,
) -> Response {
    match state.client.call_raw(endpoint, api_key, payload, model).await {
        Ok(upstream) => {
            let status = upstream.status();
            let content_type = upstream
                .headers()
                .get(axum::http::header::CONTENT_TYPE)
                .cloned();
            let body = upstream.bytes().await.unwrap_or_default();

            log_access(state, provider_id, status.as_u16(), None, start, "/v1/chat/completions", false, client_ip, None);

            let mut response = Response::builder().status(status.as_u16());
            if let Some(ct) = content_type {
                response = response.header(axum::http::header::CONTENT_TYPE, ct);
            }
            response.body(axum::body::Body::from(body)).unwrap_or_else(|_| {
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            })
        }
        Err(err) => {
            log_access(state, provider_id, 502, None, start, "/v1/chat/completions", false, client_ip, Some(err.to_string()));
            error_json_response(StatusCode::BAD_GATEWAY, "ai_call_failed", &err.to_string())
        }
    }
}

async fn stream_response(
    state: &AppState,
    endpoint: &str,
    api_key: &str,
    payload: Value,
    model: &str,
    provider_id: ProviderId,
    start: Instant,
    client_ip: &str,
) -> Response {
    match state.client.call_stream_raw(endpoint, api_key, payload, model).await {
        Ok(upstream) => {
            let (body, stats_rx) = gateway_llm::proxy_stream(upstream, start);

            let state = state.clone();
            let client_ip = client_ip.to_string();
            tokio::spawn(async move {
                if let Ok(stats) = stats_rx.await {
                    log_access(
                        &state,
                        provider_id,
                        stats.status_code,
                        stats.first_byte_ms,
                        start,
                        "/v1/chat/completions",
                        true,
                        &client_ip,
                        None,
                    );
                }
            });

            sse_response(body)
        }
        Err(err) => {
            log_access(state, provider_id, 502, None, start, "/v1/chat/completions", true, client_ip, Some(err.to_string()));
            sse_response(gateway_llm::error_events(&err.to_string(), "upstream_error"))
        }
    }
}

/// Wraps a body in the SSE headers spec.md §4.9 step 2 requires, flushed
/// before any upstream bytes arrive.
fn sse_response(body: axum::body::Body) -> Response {
    Response::builder()
        .status(StatusCode::OK)
        .header(axum::http::header::CONTENT_TYPE, "text/event-stream; charset=utf-8")
        .header(axum::http::header::CACHE_CONTROL, "no-cache, no-transform")
        .header(axum::http::header::CONNECTION, "keep-alive")
        .header("X-Accel-Buffering", "no")
        .body(body)
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

fn unavailable_response(stream: bool, start: Instant, state: &AppState, client_ip: &str) -> Response {
    log_access_str(state, "none", 503, None, start, "/v1/chat/completions", stream, client_ip, Some("service_unavailable".to_string()));
    if stream {
        sse_response(gateway_llm::error_events("no upstream provider is ready", "service_unavailable"))
    } else {
        error_json_response(StatusCode::SERVICE_UNAVAILABLE, "service_unavailable", "no upstream provider is ready")
    }
}

fn error_json_response(status: StatusCode, code: &'static str, message: &str) -> Response {
    (
        status,
        Json(serde_json::json!({"ok": false, "error": {"code": code, "message": message}})),
    )
        .into_response()
}

#[allow(clippy::too_many_arguments)]
fn log_access(
    state: &AppState,
    provider: ProviderId,
    status_code: u16,
    first_byte_ms: Option<u64>,
    start: Instant,
    path: &str,
    stream: bool,
    client_ip: &str,
    note: Option<String>,
) {
    log_access_str(state, &provider.to_string(), status_code, first_byte_ms, start, path, stream, client_ip, note);
}

#[allow(clippy::too_many_arguments)]
fn log_access_str(
    state: &AppState,
    provider: &str,
    status_code: u16,
    first_byte_ms: Option<u64>,
    start: Instant,
    path: &str,
    stream: bool,
    client_ip: &str,
    note: Option<String>,
) {
    let record = AccessLogRecord {
        ts: chrono::Utc::now().to_rfc3339(),
        provider: provider.to_string(),
        status_code,
        first_byte_ms,
        total_latency_ms: start.elapsed().as_millis() as u64,
        path: path.to_string(),
        stream,
        ip: client_ip.to_string(),
        note,
    };
    state.access_log.append_json(&record);
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway_core::Tier;

    fn descriptor(id: ProviderId, key: &str) -> ProviderDescriptor {
        ProviderDescriptor {
            id,
            api_key: key.to_string(),
            base_url: "https://example.test".to_string(),
            default_model: format!("{id}-default"),
            tier: Tier::Free,
        }
    }

    #[test]
    fn deepseek_substring_forces_provider_a() {
        let a = descriptor(ProviderId::ProviderA, "key-a");
        let b = descriptor(ProviderId::ProviderB, "key-b");
        let route = decide_route("deepseek-chat", "hello", &a, &b);
        assert_eq!(route.preferred.0, ProviderId::ProviderA);
        assert_eq!(route.preferred.1, "provider-a-default");
    }

    #[test]
    fn llama_substring_forces_provider_b() {
        let a = descriptor(ProviderId::ProviderA, "key-a");
        let b = descriptor(ProviderId::ProviderB, "key-b");
        let route = decide_route("meta-llama-3", "hello", &a, &b);
        assert_eq!(route.preferred.0, ProviderId::ProviderB);
    }

    #[test]
    fn chinese_input_without_known_model_prefers_provider_a_and_echoes_model() {
        let a = descriptor(ProviderId::ProviderA, "key-a");
        let b = descriptor(ProviderId::ProviderB, "key-b");
        let route = decide_route("gpt-4", "你好", &a, &b);
        assert_eq!(route.preferred.0, ProviderId::ProviderA);
        assert_eq!(route.preferred.1, "gpt-4");
    }

    #[test]
    fn non_chinese_input_without_known_model_prefers_provider_b_and_falls_back_to_default() {
        let a = descriptor(ProviderId::ProviderA, "key-a");
        let b = descriptor(ProviderId::ProviderB, "key-b");
        let route = decide_route("", "hello world", &a, &b);
        assert_eq!(route.preferred.0, ProviderId::ProviderB);
        assert_eq!(route.preferred.1, "provider-b-default");
    }

    #[test]
    fn pick_ready_fails_over_to_alternate() {
        let a = descriptor(ProviderId::ProviderA, "key-a");
        let b = descriptor(ProviderId::ProviderB, "key-b");
        let route = decide_route("deepseek-chat", "hello", &a, &b);
        let snapshot = gateway_core::PoolStatusSnapshot {
            provider_a_ready: false,
            provider_b_ready: true,
        };
        let picked = pick_ready(&route, &snapshot, &a, &b).unwrap();
        assert_eq!(picked.0, ProviderId::ProviderB);
    }

    #[test]
    fn pick_ready_returns_none_when_neither_ready() {
        let a = descriptor(ProviderId::ProviderA, "key-a");
        let b = descriptor(ProviderId::ProviderB, "key-b");
        let route = decide_route("deepseek-chat", "hello", &a, &b);
        let snapshot = gateway_core::PoolStatusSnapshot {
            provider_a_ready: false,
            provider_b_ready: false,
        };
        assert!(pick_ready(&route, &snapshot, &a, &b).is_none());
    }

    #[test]
    fn extracts_and_concatenates_message_text() {
        let payload = serde_json::json!({
            "messages": [
                {"role": "system", "content": "a"},
                {"role": "user", "content": "b"}
            ]
        });
        assert_eq!(extract_message_text(&payload), "a b ");
    }
}
