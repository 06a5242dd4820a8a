//! Parse orchestrator (spec.md §4.10): mode dispatch, cascade, response
//! envelope, monetization log.

use crate::state::AppState;
use crate::{auth, ip, pool_status, ratelimit};
use axum::body::Bytes;
use axum::extract::{ConnectInfo, Query, State};
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use gateway_core::{DeepseekMeta, Mode, ParseMeta, ParseResponse, TargetLang};
use gateway_llm::{router, FreePoolError};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Instant;

const MAX_INPUT_BYTES: usize = 256 * 1024;

pub async fn handle(
    State(state): State<AppState>,
    method: Method,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    body: Bytes,
) -> Response {
    let start = Instant::now();
    let request_id = uuid::Uuid::new_v4().to_string();
    let client_ip = ip::resolve(&headers, Some(peer));

    if method != Method::GET && method != Method::POST {
        return err_response(
            &state,
            StatusCode::METHOD_NOT_ALLOWED,
            "method_not_allowed",
            "method not allowed".to_string(),
            request_id,
            ParseMeta::default(),
            "",
            &client_ip,
            body.len(),
            start,
        );
    }

    if !auth::check_parse_key(state.parse_key.as_deref(), &headers, &query) {
        return err_response(
            &state,
            StatusCode::UNAUTHORIZED,
            "unauthorized",
            "unauthorized".to_string(),
            request_id,
            ParseMeta::default(),
            "",
            &client_ip,
            body.len(),
            start,
        );
    }

    if let Err(limit) = ratelimit::check(&state.cache, &client_ip, state.rate_limit_per_minute) {
        return err_response_with_meta(
            &state,
            StatusCode::TOO_MANY_REQUESTS,
            "rate_limited",
            "rate limit exceeded".to_string(),
            request_id,
            serde_json::json!({ "limit_per_minute": limit }),
            "",
            &client_ip,
            body.len(),
            start,
        );
    }

    let body_json: Option<gateway_core::ParseRequest> = serde_json::from_slice(&body).ok();
    let get = |key: &str| -> Option<String> {
        let from_body = body_json.as_ref().and_then(|b| match key {
            "mode" => b.mode.clone(),
            "target_lang" => b.target_lang.clone(),
            "instruction" => b.instruction.clone(),
            "data" => b.data.clone(),
            "url" => b.url.clone(),
            _ => None,
        });
        from_body
            .filter(|s| !s.is_empty())
            .or_else(|| query.get(key).cloned())
    };

    let mode_raw = get("mode").unwrap_or_else(|| "auto".to_string());
    let Ok(mode) = Mode::try_from(mode_raw.as_str()) else {
        return err_response(
            &state,
            StatusCode::BAD_REQUEST,
            "invalid_mode",
            format!("unknown mode: {mode_raw}"),
            request_id,
            ParseMeta { mode: mode_raw.clone(), ..Default::default() },
            &mode_raw,
            &client_ip,
            body.len(),
            start,
        );
    };

    let target_lang_raw = get("target_lang").unwrap_or_default();
    let target_lang = match TargetLang::normalize(&target_lang_raw) {
        Ok(t) => t,
        Err(()) => {
            return err_response(
                &state,
                StatusCode::BAD_REQUEST,
                "invalid_target_lang",
                format!("unknown target_lang: {target_lang_raw}"),
                request_id,
                ParseMeta { mode: mode.to_string(), ..Default::default() },
                &mode.to_string(),
                &client_ip,
                body.len(),
                start,
            );
        }
    };

    let url = get("url");
    let instruction = get("instruction").unwrap_or_default();
    let data_field = get("data");
    let effective_body: String = match data_field {
        Some(d) if !d.is_empty() => d,
        _ => String::from_utf8_lossy(&body).into_owned(),
    };

    let mut meta = ParseMeta {
        mode: mode.to_string(),
        input_bytes: effective_body.len(),
        url: url.clone(),
        deepseek: None,
        target_lang: target_lang.map(|t| t.as_str().to_string()),
    };

    if effective_body.len() > MAX_INPUT_BYTES {
        return err_response(
            &state,
            StatusCode::PAYLOAD_TOO_LARGE,
            "payload_too_large",
            "input exceeds 256 KiB".to_string(),
            request_id,
            meta,
            &mode.to_string(),
            &client_ip,
            effective_body.len(),
            start,
        );
    }

    if effective_body.trim().is_empty() {
        return err_response(
            &state,
            StatusCode::BAD_REQUEST,
            "empty_payload",
            "empty payload".to_string(),
            request_id,
            meta,
            &mode.to_string(),
            &client_ip,
            effective_body.len(),
            start,
        );
    }

    let auth_token = auth::extract_bearer_token(&headers);

    let cascade = try_list(mode);
    if cascade.is_empty() {
        return err_response(
            &state,
            StatusCode::BAD_REQUEST,
            "invalid_mode",
            format!("unsupported mode: {mode}"),
            request_id,
            meta,
            &mode.to_string(),
            &client_ip,
            effective_body.len(),
            start,
        );
    }

    for (idx, entry) in cascade.iter().enumerate() {
        let is_last = idx + 1 == cascade.len();
        match entry {
            CascadeEntry::Local(local_mode) => {
                let parsed = match local_mode {
                    Mode::Json => gateway_parsers::parse_json(&effective_body),
                    Mode::Query => gateway_parsers::parse_query(&effective_body),
                    Mode::Kv => gateway_parsers::parse_kv(&effective_body),
                    Mode::Csv => gateway_parsers::parse_csv(&effective_body),
                    _ => None,
                };
                if let Some(value) = parsed {
                    meta.mode = local_mode.to_string();
                    let resp = ParseResponse::ok(request_id.clone(), value, meta.clone());
                    log_monetization(&state, &resp, &mode.to_string(), &client_ip, effective_body.len(), start, None);
                    return (StatusCode::OK, Json(resp)).into_response();
                }
                if is_last {
                    return err_response(
                        &state,
                        StatusCode::BAD_REQUEST,
                        "parse_failed",
                        "no parser in the cascade succeeded".to_string(),
                        request_id,
                        meta,
                        &mode.to_string(),
                        &client_ip,
                        effective_body.len(),
                        start,
                    );
                }
            }
            CascadeEntry::Upstream(prompt_mode) => {
                let system_text = gateway_prompts::with_language_alignment(
                    &gateway_prompts::effective_instruction(*prompt_mode, &instruction),
                    target_lang,
                );
                let snapshot = pool_status::get(&state);

                let outcome = attempt_upstream(
                    &state,
                    auth_token.as_deref(),
                    &snapshot,
                    &effective_body,
                    &system_text,
                ).await;

                match outcome {
                    Ok((provider, tier, response)) => {
                        let contract_key = prompt_mode.contract_key();
                        match gateway_contracts::validate(contract_key, &response.json_object) {
                            Ok(()) => {
                                meta.mode = prompt_mode.to_string();
                                meta.deepseek = Some(DeepseekMeta {
                                    provider: provider.to_string(),
                                    tier: tier.to_string(),
                                    input_tokens: response.usage.prompt_tokens,
                                    output_tokens: response.usage.completion_tokens,
                                    model: response.model.clone(),
                                });
                                let resp = ParseResponse::ok(request_id.clone(), response.json_object, meta.clone());
                                log_monetization(&state, &resp, &mode.to_string(), &client_ip, effective_body.len(), start, Some((&provider.to_string(), &tier.to_string(), &response.model, response.usage.prompt_tokens, response.usage.completion_tokens)));
                                return (StatusCode::OK, Json(resp)).into_response();
                            }
                            Err(missing) => {
                                let message = format!("missing or invalid fields: {}", missing.join(","));
                                return err_response(
                                    &state,
                                    StatusCode::UNPROCESSABLE_ENTITY,
                                    "contract_violation",
                                    message,
                                    request_id,
                                    meta,
                                    &mode.to_string(),
                                    &client_ip,
                                    effective_body.len(),
                                    start,
                                );
                            }
                        }
                    }
                    Err(not_configured) if *prompt_mode == Mode::Auto && not_configured => {
                        // swallow `deepseek_not_configured` in the auto cascade, continue
                        continue;
                    }
                    Err(_) => {
                        return err_response(
                            &state,
                            StatusCode::BAD_GATEWAY,
                            "ai_call_failed",
                            "upstream call failed".to_string(),
                            request_id,
                            meta,
                            &mode.to_string(),
                            &client_ip,
                            effective_body.len(),
                            start,
                        );
                    }
                }
            }
        }
    }

    err_response(
        &state,
        StatusCode::BAD_REQUEST,
        "parse_failed",
        "cascade exhausted".to_string(),
        request_id,
        meta,
        &mode.to_string(),
        &client_ip,
        effective_body.len(),
        start,
    )
}

enum CascadeEntry {
    Local(Mode),
    Upstream(Mode),
}

fn try_list(mode: Mode) -> Vec<CascadeEntry> {
    match mode {
        Mode::Auto => vec![
            CascadeEntry::Local(Mode::Json),
            CascadeEntry::Upstream(Mode::Auto),
            CascadeEntry::Local(Mode::Query),
            CascadeEntry::Local(Mode::Kv),
            CascadeEntry::Local(Mode::Csv),
        ],
        Mode::Json => vec![CascadeEntry::Local(Mode::Json)],
        Mode::Query => vec![CascadeEntry::Local(Mode::Query)],
        Mode::Kv => vec![CascadeEntry::Local(Mode::Kv)],
        Mode::Csv => vec![CascadeEntry::Local(Mode::Csv)],
        Mode::Deepseek => vec![CascadeEntry::Upstream(Mode::Deepseek)],
        Mode::Ecom => vec![CascadeEntry::Upstream(Mode::Ecom)],
        Mode::News => vec![CascadeEntry::Upstream(Mode::News)],
        Mode::Social => vec![CascadeEntry::Upstream(Mode::Social)],
    }
}

/// Returns `Ok((provider, tier, response))` on success, or
/// `Err(true)` for the `deepseek_not_configured` sentinel (swallowable in
/// the auto cascade), `Err(false)` for any other failure.
async fn attempt_upstream(
    state: &AppState,
    auth_token: Option<&str>,
    snapshot: &gateway_core::PoolStatusSnapshot,
    raw_text: &str,
    system_text: &str,
) -> Result<(gateway_core::ProviderId, gateway_core::Tier, gateway_llm::CallResponse), bool> {
    if let Some(token) = auth_token {
        if gateway_core::is_allow_listed(token, &state.allow_list) {
            if let Ok(response) = router::call_premium(&state.client, &state.premium, system_text, raw_text).await {
                return Ok((gateway_core::ProviderId::Premium, gateway_core::Tier::Premium, response));
            }
            // Premium failure silently downgrades to free pool (spec.md §4.8 step 1 / DESIGN.md Open Question 4).
        }
    }

    match router::call_free_pool(&state.client, &state.provider_a, &state.provider_b, snapshot, raw_text, system_text, raw_text).await {
        Ok((provider, response)) => {
            let tier = if matches!(provider, gateway_core::ProviderId::Premium) {
                gateway_core::Tier::Premium
            } else {
                gateway_core::Tier::Free
            };
            Ok((provider, tier, response))
        }
        Err(FreePoolError::NotConfigured) => Err(true),
        Err(FreePoolError::Upstream(_, _)) => Err(false),
    }
}

/// Builds the error envelope, logs the monetization line for the failed
/// request (spec.md §3: the log record's `ok`/`error_code` fields must be
/// reachable from error paths, not just successes), and returns the HTTP
/// response.
#[allow(clippy::too_many_arguments)]
fn err_response(
    state: &AppState,
    status: StatusCode,
    code: &'static str,
    message: String,
    request_id: String,
    meta: ParseMeta,
    requested_mode: &str,
    client_ip: &str,
    input_bytes: usize,
    start: Instant,
) -> Response {
    let resp = ParseResponse::err(request_id, code, message, meta);
    log_monetization(state, &resp, requested_mode, client_ip, input_bytes, start, None);
    (status, Json(resp)).into_response()
}

#[allow(clippy::too_many_arguments)]
fn err_response_with_meta(
    state: &AppState,
    status: StatusCode,
    code: &'static str,
    message: String,
    request_id: String,
    meta_value: serde_json::Value,
    requested_mode: &str,
    client_ip: &str,
    input_bytes: usize,
    start: Instant,
) -> Response {
    #[derive(serde::Serialize)]
    struct RawMetaResponse {
        ok: bool,
        request_id: String,
        ts: String,
        error: RawError,
        meta: serde_json::Value,
    }
    #[derive(serde::Serialize)]
    struct RawError {
        code: &'static str,
        message: String,
    }

    let record = gateway_core::MonetizationLogRecord {
        ts: chrono::Utc::now().to_rfc3339(),
        request_id: request_id.clone(),
        ok: false,
        mode: requested_mode.to_string(),
        resolved_mode: requested_mode.to_string(),
        client_ip: client_ip.to_string(),
        input_bytes,
        input_tokens: None,
        output_tokens: None,
        provider: None,
        tier: None,
        model: None,
        duration_ms: start.elapsed().as_millis() as u64,
        error_code: Some(code.to_string()),
    };
    state.monetization_log.append_json(&record);

    let body = RawMetaResponse {
        ok: false,
        request_id,
        ts: chrono::Utc::now().to_rfc3339(),
        error: RawError { code, message },
        meta: meta_value,
    };
    (status, Json(body)).into_response()
}

#[allow(clippy::too_many_arguments)]
fn log_monetization(
    state: &AppState,
    resp: &ParseResponse,
    requested_mode: &str,
    client_ip: &str,
    input_bytes: usize,
    start: Instant,
    upstream: Option<(&str, &str, &str, u64, u64)>,
) {
    let (provider, tier, model, input_tokens, output_tokens) = match upstream {
        Some((p, t, m, i, o)) => (Some(p.to_string()), Some(t.to_string()), Some(m.to_string()), Some(i), Some(o)),
        None => (None, None, None, None, None),
    };
    let record = gateway_core::MonetizationLogRecord {
        ts: chrono::Utc::now().to_rfc3339(),
        request_id: resp.request_id.clone(),
        ok: resp.ok,
        mode: requested_mode.to_string(),
        resolved_mode: resp.meta.mode.clone(),
        client_ip: client_ip.to_string(),
        input_bytes,
        input_tokens,
        output_tokens,
        provider,
        tier,
        model,
        duration_ms: start.elapsed().as_millis() as u64,
        error_code: resp.error.as_ref().map(|e| e.code.to_string()),
    };
    state.monetization_log.append_json(&record);
}

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "ok": true, "service": "api.v1.parse", "ts": chrono::Utc::now().to_rfc3339() }))
}

pub async fn pool_status_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    let snapshot = pool_status::refresh(&state);
    Json(serde_json::json!({
        "ok": true,
        "data": {
            "free_pool_ready": snapshot.provider_a_ready || snapshot.provider_b_ready,
            "provider_a_ready": snapshot.provider_a_ready,
            "provider_b_ready": snapshot.provider_b_ready,
            "premium_ready": state.premium.is_configured(),
        }
    }))
}
