//! End-to-end scenarios S1-S8 (spec.md §8), driven against the real
//! router via `tower::ServiceExt::oneshot`, matching the reference
//! crate's own router-level test style (`http.rs::test_router_creation`).

use axum::body::Body;
use axum::extract::connect_info::ConnectInfo;
use axum::http::{Request, StatusCode};
use gateway_core::{ProviderDescriptor, ProviderId, Tier};
use gateway_server::state::AppState;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn unconfigured(id: ProviderId) -> ProviderDescriptor {
    ProviderDescriptor {
        id,
        api_key: "REPLACE_WITH_KEY".to_string(),
        base_url: "http://127.0.0.1:1".to_string(),
        default_model: "unused".to_string(),
        tier: Tier::Free,
    }
}

fn configured(id: ProviderId, base_url: &str) -> ProviderDescriptor {
    ProviderDescriptor {
        id,
        api_key: "test-key".to_string(),
        base_url: base_url.to_string(),
        default_model: "test-model".to_string(),
        tier: Tier::Free,
    }
}

fn test_state(
    dir: &std::path::Path,
    provider_a: ProviderDescriptor,
    provider_b: ProviderDescriptor,
    rate_limit_per_minute: u32,
) -> AppState {
    AppState {
        cache: Arc::new(gateway_cache::Cache::new()),
        client: Arc::new(gateway_llm::UpstreamClient::new()),
        provider_a: Arc::new(provider_a),
        provider_b: Arc::new(provider_b),
        premium: Arc::new(unconfigured(ProviderId::Premium)),
        allow_list: Arc::new(Vec::new()),
        parse_key: Arc::new(None),
        rate_limit_per_minute,
        monetization_log: Arc::new(
            gateway_server::logging::LogWriter::open(dir.join("ps_parse.log")).unwrap(),
        ),
        access_log: Arc::new(
            gateway_server::logging::LogWriter::open(dir.join("api_access.log")).unwrap(),
        ),
    }
}

fn test_addr() -> SocketAddr {
    "127.0.0.1:9999".parse().unwrap()
}

fn raw_request(method: &str, uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .extension(ConnectInfo(test_addr()))
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn read_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn read_text(response: axum::response::Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn s1_json_passthrough() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(dir.path(), unconfigured(ProviderId::ProviderA), unconfigured(ProviderId::ProviderB), 10);
    let app = gateway_server::build_router(state);

    let body = r#"{"a":1,"b":[true,null]}"#;
    let req = raw_request("POST", "/v1/parse?mode=auto", body);
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let value = read_json(resp).await;
    assert_eq!(value["data"], json!({"a": 1, "b": [true, null]}));
    assert_eq!(value["meta"]["mode"], "json");
}

#[tokio::test]
async fn s2_kv_lines() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(dir.path(), unconfigured(ProviderId::ProviderA), unconfigured(ProviderId::ProviderB), 10);
    let app = gateway_server::build_router(state);

    let body = "name=alice\nage=30\n# comment\npath=/tmp\n";
    let req = raw_request("POST", "/v1/parse?mode=kv", body);
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let value = read_json(resp).await;
    assert_eq!(
        value["data"],
        json!({"name": "alice", "age": "30", "path": "/tmp"})
    );
}

#[tokio::test]
async fn s3_csv() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(dir.path(), unconfigured(ProviderId::ProviderA), unconfigured(ProviderId::ProviderB), 10);
    let app = gateway_server::build_router(state);

    let body = "col a,b\n1,2\n3,4";
    let req = raw_request("POST", "/v1/parse?mode=csv", body);
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let value = read_json(resp).await;
    assert_eq!(
        value["data"],
        json!([{"col_a": "1", "b": "2"}, {"col_a": "3", "b": "4"}])
    );
}

#[tokio::test]
async fn s4_invalid_mode() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(dir.path(), unconfigured(ProviderId::ProviderA), unconfigured(ProviderId::ProviderB), 10);
    let app = gateway_server::build_router(state);

    let req = raw_request("POST", "/v1/parse?mode=xml", "irrelevant body");
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let value = read_json(resp).await;
    assert_eq!(value["error"]["code"], "invalid_mode");
}

#[tokio::test]
async fn s5_invalid_target_lang() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(dir.path(), unconfigured(ProviderId::ProviderA), unconfigured(ProviderId::ProviderB), 10);
    let app = gateway_server::build_router(state);

    let req = raw_request("POST", "/v1/parse?mode=json&target_lang=fr", r#"{"a":1}"#);
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let value = read_json(resp).await;
    assert_eq!(value["error"]["code"], "invalid_target_lang");
}

#[tokio::test]
async fn s6_rate_limit() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(dir.path(), unconfigured(ProviderId::ProviderA), unconfigured(ProviderId::ProviderB), 2);
    let app = gateway_server::build_router(state);

    for _ in 0..2 {
        let req = raw_request("POST", "/v1/parse?mode=json", r#"{"a":1}"#);
        let resp = app.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    let req = raw_request("POST", "/v1/parse?mode=json", r#"{"a":1}"#);
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    let value = read_json(resp).await;
    assert_eq!(value["error"]["code"], "rate_limited");
}

#[tokio::test]
async fn s7_stream_error_yields_error_then_done_events() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(json!({"error": {"message": "boom"}})),
        )
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    // non-Chinese input prefers provider-b (spec.md §4.8 step 2); point it
    // at the mock upstream.
    let state = test_state(
        dir.path(),
        unconfigured(ProviderId::ProviderA),
        configured(ProviderId::ProviderB, &mock_server.uri()),
        10,
    );
    let app = gateway_server::build_router(state);

    let body = json!({"model": "x", "stream": true, "messages": [{"role": "user", "content": "hello"}]});
    let req = raw_request("POST", "/v1/chat/completions", &body.to_string());
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let text = read_text(resp).await;
    assert_eq!(
        text,
        "data: {\"error\":{\"message\":\"boom\",\"type\":\"server_error\",\"code\":\"upstream_error\"}}\n\ndata: [DONE]\n\n"
    );
}

#[tokio::test]
async fn s8_contract_violation_lists_missing_fields() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"content": "{\"schema_version\":\"x\"}"}}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
        })))
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let state = test_state(
        dir.path(),
        unconfigured(ProviderId::ProviderA),
        configured(ProviderId::ProviderB, &mock_server.uri()),
        10,
    );
    let app = gateway_server::build_router(state);

    let req = raw_request("POST", "/v1/parse?mode=ecom", "a widget listing in plain prose");
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let value = read_json(resp).await;
    assert_eq!(value["error"]["code"], "contract_violation");
    let message = value["error"]["message"].as_str().unwrap();
    for field in ["title", "price", "currency", "spec", "skus", "bullet_points"] {
        assert!(message.contains(field), "expected {message} to list {field}");
    }
}

#[tokio::test]
async fn health_and_pool_status_endpoints() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(dir.path(), unconfigured(ProviderId::ProviderA), unconfigured(ProviderId::ProviderB), 10);
    let app = gateway_server::build_router(state);

    let req = raw_request("GET", "/v1/parse/health", "");
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let value = read_json(resp).await;
    assert_eq!(value["ok"], true);
    assert_eq!(value["service"], "api.v1.parse");

    let req = raw_request("GET", "/v1/parse/pool_status", "");
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let value = read_json(resp).await;
    assert_eq!(value["data"]["provider_a_ready"], false);
}
