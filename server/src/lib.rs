//! AI gateway HTTP surface (spec.md §6): the parse orchestrator, its
//! health/pool-status self-checks, and the OpenAI-compatible chat
//! gateway. Split into a library so both the `gateway-server` binary and
//! the integration tests under `tests/` build the exact same router.

pub mod auth;
pub mod chat;
pub mod ip;
pub mod logging;
pub mod parse;
pub mod pool_status;
pub mod ratelimit;
pub mod state;

use axum::http::{HeaderName, Method};
use axum::routing::{any, get, post};
use axum::Router;
use state::AppState;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

fn allowed_headers() -> Vec<HeaderName> {
    vec![
        HeaderName::from_static("content-type"),
        HeaderName::from_static("x-api-key"),
        HeaderName::from_static("x-parse-key"),
        HeaderName::from_static("authorization"),
    ]
}

/// CORS preflight handling (spec.md §6): `Access-Control-Allow-Origin: *`,
/// the per-surface method set, the fixed allow-headers list, `Max-Age:
/// 86400`. `tower_http::cors::CorsLayer` answers `OPTIONS` preflights with
/// 204 automatically once these are set.
fn cors_layer(methods: Vec<Method>) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods(methods)
        .allow_headers(allowed_headers())
        .max_age(Duration::from_secs(86400))
}

/// Builds the full router (spec.md §6 endpoints), with CORS and tracing
/// layered on — grounded on `rust/gateway/src/main.rs`'s `create_router`
/// shape, generalized to this system's two surfaces.
pub fn build_router(state: AppState) -> Router {
    let parse_routes = Router::new()
        // `any` so every method reaches the handler's own GET/POST check
        // and returns the JSON-shaped `method_not_allowed` (spec.md §7)
        // rather than axum's bare 405 fallback.
        .route("/v1/parse", any(parse::handle))
        .route("/v1/parse/health", get(parse::health))
        .route("/v1/parse/pool_status", get(parse::pool_status_endpoint))
        .layer(cors_layer(vec![Method::GET, Method::POST, Method::OPTIONS]));

    let chat_routes = Router::new()
        .route("/v1/chat/completions", post(chat::handle))
        .layer(cors_layer(vec![Method::POST, Method::OPTIONS]));

    parse_routes
        .merge(chat_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
