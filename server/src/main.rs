//! Gateway entrypoint (spec.md §6) — grounded on `rust/gateway/src/main.rs`'s
//! `clap::Parser` args + `tracing_subscriber::fmt::init()` + `axum::serve`
//! shape. Router construction lives in `lib.rs` so tests can reuse it.

use clap::Parser;
use gateway_server::state::AppState;
use std::net::SocketAddr;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(long, default_value_t = 8080)]
    port: u16,
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let settings = gateway_config::Settings::load().expect("failed to load settings");
    let state = AppState::from_settings(&settings).expect("failed to open log files");

    tracing::info!(
        provider_a_ready = state.provider_a.is_configured(),
        provider_b_ready = state.provider_b.is_configured(),
        premium_ready = state.premium.is_configured(),
        "provider readiness"
    );

    let app = gateway_server::build_router(state);

    let addr: SocketAddr = format!("{}:{}", args.host, args.port)
        .parse()
        .expect("invalid host/port");

    tracing::info!(%addr, "gateway listening");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("failed to bind listener");
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .await
        .expect("server error");
}
