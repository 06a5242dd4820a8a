use gateway_cache::Cache;
use gateway_config::Settings;
use gateway_core::ProviderDescriptor;
use gateway_llm::UpstreamClient;
use std::sync::Arc;

use crate::logging::LogWriter;

/// Process-wide shared state (spec.md §5 "Shared resources"), built once
/// at startup and cloned cheaply into every handler — mirrors the
/// teacher's `AppState` in `rust/gateway/src/main.rs`, scaled down to
/// this system's actual collaborators.
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<Cache>,
    pub client: Arc<UpstreamClient>,
    pub provider_a: Arc<ProviderDescriptor>,
    pub provider_b: Arc<ProviderDescriptor>,
    pub premium: Arc<ProviderDescriptor>,
    pub allow_list: Arc<Vec<String>>,
    pub parse_key: Arc<Option<String>>,
    pub rate_limit_per_minute: u32,
    pub monetization_log: Arc<LogWriter>,
    pub access_log: Arc<LogWriter>,
}

impl AppState {
    pub fn from_settings(settings: &Settings) -> std::io::Result<Self> {
        Ok(AppState {
            cache: Arc::new(Cache::new()),
            client: Arc::new(UpstreamClient::new()),
            provider_a: Arc::new(settings.provider_a()),
            provider_b: Arc::new(settings.provider_b()),
            premium: Arc::new(settings.premium()),
            allow_list: Arc::new(settings.api_keys()),
            parse_key: Arc::new(settings.parse_key()),
            rate_limit_per_minute: settings.rate_limit_per_minute(),
            monetization_log: Arc::new(LogWriter::open("runtime/log/ps_parse.log")?),
            access_log: Arc::new(LogWriter::open("runtime/log/api_access.log")?),
        })
    }
}
