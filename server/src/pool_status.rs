//! Pool-status snapshot (spec.md §3/§4.8): cached under `pool_status_v2`;
//! computed from live config when the cache entry is missing.

use crate::state::AppState;
use gateway_core::PoolStatusSnapshot;

const CACHE_KEY: &str = "pool_status_v2";
const TTL_SECONDS: u64 = 60;

pub fn get(state: &AppState) -> PoolStatusSnapshot {
    if let Some(raw) = state.cache.get(CACHE_KEY) {
        if let Ok(snapshot) = serde_json::from_str(&raw) {
            return snapshot;
        }
    }
    refresh(state)
}

/// Recomputes readiness from live config and writes it back to the cache
/// — the behavior backing the `/v1/parse/pool_status` self-check endpoint
/// (spec.md §6).
pub fn refresh(state: &AppState) -> PoolStatusSnapshot {
    let snapshot = PoolStatusSnapshot {
        provider_a_ready: state.provider_a.is_configured(),
        provider_b_ready: state.provider_b.is_configured(),
    };
    if let Ok(raw) = serde_json::to_string(&snapshot) {
        state.cache.set(CACHE_KEY, raw, TTL_SECONDS);
    }
    snapshot
}
