use serde::Serialize;
use std::fmt;

/// Sentinel prefix meaning "unconfigured" per spec.md §9.
pub const PLACEHOLDER_PREFIX: &str = "REPLACE_WITH_";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderId {
    ProviderA,
    ProviderB,
    Premium,
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProviderId::ProviderA => "provider-a",
            ProviderId::ProviderB => "provider-b",
            ProviderId::Premium => "premium",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Free,
    Premium,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Tier::Free => "free",
            Tier::Premium => "premium",
        })
    }
}

/// Provider descriptor (spec.md §3). A descriptor is "configured" iff its
/// api_key is non-empty and does not begin with [`PLACEHOLDER_PREFIX`].
#[derive(Debug, Clone)]
pub struct ProviderDescriptor {
    pub id: ProviderId,
    pub api_key: String,
    pub base_url: String,
    pub default_model: String,
    pub tier: Tier,
}

impl ProviderDescriptor {
    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty() && !self.api_key.starts_with(PLACEHOLDER_PREFIX)
    }
}

/// Pool-status snapshot (spec.md §3), cached under `pool_status_v2`.
#[derive(Debug, Clone, Copy, Default, Serialize, serde::Deserialize)]
pub struct PoolStatusSnapshot {
    pub provider_a_ready: bool,
    pub provider_b_ready: bool,
}
