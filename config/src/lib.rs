//! Config/env resolver (spec.md §4.1). Resolution order per setting:
//! (a) static config value if present and non-empty, (b) environment
//! variable, (c) hard-coded default. Any resolved value beginning with
//! the literal `REPLACE_WITH_` is treated as absent (spec.md Design Note
//! "Placeholder-as-absent").
//!
//! The three provider env-var triples are resolved directly by name
//! (spec.md §6 names exact variables, not a nested schema); the handful
//! of settings that benefit from an optional file override
//! (`rate_limit_per_minute`, `supported_modes`) go through the layered
//! `config` crate loader, mirroring the pack's `config`-crate settings
//! pattern noted in DESIGN.md.

use gateway_core::{ProviderDescriptor, ProviderId, Tier, PLACEHOLDER_PREFIX};
use std::env;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load layered settings: {0}")]
    Layering(#[from] config::ConfigError),
}

/// Honors the `REPLACE_WITH_` placeholder-as-absent rule uniformly across
/// every resolved setting, not just provider api_keys.
fn present(value: &str) -> bool {
    !value.is_empty() && !value.starts_with(PLACEHOLDER_PREFIX)
}

fn resolve_env(file_value: Option<String>, env_var: &str, default: &str) -> String {
    if let Some(v) = file_value {
        if present(&v) {
            return v;
        }
    }
    if let Ok(v) = env::var(env_var) {
        if present(&v) {
            return v;
        }
    }
    default.to_string()
}

pub struct Settings {
    layered: config::Config,
}

impl Settings {
    /// Loads optional `config/default.{toml,yaml,json,...}` (any format
    /// the `config` crate recognizes) if present; entirely optional, as
    /// this gateway runs fine from environment variables alone.
    pub fn load() -> Result<Self, ConfigError> {
        let layered = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .build()?;
        Ok(Settings { layered })
    }

    fn file_string(&self, key: &str) -> Option<String> {
        self.layered.get_string(key).ok()
    }

    pub fn api_keys(&self) -> Vec<String> {
        let raw = resolve_env(self.file_string("api_keys"), "PS_API_KEYS", "");
        raw.split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }

    pub fn parse_key(&self) -> Option<String> {
        let raw = resolve_env(self.file_string("parse_key"), "PS_PARSE_KEY", "");
        if present(&raw) {
            return Some(raw);
        }
        let raw = resolve_env(self.file_string("parse_key"), "PARSE_API_KEY", "");
        if present(&raw) {
            Some(raw)
        } else {
            None
        }
    }

    pub fn rate_limit_per_minute(&self) -> u32 {
        resolve_env(
            self.file_string("rate_limit_per_minute"),
            "PS_RATE_LIMIT_PER_MINUTE",
            "10",
        )
        .parse()
        .unwrap_or(10)
    }

    pub fn supported_modes(&self) -> Vec<String> {
        let raw = resolve_env(
            self.file_string("supported_modes"),
            "PS_SUPPORTED_MODES",
            "auto,json,query,kv,csv,deepseek,ecom,news,social",
        );
        raw.split(',').map(|s| s.trim().to_string()).collect()
    }

    /// Provider-A: DeepSeek — free-tier upstream preferred for Chinese-
    /// majority input per spec.md §4.8/§4.11.
    pub fn provider_a(&self) -> ProviderDescriptor {
        self.provider(
            ProviderId::ProviderA,
            Tier::Free,
            "DEEPSEEK_API_KEY",
            "DEEPSEEK_BASE_URL",
            "DEEPSEEK_MODEL",
            "https://api.deepseek.com/v1",
            "deepseek-chat",
        )
    }

    /// Provider-B: Groq — free-tier upstream preferred for non-Chinese
    /// input, serving the "llama" model family per spec.md §4.11.
    pub fn provider_b(&self) -> ProviderDescriptor {
        self.provider(
            ProviderId::ProviderB,
            Tier::Free,
            "GROQ_API_KEY",
            "GROQ_BASE_URL",
            "GROQ_MODEL",
            "https://api.groq.com/openai/v1",
            "llama-3.3-70b-versatile",
        )
    }

    /// Premium: SiliconFlow — auth-gated tier selected only for callers
    /// presenting an allow-listed bearer token, per spec.md §4.8 step 1.
    pub fn premium(&self) -> ProviderDescriptor {
        self.provider(
            ProviderId::Premium,
            Tier::Premium,
            "SILICONFLOW_API_KEY",
            "SILICONFLOW_BASE_URL",
            "SILICONFLOW_MODEL",
            "https://api.siliconflow.cn/v1",
            "deepseek-ai/DeepSeek-V3",
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn provider(
        &self,
        id: ProviderId,
        tier: Tier,
        key_var: &str,
        url_var: &str,
        model_var: &str,
        default_url: &str,
        default_model: &str,
    ) -> ProviderDescriptor {
        let api_key = resolve_env(self.file_string(&format!("{id}.api_key")), key_var, "");
        let base_url = resolve_env(self.file_string(&format!("{id}.base_url")), url_var, default_url)
            .trim_end_matches('/')
            .to_string();
        let default_model = resolve_env(
            self.file_string(&format!("{id}.model")),
            model_var,
            default_model,
        );
        ProviderDescriptor {
            id,
            api_key,
            base_url,
            default_model,
            tier,
        }
    }
}
