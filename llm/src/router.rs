//! Provider router (spec.md §4.8). Grounded on `PoolManager::generate`'s
//! try-loop-with-fallback shape in `keyvault/src/pool/mod.rs`: try the
//! preferred candidate, record the failure, try the next, generalized
//! from the teacher's N-keys-of-one-provider round robin down to this
//! system's two-candidate free-pool selection plus an optional premium
//! attempt.

use crate::client::{CallError, CallResponse, UpstreamClient};
use gateway_core::{PoolStatusSnapshot, ProviderDescriptor, ProviderId};

/// First Han-range (U+4E00..=U+9FFF) character present anywhere in `text`
/// decides the free-pool preference per spec.md §4.8 step 2.
pub fn prefers_provider_a(text: &str) -> bool {
    text.chars().any(|c| ('\u{4E00}'..='\u{9FFF}').contains(&c))
}

#[derive(Debug)]
pub enum FreePoolError {
    /// Neither candidate is configured/ready — spec.md §4.8 step 4.
    NotConfigured,
    /// The last attempt's error, tagged with the provider that produced it.
    Upstream(ProviderId, CallError),
}

impl std::fmt::Display for FreePoolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FreePoolError::NotConfigured => write!(f, "free_pool_not_configured"),
            FreePoolError::Upstream(provider, err) => write!(f, "{provider}: {err}"),
        }
    }
}

fn ready(id: ProviderId, descriptor: &ProviderDescriptor, pool_status: &PoolStatusSnapshot) -> bool {
    if !descriptor.is_configured() {
        return false;
    }
    match id {
        ProviderId::ProviderA => pool_status.provider_a_ready,
        ProviderId::ProviderB => pool_status.provider_b_ready,
        ProviderId::Premium => true,
    }
}

/// Attempts the free pool in preference order, failing over to the other
/// candidate on any error (spec.md §4.8 steps 2-4).
#[allow(clippy::too_many_arguments)]
pub async fn call_free_pool(
    client: &UpstreamClient,
    provider_a: &ProviderDescriptor,
    provider_b: &ProviderDescriptor,
    pool_status: &PoolStatusSnapshot,
    text: &str,
    system_text: &str,
    user_text: &str,
) -> Result<(ProviderId, CallResponse), FreePoolError> {
    let order: [(ProviderId, &ProviderDescriptor); 2] = if prefers_provider_a(text) {
        [(ProviderId::ProviderA, provider_a), (ProviderId::ProviderB, provider_b)]
    } else {
        [(ProviderId::ProviderB, provider_b), (ProviderId::ProviderA, provider_a)]
    };

    let mut last_error: Option<(ProviderId, CallError)> = None;

    for (id, descriptor) in order {
        if !ready(id, descriptor, pool_status) {
            continue;
        }
        let endpoint = format!("{}/chat/completions", descriptor.base_url);
        match client
            .call(&endpoint, &descriptor.api_key, &descriptor.default_model, system_text, user_text)
            .await
        {
            Ok(response) => return Ok((id, response)),
            Err(err) => {
                tracing::warn!(provider = %id, error = %err, "free pool attempt failed");
                last_error = Some((id, err));
            }
        }
    }

    match last_error {
        Some((id, err)) => Err(FreePoolError::Upstream(id, err)),
        None => Err(FreePoolError::NotConfigured),
    }
}

/// Attempts the premium provider. Per spec.md §4.8 step 1, a premium
/// failure is never surfaced directly — callers fall through to
/// [`call_free_pool`] on any `Err` here (DESIGN.md Open Question 4).
pub async fn call_premium(
    client: &UpstreamClient,
    premium: &ProviderDescriptor,
    system_text: &str,
    user_text: &str,
) -> Result<CallResponse, CallError> {
    if !premium.is_configured() {
        return Err(CallError::Transport("premium_not_configured".to_string()));
    }
    let endpoint = format!("{}/chat/completions", premium.base_url);
    client
        .call(&endpoint, &premium.api_key, &premium.default_model, system_text, user_text)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_provider_a_for_chinese_input() {
        assert!(prefers_provider_a("你好世界"));
        assert!(!prefers_provider_a("hello world"));
    }

    #[test]
    fn mixed_input_with_any_han_character_prefers_provider_a() {
        assert!(prefers_provider_a("hello 世 world"));
    }
}
