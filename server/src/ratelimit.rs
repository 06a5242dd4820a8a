//! Fixed-window rate limiter (spec.md §4.3). Generalized from the
//! teacher's `RateLimiter` (`keyvault/src/auth.rs`, a lock-guarded map of
//! per-caller timestamp vectors) to the spec's required fixed window keyed
//! by `floor(now/60)` rather than a sliding window of timestamps
//! (DESIGN.md Open Question 1) — the lock-guarded-map *mechanism* is kept,
//! the windowing arithmetic changes.

use gateway_cache::Cache;

const WINDOW_SECONDS: u64 = 60;
const BUCKET_TTL_SECONDS: u64 = 70;

/// Checks and increments the bucket for `ip` at the current minute.
/// Returns `Ok(())` if the request is allowed, `Err(limit)` if it exceeds
/// `limit` (spec.md §4.3: rejects with HTTP 429 `rate_limited` carrying
/// `meta.limit_per_minute`).
pub fn check(cache: &Cache, ip: &str, limit: u32) -> Result<(), u32> {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    let bucket = now / WINDOW_SECONDS;
    let digest = md5::compute(ip.as_bytes());
    let key = format!("rl:{digest:x}:{bucket}");

    let current: u32 = cache.get(&key).and_then(|v| v.parse().ok()).unwrap_or(0);
    let next = current + 1;
    cache.set(&key, next.to_string(), BUCKET_TTL_SECONDS);

    if next > limit {
        Err(limit)
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_requests_within_limit() {
        let cache = Cache::new();
        assert!(check(&cache, "1.2.3.4", 2).is_ok());
        assert!(check(&cache, "1.2.3.4", 2).is_ok());
    }

    #[test]
    fn rejects_the_request_beyond_the_limit() {
        let cache = Cache::new();
        assert!(check(&cache, "1.2.3.4", 2).is_ok());
        assert!(check(&cache, "1.2.3.4", 2).is_ok());
        assert_eq!(check(&cache, "1.2.3.4", 2), Err(2));
    }

    #[test]
    fn separate_ips_have_independent_buckets() {
        let cache = Cache::new();
        assert!(check(&cache, "1.1.1.1", 1).is_ok());
        assert!(check(&cache, "2.2.2.2", 1).is_ok());
    }
}
