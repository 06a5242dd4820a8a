//! A single injected cache interface (spec.md §4.2, Design Note "process-wide
//! state"). Grounded on the `SessionStore`/`RateLimiter` map-behind-a-lock
//! shape used throughout the teacher's code, simplified to a single
//! in-process TTL map since this system has no durability requirement.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

struct Entry {
    value: String,
    expires_at: Instant,
}

/// Key/value store with per-entry TTL. `get`/`set` need not be atomic
/// across calls — spec.md §4.2 explicitly tolerates race-induced
/// under-counting in the rate limiter built atop this cache.
pub struct Cache {
    entries: Mutex<HashMap<String, Entry>>,
}

impl Default for Cache {
    fn default() -> Self {
        Self::new()
    }
}

impl Cache {
    pub fn new() -> Self {
        Cache {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the value if present and not expired. Lazily evicts an
    /// expired entry on access rather than running a background sweeper.
    pub fn get(&self, key: &str) -> Option<String> {
        let mut entries = self.entries.lock().expect("cache lock poisoned");
        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn set(&self, key: &str, value: String, ttl_seconds: u64) {
        let mut entries = self.entries.lock().expect("cache lock poisoned");
        entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: Instant::now() + Duration::from_secs(ttl_seconds),
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_returns_none_for_missing_key() {
        let cache = Cache::new();
        assert_eq!(cache.get("nope"), None);
    }

    #[test]
    fn set_then_get_round_trips() {
        let cache = Cache::new();
        cache.set("k", "v".to_string(), 60);
        assert_eq!(cache.get("k"), Some("v".to_string()));
    }

    #[test]
    fn expired_entry_is_evicted() {
        let cache = Cache::new();
        cache.set("k", "v".to_string(), 0);
        std::thread::sleep(Duration::from_millis(10));
        assert_eq!(cache.get("k"), None);
    }

    #[test]
    fn overwrite_replaces_value_and_ttl() {
        let cache = Cache::new();
        cache.set("k", "v1".to_string(), 60);
        cache.set("k", "v2".to_string(), 60);
        assert_eq!(cache.get("k"), Some("v2".to_string()));
    }
}
