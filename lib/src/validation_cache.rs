use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use crate::authentication;


/// Identifies one validated (client address, credential token) pair.
///
/// The token is stored as a SHA-256 fingerprint: uniqueness per token is
/// preserved while no credential material is retained. Two different
/// passwords for the same username from the same address produce different
/// keys and are validated independently.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    client_addr: IpAddr,
    token_digest: String,
}

impl CacheKey {
    pub fn new(client_addr: IpAddr, raw_token: &str) -> Self {
        Self {
            client_addr,
            token_digest: authentication::credential_fingerprint(raw_token),
        }
    }
}

/// Result of a cache query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    Hit,
    Miss,
}

/// A concurrency-safe map of positive validation results with per-entry
/// expiry.
///
/// Only successful validations are ever stored; an unexpired entry implies
/// the associated credential was previously accepted by the directory for
/// that client address. Expired entries are evicted lazily on lookup.
///
/// `lookup` and `put` are individually race-free, but the window between a
/// miss and the subsequent put is not atomic: two concurrent first-use
/// requests for the same credential may both validate before either writes.
/// The duplicate validation is harmless and accepted.
pub struct ValidationCache {
    ttl: Duration,
    // key -> expiry instant
    entries: Mutex<HashMap<CacheKey, Instant>>,
}

impl ValidationCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn lookup(&self, key: &CacheKey) -> Lookup {
        self.lookup_at(key, Instant::now())
    }

    /// Insert or overwrite an entry, resetting its expiry to now + TTL.
    pub fn put(&self, key: CacheKey) {
        self.put_at(key, Instant::now());
    }

    fn lookup_at(&self, key: &CacheKey, now: Instant) -> Lookup {
        let mut entries = self.entries.lock().unwrap();
        match entries.get(key) {
            Some(expiry) if now < *expiry => Lookup::Hit,
            Some(_) => {
                entries.remove(key);
                Lookup::Miss
            }
            None => Lookup::Miss,
        }
    }

    fn put_at(&self, key: CacheKey, now: Instant) {
        self.entries.lock().unwrap().insert(key, now + self.ttl);
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn key(addr: &str, token: &str) -> CacheKey {
        CacheKey::new(addr.parse().unwrap(), token)
    }

    #[test]
    fn miss_before_put_hit_after() {
        let cache = ValidationCache::new(Duration::from_secs(60));
        let k = key("10.0.0.1", "YWxpY2U6c2VjcmV0");
        assert_eq!(cache.lookup(&k), Lookup::Miss);
        cache.put(k.clone());
        assert_eq!(cache.lookup(&k), Lookup::Hit);
    }

    #[test]
    fn entry_expires_exactly_at_ttl() {
        let cache = ValidationCache::new(Duration::from_secs(60));
        let k = key("10.0.0.1", "YWxpY2U6c2VjcmV0");
        let t0 = Instant::now();
        cache.put_at(k.clone(), t0);
        assert_eq!(cache.lookup_at(&k, t0 + Duration::from_secs(59)), Lookup::Hit);
        assert_eq!(cache.lookup_at(&k, t0 + Duration::from_secs(60)), Lookup::Miss);
    }

    #[test]
    fn expired_entry_is_evicted_on_lookup() {
        let cache = ValidationCache::new(Duration::from_secs(1));
        let k = key("10.0.0.1", "YWxpY2U6c2VjcmV0");
        let t0 = Instant::now();
        cache.put_at(k.clone(), t0);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.lookup_at(&k, t0 + Duration::from_secs(2)), Lookup::Miss);
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn put_resets_expiry() {
        let cache = ValidationCache::new(Duration::from_secs(60));
        let k = key("10.0.0.1", "YWxpY2U6c2VjcmV0");
        let t0 = Instant::now();
        cache.put_at(k.clone(), t0);
        cache.put_at(k.clone(), t0 + Duration::from_secs(50));
        assert_eq!(
            cache.lookup_at(&k, t0 + Duration::from_secs(100)),
            Lookup::Hit
        );
    }

    #[test]
    fn clients_are_cached_independently() {
        let cache = ValidationCache::new(Duration::from_secs(60));
        let token = "YWxpY2U6c2VjcmV0";
        cache.put(key("10.0.0.1", token));
        assert_eq!(cache.lookup(&key("10.0.0.1", token)), Lookup::Hit);
        assert_eq!(cache.lookup(&key("10.0.0.2", token)), Lookup::Miss);
    }

    #[test]
    fn tokens_are_cached_independently() {
        let cache = ValidationCache::new(Duration::from_secs(60));
        cache.put(key("10.0.0.1", "YWxpY2U6c2VjcmV0"));
        assert_eq!(cache.lookup(&key("10.0.0.1", "YWxpY2U6d3Jvbmc=")), Lookup::Miss);
    }
}
