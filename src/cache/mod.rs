//! Key/value cache backends shared by the raw, transformed and response tiers.
//!
//! Backends only promise atomic single-key operations. Tiers keep their keys
//! apart by namespace prefix.

pub mod response;

pub use response::{ResponseCache, ResponseKind, ResponseTtls};

use anyhow::Result;
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::fmt::Write;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;

    async fn delete(&self, key: &str) -> Result<()>;
}

/// In-process cache with per-entry expiry. Expired entries are dropped when
/// they are next read or on the next write.
#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, (String, Instant)>>,
}

impl MemoryCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .await
            .values()
            .filter(|(_, expires_at)| *expires_at > now)
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl CacheBackend for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                None => return Ok(None),
                Some((value, expires_at)) if *expires_at > Instant::now() => {
                    return Ok(Some(value.clone()));
                }
                Some(_) => {}
            }
        }

        let mut entries = self.entries.write().await;
        if entries
            .get(key)
            .is_some_and(|(_, expires_at)| *expires_at <= Instant::now())
        {
            entries.remove(key);
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let now = Instant::now();
        let expires_at = now
            .checked_add(ttl)
            .ok_or_else(|| anyhow::anyhow!("cache TTL out of range: {ttl:?}"))?;

        let mut entries = self.entries.write().await;
        entries.retain(|_, (_, expires_at)| *expires_at > now);
        entries.insert(key.to_string(), (value.to_string(), expires_at));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

/// Stable cache key for an operation and its parameters.
///
/// Parameters are sorted before hashing so equivalent requests collide on the
/// same key regardless of the order they were supplied in.
#[must_use]
pub fn cache_key(namespace: &str, operation: &str, params: &BTreeMap<String, String>) -> String {
    let mut canonical = String::from(operation);
    for (name, value) in params {
        let _ = write!(&mut canonical, "\n{name}={value}");
    }
    format!("{namespace}:{operation}:{}", sha256_hex(&canonical))
}

#[must_use]
pub fn sha256_hex(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    let mut out = String::with_capacity(64);
    for b in digest {
        let _ = write!(&mut out, "{b:02x}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_cache_key_ignores_parameter_order() {
        let a = cache_key(
            "raw",
            "search/movie",
            &params(&[("query", "alien"), ("page", "2")]),
        );
        let b = cache_key(
            "raw",
            "search/movie",
            &params(&[("page", "2"), ("query", "alien")]),
        );
        assert_eq!(a, b);
        assert!(a.starts_with("raw:search/movie:"));
    }

    #[test]
    fn test_cache_key_separates_values_and_operations() {
        let base = cache_key("raw", "movie/1", &params(&[("page", "1")]));
        assert_ne!(base, cache_key("raw", "movie/1", &params(&[("page", "2")])));
        assert_ne!(base, cache_key("raw", "movie/2", &params(&[("page", "1")])));
    }

    #[tokio::test]
    async fn test_memory_cache_round_trip_and_delete() {
        let cache = MemoryCache::new();
        cache
            .set("k", "v", Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(cache.get("k").await.unwrap().as_deref(), Some("v"));

        cache.delete("k").await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_memory_cache_expires_entries() {
        let cache = MemoryCache::new();
        cache
            .set("short", "v", Duration::from_millis(20))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(40)).await;

        assert_eq!(cache.get("short").await.unwrap(), None);
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_memory_cache_drops_unread_expired_entries_on_write() {
        let cache = MemoryCache::new();
        cache.set("dead", "v", Duration::ZERO).await.unwrap();
        cache
            .set("live", "v", Duration::from_secs(60))
            .await
            .unwrap();

        let entries = cache.entries.read().await;
        assert!(!entries.contains_key("dead"));
        assert!(entries.contains_key("live"));
    }

    #[tokio::test]
    async fn test_memory_cache_rejects_unrepresentable_ttl() {
        let cache = MemoryCache::new();
        assert!(cache.set("k", "v", Duration::MAX).await.is_err());
        assert_eq!(cache.get("k").await.unwrap(), None);
    }
}
