//! Validation result cache.
//!
//! Keys are sha256 hashes of the canonicalized (sorted-keys) schema JSON, so
//! structurally identical schemas hit the same entry regardless of key order.
//! Entries are evicted by LRU capacity and by per-entry TTL.

use super::validator::SchemaReport;
use lru::LruCache;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct ValidationCacheConfig {
    pub capacity: usize,
    pub ttl: Duration,
    pub enabled: bool,
}

impl Default for ValidationCacheConfig {
    fn default() -> Self {
        Self {
            capacity: 256,
            ttl: Duration::from_secs(300),
            enabled: true,
        }
    }
}

impl ValidationCacheConfig {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

struct CachedReport {
    report: SchemaReport,
    stored_at: Instant,
}

/// Bounded LRU + TTL cache for validation reports.
pub struct ValidationCache {
    entries: LruCache<String, CachedReport>,
    ttl: Duration,
    enabled: bool,
}

impl ValidationCache {
    pub fn new(config: &ValidationCacheConfig) -> Self {
        let capacity = NonZeroUsize::new(config.capacity.max(1)).unwrap();
        Self {
            entries: LruCache::new(capacity),
            ttl: config.ttl,
            enabled: config.enabled,
        }
    }

    /// Look up a stored report. Expired entries are dropped on access.
    pub fn get(&mut self, key: &str) -> Option<SchemaReport> {
        if !self.enabled {
            return None;
        }
        let expired = match self.entries.get(key) {
            Some(cached) => cached.stored_at.elapsed() > self.ttl,
            None => return None,
        };
        if expired {
            self.entries.pop(key);
            return None;
        }
        self.entries.get(key).map(|cached| cached.report.clone())
    }

    pub fn put(&mut self, key: String, report: SchemaReport) {
        if !self.enabled {
            return;
        }
        self.entries.put(
            key,
            CachedReport {
                report,
                stored_at: Instant::now(),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Stable hash of a JSON value with object keys sorted at every level.
pub fn canonical_hash(value: &Value) -> String {
    let canonical = canonicalize(value);
    let encoded = serde_json::to_string(&canonical).unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(encoded.as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<&String, Value> =
                map.iter().map(|(k, v)| (k, canonicalize(v))).collect();
            serde_json::to_value(sorted).unwrap_or(Value::Null)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::validator::SchemaReport;

    fn dummy_report(valid: bool) -> SchemaReport {
        SchemaReport {
            valid,
            errors: Vec::new(),
            validation_time_ms: 0.1,
            cache_hit: false,
        }
    }

    #[test]
    fn test_canonical_hash_ignores_key_order() {
        let a = serde_json::json!({"type": "object", "properties": {"a": {"type": "string"}}});
        let b = serde_json::json!({"properties": {"a": {"type": "string"}}, "type": "object"});
        assert_eq!(canonical_hash(&a), canonical_hash(&b));
    }

    #[test]
    fn test_canonical_hash_distinguishes_values() {
        let a = serde_json::json!({"type": "object"});
        let b = serde_json::json!({"type": "array"});
        assert_ne!(canonical_hash(&a), canonical_hash(&b));
    }

    #[test]
    fn test_cache_hit_and_capacity_eviction() {
        let config = ValidationCacheConfig::default().with_capacity(2);
        let mut cache = ValidationCache::new(&config);
        cache.put("a".into(), dummy_report(true));
        cache.put("b".into(), dummy_report(true));
        assert!(cache.get("a").is_some());
        // "b" is now least-recently-used and gets evicted by the third insert.
        cache.put("c".into(), dummy_report(false));
        assert!(cache.get("b").is_none());
        assert!(cache.get("a").is_some());
        assert!(cache.get("c").is_some());
    }

    #[test]
    fn test_cache_ttl_expiry() {
        let config = ValidationCacheConfig::default().with_ttl(Duration::from_millis(0));
        let mut cache = ValidationCache::new(&config);
        cache.put("a".into(), dummy_report(true));
        std::thread::sleep(Duration::from_millis(5));
        assert!(cache.get("a").is_none());
    }

    #[test]
    fn test_cache_disabled() {
        let config = ValidationCacheConfig::default().with_enabled(false);
        let mut cache = ValidationCache::new(&config);
        cache.put("a".into(), dummy_report(true));
        assert!(cache.get("a").is_none());
    }
}
