//! TTL-aware LRU cache keyed by (Name, QueryType). Storage is a
//! [`DashMap`] for concurrent point lookups; LRU order is tracked by a
//! single coarse-locked `Vec`; sharding the order tracking isn't worth
//! the complexity at this scale.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use parking_lot::Mutex;

use crate::dns::Name;
use crate::dns::{Message, QueryType};

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey(Name, QueryTypeKey);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct QueryTypeKey(u16);

impl CacheKey {
    pub fn new(name: &Name, qtype: QueryType) -> Self {
        CacheKey(
            Name::from(name.as_str().to_ascii_lowercase().trim_end_matches('.')),
            QueryTypeKey(qtype.into()),
        )
    }
}

struct CacheEntry {
    message: Message,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

#[derive(Debug, Default)]
struct RawStats {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    expirations: AtomicU64,
    stores: AtomicU64,
}

#[derive(Debug, Clone, Copy)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expirations: u64,
    pub stores: u64,
    pub size: usize,
    pub max_size: usize,
    pub hit_rate: f64,
}

pub struct DnsCache {
    entries: DashMap<CacheKey, CacheEntry>,
    order: Mutex<Vec<CacheKey>>,
    max_size: usize,
    min_ttl: u32,
    max_ttl: u32,
    stats: RawStats,
}

impl DnsCache {
    pub fn new(max_size: usize, min_ttl: u32, max_ttl: u32) -> Self {
        DnsCache {
            entries: DashMap::new(),
            order: Mutex::new(Vec::new()),
            max_size,
            min_ttl,
            max_ttl,
            stats: RawStats::default(),
        }
    }

    /// Looks up `(name, qtype)`, normalizing the name the same way
    /// `store` does. Promotes to MRU on hit; lazily evicts and counts as
    /// a miss if the entry has expired.
    pub fn get(&self, name: &Name, qtype: QueryType) -> Option<Message> {
        let key = CacheKey::new(name, qtype);
        let now = Instant::now();

        let hit = match self.entries.get(&key) {
            Some(entry) if !entry.is_expired(now) => Some(entry.message.clone()),
            _ => None,
        };

        match hit {
            Some(message) => {
                self.promote(&key);
                self.stats.hits.fetch_add(1, Ordering::Relaxed);
                Some(message)
            }
            None => {
                if let Some((_, entry)) = self.entries.remove(&key) {
                    if entry.is_expired(now) {
                        self.stats.expirations.fetch_add(1, Ordering::Relaxed);
                    }
                    self.order.lock().retain(|k| k != &key);
                }
                self.stats.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Stores `message` under `(name, qtype)` if it's cacheable
    /// (`NOERROR` with a non-empty answer section); otherwise a no-op.
    /// TTL is clamped to `[min_ttl, max_ttl]`.
    pub fn store(&self, name: &Name, qtype: QueryType, message: &Message) {
        if !message.is_cacheable() {
            return;
        }
        let Some(min_answer_ttl) = message.min_answer_ttl() else {
            return;
        };

        let clamped = min_answer_ttl.clamp(self.min_ttl, self.max_ttl);
        let key = CacheKey::new(name, qtype);
        let entry = CacheEntry {
            message: message.clone(),
            expires_at: Instant::now() + Duration::from_secs(clamped as u64),
        };

        self.entries.insert(key.clone(), entry);
        self.promote(&key);
        self.stats.stores.fetch_add(1, Ordering::Relaxed);

        self.evict_if_over_capacity();
    }

    pub fn remove(&self, name: &Name, qtype: QueryType) -> bool {
        let key = CacheKey::new(name, qtype);
        let removed = self.entries.remove(&key).is_some();
        if removed {
            self.order.lock().retain(|k| k != &key);
        }
        removed
    }

    pub fn clear(&self) {
        self.entries.clear();
        self.order.lock().clear();
    }

    /// Sweeps expired entries proactively (rather than relying on lazy
    /// eviction at `get` time) and returns the count removed.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let expired: Vec<CacheKey> = self
            .entries
            .iter()
            .filter(|e| e.value().is_expired(now))
            .map(|e| e.key().clone())
            .collect();
        for key in &expired {
            self.entries.remove(key);
        }
        if !expired.is_empty() {
            let mut order = self.order.lock();
            order.retain(|k| !expired.contains(k));
        }
        self.stats
            .expirations
            .fetch_add(expired.len() as u64, Ordering::Relaxed);
        expired.len()
    }

    pub fn stats(&self) -> CacheStats {
        let hits = self.stats.hits.load(Ordering::Relaxed);
        let misses = self.stats.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        CacheStats {
            hits,
            misses,
            evictions: self.stats.evictions.load(Ordering::Relaxed),
            expirations: self.stats.expirations.load(Ordering::Relaxed),
            stores: self.stats.stores.load(Ordering::Relaxed),
            size: self.entries.len(),
            max_size: self.max_size,
            hit_rate: if total > 0 {
                hits as f64 / total as f64
            } else {
                0.0
            },
        }
    }

    fn promote(&self, key: &CacheKey) {
        let mut order = self.order.lock();
        order.retain(|k| k != key);
        order.push(key.clone());
    }

    fn evict_if_over_capacity(&self) {
        let mut order = self.order.lock();
        while self.entries.len() > self.max_size && !order.is_empty() {
            let oldest = order.remove(0);
            if self.entries.remove(&oldest).is_some() {
                self.stats.evictions.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::{Header, QueryClass, RData, ResourceRecord};

    fn answer(name: &str, ttl: u32) -> Message {
        Message {
            header: Header {
                qr: true,
                ancount: 1,
                ..Header::default()
            },
            answers: vec![ResourceRecord {
                name: Name::from(name),
                rtype: QueryType::A,
                rclass: QueryClass::In,
                ttl,
                rdata: RData::A("1.2.3.4".parse().unwrap()),
            }],
            ..Message::default()
        }
    }

    #[test]
    fn key_normalization_is_case_and_dot_insensitive() {
        let cache = DnsCache::new(10, 60, 86400);
        cache.store(&Name::from("example.com"), QueryType::A, &answer("example.com", 300));
        assert!(cache.get(&Name::from("Example.COM."), QueryType::A).is_some());
    }

    #[test]
    fn empty_answer_is_not_cacheable() {
        let cache = DnsCache::new(10, 60, 86400);
        let empty = Message {
            header: Header {
                qr: true,
                ..Header::default()
            },
            ..Message::default()
        };
        cache.store(&Name::from("example.com"), QueryType::A, &empty);
        assert!(cache.get(&Name::from("example.com"), QueryType::A).is_none());
    }

    #[test]
    fn lru_eviction_bounds_size() {
        let cache = DnsCache::new(2, 60, 86400);
        cache.store(&Name::from("a.com"), QueryType::A, &answer("a.com", 300));
        cache.store(&Name::from("b.com"), QueryType::A, &answer("b.com", 300));
        cache.store(&Name::from("c.com"), QueryType::A, &answer("c.com", 300));
        assert_eq!(cache.stats().size, 2);
        assert!(cache.get(&Name::from("a.com"), QueryType::A).is_none());
    }

    #[test]
    fn get_promotes_to_most_recently_used() {
        let cache = DnsCache::new(2, 60, 86400);
        cache.store(&Name::from("a.com"), QueryType::A, &answer("a.com", 300));
        cache.store(&Name::from("b.com"), QueryType::A, &answer("b.com", 300));
        cache.get(&Name::from("a.com"), QueryType::A);
        cache.store(&Name::from("c.com"), QueryType::A, &answer("c.com", 300));
        // b.com was least-recently-used after the promotion of a.com.
        assert!(cache.get(&Name::from("b.com"), QueryType::A).is_none());
        assert!(cache.get(&Name::from("a.com"), QueryType::A).is_some());
    }
}
