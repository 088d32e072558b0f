// Time-bounded memoization of store reads
//
// Entries expire individually after their TTL. Every mutation of a store
// clears that store's whole cache; `generation` lets a reader that loaded
// while a clear happened drop its now-stale result instead of caching it.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Serialize;

/// Source of "now" for expiry checks
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    base: Instant,
    offset: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self { base: Instant::now(), offset: Mutex::new(Duration::ZERO) }
    }

    pub fn advance(&self, by: Duration) {
        *self.offset.lock() += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + *self.offset.lock()
    }
}

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    created_at: Instant,
    ttl: Duration,
}

impl<V> CacheEntry<V> {
    /// A zero TTL entry is never readable.
    fn is_expired(&self, now: Instant) -> bool {
        self.ttl.is_zero() || now.saturating_duration_since(self.created_at) > self.ttl
    }
}

/// Hit/miss counters plus current size
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub total_requests: u64,
    /// Percentage, 0 when there were no requests
    pub hit_rate: f64,
    pub size: usize,
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} hits, {} misses ({:.1}% hit rate), {} cached",
            self.hits, self.misses, self.hit_rate, self.size
        )
    }
}

pub struct TtlCache<K, V> {
    name: String,
    entries: HashMap<K, CacheEntry<V>>,
    clock: Arc<dyn Clock>,
    hits: u64,
    misses: u64,
    generation: u64,
}

impl<K, V> TtlCache<K, V>
where
    K: Hash + Eq + fmt::Debug,
    V: Clone,
{
    pub fn new(name: &str) -> Self {
        Self::with_clock(name, Arc::new(SystemClock))
    }

    pub fn with_clock(name: &str, clock: Arc<dyn Clock>) -> Self {
        Self {
            name: name.to_string(),
            entries: HashMap::new(),
            clock,
            hits: 0,
            misses: 0,
            generation: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fresh value for `key`. Expired entries are evicted and count as misses.
    pub fn get(&mut self, key: &K) -> Option<V> {
        let now = self.clock.now();
        match self.entries.get(key) {
            Some(entry) if !entry.is_expired(now) => {
                self.hits += 1;
                log::debug!("[{}] cache hit: {:?}", self.name, key);
                Some(entry.value.clone())
            }
            Some(_) => {
                self.entries.remove(key);
                self.misses += 1;
                log::debug!("[{}] cache expired: {:?}", self.name, key);
                None
            }
            None => {
                self.misses += 1;
                log::debug!("[{}] cache miss: {:?}", self.name, key);
                None
            }
        }
    }

    /// Insert or overwrite
    pub fn set(&mut self, key: K, value: V, ttl: Duration) {
        let created_at = self.clock.now();
        self.entries.insert(key, CacheEntry { value, created_at, ttl });
    }

    /// Insert only if no `clear` happened since `generation` was read.
    /// Returns whether the value was stored.
    pub fn set_if_current(&mut self, key: K, value: V, ttl: Duration, generation: u64) -> bool {
        if generation != self.generation {
            log::debug!("[{}] dropping stale load for {:?}", self.name, key);
            return false;
        }
        self.set(key, value, ttl);
        true
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Drop every entry. Counters are kept.
    pub fn clear(&mut self) {
        let dropped = self.entries.len();
        self.entries.clear();
        self.generation += 1;
        log::info!("[{}] cache cleared ({} entries)", self.name, dropped);
    }

    /// Evict expired entries, returning how many were removed
    pub fn cleanup_expired(&mut self) -> usize {
        let now = self.clock.now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        let removed = before - self.entries.len();
        if removed > 0 {
            log::debug!("[{}] evicted {} expired entries", self.name, removed);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        let total_requests = self.hits + self.misses;
        let hit_rate = if total_requests > 0 {
            self.hits as f64 / total_requests as f64 * 100.0
        } else {
            0.0
        };
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            total_requests,
            hit_rate,
            size: self.entries.len(),
        }
    }
}

/// Read-through lookup on a shared cache. The lock is released while `load`
/// runs. Only successful results are stored, and a result loaded across a
/// `clear` is returned without being stored.
pub fn get_or_load<K, V, E>(
    cache: &Mutex<TtlCache<K, V>>,
    key: K,
    ttl: Duration,
    load: impl FnOnce() -> Result<V, E>,
) -> Result<V, E>
where
    K: Hash + Eq + fmt::Debug,
    V: Clone,
{
    let generation = {
        let mut cache = cache.lock();
        if let Some(value) = cache.get(&key) {
            return Ok(value);
        }
        cache.generation()
    };

    let value = load()?;
    cache.lock().set_if_current(key, value.clone(), ttl, generation);
    Ok(value)
}

/// Cache key: a namespace prefix plus the rendered call arguments
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    prefix: String,
    args: Vec<String>,
}

impl CacheKey {
    pub fn new(prefix: &str) -> Self {
        Self { prefix: prefix.to_string(), args: Vec::new() }
    }

    pub fn with_arg(mut self, arg: impl fmt::Debug) -> Self {
        self.args.push(format!("{:?}", arg));
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.args.is_empty() {
            f.write_str(&self.prefix)
        } else {
            write!(f, "{}({})", self.prefix, self.args.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache(clock: &Arc<ManualClock>) -> TtlCache<CacheKey, Vec<i32>> {
        TtlCache::with_clock("test", clock.clone())
    }

    #[test]
    fn test_hit_within_ttl() {
        let clock = Arc::new(ManualClock::new());
        let mut c = cache(&clock);
        let key = CacheKey::new("clients");
        c.set(key.clone(), vec![1, 2], Duration::from_secs(60));

        clock.advance(Duration::from_secs(60));
        assert_eq!(c.get(&key), Some(vec![1, 2]));
        assert_eq!(c.stats().hits, 1);
    }

    #[test]
    fn test_expired_entry_is_evicted() {
        let clock = Arc::new(ManualClock::new());
        let mut c = cache(&clock);
        let key = CacheKey::new("clients");
        c.set(key.clone(), vec![1], Duration::from_secs(60));

        clock.advance(Duration::from_secs(61));
        assert_eq!(c.get(&key), None);
        assert!(c.is_empty());
        let stats = c.stats();
        assert_eq!((stats.hits, stats.misses), (0, 1));
    }

    #[test]
    fn test_zero_ttl_never_readable() {
        let clock = Arc::new(ManualClock::new());
        let mut c = cache(&clock);
        let key = CacheKey::new("rates");
        c.set(key.clone(), vec![7], Duration::ZERO);
        assert_eq!(c.get(&key), None);
    }

    #[test]
    fn test_set_overwrites() {
        let mut c: TtlCache<CacheKey, Vec<i32>> = TtlCache::new("test");
        let key = CacheKey::new("hotels");
        c.set(key.clone(), vec![1], Duration::from_secs(10));
        c.set(key.clone(), vec![2], Duration::from_secs(10));
        assert_eq!(c.get(&key), Some(vec![2]));
        assert_eq!(c.len(), 1);
    }

    #[test]
    fn test_keys_differ_by_args() {
        let mut c: TtlCache<CacheKey, Vec<i32>> = TtlCache::new("test");
        let all = CacheKey::new("hotels");
        let tana = CacheKey::new("hotels").with_arg("Tana");
        c.set(all.clone(), vec![1, 2], Duration::from_secs(10));
        assert_eq!(c.get(&tana), None);
        assert_eq!(c.get(&all), Some(vec![1, 2]));
        assert_eq!(tana.to_string(), "hotels(\"Tana\")");
    }

    #[test]
    fn test_clear_empties_and_bumps_generation() {
        let mut c: TtlCache<CacheKey, Vec<i32>> = TtlCache::new("test");
        let key = CacheKey::new("clients");
        let generation = c.generation();
        c.set(key.clone(), vec![1], Duration::from_secs(10));
        c.clear();

        assert!(c.is_empty());
        assert!(!c.set_if_current(key.clone(), vec![1], Duration::from_secs(10), generation));
        assert!(c.set_if_current(key.clone(), vec![2], Duration::from_secs(10), c.generation()));
        assert_eq!(c.get(&key), Some(vec![2]));
    }

    #[test]
    fn test_cleanup_expired() {
        let clock = Arc::new(ManualClock::new());
        let mut c = cache(&clock);
        c.set(CacheKey::new("a"), vec![], Duration::from_secs(5));
        c.set(CacheKey::new("b"), vec![], Duration::from_secs(50));
        clock.advance(Duration::from_secs(10));

        assert_eq!(c.cleanup_expired(), 1);
        assert_eq!(c.len(), 1);
    }

    #[test]
    fn test_stats() {
        let mut c: TtlCache<CacheKey, Vec<i32>> = TtlCache::new("test");
        let key = CacheKey::new("clients");
        assert_eq!(c.stats().hit_rate, 0.0);

        c.get(&key);
        c.set(key.clone(), vec![], Duration::from_secs(10));
        c.get(&key);
        c.get(&key);
        c.get(&key);

        let stats = c.stats();
        assert_eq!(stats.total_requests, 4);
        assert_eq!(stats.hit_rate, 75.0);
        assert_eq!(stats.size, 1);
    }

    #[test]
    fn test_get_or_load() {
        let c: Mutex<TtlCache<CacheKey, Vec<i32>>> = Mutex::new(TtlCache::new("test"));
        let key = CacheKey::new("quotations");
        let mut calls = 0;

        let first: Result<_, ()> = get_or_load(&c, key.clone(), Duration::from_secs(10), || {
            calls += 1;
            Ok(vec![3])
        });
        assert_eq!(first, Ok(vec![3]));
        let second: Result<_, ()> = get_or_load(&c, key.clone(), Duration::from_secs(10), || {
            calls += 1;
            Ok(vec![4])
        });
        assert_eq!(second, Ok(vec![3]));
        assert_eq!(calls, 1);

        let failed: Result<Vec<i32>, &str> =
            get_or_load(&c, CacheKey::new("x"), Duration::from_secs(10), || Err("boom"));
        assert_eq!(failed, Err("boom"));
        assert_eq!(c.lock().len(), 1);
    }

    #[test]
    fn test_loader_runs_unlocked() {
        let c: Mutex<TtlCache<CacheKey, Vec<i32>>> = Mutex::new(TtlCache::new("test"));
        let loaded: Result<_, ()> = get_or_load(&c, CacheKey::new("rates"), Duration::from_secs(10), || {
            let stats = c.try_lock().map(|cache| cache.stats());
            assert!(stats.is_some());
            Ok(vec![1])
        });
        assert_eq!(loaded, Ok(vec![1]));
        assert_eq!(c.lock().len(), 1);
    }

    #[test]
    fn test_load_across_clear_not_stored() {
        let c: Mutex<TtlCache<CacheKey, Vec<i32>>> = Mutex::new(TtlCache::new("test"));
        let key = CacheKey::new("clients");
        let loaded: Result<_, ()> = get_or_load(&c, key.clone(), Duration::from_secs(10), || {
            c.lock().clear();
            Ok(vec![1])
        });
        assert_eq!(loaded, Ok(vec![1]));
        assert!(c.lock().is_empty());
    }
}
