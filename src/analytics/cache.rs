//! Fixed-TTL revalidation cache for analytics reads
//!
//! Entries expire `ttl` after insertion and are evicted least-recently-used
//! once `capacity` is reached. Writers invalidate the affected course or user
//! explicitly so a fresh read follows every mutation.

use super::{Achievements, CourseStats, LeaderboardEntry};
use crate::types::{CourseId, UserId};
use lru::LruCache;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::trace;

/// Bounded LRU map whose entries go stale after a fixed duration
pub struct TtlCache<K: Hash + Eq, V> {
    inner: Mutex<LruCache<K, (Instant, V)>>,
    ttl: Duration,
}

impl<K: Hash + Eq + Clone, V: Clone> TtlCache<K, V> {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
            ttl,
        }
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<K, (Instant, V)>> {
        // A panic while holding the lock cannot leave a half-written entry
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Fresh value for `key`, dropping it if expired
    pub fn get(&self, key: &K) -> Option<V> {
        let mut cache = self.lock();
        let expired = match cache.get(key) {
            Some((inserted, value)) if inserted.elapsed() < self.ttl => return Some(value.clone()),
            Some(_) => true,
            None => false,
        };
        if expired {
            cache.pop(key);
        }
        None
    }

    pub fn insert(&self, key: K, value: V) {
        self.lock().put(key, (Instant::now(), value));
    }

    pub fn invalidate(&self, key: &K) {
        self.lock().pop(key);
    }

    /// Drop every entry whose key matches `pred`
    pub fn invalidate_where(&self, pred: impl Fn(&K) -> bool) {
        let mut cache = self.lock();
        let stale: Vec<K> = cache
            .iter()
            .filter(|(k, _)| pred(k))
            .map(|(k, _)| k.clone())
            .collect();
        for key in stale {
            cache.pop(&key);
        }
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Caches for the three analytics read paths
pub struct AnalyticsCache {
    pub stats: TtlCache<CourseId, CourseStats>,
    pub leaderboards: TtlCache<(CourseId, usize), Vec<LeaderboardEntry>>,
    pub achievements: TtlCache<UserId, Achievements>,
}

impl AnalyticsCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            stats: TtlCache::new(capacity, ttl),
            leaderboards: TtlCache::new(capacity, ttl),
            achievements: TtlCache::new(capacity, ttl),
        }
    }

    /// Forget everything derived from `course`
    pub fn invalidate_course(&self, course: CourseId) {
        trace!("Invalidating analytics for course {}", course);
        self.stats.invalidate(&course);
        self.leaderboards.invalidate_where(|(c, _)| *c == course);
    }

    pub fn invalidate_user(&self, user: UserId) {
        self.achievements.invalidate(&user);
    }

    pub fn clear(&self) {
        self.stats.clear();
        self.leaderboards.clear();
        self.achievements.clear();
    }
}
