use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

/// Entries are considered fresh for 5 minutes.
/// Short enough that catalogue edits show up quickly, long enough to absorb page navigation.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub data: T,
    pub cached_at: Instant,
}

impl<T> CacheEntry<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            cached_at: Instant::now(),
        }
    }

    pub fn age(&self) -> Duration {
        Instant::now().saturating_duration_since(self.cached_at)
    }

    pub fn age_display(&self) -> String {
        let secs = self.age().as_secs();
        if secs < 60 {
            "just now".to_string()
        } else if secs < 3600 {
            format!("{}m ago", secs / 60)
        } else {
            let hours = secs / 3600;
            let remaining_mins = (secs % 3600) / 60;
            if remaining_mins >= 30 {
                // Round up: 1h 30m+ becomes 2h
                format!("{}h ago", hours + 1)
            } else {
                format!("{}h ago", hours)
            }
        }
    }

    pub fn is_fresh(&self, ttl: Duration) -> bool {
        self.age() < ttl
    }
}

/// In-memory key/value cache with lazy expiry.
///
/// Entries are never mutated in place: `set` always installs a new
/// `CacheEntry`, so readers see either the old pair or the new one.
/// Expired entries linger until overwritten, cleared, or swept.
#[derive(Debug)]
pub struct TtlCache<T> {
    ttl: Duration,
    entries: RwLock<HashMap<String, CacheEntry<T>>>,
}

impl<T: Clone> Default for TtlCache<T> {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl<T: Clone> TtlCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    // A panicking reader can't leave an entry half-written, so a poisoned lock is still usable.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, CacheEntry<T>>> {
        self.entries.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, CacheEntry<T>>> {
        self.entries.write().unwrap_or_else(|e| e.into_inner())
    }

    /// True iff an entry exists for `key` and is younger than the TTL.
    pub fn is_valid(&self, key: &str) -> bool {
        self.read()
            .get(key)
            .map(|entry| entry.is_fresh(self.ttl))
            .unwrap_or(false)
    }

    /// Returns the cached data while it is still valid.
    pub fn get(&self, key: &str) -> Option<T> {
        let entries = self.read();
        match entries.get(key) {
            Some(entry) if entry.is_fresh(self.ttl) => {
                debug!(key, age_ms = entry.age().as_millis() as u64, "Cache hit");
                Some(entry.data.clone())
            }
            Some(_) => {
                debug!(key, "Cache entry expired");
                None
            }
            None => {
                debug!(key, "Cache miss");
                None
            }
        }
    }

    /// Returns the entry regardless of age, for callers that prefer stale data to none.
    pub fn get_entry(&self, key: &str) -> Option<CacheEntry<T>> {
        self.read().get(key).cloned()
    }

    pub fn set(&self, key: &str, data: T) {
        self.write().insert(key.to_string(), CacheEntry::new(data));
    }

    pub fn invalidate(&self, key: &str) -> bool {
        self.write().remove(key).is_some()
    }

    pub fn clear_for(&self, keys: &[&str]) {
        let mut entries = self.write();
        for key in keys {
            entries.remove(*key);
        }
        debug!(?keys, "Cache keys invalidated");
    }

    pub fn clear(&self) {
        self.write().clear();
        debug!("Cache cleared");
    }

    /// Drop every entry older than the TTL. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        let ttl = self.ttl;
        let mut entries = self.write();
        let before = entries.len();
        entries.retain(|_, entry| entry.is_fresh(ttl));
        let removed = before - entries.len();
        if removed > 0 {
            debug!(removed, "Swept expired cache entries");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}

impl<T: Clone + Send + Sync + 'static> TtlCache<T> {
    /// Periodically reclaim memory held by expired entries.
    /// Correctness never depends on this; `get` already ignores stale entries.
    pub fn spawn_sweeper(cache: Arc<Self>, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                cache.sweep();
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(300);

    #[tokio::test(start_paused = true)]
    async fn test_valid_until_ttl_elapses() {
        let cache = TtlCache::new(TTL);
        cache.set("courses", vec![1, 2, 3]);

        tokio::time::advance(TTL - Duration::from_millis(1)).await;
        assert!(cache.is_valid("courses"));
        assert_eq!(cache.get("courses"), Some(vec![1, 2, 3]));

        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(!cache.is_valid("courses"));
        assert_eq!(cache.get("courses"), None);

        // Lazy eviction: still there until swept
        assert!(cache.get_entry("courses").is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_key_is_never_valid() {
        let cache: TtlCache<u32> = TtlCache::new(TTL);
        assert!(!cache.is_valid("users"));
        assert_eq!(cache.get("users"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_replaces_entry_and_restamps() {
        let cache = TtlCache::new(TTL);
        cache.set("courses", "old");
        tokio::time::advance(Duration::from_secs(200)).await;
        cache.set("courses", "new");
        tokio::time::advance(Duration::from_secs(200)).await;

        // 400s since the first set, 200s since the second
        assert!(cache.is_valid("courses"));
        assert_eq!(cache.get("courses"), Some("new"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_for_only_touches_named_keys() {
        let cache = TtlCache::new(TTL);
        cache.set("courses", 1);
        cache.set("enrollments", 2);
        cache.set("users", 3);

        cache.clear_for(&["courses", "enrollments"]);
        assert!(!cache.is_valid("courses"));
        assert!(!cache.is_valid("enrollments"));
        assert!(cache.is_valid("users"));

        cache.clear();
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_removes_only_expired() {
        let cache = TtlCache::new(TTL);
        cache.set("old", 1);
        tokio::time::advance(Duration::from_secs(250)).await;
        cache.set("young", 2);
        tokio::time::advance(Duration::from_secs(100)).await;

        assert_eq!(cache.sweep(), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.is_valid("young"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_task_reclaims_entries() {
        let cache = Arc::new(TtlCache::new(Duration::from_secs(10)));
        cache.set("courses", 1);
        let handle = TtlCache::spawn_sweeper(Arc::clone(&cache), Duration::from_secs(15));

        // Let the sweeper consume its immediate first tick
        tokio::task::yield_now().await;
        tokio::time::sleep(Duration::from_secs(16)).await;
        assert!(cache.is_empty());
        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_age_display() {
        let entry = CacheEntry::new(());
        assert_eq!(entry.age_display(), "just now");
        tokio::time::advance(Duration::from_secs(5 * 60)).await;
        assert_eq!(entry.age_display(), "5m ago");
        tokio::time::advance(Duration::from_secs(90 * 60)).await;
        assert_eq!(entry.age_display(), "2h ago");
    }
}
