//! In-memory cache of resolved stream URLs.
//!
//! Resolved URLs are time-limited; while one is still valid it short-circuits
//! the whole catalog/cipher pipeline. Entries live only in memory — a process
//! restart starts cold, which is acceptable because every entry is
//! rebuildable.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use bridge_traits::time::Clock;
use core_store::models::TrackId;

/// One cached URL with its absolute expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedUrlEntry {
    pub url: String,
    pub expires_at_ms: i64,
}

/// Track id → resolved URL map with read-time expiry.
///
/// Concurrency: many concurrent readers; writers take the lock only for the
/// map insert. Two racing resolutions for the same track both produce valid
/// independent URLs, so last-writer-wins is fine and no single-flight
/// de-duplication is attempted.
pub struct ResolvedUrlCache {
    clock: Arc<dyn Clock>,
    entries: RwLock<HashMap<TrackId, ResolvedUrlEntry>>,
}

impl ResolvedUrlCache {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Look up a still-valid entry.
    ///
    /// Returns `None` when the track is absent or the entry has expired; the
    /// expiry check happens here at read time, there is no background sweep.
    /// An entry whose expiry equals the current instant is already a miss.
    pub fn get(&self, track_id: &TrackId) -> Option<ResolvedUrlEntry> {
        let now_ms = self.clock.unix_timestamp_millis();
        let entries = self.entries.read();
        entries
            .get(track_id)
            .filter(|entry| now_ms < entry.expires_at_ms)
            .cloned()
    }

    /// Store a freshly resolved URL valid for `ttl` from now.
    ///
    /// Overwrites any previous entry for the track.
    pub fn insert(&self, track_id: TrackId, url: String, ttl: Duration) {
        let expires_at_ms = self.clock.unix_timestamp_millis() + ttl.as_millis() as i64;
        let entry = ResolvedUrlEntry { url, expires_at_ms };
        self.entries.write().insert(track_id, entry);
    }

    /// Number of entries currently held (expired entries included until
    /// overwritten or cleared).
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use std::sync::atomic::{AtomicI64, Ordering};

    struct ManualClock {
        now_ms: AtomicI64,
    }

    impl ManualClock {
        fn new(now_ms: i64) -> Self {
            Self {
                now_ms: AtomicI64::new(now_ms),
            }
        }

        fn advance(&self, delta_ms: i64) {
            self.now_ms.fetch_add(delta_ms, Ordering::SeqCst);
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            DateTime::from_timestamp_millis(self.now_ms.load(Ordering::SeqCst)).unwrap()
        }
    }

    #[test]
    fn test_miss_when_absent() {
        let cache = ResolvedUrlCache::new(Arc::new(ManualClock::new(1_000)));
        assert!(cache.get(&TrackId::from("a")).is_none());
    }

    #[test]
    fn test_hit_before_expiry() {
        let clock = Arc::new(ManualClock::new(1_000));
        let cache = ResolvedUrlCache::new(clock.clone());

        cache.insert(
            TrackId::from("a"),
            "https://edge.example.com/a".to_string(),
            Duration::from_secs(60),
        );

        let entry = cache.get(&TrackId::from("a")).unwrap();
        assert_eq!(entry.url, "https://edge.example.com/a");
        assert_eq!(entry.expires_at_ms, 1_000 + 60_000);
    }

    #[test]
    fn test_miss_after_expiry() {
        let clock = Arc::new(ManualClock::new(1_000));
        let cache = ResolvedUrlCache::new(clock.clone());

        cache.insert(
            TrackId::from("a"),
            "https://edge.example.com/a".to_string(),
            Duration::from_secs(60),
        );

        clock.advance(60_001);
        assert!(cache.get(&TrackId::from("a")).is_none());
    }

    #[test]
    fn test_expiry_boundary_is_a_miss() {
        let clock = Arc::new(ManualClock::new(0));
        let cache = ResolvedUrlCache::new(clock.clone());

        cache.insert(
            TrackId::from("a"),
            "https://edge.example.com/a".to_string(),
            Duration::from_millis(500),
        );

        clock.advance(500);
        assert!(cache.get(&TrackId::from("a")).is_none());
    }

    #[test]
    fn test_insert_overwrites() {
        let clock = Arc::new(ManualClock::new(0));
        let cache = ResolvedUrlCache::new(clock);

        cache.insert(
            TrackId::from("a"),
            "https://edge.example.com/old".to_string(),
            Duration::from_secs(10),
        );
        cache.insert(
            TrackId::from("a"),
            "https://edge.example.com/new".to_string(),
            Duration::from_secs(10),
        );

        assert_eq!(cache.len(), 1);
        assert_eq!(
            cache.get(&TrackId::from("a")).unwrap().url,
            "https://edge.example.com/new"
        );
    }

    #[test]
    fn test_clear() {
        let clock = Arc::new(ManualClock::new(0));
        let cache = ResolvedUrlCache::new(clock);

        cache.insert(
            TrackId::from("a"),
            "https://edge.example.com/a".to_string(),
            Duration::from_secs(10),
        );
        cache.clear();

        assert!(cache.is_empty());
    }
}
