//! Freshness metadata for cache reads.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Result of a cache read, carrying staleness metadata.
///
/// Callers can tell a value served from memory apart from one that was just
/// fetched, and a fresh value apart from one kept after invalidation.
#[derive(Debug, Clone)]
pub struct CacheRead<T> {
    value: T,
    /// When the value was stored (or fetched, for a miss).
    cached_at: DateTime<Utc>,
    was_cache_hit: bool,
    /// The entry was invalidated (or aged out) after this value was stored.
    stale: bool,
}

impl<T> CacheRead<T> {
    /// A value served from the cache.
    pub fn from_cache(value: T, cached_at: DateTime<Utc>, stale: bool) -> Self {
        Self {
            value,
            cached_at,
            was_cache_hit: true,
            stale,
        }
    }

    /// A value produced by a fetch.
    pub fn from_fetch(value: T, fetched_at: DateTime<Utc>) -> Self {
        Self {
            value,
            cached_at: fetched_at,
            was_cache_hit: false,
            stale: false,
        }
    }

    pub fn into_value(self) -> T {
        self.value
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn cached_at(&self) -> DateTime<Utc> {
        self.cached_at
    }

    /// Time elapsed since the value was stored.
    pub fn age(&self) -> Duration {
        (Utc::now() - self.cached_at)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }

    pub fn was_cache_hit(&self) -> bool {
        self.was_cache_hit
    }

    pub fn was_cache_miss(&self) -> bool {
        !self.was_cache_hit
    }

    /// True when a newer value should be fetched before trusting this one.
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    pub fn map<U, F>(self, f: F) -> CacheRead<U>
    where
        F: FnOnce(T) -> U,
    {
        CacheRead {
            value: f(self.value),
            cached_at: self.cached_at,
            was_cache_hit: self.was_cache_hit,
            stale: self.stale,
        }
    }
}

impl<T> AsRef<T> for CacheRead<T> {
    fn as_ref(&self) -> &T {
        &self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_read_from_cache() {
        let cached_at = Utc::now();
        let read = CacheRead::from_cache("value".to_string(), cached_at, false);

        assert!(read.was_cache_hit());
        assert!(!read.was_cache_miss());
        assert!(!read.is_stale());
        assert_eq!(read.value(), "value");
        assert_eq!(read.cached_at(), cached_at);
    }

    #[test]
    fn test_cache_read_from_fetch() {
        let read = CacheRead::from_fetch(42i32, Utc::now());

        assert!(read.was_cache_miss());
        assert!(!read.is_stale());
        assert_eq!(read.into_value(), 42);
    }

    #[test]
    fn test_cache_read_age() {
        let past = Utc::now() - chrono::Duration::seconds(5);
        let read = CacheRead::from_cache("test", past, true);

        let age = read.age();
        assert!(age >= Duration::from_secs(4));
        assert!(age <= Duration::from_secs(10));
        assert!(read.is_stale());
    }

    #[test]
    fn test_cache_read_map_keeps_metadata() {
        let read = CacheRead::from_cache(42i32, Utc::now(), true);
        let mapped = read.map(|v| v.to_string());

        assert!(mapped.was_cache_hit());
        assert!(mapped.is_stale());
        assert_eq!(mapped.into_value(), "42");
    }
}
