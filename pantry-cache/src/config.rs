use serde::Deserialize;
use std::time::Duration;

/// Cache sizing and age policy.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    /// Entries kept before eviction starts.
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
    /// Age after which a fresh entry is treated as stale. `None` keeps entries
    /// fresh until they are invalidated.
    #[serde(default)]
    pub stale_after_ms: Option<u64>,
}

fn default_max_entries() -> usize {
    512
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
            stale_after_ms: None,
        }
    }
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the entry limit.
    pub fn with_max_entries(mut self, max: usize) -> Self {
        self.max_entries = max;
        self
    }

    /// Set the age-based staleness threshold.
    pub fn with_stale_after(mut self, age: Duration) -> Self {
        self.stale_after_ms = Some(age.as_millis().min(u64::MAX as u128) as u64);
        self
    }

    pub fn stale_after(&self) -> Option<Duration> {
        self.stale_after_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_never_age_out() {
        let config = CacheConfig::default();
        assert_eq!(config.max_entries, 512);
        assert_eq!(config.stale_after(), None);
    }

    #[test]
    fn builders_set_fields() {
        let config = CacheConfig::new()
            .with_max_entries(8)
            .with_stale_after(Duration::from_secs(2));
        assert_eq!(config.max_entries, 8);
        assert_eq!(config.stale_after_ms, Some(2_000));
    }
}
