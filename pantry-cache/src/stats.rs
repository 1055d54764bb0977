/// Counters describing cache usage since the store was created.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Populates answered from a fresh entry.
    pub hits: u64,
    /// Populates that started a fetch.
    pub misses: u64,
    /// Populates that joined a fetch already in flight.
    pub coalesced: u64,
    /// Entries marked stale by invalidation.
    pub invalidations: u64,
    /// Entries dropped for capacity.
    pub evictions: u64,
    /// Entries currently held.
    pub entry_count: u64,
}

impl CacheStats {
    /// Fraction of populates that issued no request (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let served = self.hits + self.coalesced;
        let total = served + self.misses;
        if total == 0 {
            0.0
        } else {
            served as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_rate_counts_coalesced_joins() {
        let stats = CacheStats {
            hits: 2,
            misses: 1,
            coalesced: 1,
            ..Default::default()
        };
        assert!((stats.hit_rate() - 0.75).abs() < f64::EPSILON);
        assert_eq!(CacheStats::default().hit_rate(), 0.0);
    }
}
