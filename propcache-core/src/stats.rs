use std::sync::atomic::{AtomicU64, Ordering};

/// Per-slot access counters.
///
/// A *hit* is a read served from an instance's stored value, a *miss* is a
/// read that ran the computation, and a *reset* is a purge that actually
/// removed a stored value. Counters are shared by every instance the slot
/// is used on.
///
/// All counters use `Relaxed` atomics: they are monitoring data, never used
/// to order other memory operations.
///
/// # Examples
///
/// ```
/// use propcache_core::SlotStats;
///
/// let stats = SlotStats::new();
/// stats.record_miss();
/// stats.record_hit();
/// stats.record_hit();
/// stats.record_reset();
///
/// assert_eq!(stats.computations(), 1);
/// assert_eq!(stats.total_reads(), 3);
/// assert_eq!(stats.resets(), 1);
/// assert!((stats.hit_rate() - 0.6666).abs() < 0.001);
/// ```
#[derive(Debug)]
pub struct SlotStats {
    hits: AtomicU64,
    misses: AtomicU64,
    resets: AtomicU64,
}

impl SlotStats {
    pub fn new() -> Self {
        Self {
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            resets: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_reset(&self) {
        self.resets.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Number of reads that ran the computation.
    ///
    /// Every miss computes exactly once, so this is the computation count.
    #[inline]
    pub fn computations(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn resets(&self) -> u64 {
        self.resets.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn total_reads(&self) -> u64 {
        self.hits() + self.computations()
    }

    /// Fraction of reads served without computing (0.0 when never read).
    #[inline]
    pub fn hit_rate(&self) -> f64 {
        let total = self.total_reads();
        if total == 0 {
            0.0
        } else {
            self.hits() as f64 / total as f64
        }
    }
}

impl Default for SlotStats {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for SlotStats {
    fn clone(&self) -> Self {
        Self {
            hits: AtomicU64::new(self.hits()),
            misses: AtomicU64::new(self.computations()),
            resets: AtomicU64::new(self.resets()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_stats() {
        let stats = SlotStats::new();
        assert_eq!(stats.hits(), 0);
        assert_eq!(stats.computations(), 0);
        assert_eq!(stats.resets(), 0);
        assert_eq!(stats.hit_rate(), 0.0);
    }

    #[test]
    fn test_counters() {
        let stats = SlotStats::new();
        stats.record_miss();
        stats.record_hit();
        stats.record_hit();
        stats.record_hit();
        stats.record_reset();

        assert_eq!(stats.hits(), 3);
        assert_eq!(stats.computations(), 1);
        assert_eq!(stats.total_reads(), 4);
        assert_eq!(stats.resets(), 1);
        assert!((stats.hit_rate() - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn test_clone_is_independent() {
        let stats = SlotStats::new();
        stats.record_hit();

        let cloned = stats.clone();
        stats.record_hit();

        assert_eq!(stats.hits(), 2);
        assert_eq!(cloned.hits(), 1);
    }

    #[test]
    fn test_concurrent_access() {
        use std::sync::Arc;
        use std::thread;

        let stats = Arc::new(SlotStats::new());
        let mut handles = vec![];

        for _ in 0..8 {
            let stats_clone = Arc::clone(&stats);
            handles.push(thread::spawn(move || {
                for _ in 0..100 {
                    stats_clone.record_hit();
                }
                stats_clone.record_miss();
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(stats.hits(), 800);
        assert_eq!(stats.computations(), 8);
    }
}
