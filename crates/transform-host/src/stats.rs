//! Call and cache statistics.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

/// Snapshot of engine statistics.
///
/// # Examples
///
/// ```
/// use transform_host::TransformStats;
///
/// let stats = TransformStats {
///     total_calls: 10,
///     failed_calls: 1,
///     cache_hits: 3,
///     cache_misses: 1,
///     ..TransformStats::default()
/// };
/// assert_eq!(stats.cache_hit_rate(), Some(0.75));
/// assert_eq!(stats.success_rate(), Some(0.9));
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformStats {
    /// Transform calls attempted, including calls rejected before reaching the guest.
    pub total_calls: u32,

    /// Calls that ended in an error (sentinels, traps, contract violations).
    pub failed_calls: u32,

    /// Modules that failed to compile or verify.
    pub compilation_failures: u32,

    /// Module loads served from the cache.
    pub cache_hits: u32,

    /// Module loads that compiled.
    pub cache_misses: u32,

    /// Average transform call time in microseconds.
    pub avg_call_time_us: u64,
}

impl TransformStats {
    /// Fraction of module loads served from the cache.
    ///
    /// Returns `None` before the first load.
    #[must_use]
    pub fn cache_hit_rate(&self) -> Option<f64> {
        let loads = self.cache_hits.saturating_add(self.cache_misses);
        if loads == 0 {
            return None;
        }
        Some(f64::from(self.cache_hits) / f64::from(loads))
    }

    /// Fraction of calls that succeeded.
    ///
    /// Returns `None` before the first call.
    #[must_use]
    pub fn success_rate(&self) -> Option<f64> {
        if self.total_calls == 0 {
            return None;
        }
        let successes = self.total_calls.saturating_sub(self.failed_calls);
        Some(f64::from(successes) / f64::from(self.total_calls))
    }

    /// Average call time.
    #[must_use]
    pub const fn avg_call_time(&self) -> Duration {
        Duration::from_micros(self.avg_call_time_us)
    }
}

/// Shared atomic counters behind [`TransformStats`].
#[derive(Debug, Default)]
pub(crate) struct StatsRecorder {
    total_calls: AtomicU32,
    failed_calls: AtomicU32,
    compilation_failures: AtomicU32,
    cache_hits: AtomicU32,
    cache_misses: AtomicU32,
    total_call_time_us: AtomicU64,
}

impl StatsRecorder {
    pub(crate) fn record_call(&self, elapsed: Duration, succeeded: bool) {
        self.total_calls.fetch_add(1, Ordering::Relaxed);
        if !succeeded {
            self.failed_calls.fetch_add(1, Ordering::Relaxed);
        }
        let micros = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
        self.total_call_time_us.fetch_add(micros, Ordering::Relaxed);
    }

    pub(crate) fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_compilation_failure(&self) {
        self.compilation_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> TransformStats {
        let total_calls = self.total_calls.load(Ordering::Relaxed);
        let total_call_time_us = self.total_call_time_us.load(Ordering::Relaxed);

        let avg_call_time_us = if total_calls > 0 {
            total_call_time_us / u64::from(total_calls)
        } else {
            0
        };

        TransformStats {
            total_calls,
            failed_calls: self.failed_calls.load(Ordering::Relaxed),
            compilation_failures: self.compilation_failures.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            avg_call_time_us,
        }
    }
}
