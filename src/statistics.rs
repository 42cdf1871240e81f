use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe send/failure counters.
///
/// Every gateway owns one instance; a second, process-wide instance shared
/// across gateways receives every increment a gateway instance receives, so
/// the aggregate always equals the sum over the per-gateway counters. All
/// counters are monotonically non-decreasing for the lifetime of the value.
///
/// `total_failed` counts operations where the channel took the request and
/// reported an unsuccessful result; `total_failures` counts operations that
/// raised an error instead of completing.
#[derive(Debug, Default)]
pub struct Statistics {
    total_sent: AtomicU64,
    total_failed: AtomicU64,
    total_failures: AtomicU64,
}

impl Statistics {
    pub fn total_sent(&self) -> u64 {
        self.total_sent.load(Ordering::Relaxed)
    }

    pub fn total_failed(&self) -> u64 {
        self.total_failed.load(Ordering::Relaxed)
    }

    pub fn total_failures(&self) -> u64 {
        self.total_failures.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> StatisticsSnapshot {
        StatisticsSnapshot {
            total_sent: self.total_sent(),
            total_failed: self.total_failed(),
            total_failures: self.total_failures(),
        }
    }

    pub(crate) fn record_sent(&self) {
        self.total_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failed(&self) {
        self.total_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failure(&self) {
        self.total_failures.fetch_add(1, Ordering::Relaxed);
    }
}

/// Point-in-time copy of the counters, for reporting and assertions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatisticsSnapshot {
    pub total_sent: u64,
    pub total_failed: u64,
    pub total_failures: u64,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_counters_are_independent() {
        let statistics = Statistics::default();
        statistics.record_sent();
        statistics.record_sent();
        statistics.record_failed();
        statistics.record_failure();

        assert_eq!(
            statistics.snapshot(),
            StatisticsSnapshot {
                total_sent: 2,
                total_failed: 1,
                total_failures: 1,
            }
        );
    }

    #[test]
    fn test_concurrent_increments_are_not_lost() {
        let statistics = std::sync::Arc::new(Statistics::default());
        let threads: Vec<_> = (0..8)
            .map(|_| {
                let statistics = statistics.clone();
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        statistics.record_sent();
                    }
                })
            })
            .collect();
        for thread in threads {
            thread.join().unwrap();
        }
        assert_eq!(statistics.total_sent(), 8000);
    }
}
