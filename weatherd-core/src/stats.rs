use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;

/// Point-in-time copy of the service counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Statistics {
    pub total_requests: u64,
    pub cache_hits: u64,
    pub upstream_calls: u64,
    pub total_latency: Duration,
}

impl Statistics {
    /// Cumulative latency divided by the request count; zero before the first request.
    pub fn average_latency(&self) -> Duration {
        if self.total_requests == 0 {
            return Duration::ZERO;
        }
        let nanos = self.total_latency.as_nanos() / u128::from(self.total_requests);
        Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }

    /// Cache hits as a percentage of all requests.
    pub fn hit_rate(&self) -> f64 {
        if self.total_requests == 0 {
            return 0.0;
        }
        self.cache_hits as f64 * 100.0 / self.total_requests as f64
    }
}

/// Monotonic request counters shared by every in-flight request.
///
/// All four counters sit behind one lock so a snapshot is never torn.
#[derive(Debug, Default)]
pub struct StatisticsTracker {
    inner: Mutex<Statistics>,
}

impl StatisticsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_request_start(&self) {
        self.inner.lock().total_requests += 1;
    }

    pub fn record_cache_hit(&self) {
        self.inner.lock().cache_hits += 1;
    }

    pub fn record_upstream_call(&self) {
        self.inner.lock().upstream_calls += 1;
    }

    pub fn record_latency(&self, elapsed: Duration) {
        let mut stats = self.inner.lock();
        stats.total_latency = stats.total_latency.saturating_add(elapsed);
    }

    pub fn snapshot(&self) -> Statistics {
        *self.inner.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{sync::Arc, thread};

    #[test]
    fn empty_snapshot_has_zero_average() {
        let stats = StatisticsTracker::new().snapshot();
        assert_eq!(stats, Statistics::default());
        assert_eq!(stats.average_latency(), Duration::ZERO);
        assert_eq!(stats.hit_rate(), 0.0);
    }

    #[test]
    fn average_and_hit_rate() {
        let tracker = StatisticsTracker::new();
        for _ in 0..4 {
            tracker.record_request_start();
        }
        tracker.record_cache_hit();
        tracker.record_upstream_call();
        tracker.record_latency(Duration::from_millis(30));
        tracker.record_latency(Duration::from_millis(50));

        let stats = tracker.snapshot();
        assert_eq!(stats.total_requests, 4);
        assert_eq!(stats.total_latency, Duration::from_millis(80));
        assert_eq!(stats.average_latency(), Duration::from_millis(20));
        assert_eq!(stats.hit_rate(), 25.0);
    }

    #[test]
    fn concurrent_updates_are_not_lost() {
        let tracker = Arc::new(StatisticsTracker::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let tracker = tracker.clone();
                thread::spawn(move || {
                    for _ in 0..1000 {
                        tracker.record_request_start();
                        tracker.record_cache_hit();
                        tracker.record_latency(Duration::from_micros(1));
                        let snap = tracker.snapshot();
                        assert!(snap.cache_hits <= snap.total_requests);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let stats = tracker.snapshot();
        assert_eq!(stats.total_requests, 8000);
        assert_eq!(stats.cache_hits, 8000);
        assert_eq!(stats.total_latency, Duration::from_millis(8));
    }
}
