use std::sync::Mutex;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

/// Process-wide counters and a latency histogram, injected into the
/// client builder rather than read from a global registry, since this
/// crate has no async-runtime-wide observability singleton to hook into.
#[derive(Default)]
pub struct Metrics {
    pub request_count: AtomicU64,
    pub success_count: AtomicU64,
    pub failed_count: AtomicU64,
    pub pool_get_count: AtomicU64,
    pub pool_put_ok_count: AtomicU64,
    pub pool_put_failed_count: AtomicU64,
    pool_outstanding: AtomicI64,
    latency_by_status_bucket: Mutex<LatencyHistogram>,
}

#[derive(Default)]
struct LatencyHistogram {
    // (status class, count, total_ms)
    buckets: Vec<(u16, u64, u64)>,
}

impl Metrics {
    pub fn new() -> Self {
        Metrics::default()
    }

    pub fn record_request(&self) {
        self.request_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_success(&self) {
        self.success_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failed_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_pool_get(&self) {
        self.pool_get_count.fetch_add(1, Ordering::Relaxed);
        self.pool_outstanding.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_pool_put(&self, ok: bool) {
        if ok {
            self.pool_put_ok_count.fetch_add(1, Ordering::Relaxed);
        } else {
            self.pool_put_failed_count.fetch_add(1, Ordering::Relaxed);
        }
        self.pool_outstanding.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn pool_outstanding(&self) -> i64 {
        self.pool_outstanding.load(Ordering::Relaxed)
    }

    pub fn record_latency(&self, status: u16, elapsed_ms: u64) {
        let bucket = status - (status % 100);
        let mut hist = self.latency_by_status_bucket.lock().expect("metrics poisoned");
        match hist.buckets.iter_mut().find(|(b, _, _)| *b == bucket) {
            Some((_, count, total)) => {
                *count += 1;
                *total += elapsed_ms;
            }
            None => hist.buckets.push((bucket, 1, elapsed_ms)),
        }
    }

    /// Mean latency for a status-code bucket (e.g. `200` for the 2xx
    /// bucket), for tests and diagnostics.
    pub fn mean_latency_ms(&self, bucket: u16) -> Option<f64> {
        let hist = self.latency_by_status_bucket.lock().expect("metrics poisoned");
        hist.buckets
            .iter()
            .find(|(b, _, _)| *b == bucket)
            .map(|(_, count, total)| *total as f64 / *count as f64)
    }
}
