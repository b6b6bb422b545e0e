//! Observability: latency histograms and event counters for the pipeline.
//! Histograms keep the most recent samples and report p50/p95/p99.

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;

const RING_CAPACITY: usize = 512;

/// Fixed-capacity ring of recent samples.
struct SampleRing {
    samples: Vec<f64>,
    next: usize,
}

impl SampleRing {
    fn new() -> Self {
        Self {
            samples: Vec::with_capacity(RING_CAPACITY),
            next: 0,
        }
    }

    fn push(&mut self, value: f64) {
        if self.samples.len() < RING_CAPACITY {
            self.samples.push(value);
        } else {
            self.samples[self.next] = value;
        }
        self.next = (self.next + 1) % RING_CAPACITY;
    }

    fn percentile(sorted: &[f64], p: f64) -> f64 {
        if sorted.is_empty() {
            return 0.0;
        }
        let idx = ((p / 100.0) * (sorted.len() as f64 - 1.0)).round() as usize;
        sorted[idx.min(sorted.len() - 1)]
    }

    fn summary(&self) -> LatencySummary {
        let mut sorted = self.samples.clone();
        sorted.sort_by(f64::total_cmp);
        LatencySummary {
            p50_ms: Self::percentile(&sorted, 50.0),
            p95_ms: Self::percentile(&sorted, 95.0),
            p99_ms: Self::percentile(&sorted, 99.0),
            count: sorted.len(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LatencySummary {
    pub p50_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub counters: HashMap<&'static str, u64>,
    pub latencies: HashMap<&'static str, LatencySummary>,
}

#[derive(Default)]
pub struct MetricsRegistry {
    histograms: Mutex<HashMap<&'static str, SampleRing>>,
    counters: Mutex<HashMap<&'static str, u64>>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, name: &'static str, elapsed: Duration) {
        let ms = elapsed.as_secs_f64() * 1000.0;
        self.histograms
            .lock()
            .entry(name)
            .or_insert_with(SampleRing::new)
            .push(ms);
        tracing::trace!(metric = name, ms, "metric_recorded");
    }

    pub fn incr(&self, name: &'static str) {
        *self.counters.lock().entry(name).or_default() += 1;
    }

    pub fn count(&self, name: &str) -> u64 {
        self.counters.lock().get(name).copied().unwrap_or(0)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let counters = self.counters.lock().clone();
        let latencies = self
            .histograms
            .lock()
            .iter()
            .map(|(&name, ring)| (name, ring.summary()))
            .collect();
        MetricsSnapshot {
            counters,
            latencies,
        }
    }
}

/// Well-known metric names (constants to avoid typos).
pub mod metric_names {
    pub const LINE_TRANSLATE: &str = "t_line_translate";
    pub const DISPATCH_TO_COMMIT: &str = "t_dispatch_to_commit";

    pub const SNAPSHOT_CACHE_HIT: &str = "snapshot_cache_hit";
    pub const LINE_CACHE_HIT: &str = "line_cache_hit";
    pub const PROVIDER_CALL: &str = "provider_call";
    pub const PROVIDER_FAILURE: &str = "provider_failure";
    pub const STALE_DISCARD: &str = "stale_discard";
    pub const COMMIT: &str = "commit";
}
