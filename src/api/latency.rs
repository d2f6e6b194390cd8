//! In-memory latency histograms for the resolve pipeline.
//! Records time spent in whichever network tier answered a fetch.

use std::sync::Mutex;
use std::time::Duration;

use serde::Serialize;

use crate::types::DataSource;

struct Histo {
    inner: Mutex<hdrhistogram::Histogram<u64>>,
}

impl Histo {
    /// Tracks 1us to 100s, 3 significant figures.
    fn new() -> Self {
        let histogram = hdrhistogram::Histogram::new_with_bounds(1, 100_000_000, 3)
            .expect("valid histogram bounds");
        Self {
            inner: Mutex::new(histogram),
        }
    }

    fn record_us(&self, us: u64) {
        if let Ok(mut h) = self.inner.lock() {
            let _ = h.record(us);
        }
    }

    fn snapshot(&self) -> TierSnapshot {
        let Ok(h) = self.inner.lock() else {
            return TierSnapshot::default();
        };
        if h.is_empty() {
            return TierSnapshot::default();
        }
        TierSnapshot {
            samples: h.len(),
            p50_us: Some(h.value_at_quantile(0.5)),
            p95_us: Some(h.value_at_quantile(0.95)),
            p99_us: Some(h.value_at_quantile(0.99)),
        }
    }
}

/// One histogram per network tier. Cache hits are not recorded; they are
/// map lookups, not latencies worth a histogram slot.
pub struct TierLatency {
    mirror: Histo,
    chain: Histo,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct TierSnapshot {
    pub samples: u64,
    pub p50_us: Option<u64>,
    pub p95_us: Option<u64>,
    pub p99_us: Option<u64>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct LatencySnapshot {
    pub mirror: TierSnapshot,
    pub chain: TierSnapshot,
}

impl TierLatency {
    pub fn new() -> Self {
        Self {
            mirror: Histo::new(),
            chain: Histo::new(),
        }
    }

    pub fn record(&self, source: DataSource, elapsed: Duration) {
        let us = elapsed.as_micros().min(u128::from(u64::MAX)) as u64;
        match source {
            DataSource::Mirror => self.mirror.record_us(us),
            DataSource::Chain => self.chain.record_us(us),
            DataSource::Cache => {}
        }
    }

    pub fn snapshot(&self) -> LatencySnapshot {
        LatencySnapshot {
            mirror: self.mirror.snapshot(),
            chain: self.chain.snapshot(),
        }
    }
}

impl Default for TierLatency {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_attribute_to_the_right_tier() {
        let latency = TierLatency::new();
        latency.record(DataSource::Mirror, Duration::from_millis(5));
        latency.record(DataSource::Chain, Duration::from_millis(80));
        latency.record(DataSource::Chain, Duration::from_millis(120));
        // Cache resolves are not histogram material.
        latency.record(DataSource::Cache, Duration::from_millis(1));

        let snap = latency.snapshot();
        assert_eq!(snap.mirror.samples, 1);
        assert_eq!(snap.chain.samples, 2);
        assert!(snap.chain.p50_us.is_some());
    }

    #[test]
    fn empty_tier_snapshots_as_none() {
        let latency = TierLatency::new();
        let snap = latency.snapshot();
        assert_eq!(snap.mirror.samples, 0);
        assert!(snap.mirror.p50_us.is_none());
    }
}
