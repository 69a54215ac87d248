// crates/rewrite/src/cache/stats.rs

//! Observability layer: every get/put/delete crosses this wrapper, which
//! records counts, latency buckets, and payload-size buckets.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use bytes::Bytes;

use super::{Cache, CacheResult, CacheState, KeyedResult};

/// Power-of-two bucketed histogram; index i counts samples in
/// `[2^i, 2^(i+1))`.
#[derive(Debug, Default)]
pub struct Histogram {
    buckets: [AtomicU64; 32],
}

impl Histogram {
    pub fn record(&self, sample: u64) {
        let index = (64 - sample.leading_zeros()).min(31) as usize;
        self.buckets[index].fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self) -> u64 {
        self.buckets
            .iter()
            .map(|b| b.load(Ordering::Relaxed))
            .sum()
    }
}

#[derive(Debug, Default)]
pub struct CacheStats {
    pub gets: AtomicU64,
    pub hits: AtomicU64,
    pub misses: AtomicU64,
    pub errors: AtomicU64,
    pub unhealthy: AtomicU64,
    pub puts: AtomicU64,
    pub deletes: AtomicU64,
    pub get_latency_us: Histogram,
    pub payload_bytes: Histogram,
}

impl CacheStats {
    fn record_get(&self, result: &CacheResult, started: Instant) {
        self.gets.fetch_add(1, Ordering::Relaxed);
        self.get_latency_us
            .record(started.elapsed().as_micros() as u64);
        match result.state {
            CacheState::Available => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                if let Some(value) = &result.value {
                    self.payload_bytes.record(value.len() as u64);
                }
            }
            CacheState::NotFound => {
                self.misses.fetch_add(1, Ordering::Relaxed);
            }
            CacheState::Error => {
                self.errors.fetch_add(1, Ordering::Relaxed);
            }
            CacheState::Unhealthy => {
                self.unhealthy.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

pub struct StatsCache {
    stats: Arc<CacheStats>,
    inner: Arc<dyn Cache>,
}

impl StatsCache {
    pub fn new(stats: Arc<CacheStats>, inner: Arc<dyn Cache>) -> Self {
        StatsCache { stats, inner }
    }

    pub fn stats(&self) -> &Arc<CacheStats> {
        &self.stats
    }
}

#[async_trait]
impl Cache for StatsCache {
    async fn get(&self, key: &str) -> CacheResult {
        let started = Instant::now();
        let result = self.inner.get(key).await;
        self.stats.record_get(&result, started);
        result
    }

    async fn multi_get(&self, keys: Vec<String>) -> Vec<KeyedResult> {
        let started = Instant::now();
        let results = self.inner.multi_get(keys).await;
        for entry in &results {
            self.stats.record_get(&entry.result, started);
        }
        results
    }

    async fn put(&self, key: &str, value: Bytes) {
        self.stats.puts.fetch_add(1, Ordering::Relaxed);
        self.stats.payload_bytes.record(value.len() as u64);
        self.inner.put(key, value).await;
    }

    async fn delete(&self, key: &str) {
        self.stats.deletes.fetch_add(1, Ordering::Relaxed);
        self.inner.delete(key).await;
    }

    fn is_healthy(&self) -> bool {
        self.inner.is_healthy()
    }
}
