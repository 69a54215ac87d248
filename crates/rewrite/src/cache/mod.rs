// crates/rewrite/src/cache/mod.rs

//! Abstract key/value cache interface shared by the input, metadata, and
//! output tiers.
//!
//! Backends are injected at startup. The core only adds composable
//! wrappers on top: a mutex layer for non-thread-safe stores, a key
//! namespacing layer, and a stats layer.

pub mod locked;
pub mod lru;
pub mod prefix;
pub mod stats;

pub use locked::LockedCache;
pub use lru::LruStore;
pub use prefix::PrefixCache;
pub use stats::{CacheStats, StatsCache};

use async_trait::async_trait;
use bytes::Bytes;

/// Delivery state of a single lookup. A consumer sees exactly one of
/// these per get.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    Available,
    NotFound,
    Error,
    Unhealthy,
}

#[derive(Debug, Clone)]
pub struct CacheResult {
    pub state: CacheState,
    pub value: Option<Bytes>,
}

impl CacheResult {
    pub fn found(value: Bytes) -> Self {
        CacheResult {
            state: CacheState::Available,
            value: Some(value),
        }
    }

    pub fn miss() -> Self {
        CacheResult {
            state: CacheState::NotFound,
            value: None,
        }
    }

    pub fn error() -> Self {
        CacheResult {
            state: CacheState::Error,
            value: None,
        }
    }

    pub fn unhealthy() -> Self {
        CacheResult {
            state: CacheState::Unhealthy,
            value: None,
        }
    }

    pub fn is_hit(&self) -> bool {
        self.state == CacheState::Available && self.value.is_some()
    }
}

/// A batched lookup result; backends echo the key they resolved so
/// namespacing wrappers can verify it on the way back.
#[derive(Debug, Clone)]
pub struct KeyedResult {
    pub key: String,
    pub result: CacheResult,
}

#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, key: &str) -> CacheResult;

    async fn multi_get(&self, keys: Vec<String>) -> Vec<KeyedResult> {
        let mut out = Vec::with_capacity(keys.len());
        for key in keys {
            let result = self.get(&key).await;
            out.push(KeyedResult { key, result });
        }
        out
    }

    async fn put(&self, key: &str, value: Bytes);

    async fn delete(&self, key: &str);

    fn is_healthy(&self) -> bool {
        true
    }
}

/// A non-thread-safe synchronous backing store; wrap in [`LockedCache`]
/// to expose it through [`Cache`].
pub trait CacheStore: Send {
    fn get(&mut self, key: &str) -> CacheResult;
    fn put(&mut self, key: &str, value: Bytes);
    fn delete(&mut self, key: &str);
    fn is_healthy(&self) -> bool {
        true
    }
}
