// crates/rewrite/src/cache/locked.rs

//! Mutex layer exposing a non-thread-safe [`CacheStore`] through the
//! shared [`Cache`] interface.
//!
//! The lock covers only the backend call; it is released before the
//! result reaches the consumer, so no consumer code ever runs under the
//! cache lock.

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;

use super::{Cache, CacheResult, CacheStore};

pub struct LockedCache<S: CacheStore> {
    inner: Mutex<S>,
}

impl<S: CacheStore> LockedCache<S> {
    pub fn new(store: S) -> Self {
        LockedCache {
            inner: Mutex::new(store),
        }
    }
}

#[async_trait]
impl<S: CacheStore> Cache for LockedCache<S> {
    async fn get(&self, key: &str) -> CacheResult {
        self.inner.lock().get(key)
    }

    async fn put(&self, key: &str, value: Bytes) {
        self.inner.lock().put(key, value);
    }

    async fn delete(&self, key: &str) {
        self.inner.lock().delete(key);
    }

    fn is_healthy(&self) -> bool {
        self.inner.lock().is_healthy()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::LruStore;
    use std::sync::Arc;

    #[tokio::test]
    async fn concurrent_access_is_serialized() {
        let cache = Arc::new(LockedCache::new(LruStore::new(64)));
        let mut tasks = Vec::new();
        for i in 0..16 {
            let cache = Arc::clone(&cache);
            tasks.push(tokio::spawn(async move {
                let key = format!("k{i}");
                cache.put(&key, Bytes::from(format!("v{i}"))).await;
                cache.get(&key).await
            }));
        }
        for task in tasks {
            assert!(task.await.unwrap().is_hit());
        }
    }
}
